use rustc_hash::FxHashSet;

use crate::ast::{NodeId, NodeKind, RefStats, SyntaxTree};

/// Host objects and language builtins that never count as class
/// references. `Permutation` is the client-side runtime shim whose
/// calls the specializer replaces with literals.
const GLOBALS: &[&str] = &[
    "window",
    "document",
    "navigator",
    "location",
    "console",
    "Math",
    "JSON",
    "Date",
    "String",
    "Number",
    "Boolean",
    "Object",
    "Array",
    "Function",
    "RegExp",
    "Error",
    "undefined",
    "arguments",
    "Infinity",
    "NaN",
    "parseInt",
    "parseFloat",
    "isNaN",
    "isFinite",
    "encodeURIComponent",
    "decodeURIComponent",
    "setTimeout",
    "setInterval",
    "clearTimeout",
    "clearInterval",
    "Permutation",
];

/// Computes the tree's reference statistics and attaches them.
///
/// Bare identifiers that are neither locally declared nor builtins are
/// recorded as shared references; member chains of plain identifiers
/// are recorded as package references under their full dotted path.
/// References reached outside any function body are additionally
/// recorded as load-time, which is what break dependencies are built
/// from.
pub fn attach_stats(tree: &mut SyntaxTree) {
    let mut walker = Walker {
        tree,
        scopes: Vec::new(),
        depth: 0,
        stats: RefStats::default(),
    };
    let root = walker.tree.root();
    if let NodeKind::Script { body } = walker.tree.kind(root).clone() {
        walker.push_scope(&[], &body);
        for stmt in &body {
            walker.walk_statement(*stmt);
        }
        walker.scopes.pop();
    }
    let stats = walker.stats;
    tree.set_stats(stats);
}

struct Walker<'a> {
    tree: &'a SyntaxTree,
    scopes: Vec<FxHashSet<String>>,
    /// Function nesting depth; zero means load-time code.
    depth: u32,
    stats: RefStats,
}

impl<'a> Walker<'a> {
    /// Opens a scope holding the params plus all `var` and function
    /// declarations hoisted from the statement list.
    fn push_scope(&mut self, params: &[String], body: &[NodeId]) {
        let mut scope: FxHashSet<String> = params.iter().cloned().collect();
        for stmt in body {
            self.hoist(*stmt, &mut scope);
        }
        self.scopes.push(scope);
    }

    fn hoist(&self, id: NodeId, scope: &mut FxHashSet<String>) {
        match self.tree.kind(id) {
            NodeKind::VarDecl { declarators } => {
                for decl in declarators {
                    scope.insert(decl.name.clone());
                }
            }
            NodeKind::Function {
                name: Some(name),
                declaration: true,
                ..
            } => {
                scope.insert(name.clone());
            }
            NodeKind::Block { body } => {
                for stmt in body {
                    self.hoist(*stmt, scope);
                }
            }
            NodeKind::If {
                consequent,
                alternate,
                ..
            } => {
                self.hoist(*consequent, scope);
                if let Some(alt) = alternate {
                    self.hoist(*alt, scope);
                }
            }
            _ => {}
        }
    }

    fn is_bound(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name)) || GLOBALS.contains(&name)
    }

    fn record_shared(&mut self, name: &str) {
        self.stats.shared.insert(name.to_string());
        if self.depth == 0 {
            self.stats.loadtime_shared.insert(name.to_string());
        }
    }

    fn record_package(&mut self, path: &str) {
        self.stats.packages.insert(path.to_string());
        if self.depth == 0 {
            self.stats.loadtime_packages.insert(path.to_string());
        }
    }

    fn walk_statement(&mut self, id: NodeId) {
        match self.tree.kind(id).clone() {
            NodeKind::Function { params, body, .. } => self.walk_function(&params, &body),
            NodeKind::Block { body } => {
                for stmt in &body {
                    self.walk_statement(*stmt);
                }
            }
            NodeKind::VarDecl { declarators } => {
                for decl in &declarators {
                    if let Some(init) = decl.init {
                        self.walk_expression(init);
                    }
                }
            }
            NodeKind::If {
                condition,
                consequent,
                alternate,
            } => {
                self.walk_expression(condition);
                self.walk_statement(consequent);
                if let Some(alt) = alternate {
                    self.walk_statement(alt);
                }
            }
            NodeKind::Return { value } => {
                if let Some(value) = value {
                    self.walk_expression(value);
                }
            }
            NodeKind::ExprStmt { expression } => self.walk_expression(expression),
            _ => {}
        }
    }

    fn walk_function(&mut self, params: &[String], body: &[NodeId]) {
        self.push_scope(params, body);
        self.depth += 1;
        for stmt in body {
            self.walk_statement(*stmt);
        }
        self.depth -= 1;
        self.scopes.pop();
    }

    fn walk_expression(&mut self, id: NodeId) {
        match self.tree.kind(id).clone() {
            NodeKind::Ident { name } => {
                if !self.is_bound(&name) {
                    self.record_shared(&name);
                }
            }
            NodeKind::Member { .. } => {
                if let Some(path) = self.flatten_chain(id) {
                    let base = path.split('.').next().expect("path has a base segment");
                    if !self.is_bound(base) {
                        self.record_package(&path);
                    }
                } else if let NodeKind::Member { object, .. } = self.tree.kind(id) {
                    self.walk_expression(*object);
                }
            }
            NodeKind::Assign { target, value } => {
                self.walk_expression(target);
                self.walk_expression(value);
            }
            NodeKind::Binary { left, right, .. } => {
                self.walk_expression(left);
                self.walk_expression(right);
            }
            NodeKind::Unary { operand, .. } => self.walk_expression(operand),
            NodeKind::Call { callee, arguments } => {
                self.walk_expression(callee);
                for arg in &arguments {
                    self.walk_expression(*arg);
                }
            }
            NodeKind::Function { params, body, .. } => self.walk_function(&params, &body),
            _ => {}
        }
    }

    /// Renders `a.b.c` chains of plain identifiers as a dotted path;
    /// chains rooted in anything else (calls, literals, `this`) are not
    /// namespace references.
    fn flatten_chain(&self, id: NodeId) -> Option<String> {
        match self.tree.kind(id) {
            NodeKind::Ident { name } => Some(name.clone()),
            NodeKind::Member { object, property } => {
                let mut base = self.flatten_chain(*object)?;
                base.push('.');
                base.push_str(property);
                Some(base)
            }
            _ => None,
        }
    }
}
