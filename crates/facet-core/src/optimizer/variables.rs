use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{NodeId, NodeKind, SyntaxTree};

const LETTERS: &[u8; 52] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Renames function-local variables and parameters to short names.
///
/// Each function scope assigns names in hoist order (params first,
/// then declarations), skipping any identifier that occurs free in the
/// scope's subtree and any short name already taken by an enclosing
/// scope, so captures keep resolving to the right binding.
pub fn optimize(tree: &mut SyntaxTree) {
    let root = tree.root();
    let NodeKind::Script { body } = tree.kind(root).clone() else {
        return;
    };
    let mut scopes: Vec<FxHashMap<String, String>> = Vec::new();
    for stmt in body {
        walk(tree, stmt, &mut scopes);
    }
}

fn walk(tree: &mut SyntaxTree, id: NodeId, scopes: &mut Vec<FxHashMap<String, String>>) {
    match tree.kind(id).clone() {
        NodeKind::Function { params, body, .. } => {
            // A declaration's name binds in the enclosing scope, where
            // it was hoisted and mapped; rewrite it through the
            // enclosing scopes so call sites and definition agree.
            if let NodeKind::Function {
                name: Some(name),
                declaration: true,
                ..
            } = tree.kind(id)
            {
                if let Some(short) = lookup(scopes, name) {
                    if let NodeKind::Function { name, .. } = tree.kind_mut(id) {
                        *name = Some(short);
                    }
                }
            }

            let locals = collect_locals(tree, &params, &body);
            let mut reserved = collect_names(tree, id);
            for scope in scopes.iter() {
                reserved.extend(scope.values().cloned());
            }

            let mut mapping = FxHashMap::default();
            let mut counter = 0usize;
            for local in &locals {
                let short = next_name(&mut counter, &reserved);
                mapping.insert(local.clone(), short);
            }

            if let NodeKind::Function { params, .. } = tree.kind_mut(id) {
                for param in params.iter_mut() {
                    if let Some(short) = mapping.get(param) {
                        *param = short.clone();
                    }
                }
            }

            scopes.push(mapping);
            for stmt in body {
                walk(tree, stmt, scopes);
            }
            scopes.pop();
        }
        NodeKind::Ident { name } => {
            if let Some(short) = lookup(scopes, &name) {
                if let NodeKind::Ident { name } = tree.kind_mut(id) {
                    *name = short;
                }
            }
        }
        NodeKind::VarDecl { declarators } => {
            for (index, decl) in declarators.iter().enumerate() {
                if let Some(short) = lookup(scopes, &decl.name) {
                    if let NodeKind::VarDecl { declarators } = tree.kind_mut(id) {
                        declarators[index].name = short;
                    }
                }
                if let Some(init) = decl.init {
                    walk(tree, init, scopes);
                }
            }
        }
        NodeKind::Block { body } => {
            for stmt in body {
                walk(tree, stmt, scopes);
            }
        }
        NodeKind::If {
            condition,
            consequent,
            alternate,
        } => {
            walk(tree, condition, scopes);
            walk(tree, consequent, scopes);
            if let Some(alt) = alternate {
                walk(tree, alt, scopes);
            }
        }
        NodeKind::Return { value } => {
            if let Some(value) = value {
                walk(tree, value, scopes);
            }
        }
        NodeKind::ExprStmt { expression } => walk(tree, expression, scopes),
        NodeKind::Assign { target, value } => {
            walk(tree, target, scopes);
            walk(tree, value, scopes);
        }
        NodeKind::Binary { left, right, .. } => {
            walk(tree, left, scopes);
            walk(tree, right, scopes);
        }
        NodeKind::Unary { operand, .. } => walk(tree, operand, scopes),
        NodeKind::Call { callee, arguments } => {
            walk(tree, callee, scopes);
            for arg in arguments {
                walk(tree, arg, scopes);
            }
        }
        // Member property names are not variable references.
        NodeKind::Member { object, .. } => walk(tree, object, scopes),
        _ => {}
    }
}

fn lookup(scopes: &[FxHashMap<String, String>], name: &str) -> Option<String> {
    scopes
        .iter()
        .rev()
        .find_map(|scope| scope.get(name).cloned())
}

/// Params plus hoisted `var` and function declaration names of one
/// function body, in source order, without descending into nested
/// functions.
fn collect_locals(tree: &SyntaxTree, params: &[String], body: &[NodeId]) -> Vec<String> {
    let mut locals: Vec<String> = params.to_vec();
    let mut seen: FxHashSet<String> = params.iter().cloned().collect();
    for &stmt in body {
        hoist(tree, stmt, &mut locals, &mut seen);
    }
    locals
}

fn hoist(tree: &SyntaxTree, id: NodeId, locals: &mut Vec<String>, seen: &mut FxHashSet<String>) {
    match tree.kind(id) {
        NodeKind::VarDecl { declarators } => {
            for decl in declarators {
                if seen.insert(decl.name.clone()) {
                    locals.push(decl.name.clone());
                }
            }
        }
        NodeKind::Function {
            name: Some(name),
            declaration: true,
            ..
        } => {
            if seen.insert(name.clone()) {
                locals.push(name.clone());
            }
        }
        NodeKind::Block { body } => {
            for &stmt in body {
                hoist(tree, stmt, locals, seen);
            }
        }
        NodeKind::If {
            consequent,
            alternate,
            ..
        } => {
            hoist(tree, *consequent, locals, seen);
            if let Some(alt) = alternate {
                hoist(tree, *alt, locals, seen);
            }
        }
        _ => {}
    }
}

/// Every identifier-ish name occurring in a subtree; renaming must not
/// collide with any of them.
fn collect_names(tree: &SyntaxTree, id: NodeId) -> FxHashSet<String> {
    let mut names = FxHashSet::default();
    gather(tree, id, &mut names);
    names
}

fn gather(tree: &SyntaxTree, id: NodeId, names: &mut FxHashSet<String>) {
    match tree.kind(id) {
        NodeKind::Ident { name } => {
            names.insert(name.clone());
        }
        NodeKind::Function {
            name, params, body, ..
        } => {
            if let Some(name) = name {
                names.insert(name.clone());
            }
            names.extend(params.iter().cloned());
            for &stmt in body {
                gather(tree, stmt, names);
            }
        }
        NodeKind::VarDecl { declarators } => {
            for decl in declarators {
                names.insert(decl.name.clone());
                if let Some(init) = decl.init {
                    gather(tree, init, names);
                }
            }
        }
        NodeKind::Block { body } | NodeKind::Script { body } => {
            for &stmt in body {
                gather(tree, stmt, names);
            }
        }
        NodeKind::If {
            condition,
            consequent,
            alternate,
        } => {
            gather(tree, *condition, names);
            gather(tree, *consequent, names);
            if let Some(alt) = alternate {
                gather(tree, *alt, names);
            }
        }
        NodeKind::Return { value } => {
            if let Some(value) = value {
                gather(tree, *value, names);
            }
        }
        NodeKind::ExprStmt { expression } => gather(tree, *expression, names),
        NodeKind::Assign { target, value } => {
            gather(tree, *target, names);
            gather(tree, *value, names);
        }
        NodeKind::Binary { left, right, .. } => {
            gather(tree, *left, names);
            gather(tree, *right, names);
        }
        NodeKind::Unary { operand, .. } => gather(tree, *operand, names),
        NodeKind::Call { callee, arguments } => {
            gather(tree, *callee, names);
            for &arg in arguments {
                gather(tree, arg, names);
            }
        }
        NodeKind::Member { object, .. } => gather(tree, *object, names),
        _ => {}
    }
}

/// Next unreserved short name: `a`..`z`, `A`..`Z`, then two letters.
fn next_name(counter: &mut usize, reserved: &FxHashSet<String>) -> String {
    loop {
        let name = letter_name(*counter);
        *counter += 1;
        if !reserved.contains(&name) {
            return name;
        }
    }
}

fn letter_name(mut index: usize) -> String {
    let mut bytes = Vec::new();
    loop {
        bytes.push(LETTERS[index % 52]);
        index /= 52;
        if index == 0 {
            break;
        }
        index -= 1;
    }
    bytes.reverse();
    String::from_utf8(bytes).expect("letter names are ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::serializer::compress;
    use indoc::indoc;

    #[test]
    fn test_locals_and_params_are_shortened() {
        let mut tree = parse(
            indoc! {r#"
                function add(first, second) {
                    var total = first + second;
                    return total;
                }
            "#},
            "a.B",
        )
        .unwrap();
        optimize(&mut tree);
        assert_eq!(compress(&tree), "function add(a,b){var c=a+b;return c;}");
    }

    #[test]
    fn test_free_references_are_untouched() {
        let mut tree = parse(
            indoc! {r#"
                function report(value) {
                    logger.write(value);
                }
            "#},
            "a.B",
        )
        .unwrap();
        optimize(&mut tree);
        assert_eq!(compress(&tree), "function report(a){logger.write(a);}");
    }

    #[test]
    fn test_captured_outer_local_keeps_resolving() {
        let mut tree = parse(
            indoc! {r#"
                function outer(seed) {
                    var grow = function(amount) {
                        return seed + amount;
                    };
                    return grow;
                }
            "#},
            "a.B",
        )
        .unwrap();
        optimize(&mut tree);
        let compact = compress(&tree);
        // The inner parameter must not shadow the captured outer
        // `seed` under the same short name.
        assert_eq!(
            compact,
            "function outer(a){var b=function(c){return a+c;};return b;}"
        );
    }

    #[test]
    fn test_nested_declaration_renames_with_its_call_sites() {
        let mut tree = parse(
            indoc! {r#"
                function outer() {
                    function helper() {
                        return 1;
                    }
                    return helper();
                }
            "#},
            "a.B",
        )
        .unwrap();
        optimize(&mut tree);
        // The declaration and every call to it take the same short
        // name; a half-renamed pair would call an undefined function.
        assert_eq!(
            compress(&tree),
            "function outer(){function a(){return 1;}return a();}"
        );
    }

    #[test]
    fn test_reserved_short_name_is_skipped() {
        let mut tree = parse(
            indoc! {r#"
                function pick(value) {
                    return a.Registry.find(value);
                }
            "#},
            "a.B",
        )
        .unwrap();
        optimize(&mut tree);
        // `a` is the root of a namespace reference inside the scope,
        // so the parameter takes the next free letter.
        assert_eq!(compress(&tree), "function pick(b){return a.Registry.find(b);}");
    }

    #[test]
    fn test_letter_name_sequence() {
        assert_eq!(letter_name(0), "a");
        assert_eq!(letter_name(25), "z");
        assert_eq!(letter_name(26), "A");
        assert_eq!(letter_name(51), "Z");
        assert_eq!(letter_name(52), "aa");
    }
}
