use crate::ast::{NodeId, NodeKind, SyntaxTree};

/// Combines adjacent `var` statements in a statement list into one
/// declaration list.
pub fn optimize(tree: &mut SyntaxTree) {
    let root = tree.root();
    if let NodeKind::Script { body } = tree.kind(root).clone() {
        let body = combine_list(tree, &body);
        tree.replace(root, NodeKind::Script { body });
    }
}

fn combine_list(tree: &mut SyntaxTree, body: &[NodeId]) -> Vec<NodeId> {
    let mut out: Vec<NodeId> = Vec::with_capacity(body.len());
    for &stmt in body {
        combine_statement(tree, stmt);

        let merged = match (out.last(), tree.kind(stmt)) {
            (Some(&prev), NodeKind::VarDecl { declarators })
                if matches!(tree.kind(prev), NodeKind::VarDecl { .. }) =>
            {
                let mut extra = declarators.clone();
                if let NodeKind::VarDecl { declarators } = tree.kind_mut(prev) {
                    declarators.append(&mut extra);
                }
                true
            }
            _ => false,
        };
        if !merged {
            out.push(stmt);
        }
    }
    out
}

fn combine_statement(tree: &mut SyntaxTree, id: NodeId) {
    match tree.kind(id).clone() {
        NodeKind::Block { body } => {
            let body = combine_list(tree, &body);
            tree.replace(id, NodeKind::Block { body });
        }
        NodeKind::Function {
            name,
            params,
            body,
            declaration,
        } => {
            let body = combine_list(tree, &body);
            tree.replace(
                id,
                NodeKind::Function {
                    name,
                    params,
                    body,
                    declaration,
                },
            );
        }
        NodeKind::If {
            consequent,
            alternate,
            ..
        } => {
            combine_statement(tree, consequent);
            if let Some(alt) = alternate {
                combine_statement(tree, alt);
            }
        }
        NodeKind::ExprStmt { expression } => combine_expression(tree, expression),
        NodeKind::VarDecl { declarators } => {
            for decl in declarators {
                if let Some(init) = decl.init {
                    combine_expression(tree, init);
                }
            }
        }
        NodeKind::Return { value } => {
            if let Some(value) = value {
                combine_expression(tree, value);
            }
        }
        _ => {}
    }
}

/// Function expressions carry their own statement lists.
fn combine_expression(tree: &mut SyntaxTree, id: NodeId) {
    match tree.kind(id).clone() {
        NodeKind::Function {
            name,
            params,
            body,
            declaration,
        } => {
            let body = combine_list(tree, &body);
            tree.replace(
                id,
                NodeKind::Function {
                    name,
                    params,
                    body,
                    declaration,
                },
            );
        }
        NodeKind::Assign { target, value } => {
            combine_expression(tree, target);
            combine_expression(tree, value);
        }
        NodeKind::Binary { left, right, .. } => {
            combine_expression(tree, left);
            combine_expression(tree, right);
        }
        NodeKind::Unary { operand, .. } => combine_expression(tree, operand),
        NodeKind::Call { callee, arguments } => {
            combine_expression(tree, callee);
            for arg in arguments {
                combine_expression(tree, arg);
            }
        }
        NodeKind::Member { object, .. } => combine_expression(tree, object),
        _ => {}
    }
}
