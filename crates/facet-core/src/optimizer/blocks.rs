use crate::ast::{NodeId, NodeKind, SyntaxTree};

/// Block reduction: splices blocks nested directly in a statement
/// list, drops empty statements, and unwraps single-statement `if`
/// branches. Runs before declaration combination so `var` statements
/// buried in blocks become adjacent.
pub fn optimize(tree: &mut SyntaxTree) {
    let root = tree.root();
    if let NodeKind::Script { body } = tree.kind(root).clone() {
        let body = reduce_list(tree, &body);
        tree.replace(root, NodeKind::Script { body });
    }
}

fn reduce_list(tree: &mut SyntaxTree, body: &[NodeId]) -> Vec<NodeId> {
    let mut out = Vec::with_capacity(body.len());
    for &stmt in body {
        reduce_statement(tree, stmt);
        match tree.kind(stmt) {
            NodeKind::Block { body } => out.extend(body.iter().copied()),
            NodeKind::Empty => {}
            _ => out.push(stmt),
        }
    }
    out
}

fn reduce_statement(tree: &mut SyntaxTree, id: NodeId) {
    match tree.kind(id).clone() {
        NodeKind::Block { body } => {
            let body = reduce_list(tree, &body);
            tree.replace(id, NodeKind::Block { body });
        }
        NodeKind::Function {
            name,
            params,
            body,
            declaration,
        } => {
            let body = reduce_list(tree, &body);
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
            condition,
            consequent,
            alternate,
        } => {
            let consequent = reduce_branch(tree, consequent);
            let alternate = alternate.map(|alt| reduce_branch(tree, alt));
            tree.replace(
                id,
                NodeKind::If {
                    condition,
                    consequent,
                    alternate,
                },
            );
        }
        NodeKind::ExprStmt { expression } => reduce_expression(tree, expression),
        NodeKind::VarDecl { declarators } => {
            for decl in declarators {
                if let Some(init) = decl.init {
                    reduce_expression(tree, init);
                }
            }
        }
        NodeKind::Return { value } => {
            if let Some(value) = value {
                reduce_expression(tree, value);
            }
        }
        _ => {}
    }
}

/// An `if` branch that reduced to a one-statement block is unwrapped
/// to the bare statement.
fn reduce_branch(tree: &mut SyntaxTree, id: NodeId) -> NodeId {
    reduce_statement(tree, id);
    match tree.kind(id) {
        NodeKind::Block { body } if body.len() == 1 => body[0],
        _ => id,
    }
}

fn reduce_expression(tree: &mut SyntaxTree, id: NodeId) {
    match tree.kind(id).clone() {
        NodeKind::Function {
            name,
            params,
            body,
            declaration,
        } => {
            let body = reduce_list(tree, &body);
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
            reduce_expression(tree, target);
            reduce_expression(tree, value);
        }
        NodeKind::Binary { left, right, .. } => {
            reduce_expression(tree, left);
            reduce_expression(tree, right);
        }
        NodeKind::Unary { operand, .. } => reduce_expression(tree, operand),
        NodeKind::Call { callee, arguments } => {
            reduce_expression(tree, callee);
            for arg in arguments {
                reduce_expression(tree, arg);
            }
        }
        NodeKind::Member { object, .. } => reduce_expression(tree, object),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::serializer::compress;
    use indoc::indoc;

    #[test]
    fn test_nested_blocks_are_flattened() {
        let mut tree = parse("{ a(); { b(); c(); } }", "a.B").unwrap();
        optimize(&mut tree);
        assert_eq!(compress(&tree), "a();b();c();");
    }

    #[test]
    fn test_empty_statements_are_dropped() {
        let mut tree = parse("a();;;b();", "a.B").unwrap();
        optimize(&mut tree);
        assert_eq!(compress(&tree), "a();b();");
    }

    #[test]
    fn test_single_statement_if_branch_is_unwrapped() {
        let mut tree = parse("if (ready) { start(); } else { wait(); }", "a.B").unwrap();
        optimize(&mut tree);
        assert_eq!(compress(&tree), "if(ready)start();else wait();");
    }

    #[test]
    fn test_multi_statement_branch_keeps_its_block() {
        let mut tree = parse(
            indoc! {r#"
                if (ready) {
                    start();
                    notify();
                }
            "#},
            "a.B",
        )
        .unwrap();
        optimize(&mut tree);
        assert_eq!(compress(&tree), "if(ready){start();notify();}");
    }

    #[test]
    fn test_function_bodies_are_reduced() {
        let mut tree = parse("main.App = function() { { init(); } };", "main.App").unwrap();
        optimize(&mut tree);
        assert_eq!(compress(&tree), "main.App=function(){init();};");
    }
}
