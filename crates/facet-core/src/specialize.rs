use crate::ast::{BinaryOp, NodeId, NodeKind, SyntaxTree, UnaryOp};
use crate::permutation::{Permutation, VariantValue};
use crate::resolve;

/// Permutation-specializes a tree in place: patch variant queries to
/// their compile-time literals, sweep newly dead code, then recompute
/// the reference statistics so pruned branches stop contributing
/// dependencies. Callers hand in an independent clone; the cached base
/// tree is never touched.
pub fn specialize(tree: &mut SyntaxTree, permutation: &Permutation) {
    patch(tree, permutation);
    eliminate_dead_code(tree);
    resolve::attach_stats(tree);
}

/// Replaces `Permutation.getValue("field")` and
/// `Permutation.isSet("field"[, value])` calls with literals for every
/// field the permutation fixes. Queries for unknown fields stay as
/// runtime calls.
pub fn patch(tree: &mut SyntaxTree, permutation: &Permutation) -> bool {
    let mut replacements: Vec<(NodeId, NodeKind)> = Vec::new();

    for id in 0..tree.len() {
        let NodeKind::Call { callee, arguments } = tree.kind(id) else {
            continue;
        };
        let NodeKind::Member { object, property } = tree.kind(*callee) else {
            continue;
        };
        if !matches!(tree.kind(*object), NodeKind::Ident { name } if name == "Permutation") {
            continue;
        }
        let Some(NodeKind::Str(field)) = arguments.first().map(|arg| tree.kind(*arg)) else {
            continue;
        };
        let Some(value) = permutation.get(field) else {
            continue;
        };

        match property.as_str() {
            "getValue" => {
                replacements.push((id, literal_kind(value)));
            }
            "isSet" => {
                // Second argument defaults to `true`, matching the
                // client-side runtime.
                let expected = match arguments.get(1).map(|arg| tree.kind(*arg)) {
                    None => NodeKind::Bool(true),
                    Some(kind) if is_literal(kind) => kind.clone(),
                    Some(_) => continue,
                };
                replacements.push((id, NodeKind::Bool(loosely_equal(value, &expected))));
            }
            _ => {}
        }
    }

    let changed = !replacements.is_empty();
    for (id, kind) in replacements {
        tree.replace(id, kind);
    }
    changed
}

fn literal_kind(value: &VariantValue) -> NodeKind {
    match value {
        VariantValue::Bool(b) => NodeKind::Bool(*b),
        VariantValue::Number(n) => NodeKind::Number(*n),
        VariantValue::Str(s) => NodeKind::Str(s.clone()),
        VariantValue::Null => NodeKind::Null,
    }
}

fn is_literal(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Str(_) | NodeKind::Number(_) | NodeKind::Bool(_) | NodeKind::Null
    )
}

/// JavaScript loose equality between a permutation value and a literal
/// node, to the extent variant comparisons need it.
fn loosely_equal(value: &VariantValue, expected: &NodeKind) -> bool {
    match (value, expected) {
        (VariantValue::Str(a), NodeKind::Str(b)) => a == b,
        (VariantValue::Number(a), NodeKind::Number(b)) => a == b,
        (VariantValue::Bool(a), NodeKind::Bool(b)) => a == b,
        (VariantValue::Null, NodeKind::Null) => true,
        (VariantValue::Str(a), NodeKind::Number(b)) => {
            a.parse::<f64>().map(|n| n == *b).unwrap_or(false)
        }
        (VariantValue::Number(a), NodeKind::Str(b)) => {
            b.parse::<f64>().map(|n| n == *a).unwrap_or(false)
        }
        (VariantValue::Bool(a), NodeKind::Number(b)) => (*a as i32 as f64) == *b,
        (VariantValue::Number(a), NodeKind::Bool(b)) => *a == (*b as i32 as f64),
        _ => false,
    }
}

/// Prunes `if` branches whose condition folded to a compile-time
/// constant and drops statements after a `return` inside a block.
pub fn eliminate_dead_code(tree: &mut SyntaxTree) {
    let root = tree.root();
    if let NodeKind::Script { body } = tree.kind(root).clone() {
        let body = sweep_list(tree, &body);
        tree.replace(root, NodeKind::Script { body });
    }
}

fn sweep_list(tree: &mut SyntaxTree, body: &[NodeId]) -> Vec<NodeId> {
    let mut out = Vec::with_capacity(body.len());
    for &stmt in body {
        let Some(kept) = sweep_statement(tree, stmt) else {
            continue;
        };
        let terminal = matches!(tree.kind(kept), NodeKind::Return { .. });
        out.push(kept);
        if terminal {
            break;
        }
    }
    out
}

fn sweep_statement(tree: &mut SyntaxTree, id: NodeId) -> Option<NodeId> {
    match tree.kind(id).clone() {
        NodeKind::If {
            condition,
            consequent,
            alternate,
        } => match const_truth(tree, condition) {
            Some(true) => sweep_statement(tree, consequent),
            Some(false) => alternate.and_then(|alt| sweep_statement(tree, alt)),
            None => {
                let consequent = sweep_statement(tree, consequent)
                    .unwrap_or_else(|| tree.add(NodeKind::Empty));
                let alternate = alternate.and_then(|alt| sweep_statement(tree, alt));
                tree.replace(
                    id,
                    NodeKind::If {
                        condition,
                        consequent,
                        alternate,
                    },
                );
                Some(id)
            }
        },
        NodeKind::Block { body } => {
            let body = sweep_list(tree, &body);
            tree.replace(id, NodeKind::Block { body });
            Some(id)
        }
        NodeKind::Function {
            name,
            params,
            body,
            declaration,
        } => {
            let body = sweep_list(tree, &body);
            tree.replace(
                id,
                NodeKind::Function {
                    name,
                    params,
                    body,
                    declaration,
                },
            );
            Some(id)
        }
        NodeKind::ExprStmt { expression } => {
            sweep_expression(tree, expression);
            Some(id)
        }
        NodeKind::VarDecl { declarators } => {
            for decl in &declarators {
                if let Some(init) = decl.init {
                    sweep_expression(tree, init);
                }
            }
            Some(id)
        }
        NodeKind::Return { value } => {
            if let Some(value) = value {
                sweep_expression(tree, value);
            }
            Some(id)
        }
        _ => Some(id),
    }
}

/// Function expressions hide inside expressions; their bodies get the
/// same sweep.
fn sweep_expression(tree: &mut SyntaxTree, id: NodeId) {
    match tree.kind(id).clone() {
        NodeKind::Function {
            name,
            params,
            body,
            declaration,
        } => {
            let body = sweep_list(tree, &body);
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
            sweep_expression(tree, target);
            sweep_expression(tree, value);
        }
        NodeKind::Binary { left, right, .. } => {
            sweep_expression(tree, left);
            sweep_expression(tree, right);
        }
        NodeKind::Unary { operand, .. } => sweep_expression(tree, operand),
        NodeKind::Call { callee, arguments } => {
            sweep_expression(tree, callee);
            for arg in arguments {
                sweep_expression(tree, arg);
            }
        }
        _ => {}
    }
}

/// Constant truthiness of an expression, folding through `!`, `&&`,
/// `||` and same-type literal comparisons. `None` means not decidable
/// at compile time.
fn const_truth(tree: &SyntaxTree, id: NodeId) -> Option<bool> {
    match tree.kind(id) {
        NodeKind::Bool(b) => Some(*b),
        NodeKind::Str(s) => Some(!s.is_empty()),
        NodeKind::Number(n) => Some(*n != 0.0),
        NodeKind::Null => Some(false),
        NodeKind::Unary {
            op: UnaryOp::Not,
            operand,
        } => const_truth(tree, *operand).map(|b| !b),
        NodeKind::Binary { op, left, right } => match op {
            BinaryOp::And => match const_truth(tree, *left) {
                Some(false) => Some(false),
                Some(true) => const_truth(tree, *right),
                None => None,
            },
            BinaryOp::Or => match const_truth(tree, *left) {
                Some(true) => Some(true),
                Some(false) => const_truth(tree, *right),
                None => None,
            },
            BinaryOp::Eq | BinaryOp::StrictEq => literal_eq(tree, *left, *right),
            BinaryOp::NotEq | BinaryOp::StrictNotEq => {
                literal_eq(tree, *left, *right).map(|b| !b)
            }
            _ => None,
        },
        _ => None,
    }
}

/// Same-type literal comparison; mixed types stay undecided so no
/// branch is pruned on coercion guesses.
fn literal_eq(tree: &SyntaxTree, left: NodeId, right: NodeId) -> Option<bool> {
    match (tree.kind(left), tree.kind(right)) {
        (NodeKind::Str(a), NodeKind::Str(b)) => Some(a == b),
        (NodeKind::Number(a), NodeKind::Number(b)) => Some(a == b),
        (NodeKind::Bool(a), NodeKind::Bool(b)) => Some(a == b),
        (NodeKind::Null, NodeKind::Null) => Some(true),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::serializer::compress;
    use indoc::indoc;

    fn debug_on() -> Permutation {
        let mut perm = Permutation::new();
        perm.set("debug", VariantValue::Str("on".into()));
        perm
    }

    #[test]
    fn test_get_value_is_patched_to_literal() {
        let mut tree = parse("var mode = Permutation.getValue(\"debug\");", "a.B").unwrap();
        specialize(&mut tree, &debug_on());
        assert_eq!(compress(&tree), "var mode=\"on\";");
    }

    #[test]
    fn test_is_set_prunes_the_dead_branch() {
        let mut tree = parse(
            indoc! {r#"
                if (Permutation.isSet("debug", "on")) {
                    run();
                } else {
                    skip();
                }
            "#},
            "a.B",
        )
        .unwrap();
        specialize(&mut tree, &debug_on());
        assert_eq!(compress(&tree), "{run();}");
    }

    #[test]
    fn test_negated_query_keeps_the_other_branch() {
        let mut tree = parse(
            "if (!Permutation.isSet(\"debug\", \"on\")) { skip(); } else { run(); }",
            "a.B",
        )
        .unwrap();
        specialize(&mut tree, &debug_on());
        assert_eq!(compress(&tree), "{run();}");
    }

    #[test]
    fn test_unknown_field_is_left_as_runtime_call() {
        let mut tree = parse("var x = Permutation.getValue(\"other\");", "a.B").unwrap();
        specialize(&mut tree, &debug_on());
        assert_eq!(compress(&tree), "var x=Permutation.getValue(\"other\");");
    }

    #[test]
    fn test_is_set_defaults_to_true() {
        let mut perm = Permutation::new();
        perm.set("debug", VariantValue::Bool(true));
        let mut tree = parse("if (Permutation.isSet(\"debug\")) { run(); }", "a.B").unwrap();
        specialize(&mut tree, &perm);
        assert_eq!(compress(&tree), "{run();}");
    }

    #[test]
    fn test_statements_after_return_are_dropped() {
        let mut tree = parse(
            indoc! {r#"
                function f() {
                    return 1;
                    leftover();
                }
            "#},
            "a.B",
        )
        .unwrap();
        eliminate_dead_code(&mut tree);
        assert_eq!(compress(&tree), "function f(){return 1;}");
    }

    #[test]
    fn test_stats_are_recomputed_after_pruning() {
        let mut tree = parse(
            "if (Permutation.isSet(\"debug\", \"on\")) { a.DebugHelper.dump(); }",
            "a.B",
        )
        .unwrap();
        assert!(tree.stats().packages.contains("a.DebugHelper.dump"));

        let mut off = Permutation::new();
        off.set("debug", VariantValue::Str("off".into()));
        specialize(&mut tree, &off);
        assert!(!tree.stats().packages.contains("a.DebugHelper.dump"));
    }

    #[test]
    fn test_false_branch_without_else_disappears() {
        let mut tree = parse("if (false) { gone(); }\nkept();", "a.B").unwrap();
        eliminate_dead_code(&mut tree);
        assert_eq!(compress(&tree), "kept();");
    }
}
