use crate::ast::{format_number, NodeId, NodeKind, SyntaxTree};

/// Serializes a tree to compact JavaScript text. This is the final
/// pipeline stage; its output is what gets cached per permutation and
/// optimization signature and concatenated into the bundle.
pub fn compress(tree: &SyntaxTree) -> String {
    let mut out = String::new();
    for &stmt in tree.script_body() {
        out.push_str(&statement(tree, stmt));
    }
    out
}

fn statement(tree: &SyntaxTree, id: NodeId) -> String {
    match tree.kind(id) {
        NodeKind::Script { body } | NodeKind::Block { body } => {
            let mut out = String::from("{");
            for &stmt in body {
                out.push_str(&statement(tree, stmt));
            }
            out.push('}');
            out
        }
        NodeKind::Function {
            name,
            params,
            body,
            declaration: true,
        } => function_text(tree, name.as_deref(), params, body),
        NodeKind::VarDecl { declarators } => {
            let list: Vec<String> = declarators
                .iter()
                .map(|decl| match decl.init {
                    Some(init) => format!("{}={}", decl.name, expression(tree, init, 2)),
                    None => decl.name.clone(),
                })
                .collect();
            format!("var {};", list.join(","))
        }
        NodeKind::If {
            condition,
            consequent,
            alternate,
        } => {
            let mut out = format!(
                "if({}){}",
                expression(tree, *condition, 1),
                statement(tree, *consequent)
            );
            if let Some(alt) = alternate {
                let alt_text = statement(tree, *alt);
                out.push_str("else");
                if !alt_text.starts_with('{') {
                    out.push(' ');
                }
                out.push_str(&alt_text);
            }
            out
        }
        NodeKind::Return { value } => match value {
            Some(value) => format!("return {};", expression(tree, *value, 1)),
            None => "return;".to_string(),
        },
        NodeKind::ExprStmt { expression: expr } => {
            let text = expression(tree, *expr, 1);
            // A function expression at statement position would parse
            // as a declaration; parenthesize it.
            if matches!(
                tree.kind(*expr),
                NodeKind::Function {
                    declaration: false,
                    ..
                }
            ) {
                format!("({});", text)
            } else {
                format!("{};", text)
            }
        }
        NodeKind::Empty => ";".to_string(),
        other => panic!("not a statement node: {:?}", other),
    }
}

fn function_text(
    tree: &SyntaxTree,
    name: Option<&str>,
    params: &[String],
    body: &[NodeId],
) -> String {
    let mut out = String::from("function");
    if let Some(name) = name {
        out.push(' ');
        out.push_str(name);
    }
    out.push('(');
    out.push_str(&params.join(","));
    out.push_str("){");
    for &stmt in body {
        out.push_str(&statement(tree, stmt));
    }
    out.push('}');
    out
}

/// Binding strength of an expression node; used to decide
/// parenthesization against the context's minimum.
fn precedence(tree: &SyntaxTree, id: NodeId) -> u8 {
    match tree.kind(id) {
        NodeKind::Assign { .. } => 1,
        NodeKind::Binary { op, .. } => op.precedence(),
        NodeKind::Unary { .. } => 8,
        NodeKind::Call { .. } | NodeKind::Member { .. } => 9,
        _ => 10,
    }
}

fn expression(tree: &SyntaxTree, id: NodeId, min_prec: u8) -> String {
    let text = match tree.kind(id) {
        NodeKind::Assign { target, value } => format!(
            "{}={}",
            expression(tree, *target, 9),
            expression(tree, *value, 1)
        ),
        NodeKind::Binary { op, left, right } => {
            let prec = op.precedence();
            format!(
                "{}{}{}",
                expression(tree, *left, prec),
                op.symbol(),
                expression(tree, *right, prec + 1)
            )
        }
        NodeKind::Unary { op, operand } => {
            let inner = expression(tree, *operand, 8);
            if op.symbol() == "-" && inner.starts_with('-') {
                format!("- {}", inner)
            } else {
                format!("{}{}", op.symbol(), inner)
            }
        }
        NodeKind::Call { callee, arguments } => {
            let args: Vec<String> = arguments
                .iter()
                .map(|&arg| expression(tree, arg, 2))
                .collect();
            format!("{}({})", expression(tree, *callee, 9), args.join(","))
        }
        NodeKind::Member { object, property } => {
            format!("{}.{}", expression(tree, *object, 9), property)
        }
        NodeKind::Function {
            name,
            params,
            body,
            ..
        } => function_text(tree, name.as_deref(), params, body),
        NodeKind::Ident { name } => name.clone(),
        NodeKind::This => "this".to_string(),
        NodeKind::Str(value) => quote(value),
        NodeKind::Number(value) => format_number(*value),
        NodeKind::Bool(value) => value.to_string(),
        NodeKind::Null => "null".to_string(),
        other => panic!("not an expression node: {:?}", other),
    };

    if precedence(tree, id) < min_prec {
        format!("({})", text)
    } else {
        text
    }
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}
