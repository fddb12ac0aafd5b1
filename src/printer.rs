use crate::prelude::*;

/// Renders a syntax tree as s-expressions, mostly for tests and debugging.
pub struct AstPrinter;

impl AstPrinter {
    pub fn to_string(node: &Node) -> String {
        match &node.kind {
            NodeKind::Number(n) => format!("{n}"),
            NodeKind::Str(s) => format!("{s:?}"),
            NodeKind::Identifier(name) => name.clone(),
            NodeKind::Binary { left, operator, right } => {
                format!("({operator} {} {})", Self::to_string(left), Self::to_string(right))
            }
            NodeKind::Unary { operator, operand } => {
                format!("({operator} {})", Self::to_string(operand))
            }
            NodeKind::Assign { target, value } => {
                format!("(= {} {})", Self::to_string(target), Self::to_string(value))
            }
            NodeKind::Declare { type_name, name, value } => {
                format!("(declare {type_name} {name} {})", Self::to_string(value))
            }
            NodeKind::List(items) => Self::parenthesize("list", items.iter()),
            NodeKind::KeyAccess { object, key: Key::Name(name) } => {
                format!("(. {} {name})", Self::to_string(object))
            }
            NodeKind::KeyAccess { object, key: Key::Index(index) } => {
                format!("([] {} {})", Self::to_string(object), Self::to_string(index))
            }
            NodeKind::Call { callee, arguments } => Self::parenthesize(
                &format!("call {}", Self::to_string(callee)),
                arguments.iter(),
            ),
            NodeKind::FunctionDef { name, params, return_type, body, auto_return } => {
                let mut out = format!("(fn {return_type} {name}");
                for param in params {
                    out.push_str(&format!(" ({} {})", param.type_name, param.name));
                }
                if *auto_return {
                    out.push_str(" =");
                }
                out.push_str(&format!(" {})", Self::to_string(body)));
                out
            }
            NodeKind::If { cases, else_body } => {
                let mut out = "(if".to_owned();
                for (condition, body) in cases {
                    out.push_str(&format!(
                        " ({} {})",
                        Self::to_string(condition),
                        Self::to_string(body)
                    ));
                }
                if let Some(body) = else_body {
                    out.push_str(&format!(" (else {})", Self::to_string(body)));
                }
                out.push(')');
                out
            }
            NodeKind::While { condition, body } => {
                format!("(while {} {})", Self::to_string(condition), Self::to_string(body))
            }
            NodeKind::Namespace { name, body } => {
                format!("(namespace {name} {})", Self::to_string(body))
            }
            NodeKind::Return(Some(value)) => format!("(return {})", Self::to_string(value)),
            NodeKind::Return(None) => "(return)".to_owned(),
            NodeKind::Break => "break".to_owned(),
            NodeKind::Continue => "continue".to_owned(),
            NodeKind::Block(statements) => Self::parenthesize("block", statements.iter()),
        }
    }

    fn parenthesize<'a>(head: &str, nodes: impl Iterator<Item = &'a Node>) -> String {
        let mut out = format!("({head}");
        for node in nodes {
            out.push(' ');
            out.push_str(&Self::to_string(node));
        }
        out.push(')');
        out
    }
}
