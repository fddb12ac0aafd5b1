use std::fmt::Display;
use std::rc::Rc;

use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOperator {
    pub fn from_token(token_type: TokenType) -> Option<Self> {
        let operator = match token_type {
            TokenType::Plus => BinaryOperator::Add,
            TokenType::Minus => BinaryOperator::Subtract,
            TokenType::Star => BinaryOperator::Multiply,
            TokenType::Slash => BinaryOperator::Divide,
            TokenType::Percent => BinaryOperator::Modulo,
            TokenType::EqualEqual => BinaryOperator::Equal,
            TokenType::BangEqual => BinaryOperator::NotEqual,
            TokenType::Less => BinaryOperator::Less,
            TokenType::LessEqual => BinaryOperator::LessEqual,
            TokenType::Greater => BinaryOperator::Greater,
            TokenType::GreaterEqual => BinaryOperator::GreaterEqual,
            TokenType::And => BinaryOperator::And,
            TokenType::Or => BinaryOperator::Or,
            _ => return None,
        };
        Some(operator)
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
        };
        write!(f, "{symbol}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Plus,
    Not,
}

impl Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOperator::Negate => write!(f, "-"),
            UnaryOperator::Plus => write!(f, "+"),
            UnaryOperator::Not => write!(f, "not"),
        }
    }
}

/// What follows an object in `object.name` or `object[expr]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    Name(String),
    Index(Box<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub type_name: String,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Number(Number),
    Str(Rc<str>),
    Identifier(String),
    Binary {
        left: Box<Node>,
        operator: BinaryOperator,
        right: Box<Node>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Node>,
    },
    /// `target = value`, where target is an identifier or a key access.
    Assign {
        target: Box<Node>,
        value: Box<Node>,
    },
    Declare {
        type_name: String,
        name: String,
        value: Box<Node>,
    },
    List(Vec<Node>),
    KeyAccess {
        object: Box<Node>,
        key: Key,
    },
    Call {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    FunctionDef {
        name: String,
        params: Vec<Param>,
        return_type: String,
        body: Rc<Node>,
        auto_return: bool,
    },
    If {
        cases: Vec<(Node, Node)>,
        else_body: Option<Box<Node>>,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
    },
    Namespace {
        name: String,
        body: Box<Node>,
    },
    Return(Option<Box<Node>>),
    Break,
    Continue,
    Block(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn boxed(self) -> Box<Node> {
        Box::new(self)
    }

    pub fn is_assignable(&self) -> bool {
        matches!(self.kind, NodeKind::Identifier(_) | NodeKind::KeyAccess { .. })
    }

    /// Move this node's children into `pending`, leaving it a leaf.
    fn detach_children(&mut self, pending: &mut Vec<Node>) {
        match std::mem::replace(&mut self.kind, NodeKind::Break) {
            NodeKind::Binary { left, right, .. } => pending.extend([*left, *right]),
            NodeKind::Unary { operand, .. } => pending.push(*operand),
            NodeKind::Assign { target, value } => pending.extend([*target, *value]),
            NodeKind::Declare { value, .. } => pending.push(*value),
            NodeKind::List(items) | NodeKind::Block(items) => pending.extend(items),
            NodeKind::KeyAccess { object, key } => {
                pending.push(*object);
                if let Key::Index(index) = key {
                    pending.push(*index);
                }
            }
            NodeKind::Call { callee, arguments } => {
                pending.push(*callee);
                pending.extend(arguments);
            }
            // Function values may still share the body.
            NodeKind::FunctionDef { body, .. } => pending.extend(Rc::into_inner(body)),
            NodeKind::If { cases, else_body } => {
                for (condition, body) in cases {
                    pending.extend([condition, body]);
                }
                pending.extend(else_body.map(|body| *body));
            }
            NodeKind::While { condition, body } => pending.extend([*condition, *body]),
            NodeKind::Namespace { body, .. } => pending.push(*body),
            NodeKind::Return(value) => pending.extend(value.map(|value| *value)),
            NodeKind::Number(_)
            | NodeKind::Str(_)
            | NodeKind::Identifier(_)
            | NodeKind::Break
            | NodeKind::Continue => {}
        }
    }
}

// Long operator chains nest one level per operand, so the default
// recursive drop could run out of stack. Tear the tree down with a worklist.
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = vec![];
        self.detach_children(&mut pending);

        while let Some(mut node) = pending.pop() {
            node.detach_children(&mut pending);
        }
    }
}
