use std::cmp::Ordering;
use std::fmt::{Debug, Display};
use std::rc::Rc;

use thiserror::Error;

use crate::prelude::*;

/// Containers nested deeper than this are shown as `{...}`.
const MAX_DISPLAY_DEPTH: usize = 8;

/// Most bytes (strings) or elements (lists) a repetition may produce.
const MAX_REPEAT_LEN: usize = 1 << 28;

#[derive(Clone)]
pub enum Value {
    Int(i32),
    Long(i64),
    Double(f64),
    Boolean(bool),
    String(Rc<str>),
    List(Rc<Vec<Value>>),
    Function(Rc<dyn Callable>),
    Namespace(Rc<Namespace>),
    Nil,
}

/// An environment frame exposed as a value.
pub struct Namespace {
    pub name: String,
    pub env: Shared<Environment>,
}

impl Namespace {
    pub fn new(name: &str, env: Shared<Environment>) -> Self {
        Self { name: name.to_owned(), env }
    }

    /// Only the namespace's own frame is searched, never its parents.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.env.borrow().get_local(key).map(|binding| binding.value)
    }

    pub fn set(&self, key: &str, value: Value) -> Result<(), EnvError> {
        self.env.borrow_mut().set_local(key, value)
    }

    pub fn len(&self) -> usize {
        self.env.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpError {
    #[error("{0}")]
    Illegal(String),
    #[error("division by zero")]
    DivisionByZero,
}

impl From<ArithmeticError> for OpError {
    fn from(e: ArithmeticError) -> Self {
        match e {
            ArithmeticError::DivisionByZero => OpError::DivisionByZero,
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(v) => Value::Int(v),
            Number::Long(v) => Value::Long(v),
            Number::Double(v) => Value::Double(v),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Int(_) => TypeTag::Int,
            Value::Long(_) => TypeTag::Long,
            Value::Double(_) => TypeTag::Double,
            Value::Boolean(_) => TypeTag::Boolean,
            Value::String(_) => TypeTag::String,
            Value::List(_) => TypeTag::List,
            Value::Function(_) => TypeTag::Function,
            Value::Namespace(_) => TypeTag::Namespace,
            Value::Nil => TypeTag::Void,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_tag().name()
    }

    pub fn as_number(&self) -> Option<Number> {
        match *self {
            Value::Int(v) => Some(Number::Int(v)),
            Value::Long(v) => Some(Number::Long(v)),
            Value::Double(v) => Some(Number::Double(v)),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Nil => false,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Int(_) | Value::Long(_) | Value::Double(_) => {
                self.as_number().is_some_and(|n| !n.is_zero())
            }
            Value::Function(_) | Value::Namespace(_) => true,
        }
    }

    /// Display form with strings quoted, as used inside containers.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_nested(&mut out, 0, true);
        out
    }

    fn write_nested(&self, f: &mut dyn std::fmt::Write, depth: usize, quoted: bool) -> std::fmt::Result {
        if depth > MAX_DISPLAY_DEPTH {
            return write!(f, "{{...}}");
        }

        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{}", Number::Double(*v)),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::String(s) if quoted => write!(f, "{s:?}"),
            Value::String(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.write_nested(f, depth + 1, true)?;
                }
                write!(f, "}}")
            }
            Value::Function(func) => write!(f, "<function {}>", func.name()),
            Value::Namespace(ns) => {
                let bindings = ns.env.borrow().bindings();
                if bindings.is_empty() {
                    return write!(f, "{{}}");
                }

                write!(f, "{{ ")?;
                for (i, (name, value)) in bindings.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}=")?;
                    value.write_nested(f, depth + 1, true)?;
                }
                write!(f, " }}")
            }
            Value::Nil => write!(f, "nil"),
        }
    }

    pub fn apply(&self, operator: BinaryOperator, other: &Value) -> Result<Value, OpError> {
        match operator {
            BinaryOperator::Add => self.added_to(other),
            BinaryOperator::Subtract => self.numeric(operator, other, |l, r| Ok(l - r)),
            BinaryOperator::Multiply => self.multiplied_by(other),
            BinaryOperator::Divide => self.numeric(operator, other, Number::checked_div),
            BinaryOperator::Modulo => self.numeric(operator, other, Number::checked_rem),
            BinaryOperator::Equal => Ok(Value::Boolean(self.loosely_equals(other))),
            BinaryOperator::NotEqual => Ok(Value::Boolean(!self.loosely_equals(other))),
            BinaryOperator::Less => self.compared_with(operator, other, Ordering::is_lt),
            BinaryOperator::LessEqual => self.compared_with(operator, other, Ordering::is_le),
            BinaryOperator::Greater => self.compared_with(operator, other, Ordering::is_gt),
            BinaryOperator::GreaterEqual => self.compared_with(operator, other, Ordering::is_ge),
            BinaryOperator::And => Ok(Value::Boolean(self.is_truthy() && other.is_truthy())),
            BinaryOperator::Or => Ok(Value::Boolean(self.is_truthy() || other.is_truthy())),
        }
    }

    pub fn negate(&self) -> Result<Value, OpError> {
        self.as_number().map(|n| Value::from(-n)).ok_or_else(|| {
            OpError::Illegal(format!(
                "unary operator '-' cannot be applied to operand of type {}",
                self.type_name()
            ))
        })
    }

    /// Element lookup with `value[key]`.
    pub fn index(&self, key: &Value) -> Result<Value, OpError> {
        match (self, key) {
            (Value::List(items), _) if key.as_integer().is_some() => {
                let position = key.as_integer().and_then(|i| resolve_index(i, items.len()));
                Ok(position.and_then(|i| items.get(i).cloned()).unwrap_or(Value::Nil))
            }
            (Value::String(s), _) if key.as_integer().is_some() => {
                let chars: Vec<char> = s.chars().collect();
                let position = key.as_integer().and_then(|i| resolve_index(i, chars.len()));
                Ok(position
                    .and_then(|i| chars.get(i))
                    .map(|c| Value::from(c.to_string().as_str()))
                    .unwrap_or(Value::Nil))
            }
            (Value::Namespace(ns), Value::String(name)) => Ok(ns.get(name).unwrap_or(Value::Nil)),
            _ => Err(OpError::Illegal(format!(
                "value of type {} cannot be indexed by {}",
                self.type_name(),
                key.type_name()
            ))),
        }
    }

    fn as_integer(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(i64::from(v)),
            Value::Long(v) => Some(v),
            _ => None,
        }
    }

    /// Equality by display form and kind, so `1 == 1L` is false while two
    /// lists with the same elements are equal.
    fn loosely_equals(&self, other: &Value) -> bool {
        self.type_tag() == other.type_tag() && self.repr() == other.repr()
    }

    fn added_to(&self, other: &Value) -> Result<Value, OpError> {
        match (self, other) {
            (Value::String(l), Value::String(r)) => Ok(Value::from(format!("{l}{r}").as_str())),
            (Value::List(l), Value::List(r)) => {
                Ok(Value::List(Rc::new(l.iter().chain(r.iter()).cloned().collect())))
            }
            _ => self.numeric(BinaryOperator::Add, other, |l, r| Ok(l + r)),
        }
    }

    fn multiplied_by(&self, other: &Value) -> Result<Value, OpError> {
        let count = other.as_integer().map(|n| usize::try_from(n).unwrap_or(0));

        match (self, count) {
            (Value::String(s), Some(count)) => {
                repeated_len(s.len(), count)?;
                Ok(Value::from(s.repeat(count).as_str()))
            }
            (Value::List(items), Some(count)) => {
                let len = repeated_len(items.len(), count)?;
                let repeated = items.iter().cloned().cycle().take(len).collect();
                Ok(Value::List(Rc::new(repeated)))
            }
            _ => self.numeric(BinaryOperator::Multiply, other, |l, r| Ok(l * r)),
        }
    }

    fn numeric(
        &self,
        operator: BinaryOperator,
        other: &Value,
        op: impl FnOnce(Number, Number) -> Result<Number, ArithmeticError>,
    ) -> Result<Value, OpError> {
        match (self.as_number(), other.as_number()) {
            (Some(l), Some(r)) => Ok(Value::from(op(l, r)?)),
            _ => Err(self.illegal(operator, other)),
        }
    }

    fn compared_with(
        &self,
        operator: BinaryOperator,
        other: &Value,
        test: fn(Ordering) -> bool,
    ) -> Result<Value, OpError> {
        let ordering = match (self, other) {
            (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
            _ => match (self.as_number(), other.as_number()) {
                (Some(l), Some(r)) => l.compare(r),
                _ => return Err(self.illegal(operator, other)),
            },
        };

        // Any comparison involving NaN is false.
        Ok(Value::Boolean(ordering.is_some_and(test)))
    }

    fn illegal(&self, operator: BinaryOperator, other: &Value) -> OpError {
        OpError::Illegal(format!(
            "binary operator '{operator}' cannot be applied to operands of type {} and {}",
            self.type_name(),
            other.type_name()
        ))
    }
}

/// Size of `unit` repeated `count` times, refusing anything beyond
/// `MAX_REPEAT_LEN`.
fn repeated_len(unit: usize, count: usize) -> Result<usize, OpError> {
    unit.checked_mul(count)
        .filter(|&len| len <= MAX_REPEAT_LEN)
        .ok_or_else(|| OpError::Illegal("repeat count too large".to_owned()))
}

/// Negative indices count from the end.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.write_nested(f, 0, false)
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Namespace(ns) => write!(f, "Namespace({})", ns.name),
            Value::Function(func) => write!(f, "Function({})", func.name()),
            other => write!(f, "{}({})", other.type_name(), other.repr()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(l), Value::Int(r)) => l == r,
            (Value::Long(l), Value::Long(r)) => l == r,
            (Value::Double(l), Value::Double(r)) => l == r,
            (Value::Boolean(l), Value::Boolean(r)) => l == r,
            (Value::String(l), Value::String(r)) => l == r,
            (Value::List(l), Value::List(r)) => l == r,
            (Value::Function(l), Value::Function(r)) => Rc::ptr_eq(l, r),
            (Value::Namespace(l), Value::Namespace(r)) => Rc::ptr_eq(l, r),
            (Value::Nil, Value::Nil) => true,
            _ => false,
        }
    }
}
