use std::rc::Rc;

use crate::prelude::*;

/// `print(x)` and `println(x)`.
#[derive(Debug)]
struct Print {
    newline: bool,
}

impl Callable for Print {
    fn name(&self) -> &str {
        if self.newline {
            "println"
        } else {
            "print"
        }
    }

    fn arity(&self) -> usize {
        1
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        span: &Span,
    ) -> Result<Value, RuntimeInterrupt> {
        let text = arguments.first().map(Value::to_string).unwrap_or_default();
        let written = if self.newline {
            writeln!(interpreter.output(), "{text}")
        } else {
            write!(interpreter.output(), "{text}")
        };

        written.map_err(|e| {
            interpreter.error(
                RuntimeErrorKind::IllegalOperation,
                format!("cannot write output: {e}"),
                span,
            )
        })?;
        Ok(Value::Nil)
    }
}

#[derive(Debug)]
struct Len;

impl Callable for Len {
    fn name(&self) -> &str {
        "len"
    }

    fn arity(&self) -> usize {
        1
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        span: &Span,
    ) -> Result<Value, RuntimeInterrupt> {
        let len = match arguments.first() {
            Some(Value::String(s)) => s.chars().count(),
            Some(Value::List(items)) => items.len(),
            Some(Value::Namespace(ns)) => ns.len(),
            other => {
                let type_name = other.map_or("void", Value::type_name);
                return Err(interpreter
                    .error(
                        RuntimeErrorKind::IllegalOperation,
                        format!("value of type {type_name} has no length"),
                        span,
                    )
                    .into());
            }
        };

        // Lengths beyond i32 wrap like any other int.
        Ok(Value::Int(len as i32))
    }
}

#[derive(Debug)]
struct Str;

impl Callable for Str {
    fn name(&self) -> &str {
        "str"
    }

    fn arity(&self) -> usize {
        1
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        _span: &Span,
    ) -> Result<Value, RuntimeInterrupt> {
        let text = arguments.first().map(Value::to_string).unwrap_or_default();
        Ok(Value::from(text.as_str()))
    }
}

pub fn print() -> Rc<dyn Callable> {
    Rc::new(Print { newline: false })
}

pub fn println() -> Rc<dyn Callable> {
    Rc::new(Print { newline: true })
}

pub fn len() -> Rc<dyn Callable> {
    Rc::new(Len)
}

pub fn stringify() -> Rc<dyn Callable> {
    Rc::new(Str)
}
