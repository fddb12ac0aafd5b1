use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use crate::prelude::*;

pub trait Callable: Debug {
    fn name(&self) -> &str;

    fn arity(&self) -> usize;

    /// Run the callable. `arguments` already has exactly `arity()` values;
    /// `span` is the call site, used for errors raised on the callee's behalf.
    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        span: &Span,
    ) -> Result<Value, RuntimeInterrupt>;
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeTag,
}

/// A user defined function together with the environment it was defined in.
#[derive(Debug)]
pub struct Function {
    name: String,
    params: Vec<Parameter>,
    return_type: TypeTag,
    body: Rc<Node>,
    closure: Rc<RefCell<Environment>>,
    auto_return: bool,
}

impl Function {
    pub fn new(
        name: &str,
        params: Vec<Parameter>,
        return_type: TypeTag,
        body: Rc<Node>,
        closure: Rc<RefCell<Environment>>,
        auto_return: bool,
    ) -> Self {
        Self { name: name.to_owned(), params, return_type, body, closure, auto_return }
    }

    fn invoke(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        span: &Span,
    ) -> Result<Value, RuntimeInterrupt> {
        let environment = Environment::new().with_enclosing(self.closure.clone()).as_shared();

        for (param, arg) in self.params.iter().zip(arguments) {
            let declared = environment.borrow_mut().declare(&param.name, arg, param.ty);
            declared.map_err(|e| interpreter.env_error(e, span))?;
        }

        let value = match interpreter.evaluate(&self.body, &environment) {
            Ok(value) if self.auto_return => value,
            Ok(_) => Value::Nil,
            // The body had a return statement. Extract the value from it.
            Err(RuntimeInterrupt::Return { value, .. }) => value,
            Err(RuntimeInterrupt::Break { span }) => {
                return Err(interpreter.stray(&span, "'break' outside of a loop").into());
            }
            Err(RuntimeInterrupt::Continue { span }) => {
                return Err(interpreter.stray(&span, "'continue' outside of a loop").into());
            }
            Err(e) => return Err(e),
        };

        if value != Value::Nil && !self.return_type.accepts(&value) {
            return Err(interpreter
                .error(
                    RuntimeErrorKind::IncompatibleTypes,
                    format!(
                        "cannot convert {} to {} (return value of '{}')",
                        value.type_name(),
                        self.return_type,
                        self.name
                    ),
                    span,
                )
                .into());
        }

        Ok(value)
    }
}

impl Callable for Function {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> usize {
        self.params.len()
    }

    #[tracing::instrument(level = "trace", skip_all, fields(name = %self.name))]
    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        span: &Span,
    ) -> Result<Value, RuntimeInterrupt> {
        interpreter.enter_frame(&self.name, span)?;
        let result = self.invoke(interpreter, arguments, span);
        interpreter.exit_frame();
        result
    }
}
