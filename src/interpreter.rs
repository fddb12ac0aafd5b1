use std::io::Write;
use std::rc::Rc;

use crate::native;
use crate::prelude::*;
use crate::stack::ensure_sufficient_stack;

/// Deepest allowed nesting of function calls.
pub const MAX_CALL_DEPTH: usize = 1000;

type InterpreterResult = Result<Value, RuntimeInterrupt>;

/// State shared by every evaluation in one session: the global scope, the
/// names valid in type position and the sink for program output.
pub struct Runtime {
    pub globals: Shared<Environment>,
    pub types: TypeRegistry,
    output: Box<dyn Write>,
}

impl Runtime {
    pub fn new(output: Box<dyn Write>) -> Self {
        let globals = Environment::new().as_shared();

        {
            let mut env = globals.borrow_mut();
            env.define("true", Value::Boolean(true));
            env.define("false", Value::Boolean(false));
            env.define("nil", Value::Nil);

            for function in [native::print(), native::println(), native::len(), native::stringify()]
            {
                let name = function.name().to_owned();
                env.define(&name, Value::Function(function));
            }
        }

        Self { globals, types: TypeRegistry::new(), output }
    }
}

/// An active function call, for tracebacks.
#[derive(Debug, Clone)]
struct Frame {
    name: String,
    entry: Span,
}

pub struct Interpreter {
    runtime: Runtime,
    frames: Vec<Frame>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(std::io::stdout()))
    }

    pub fn with_output(output: Box<dyn Write>) -> Self {
        Self { runtime: Runtime::new(output), frames: vec![] }
    }

    pub fn globals(&self) -> Shared<Environment> {
        self.runtime.globals.clone()
    }

    pub fn output(&mut self) -> &mut dyn Write {
        self.runtime.output.as_mut()
    }

    /// Evaluate a whole program in the global scope and return the value of
    /// its last statement.
    pub fn interpret(&mut self, program: &Node) -> Result<Value, RuntimeError> {
        self.frames.clear();
        let globals = self.globals();

        let result = match self.evaluate(program, &globals) {
            Ok(value) => Ok(value),
            Err(RuntimeInterrupt::Error(e)) => Err(e),
            Err(RuntimeInterrupt::Return { span, .. }) => {
                Err(self.stray(&span, "'return' outside of a function"))
            }
            Err(RuntimeInterrupt::Break { span }) => {
                Err(self.stray(&span, "'break' outside of a loop"))
            }
            Err(RuntimeInterrupt::Continue { span }) => {
                Err(self.stray(&span, "'continue' outside of a loop"))
            }
        };

        if let Err(e) = self.output().flush() {
            tracing::warn!(error = %e, "failed to flush program output");
        }

        result
    }

    pub fn evaluate(&mut self, node: &Node, env: &Shared<Environment>) -> InterpreterResult {
        ensure_sufficient_stack(|| self.evaluate_node(node, env))
    }

    fn evaluate_node(&mut self, node: &Node, env: &Shared<Environment>) -> InterpreterResult {
        match &node.kind {
            NodeKind::Number(n) => Ok(Value::from(*n)),
            NodeKind::Str(s) => Ok(Value::String(s.clone())),
            NodeKind::Identifier(name) => {
                let value = env.borrow().get(name);
                value.map_err(|e| self.env_error(e, &node.span).into())
            }
            NodeKind::Binary { left, operator, right } => {
                self.evaluate_binary(node, left, *operator, right, env)
            }
            NodeKind::Unary { operator, operand } => {
                let value = self.evaluate(operand, env)?;
                match operator {
                    UnaryOperator::Not => Ok(Value::Boolean(!value.is_truthy())),
                    UnaryOperator::Negate => {
                        value.negate().map_err(|e| self.op_error(e, &node.span).into())
                    }
                    UnaryOperator::Plus if value.as_number().is_some() => Ok(value),
                    UnaryOperator::Plus => Err(self
                        .error(
                            RuntimeErrorKind::IllegalOperation,
                            format!(
                                "unary operator '+' cannot be applied to operand of type {}",
                                value.type_name()
                            ),
                            &node.span,
                        )
                        .into()),
                }
            }
            NodeKind::Assign { target, value } => self.evaluate_assign(target, value, env),
            NodeKind::Declare { type_name, name, value } => {
                let declared = self.resolve_type(type_name, &node.span)?;
                let value = self.evaluate(value, env)?;

                let res = env.borrow_mut().declare(name, value.clone(), declared);
                res.map_err(|e| self.env_error(e, &node.span))?;
                Ok(value)
            }
            NodeKind::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.evaluate(item, env)?);
                }
                Ok(Value::List(Rc::new(values)))
            }
            NodeKind::KeyAccess { object, key } => {
                let object = self.evaluate(object, env)?;
                match key {
                    Key::Name(name) => match object {
                        Value::Namespace(ref ns) => Ok(ns.get(name).unwrap_or(Value::Nil)),
                        other => Err(self
                            .error(
                                RuntimeErrorKind::IllegalOperation,
                                format!("value of type {} has no member '{name}'", other.type_name()),
                                &node.span,
                            )
                            .into()),
                    },
                    Key::Index(index) => {
                        let index = self.evaluate(index, env)?;
                        object.index(&index).map_err(|e| self.op_error(e, &node.span).into())
                    }
                }
            }
            NodeKind::Call { callee, arguments } => self.evaluate_call(node, callee, arguments, env),
            NodeKind::FunctionDef { name, params, return_type, body, auto_return } => {
                let return_type = self.resolve_type(return_type, &node.span)?;
                let mut parameters = Vec::with_capacity(params.len());
                for param in params {
                    let ty = self.resolve_type(&param.type_name, &param.span)?;
                    parameters.push(Parameter { name: param.name.clone(), ty });
                }

                let function = Value::Function(Rc::new(Function::new(
                    name,
                    parameters,
                    return_type,
                    body.clone(),
                    env.clone(),
                    *auto_return,
                )));
                self.bind_definition(env, name, function.clone(), &node.span)?;
                Ok(function)
            }
            NodeKind::If { cases, else_body } => {
                for (condition, body) in cases {
                    if self.evaluate(condition, env)?.is_truthy() {
                        let scope = Environment::new().with_enclosing(env.clone()).as_shared();
                        return self.evaluate(body, &scope);
                    }
                }

                match else_body {
                    Some(body) => {
                        let scope = Environment::new().with_enclosing(env.clone()).as_shared();
                        self.evaluate(body, &scope)
                    }
                    None => Ok(Value::Nil),
                }
            }
            NodeKind::While { condition, body } => {
                let mut result = Value::Nil;

                while self.evaluate(condition, env)?.is_truthy() {
                    // Every iteration gets a fresh scope.
                    let scope = Environment::new().with_enclosing(env.clone()).as_shared();
                    match self.evaluate(body, &scope) {
                        Ok(value) => result = value,
                        Err(RuntimeInterrupt::Break { .. }) => break,
                        Err(RuntimeInterrupt::Continue { .. }) => continue,
                        Err(e) => return Err(e),
                    }
                }

                Ok(result)
            }
            NodeKind::Namespace { name, body } => {
                let scope = Environment::new().with_enclosing(env.clone()).as_shared();
                self.evaluate(body, &scope)?;
                tracing::trace!(namespace = %name, members = scope.borrow().len(), "namespace created");

                let namespace = Value::Namespace(Rc::new(Namespace::new(name, scope)));
                self.bind_definition(env, name, namespace.clone(), &node.span)?;
                Ok(namespace)
            }
            NodeKind::Return(value) => {
                let value = match value {
                    Some(value) => self.evaluate(value, env)?,
                    None => Value::Nil,
                };
                Err(RuntimeInterrupt::Return { value, span: node.span.clone() })
            }
            NodeKind::Break => Err(RuntimeInterrupt::Break { span: node.span.clone() }),
            NodeKind::Continue => Err(RuntimeInterrupt::Continue { span: node.span.clone() }),
            NodeKind::Block(statements) => {
                let mut result = Value::Nil;
                for statement in statements {
                    result = self.evaluate(statement, env)?;
                }
                Ok(result)
            }
        }
    }

    fn evaluate_binary(
        &mut self,
        node: &Node,
        left: &Node,
        operator: BinaryOperator,
        right: &Node,
        env: &Shared<Environment>,
    ) -> InterpreterResult {
        let left_value = self.evaluate(left, env)?;

        // `and`/`or` short-circuit and always produce a boolean
        match operator {
            BinaryOperator::And if !left_value.is_truthy() => return Ok(Value::Boolean(false)),
            BinaryOperator::Or if left_value.is_truthy() => return Ok(Value::Boolean(true)),
            BinaryOperator::And | BinaryOperator::Or => {
                return Ok(Value::Boolean(self.evaluate(right, env)?.is_truthy()));
            }
            _ => {}
        }

        let right_value = self.evaluate(right, env)?;
        left_value.apply(operator, &right_value).map_err(|e| self.op_error(e, &node.span).into())
    }

    fn evaluate_assign(
        &mut self,
        target: &Node,
        value: &Node,
        env: &Shared<Environment>,
    ) -> InterpreterResult {
        let value = self.evaluate(value, env)?;

        match &target.kind {
            NodeKind::Identifier(name) => {
                let res = env.borrow_mut().assign(name, value.clone());
                res.map_err(|e| self.env_error(e, &target.span))?;
            }
            NodeKind::KeyAccess { object, key } => {
                let object = self.evaluate(object, env)?;
                let key = match key {
                    Key::Name(name) => Value::from(name.as_str()),
                    Key::Index(index) => self.evaluate(index, env)?,
                };

                match (&object, &key) {
                    (Value::Namespace(ns), Value::String(name)) => {
                        let res = ns.set(name, value.clone());
                        res.map_err(|e| self.env_error(e, &target.span))?;
                    }
                    (Value::Namespace(_), _) => {
                        return Err(self
                            .error(
                                RuntimeErrorKind::IllegalOperation,
                                format!("namespace keys must be strings, not {}", key.type_name()),
                                &target.span,
                            )
                            .into());
                    }
                    _ => {
                        // Only namespaces hold members; anything else silently
                        // drops the write.
                        tracing::debug!(
                            target_type = object.type_name(),
                            key = %key,
                            "ignoring member assignment on a non-namespace value"
                        );
                    }
                }
            }
            _ => {
                return Err(self
                    .error(
                        RuntimeErrorKind::IllegalOperation,
                        "invalid assignment target",
                        &target.span,
                    )
                    .into());
            }
        }

        Ok(value)
    }

    fn evaluate_call(
        &mut self,
        node: &Node,
        callee: &Node,
        arguments: &[Node],
        env: &Shared<Environment>,
    ) -> InterpreterResult {
        let callee = self.evaluate(callee, env)?;

        let mut args = Vec::with_capacity(arguments.len());
        for arg in arguments {
            args.push(self.evaluate(arg, env)?);
        }

        let callable = match callee {
            Value::Function(callable) => callable,
            other => {
                return Err(self
                    .error(
                        RuntimeErrorKind::IllegalOperation,
                        format!("value of type {} is not callable", other.type_name()),
                        &node.span,
                    )
                    .into());
            }
        };

        let arity = callable.arity();
        if args.len() != arity {
            let (count, direction) = if args.len() > arity {
                (args.len() - arity, "many")
            } else {
                (arity - args.len(), "few")
            };
            return Err(self
                .error(
                    RuntimeErrorKind::Arity,
                    format!(
                        "{count} too {direction} arguments passed into '{}'",
                        callable.name()
                    ),
                    &node.span,
                )
                .into());
        }

        callable.call(self, args, &node.span)
    }

    /// Bind a function or namespace definition in `env`. Redefining a name
    /// with a value of the same kind replaces it.
    fn bind_definition(
        &self,
        env: &Shared<Environment>,
        name: &str,
        value: Value,
        span: &Span,
    ) -> Result<(), RuntimeError> {
        let existing = env.borrow().get_local(name);
        if let Some(existing) = existing {
            if existing.declared != value.type_tag() {
                return Err(self.env_error(
                    EnvError::Redeclared {
                        name: name.to_owned(),
                        previous: existing.declared,
                        requested: value.type_tag(),
                    },
                    span,
                ));
            }
        }

        env.borrow_mut().define(name, value);
        Ok(())
    }

    fn resolve_type(&self, name: &str, span: &Span) -> Result<TypeTag, RuntimeError> {
        self.runtime.types.resolve(name).ok_or_else(|| {
            self.error(RuntimeErrorKind::UndefinedName, format!("type '{name}' is not defined"), span)
        })
    }

    pub(crate) fn enter_frame(&mut self, name: &str, entry: &Span) -> Result<(), RuntimeError> {
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(self.error(
                RuntimeErrorKind::IllegalOperation,
                "maximum recursion depth exceeded",
                entry,
            ));
        }

        self.frames.push(Frame { name: name.to_owned(), entry: entry.clone() });
        Ok(())
    }

    pub(crate) fn exit_frame(&mut self) {
        self.frames.pop();
    }

    pub fn error(&self, kind: RuntimeErrorKind, detail: impl Into<String>, span: &Span) -> RuntimeError {
        RuntimeError { kind, detail: detail.into(), span: span.clone(), traceback: self.traceback(span) }
    }

    pub(crate) fn env_error(&self, e: EnvError, span: &Span) -> RuntimeError {
        let kind = match e {
            EnvError::Undefined(_) => RuntimeErrorKind::UndefinedName,
            EnvError::AlreadyDeclared(_) => RuntimeErrorKind::Redeclaration,
            EnvError::Redeclared { .. } | EnvError::Incompatible { .. } => {
                RuntimeErrorKind::IncompatibleTypes
            }
        };
        self.error(kind, e.to_string(), span)
    }

    fn op_error(&self, e: OpError, span: &Span) -> RuntimeError {
        match e {
            OpError::Illegal(detail) => self.error(RuntimeErrorKind::IllegalOperation, detail, span),
            OpError::DivisionByZero => {
                self.error(RuntimeErrorKind::DivisionByZero, "division by zero", span)
            }
        }
    }

    /// A `return`, `break` or `continue` that nothing caught.
    pub(crate) fn stray(&self, span: &Span, detail: &str) -> RuntimeError {
        self.error(RuntimeErrorKind::IllegalOperation, detail, span)
    }

    /// Innermost context first while walking, outermost first in the result.
    fn traceback(&self, span: &Span) -> Vec<TraceFrame> {
        let mut trace = Vec::with_capacity(self.frames.len() + 1);
        let mut position = &span.start;

        for frame in self.frames.iter().rev() {
            trace.push(TraceFrame {
                file: position.file.clone(),
                line: position.line,
                context: frame.name.clone(),
            });
            position = &frame.entry.start;
        }
        trace.push(TraceFrame {
            file: position.file.clone(),
            line: position.line,
            context: "<program>".to_owned(),
        });

        trace.reverse();
        trace
    }
}
