#![allow(clippy::new_without_default)]
#![allow(clippy::vtable_address_comparisons)]

mod ast;
mod environment;
mod error;
mod func;
mod interpreter;
mod native;
mod number;
mod parser;
mod position;
mod printer;
mod scanner;
mod stack;
mod token;
mod types;
mod value;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::environment::{Binding, EnvError, Environment};
    pub use crate::error::*;
    pub use crate::func::*;
    pub use crate::interpreter::*;
    pub use crate::number::*;
    pub use crate::parser::*;
    pub use crate::position::*;
    pub use crate::printer::*;
    pub use crate::scanner::*;
    pub use crate::token::*;
    pub use crate::types::*;
    pub use crate::value::*;
    pub use crate::Shared;
}

use std::cell::RefCell;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use prelude::{Interpreter, Node, Parser, Scanner, SkinkError, Value};

pub type Shared<T> = Rc<RefCell<T>>;

/// A long lived interpreter session. Globals defined by one `run` are
/// visible to the next, which is what the REPL relies on.
pub struct Skink {
    interpreter: Interpreter,
}

impl Skink {
    pub fn new() -> Self {
        Self { interpreter: Interpreter::new() }
    }

    /// A session whose `print`/`println` output goes to `output`.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        Self { interpreter: Interpreter::with_output(output) }
    }
}

impl Skink {
    pub fn run_file(&mut self, path: impl AsRef<Path>) -> Result<Value, anyhow::Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        // Rendered here: the error holds shared source text and cannot
        // cross into `anyhow` as is.
        self.run(&content, &path.display().to_string()).map_err(|e| anyhow::anyhow!(e.render()))
    }

    pub fn run(&mut self, source: &str, file: &str) -> Result<Value, SkinkError> {
        tracing::debug!(file, bytes = source.len(), "running source");
        let program = parse(source, file)?;
        let value = self.interpreter.interpret(&program)?;
        Ok(value)
    }

    /// Like `run`, but everything comes back as display text: the value in
    /// its display form or the rendered error.
    pub fn run_pretty(&mut self, source: &str, file: &str) -> String {
        match self.run(source, file) {
            Ok(value) => value.to_string(),
            Err(e) => e.render(),
        }
    }
}

/// Scan and parse without evaluating.
pub fn parse(source: &str, file: &str) -> Result<Node, SkinkError> {
    let tokens = Scanner::new(source, file).scan_tokens()?;
    tracing::debug!(tokens = tokens.len(), "scanned source");
    let program = Parser::new(tokens).parse()?;
    Ok(program)
}

/// Run `source` in a fresh session.
pub fn run(source: &str, file: &str) -> Result<Value, SkinkError> {
    Skink::new().run(source, file)
}
