use std::fmt::Display;
use std::rc::Rc;

use thiserror::Error;

use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    IllegalCharacter,
    ExpectedCharacter,
    UnterminatedLiteral,
}

impl Display for LexErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexErrorKind::IllegalCharacter => write!(f, "Illegal Character"),
            LexErrorKind::ExpectedCharacter => write!(f, "Expected Character"),
            LexErrorKind::UnterminatedLiteral => write!(f, "Unterminated Literal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {detail}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub detail: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid Syntax: {detail}")]
pub struct SyntaxError {
    pub detail: String,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(detail: impl Into<String>, span: Span) -> Self {
        Self { detail: detail.into(), span }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    UndefinedName,
    IllegalOperation,
    DivisionByZero,
    Arity,
    IncompatibleTypes,
    Redeclaration,
}

impl Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeErrorKind::UndefinedName => write!(f, "Undefined Name"),
            RuntimeErrorKind::IllegalOperation => write!(f, "Illegal Operation"),
            RuntimeErrorKind::DivisionByZero => write!(f, "Division By Zero"),
            RuntimeErrorKind::Arity => write!(f, "Argument Count"),
            RuntimeErrorKind::IncompatibleTypes => write!(f, "Incompatible Types"),
            RuntimeErrorKind::Redeclaration => write!(f, "Redeclaration"),
        }
    }
}

/// One line of a runtime traceback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub file: Rc<str>,
    pub line: usize,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {detail}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub detail: String,
    pub span: Span,
    /// Active call frames when the error was raised, outermost first.
    pub traceback: Vec<TraceFrame>,
}

/// Anything that stops normal evaluation of a statement.
///
/// Only `Error` is a failure; the other variants are control flow that is
/// caught by the nearest enclosing loop or function call.
#[derive(Debug)]
pub enum RuntimeInterrupt {
    Error(RuntimeError),
    Return { value: Value, span: Span },
    Break { span: Span },
    Continue { span: Span },
}

impl From<RuntimeError> for RuntimeInterrupt {
    fn from(e: RuntimeError) -> Self {
        RuntimeInterrupt::Error(e)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkinkError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl SkinkError {
    pub fn category(&self) -> String {
        match self {
            SkinkError::Lex(e) => e.kind.to_string(),
            SkinkError::Syntax(_) => "Invalid Syntax".to_owned(),
            SkinkError::Runtime(e) => e.kind.to_string(),
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            SkinkError::Lex(e) => &e.detail,
            SkinkError::Syntax(e) => &e.detail,
            SkinkError::Runtime(e) => &e.detail,
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            SkinkError::Lex(e) => &e.span,
            SkinkError::Syntax(e) => &e.span,
            SkinkError::Runtime(e) => &e.span,
        }
    }

    /// Human readable report: category, location and the offending source
    /// underlined, preceded by the call stack for runtime errors.
    pub fn render(&self) -> String {
        let span = self.span();
        let mut out = String::new();

        if let SkinkError::Runtime(e) = self {
            out.push_str("Traceback (most recent call last):\n");
            for frame in &e.traceback {
                out.push_str(&format!(
                    "  File {}, line {}, in {}\n",
                    frame.file, frame.line, frame.context
                ));
            }
        }

        out.push_str(&format!(
            "{}: {}\nFile {}, line {}\n\n{}",
            self.category(),
            self.detail(),
            span.start.file,
            span.start.line,
            span.underline()
        ));
        out
    }
}
