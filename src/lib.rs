//! MRT: a small dynamically typed scripting language.
//!
//! [`execute`] runs a whole program through the scanner, parser and interpreter and
//! returns everything it printed together with the first error, if any.

pub mod config;
pub mod diagnostics;
pub mod interpreter;
pub mod parser;
pub mod scanner;
pub mod span;
mod stack;

use crate::config::RuntimeConfig;
use crate::interpreter::{Interpreter, RuntimeError, RuntimeErrorKind};
use crate::parser::ParseError;
use crate::scanner::ScanError;
use crate::span::Span;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lex,
    Parse,
    Runtime(RuntimeErrorKind),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Lex => write!(f, "LexError"),
            ErrorKind::Parse => write!(f, "ParseError"),
            ErrorKind::Runtime(kind) => write!(f, "{}", kind),
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Scan(_) => ErrorKind::Lex,
            Error::Parse(_) => ErrorKind::Parse,
            Error::Runtime(e) => ErrorKind::Runtime(e.kind),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Error::Scan(e) => e.span,
            Error::Parse(e) => e.span,
            Error::Runtime(e) => e.span,
        }
    }
}

/// Result of one run. `output` holds every line printed before the run
/// finished or failed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Execution {
    pub output: Vec<String>,
    pub error: Option<Error>,
}

impl Execution {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Vec<String>, Error> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.output),
        }
    }
}

pub fn execute(source: &str) -> Execution {
    execute_with_config(source, &RuntimeConfig::default())
}

pub fn execute_with_config(source: &str, runtime_config: &RuntimeConfig) -> Execution {
    let tokens = match scanner::tokenize(source) {
        Ok(tokens) => tokens,
        Err(e) => return failed(e.into()),
    };

    let program = match parser::parse(tokens) {
        Ok(program) => program,
        Err(e) => return failed(e.into()),
    };

    let mut interpreter = Interpreter::new(runtime_config.clone());
    let result = interpreter.interpret(&program);
    let output = interpreter.into_output();

    if let Err(ref e) = result {
        tracing::debug!(kind = %e.kind, span = %e.span, lines = output.len(), "run failed");
    }

    Execution {
        output,
        error: result.err().map(Error::from),
    }
}

fn failed(error: Error) -> Execution {
    tracing::debug!(kind = %error.kind(), span = %error.span(), "rejected before running");
    Execution {
        output: Vec::new(),
        error: Some(error),
    }
}
