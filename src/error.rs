//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here.  This enables
//! a uniform `Result<T>` alias throughout the crate and ergonomic
//! inter-operation with `anyhow`, while still preserving rich diagnostic
//! detail.
//!
//! Static diagnostics (`Lex`, `Parse`, `Resolve`) render in the classic
//! `[line N] Error at 'lexeme': message` shape; runtime faults render the
//! message first and the line on a trailing `[line N]` row.  The module
//! **does not** print diagnostics itself.

use std::io;
use std::str::Utf8Error;

use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human-readable description.
        message: String,

        /// 1-based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error, anchored to the offending token.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,

        /// Either ` at 'lexeme'` or ` at end` when the token is EOF.
        location: String,

        line: usize,
    },

    /// Static-analysis (resolution) failure, e.g. early-binding errors.
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        location: String,
        line: usize,
    },

    /// Runtime evaluation fault (transparent).
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF-8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] Utf8Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.  The reported location is
    /// derived from the token the parser was looking at.
    pub fn parse<S: Into<String>>(token: &Token<'_>, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        LoxError::Parse {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token<'_>, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        LoxError::Resolve {
            message,
            location: location_of(token),
            line: token.line,
        }
    }
}

/// ` at end` for EOF, ` at 'lexeme'` for everything else.
fn location_of(token: &Token<'_>) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

/// Fault raised while evaluating a program.  Carries the 1-based source line
/// of the token the evaluator was working on when the fault fired.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RuntimeError {
    /// Operand or operator type mismatch, including division by zero and
    /// non-class superclauses.
    #[error("{message}\n[line {line}]")]
    Type { message: String, line: usize },

    /// A call supplied the wrong number of arguments.
    #[error("Expected {expected} arguments but got {actual}.\n[line {line}]")]
    Arity {
        expected: usize,
        actual: usize,
        line: usize,
    },

    /// Read or assignment of a name with no binding anywhere on the chain.
    #[error("Undefined variable '{name}'.\n[line {line}]")]
    UndefinedVariable { name: String, line: usize },

    /// Property access that matched neither a field nor a method.
    #[error("Undefined property '{name}'.\n[line {line}]")]
    UndefinedProperty { name: String, line: usize },
}

impl RuntimeError {
    /// Type mismatch anchored to an operator or keyword token.
    pub fn type_error<S: Into<String>>(token: &Token<'_>, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Type fault: line={}, msg={}", token.line, message);

        RuntimeError::Type {
            message,
            line: token.line,
        }
    }

    /// Arity mismatch anchored to the closing parenthesis of the call.
    pub fn arity(token: &Token<'_>, expected: usize, actual: usize) -> Self {
        info!(
            "Creating Arity fault: line={}, expected={}, actual={}",
            token.line, expected, actual
        );

        RuntimeError::Arity {
            expected,
            actual,
            line: token.line,
        }
    }

    pub fn undefined_variable<S: Into<String>>(name: S, line: usize) -> Self {
        RuntimeError::UndefinedVariable {
            name: name.into(),
            line,
        }
    }

    pub fn undefined_property(name: &Token<'_>) -> Self {
        RuntimeError::UndefinedProperty {
            name: name.lexeme.to_string(),
            line: name.line,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
