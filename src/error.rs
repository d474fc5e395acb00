//! Error types for parsing, evaluation and configuration

use crate::error_diagnostics::DiagnosticError;
use std::fmt;

/// Everything that can go wrong between pattern text and resolved events
#[derive(Debug)]
pub enum ZiffersError {
    /// Pattern text the grammar could not consume
    Parse(DiagnosticError),
    /// Roman numeral containing characters outside i/v/x
    InvalidRomanNumeral(String),
    /// Node needs key and scale but the context has none
    Unresolved(String),
    /// Sequence that must yield at least one value was empty
    EmptySequence(String),
    DivisionByZero,
    /// List arithmetic left the range of a degree
    ArithmeticOverflow(String),
    /// Variable used before any assignment or binding
    UnknownVariable(String),
    /// `x` used in an expression that is not applied to a list
    UnboundExpressionVariable,
    /// Runtime accessed before `init`
    Uninitialized,
    Config(String),
    Io(std::io::Error),
}

impl fmt::Display for ZiffersError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZiffersError::Parse(diagnostic) => write!(f, "{}", diagnostic),
            ZiffersError::InvalidRomanNumeral(numeral) => {
                write!(f, "Invalid roman numeral: '{}'", numeral)
            }
            ZiffersError::Unresolved(what) => {
                write!(f, "Cannot resolve {} without key and scale", what)
            }
            ZiffersError::EmptySequence(what) => write!(f, "Empty {}", what),
            ZiffersError::DivisionByZero => write!(f, "Division by zero"),
            ZiffersError::ArithmeticOverflow(what) => write!(f, "Arithmetic overflow in {}", what),
            ZiffersError::UnknownVariable(name) => write!(f, "Unknown variable: {}", name),
            ZiffersError::UnboundExpressionVariable => {
                write!(f, "Expression uses x outside of a list operation")
            }
            ZiffersError::Uninitialized => write!(f, "Sequence used before init"),
            ZiffersError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ZiffersError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ZiffersError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ZiffersError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ZiffersError {
    fn from(e: std::io::Error) -> Self {
        ZiffersError::Io(e)
    }
}

impl From<DiagnosticError> for ZiffersError {
    fn from(e: DiagnosticError) -> Self {
        ZiffersError::Parse(e)
    }
}

pub type Result<T> = std::result::Result<T, ZiffersError>;
