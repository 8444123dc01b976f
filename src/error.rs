//! Error types for the layout compiler

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A 1-based line/column location in the layout source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SourcePos {
    pub line: usize,
    pub column: usize,
}

impl SourcePos {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn start() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The class of name that failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Widget,
    Property,
    /// An identifier in a widget body that is neither a property nor a widget
    Member,
    Enumeration,
    Resource,
    PropertyBinding,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SymbolKind::Widget => "widget type",
            SymbolKind::Property => "property",
            SymbolKind::Member => "identifier",
            SymbolKind::Enumeration => "enumeration value",
            SymbolKind::Resource => "resource",
            SymbolKind::PropertyBinding => "property binding",
        };
        f.write_str(text)
    }
}

#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Syntax error at {pos}: expected {expected}, found '{found}'")]
    Syntax { pos: SourcePos, expected: String, found: String },

    #[error("Unexpected end of input at {pos}")]
    UnexpectedEndOfInput { pos: SourcePos },

    #[error("Unknown {kind} at {pos}: '{name}'")]
    UnknownSymbol { pos: SourcePos, kind: SymbolKind, name: String },

    #[error("Invalid value at {pos}: {message}")]
    InvalidValue { pos: SourcePos, message: String },

    #[error("Property '{property}' at {pos} is declared after a child widget; properties must come first")]
    PropertyAfterChild { pos: SourcePos, property: String },

    #[error("Maximum limit exceeded: {limit_type} (limit: {limit})")]
    LimitExceeded { limit_type: String, limit: usize },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },
}

pub type Result<T> = std::result::Result<T, CompilerError>;

impl CompilerError {
    pub fn syntax(pos: SourcePos, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::Syntax {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unknown_symbol(pos: SourcePos, kind: SymbolKind, name: impl Into<String>) -> Self {
        Self::UnknownSymbol {
            pos,
            kind,
            name: name.into(),
        }
    }

    pub fn invalid_value(pos: SourcePos, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            pos,
            message: message.into(),
        }
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Source position of a compile error, if the error has one
    pub fn position(&self) -> Option<SourcePos> {
        match self {
            Self::Syntax { pos, .. }
            | Self::UnexpectedEndOfInput { pos }
            | Self::UnknownSymbol { pos, .. }
            | Self::InvalidValue { pos, .. }
            | Self::PropertyAfterChild { pos, .. } => Some(*pos),
            _ => None,
        }
    }
}
