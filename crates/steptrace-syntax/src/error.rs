//! Compile-time error type.

use std::fmt;

/// The class of a compile failure, named the way the traced language names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    Syntax,
    Indentation,
}

impl fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileErrorKind::Syntax => f.write_str("SyntaxError"),
            CompileErrorKind::Indentation => f.write_str("IndentationError"),
        }
    }
}

/// A lexing or parsing failure with the position where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message} (line {line}, column {column})")]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl CompileError {
    pub fn syntax(message: impl Into<String>, line: u32, column: u32) -> Self {
        CompileError {
            kind: CompileErrorKind::Syntax,
            message: message.into(),
            line,
            column,
        }
    }

    pub fn indentation(message: impl Into<String>, line: u32, column: u32) -> Self {
        CompileError {
            kind: CompileErrorKind::Indentation,
            message: message.into(),
            line,
            column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_kind_and_position() {
        let err = CompileError::syntax("invalid syntax", 3, 7);
        assert_eq!(err.to_string(), "SyntaxError: invalid syntax (line 3, column 7)");

        let err = CompileError::indentation("unexpected indent", 2, 1);
        assert!(err.to_string().starts_with("IndentationError: "));
    }
}
