//! Parse error type.

use thiserror::Error;

use crate::tokenizer::TokenizeError;

/// Error raised when the input is not accepted.
///
/// Offsets are byte offsets into the parsed source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{message}")]
    Tokenize { message: String, offset: usize },

    #[error("{message}")]
    Syntax { message: String, offset: usize },
}

impl ParseError {
    pub(crate) fn syntax(message: impl Into<String>, offset: usize) -> Self {
        ParseError::Syntax {
            message: message.into(),
            offset,
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            ParseError::Tokenize { offset, .. } | ParseError::Syntax { offset, .. } => *offset,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::Tokenize { message, .. } | ParseError::Syntax { message, .. } => message,
        }
    }
}

impl From<TokenizeError> for ParseError {
    fn from(err: TokenizeError) -> Self {
        ParseError::Tokenize {
            message: err.message,
            offset: err.offset,
        }
    }
}

/// Result type for parser functions.
pub type ParseResult<T> = Result<T, ParseError>;
