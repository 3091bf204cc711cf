//! Error types and error code constants for decaf.
//!
//! `DecafError` is the single error type the CLI renders. Stage-specific
//! errors (tokenizer, parser, patcher, editor) are bridged into it with
//! `From` impls so every failure maps to a stable exit code.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad flags, unreadable input, bad options file)
//! - `3`: Syntax errors (the input does not tokenize or parse)
//! - `4`: Conversion errors (a construct cannot be expressed in the output)
//! - `10`: Internal errors (bugs, unexpected state)

use std::fmt;

use thiserror::Error;

use crate::editor::EditError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output and CLI exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed request).
    InvalidArguments = 2,
    /// The source could not be tokenized or parsed.
    SyntaxError = 3,
    /// A construct could not be converted.
    ConversionError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Source Location
// ============================================================================

/// A 1-indexed position in a named (or anonymous) input.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub line: u32,
    pub col: u32,
}

impl SourceLocation {
    pub fn new(file: Option<String>, line: u32, col: u32) -> Self {
        SourceLocation { file, line, col }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.col),
            None => write!(f, "{}:{}", self.line, self.col),
        }
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum DecafError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Input file not found or unreadable.
    #[error("cannot read {path}: {reason}")]
    FileNotFound { path: String, reason: String },

    /// The input is not valid source.
    #[error("{location}: syntax error: {message}")]
    Syntax {
        message: String,
        location: SourceLocation,
    },

    /// A construct in the input could not be converted.
    #[error("{location}: cannot convert: {message}")]
    Conversion {
        message: String,
        location: SourceLocation,
    },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&DecafError> for OutputErrorCode {
    fn from(err: &DecafError) -> Self {
        match err {
            DecafError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            DecafError::FileNotFound { .. } => OutputErrorCode::InvalidArguments,
            DecafError::Syntax { .. } => OutputErrorCode::SyntaxError,
            DecafError::Conversion { .. } => OutputErrorCode::ConversionError,
            DecafError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<DecafError> for OutputErrorCode {
    fn from(err: DecafError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<EditError> for DecafError {
    fn from(err: EditError) -> Self {
        DecafError::InternalError {
            message: format!("edit failed: {}", err),
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl DecafError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        DecafError::InvalidArguments {
            message: message.into(),
            details: None,
        }
    }

    /// Create an invalid arguments error with JSON details.
    pub fn invalid_args_with_details(
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        DecafError::InvalidArguments {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>, reason: impl fmt::Display) -> Self {
        DecafError::FileNotFound {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a syntax error at a location.
    pub fn syntax(message: impl Into<String>, location: SourceLocation) -> Self {
        DecafError::Syntax {
            message: message.into(),
            location,
        }
    }

    /// Create a conversion error at a location.
    pub fn conversion(message: impl Into<String>, location: SourceLocation) -> Self {
        DecafError::Conversion {
            message: message.into(),
            location,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        DecafError::InternalError {
            message: message.into(),
        }
    }

    /// Where in the input the error points, if anywhere.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            DecafError::Syntax { location, .. } | DecafError::Conversion { location, .. } => {
                Some(location)
            }
            _ => None,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
