//! Errors raised while converting.
//!
//! - [`PatchError`]: a patcher met a construct it cannot express, or the
//!   overlay buffer rejected an edit. Carries the offending range once known.
//! - [`ConvertError`]: what [`crate::convert`] returns, one variant per
//!   failure source. [`ConvertError::into_decaf_error`] bridges it to the CLI
//!   error type and its exit codes.

use std::io;

use decaf_coffee::ParseError;
use decaf_core::editor::EditError;
use decaf_core::error::{DecafError, SourceLocation};
use decaf_core::patch::Span;
use thiserror::Error;

use crate::options::Stage;

// ============================================================================
// Patch Errors
// ============================================================================

/// Why a patcher gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchErrorKind {
    /// The input uses a construct with no JavaScript rendering.
    Unsupported,
    /// The patcher broke one of its own invariants.
    Internal,
}

/// Error raised by a node patcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PatchError {
    pub message: String,
    /// Range of the offending node in the text being patched.
    pub span: Option<Span>,
    pub kind: PatchErrorKind,
}

impl PatchError {
    pub fn unsupported(message: impl Into<String>, span: Span) -> Self {
        PatchError {
            message: message.into(),
            span: Some(span),
            kind: PatchErrorKind::Unsupported,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PatchError {
            message: message.into(),
            span: None,
            kind: PatchErrorKind::Internal,
        }
    }

    /// Attach `span` unless a deeper node already did.
    pub fn with_span_if_missing(mut self, span: Span) -> Self {
        if self.span.is_none() {
            tracing::debug!(%span, message = %self.message, "annotating patch error");
            self.span = Some(span);
        }
        self
    }
}

impl From<EditError> for PatchError {
    fn from(err: EditError) -> Self {
        PatchError::internal(format!("edit failed: {}", err))
    }
}

/// Result type for patcher functions.
pub type PatchResult<T> = Result<T, PatchError>;

// ============================================================================
// Convert Errors
// ============================================================================

/// Error returned by the conversion pipeline.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// A stage's input did not parse. `line`/`col` are 1-indexed positions in
    /// that stage's input.
    #[error("{line}:{col}: {source}")]
    Parse {
        stage: Stage,
        source: ParseError,
        line: u32,
        col: u32,
    },

    /// A patcher rejected the input.
    #[error("{stage} stage: {error}")]
    Patch {
        stage: Stage,
        error: PatchError,
        position: Option<(u32, u32)>,
    },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl ConvertError {
    /// Bridge to the CLI error type. `file` names the input in locations.
    ///
    /// Parse failures of the original input are syntax errors; a stage
    /// producing text its successor cannot parse is an internal error.
    pub fn into_decaf_error(self, file: Option<&str>) -> DecafError {
        let location = |line: u32, col: u32| SourceLocation::new(file.map(String::from), line, col);
        match self {
            ConvertError::Parse {
                stage: Stage::Normalize,
                source,
                line,
                col,
            } => DecafError::syntax(source.message(), location(line, col)),
            ConvertError::Parse { source, line, col, .. } => DecafError::internal(format!(
                "normalized code does not parse at {}:{}: {}",
                line, col, source
            )),
            ConvertError::Patch {
                error, position, ..
            } => match error.kind {
                PatchErrorKind::Unsupported => {
                    let (line, col) = position.unwrap_or((1, 1));
                    DecafError::conversion(error.message, location(line, col))
                }
                PatchErrorKind::Internal => DecafError::internal(error.message),
            },
            ConvertError::Io(err) => DecafError::file_not_found(file.unwrap_or("<stdin>"), err),
        }
    }
}

impl From<ConvertError> for DecafError {
    fn from(err: ConvertError) -> Self {
        err.into_decaf_error(None)
    }
}

// ============================================================================
// Tests
// ============================================================================
