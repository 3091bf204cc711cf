//! Core infrastructure for decaf.
//!
//! This crate provides language-agnostic infrastructure:
//! - `Span` byte ranges
//! - The `SourceEditor` overlay buffer used by every patching stage
//! - Text utilities (offset to line:column, line indentation)
//! - Error types and stable exit codes
//! - JSON output types for CLI responses

pub mod editor;
pub mod error;
pub mod output;
pub mod patch;
pub mod text;

pub use editor::{EditError, EditMark, SourceEditor};
pub use patch::Span;
