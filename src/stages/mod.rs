//! Conversion stages.
//!
//! Each stage is one patch pass over freshly parsed text:
//!
//! - [`normalize`]: CoffeeScript to CoffeeScript, making implicit calls and
//!   objects explicit and turning postfix forms into prefix ones
//! - [`main`]: CoffeeScript to JavaScript
//!
//! The pipeline re-parses between stages, so every stage works on a tree
//! whose spans match its own input.

pub mod main;
pub mod normalize;

use crate::helpers::HelperRegistry;
use crate::suggestions::SuggestionLog;

/// What one stage produced.
#[derive(Debug, Clone, Default)]
pub struct StageOutput {
    pub code: String,
    pub suggestions: SuggestionLog,
    pub helpers: HelperRegistry,
}
