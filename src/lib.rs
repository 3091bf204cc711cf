//! decaf: a CoffeeScript to JavaScript compiler that patches source text.
//!
//! Instead of printing JavaScript from a syntax tree, decaf edits the
//! original text in place through an overlay buffer, so comments, spacing
//! and line structure survive the conversion. A conversion is two stages,
//! each a patch pass over a fresh parse:
//!
//! 1. normalize: CoffeeScript to CoffeeScript with implicit layout written
//!    out
//! 2. main: CoffeeScript to JavaScript
//!
//! ```
//! use decaf::{convert, ConvertOptions};
//!
//! let options = ConvertOptions {
//!     disable_suggestion_comment: true,
//!     ..ConvertOptions::default()
//! };
//! let output = convert("square = (x) -> x * x", &options).unwrap();
//! assert_eq!(output.code, "let square = function(x) { return x * x; };\n");
//! ```

// Language-agnostic infrastructure, re-exported from decaf-core
pub use decaf_core::editor;
pub use decaf_core::output;
pub use decaf_core::patch;
pub use decaf_core::text;

pub mod error;
pub mod helpers;
pub mod options;
pub mod patcher;
pub mod pipeline;
pub mod scope;
pub mod stages;
pub mod suggestions;
pub mod tokens;

pub use error::{ConvertError, PatchError, PatchErrorKind, PatchResult};
pub use helpers::{Helper, HelperRegistry};
pub use options::{ConvertOptions, Stage};
pub use pipeline::{convert, ConvertOutput};
pub use suggestions::{Suggestion, SuggestionLog};
