//! Conversion options.
//!
//! Options are read once (from CLI flags, a JSON file, or both) and shared
//! read-only by every stage. Every field has a default, so an empty JSON
//! object is a valid options file. Keys may be written in kebab or snake
//! case.

use std::fmt;
use std::path::Path;

use decaf_core::error::DecafError;
use serde::{Deserialize, Serialize};

/// A pipeline stage. Conversion can stop after any of them.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Make implicit layout explicit; output is still CoffeeScript.
    Normalize,
    /// Produce JavaScript.
    #[default]
    Main,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Normalize => "normalize",
            Stage::Main => "main",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Knobs that select between equivalent output shapes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConvertOptions {
    /// Keep `a?.b` instead of guard helpers or ternaries.
    #[serde(alias = "optional_chaining")]
    pub optional_chaining: bool,

    /// Emit `a ?? b` for the binary existence operator.
    #[serde(alias = "nullish_coalescing")]
    pub nullish_coalescing: bool,

    /// Emit `a ??= b`, `a ||= b` and `a &&= b`.
    #[serde(alias = "logical_assignment")]
    pub logical_assignment: bool,

    /// Fail instead of warning when a subclass constructor touches `this`
    /// before calling `super`.
    #[serde(alias = "disallow_invalid_constructors")]
    pub disallow_invalid_constructors: bool,

    /// Rewrite comprehensions over any target with `.filter`/`.map`, not only
    /// over array literals.
    #[serde(alias = "loose_for_expressions")]
    pub loose_for_expressions: bool,

    /// Iterate `for ... in` targets directly instead of through `Array.from`.
    #[serde(alias = "no_array_from", alias = "loose-for-of", alias = "loose_for_of")]
    pub no_array_from: bool,

    /// Use the `__in__` helper instead of `.includes`.
    #[serde(alias = "no_array_includes")]
    pub no_array_includes: bool,

    /// Allow `!(a < b)` to become `a >= b`.
    #[serde(alias = "loose_comparison_negation")]
    pub loose_comparison_negation: bool,

    /// Leave out the leading suggestion comment.
    #[serde(alias = "disable_suggestion_comment")]
    pub disable_suggestion_comment: bool,

    /// Last stage to run.
    #[serde(alias = "run_to_stage")]
    pub run_to_stage: Stage,
}

impl ConvertOptions {
    /// Parse options from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Read options from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, DecafError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path)
            .map_err(|err| DecafError::file_not_found(&display, err))?;
        ConvertOptions::from_json(&text).map_err(|err| {
            DecafError::invalid_args_with_details(
                format!("invalid options file {}: {}", display, err),
                serde_json::json!({ "path": display, "line": err.line(), "column": err.column() }),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_all_defaults() {
        let options = ConvertOptions::from_json("{}").unwrap();
        assert_eq!(options, ConvertOptions::default());
        assert_eq!(options.run_to_stage, Stage::Main);
    }

    #[test]
    fn kebab_and_snake_keys_are_accepted() {
        let options = ConvertOptions::from_json(
            r#"{"optional-chaining": true, "nullish_coalescing": true, "run-to-stage": "normalize"}"#,
        )
        .unwrap();
        assert!(options.optional_chaining);
        assert!(options.nullish_coalescing);
        assert_eq!(options.run_to_stage, Stage::Normalize);
    }

    #[test]
    fn loose_for_of_is_an_alias() {
        let options = ConvertOptions::from_json(r#"{"loose-for-of": true}"#).unwrap();
        assert!(options.no_array_from);
    }

    #[test]
    fn unknown_stage_is_rejected() {
        assert!(ConvertOptions::from_json(r#"{"run-to-stage": "lint"}"#).is_err());
    }

    #[test]
    fn options_file_errors_are_invalid_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = ConvertOptions::from_file(&path).unwrap_err();
        assert_eq!(err.error_code().code(), 2);

        let missing = ConvertOptions::from_file(&dir.path().join("missing.json")).unwrap_err();
        assert_eq!(missing.error_code().code(), 2);
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::Normalize.to_string(), "normalize");
        assert_eq!(Stage::Main.name(), "main");
    }
}
