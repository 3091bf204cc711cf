//! The conversion pipeline.
//!
//! Parses the input, runs the normalize stage, re-parses its output and runs
//! the main stage, then assembles the final text: the suggestion comment,
//! the converted code, and the runtime helpers it calls.

use decaf_coffee::{ParseError, ParsedSource};
use decaf_core::output::SuggestionInfo;
use decaf_core::text::byte_offset_to_position;

use crate::error::{ConvertError, PatchError};
use crate::options::{ConvertOptions, Stage};
use crate::stages::{self, StageOutput};

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOutput {
    /// Final text, including the suggestion comment and helpers when present.
    pub code: String,
    /// Suggestions recorded by the main stage, sorted by code.
    pub suggestions: Vec<SuggestionInfo>,
    /// Names of the helpers appended to `code`, in registration order.
    pub helpers: Vec<String>,
}

/// Convert CoffeeScript `source` to JavaScript.
///
/// With `run_to_stage` set to [`Stage::Normalize`] the normalized
/// CoffeeScript is returned as is, with no suggestions or helpers.
pub fn convert(source: &str, options: &ConvertOptions) -> Result<ConvertOutput, ConvertError> {
    let parsed = parse_stage_input(source, Stage::Normalize)?;
    tracing::debug!(bytes = source.len(), "starting normalize stage");
    let normalized = stages::normalize::run(source, &parsed, options)
        .map_err(|error| patch_error(source, Stage::Normalize, error))?;

    if options.run_to_stage == Stage::Normalize {
        return Ok(ConvertOutput {
            code: normalized,
            suggestions: Vec::new(),
            helpers: Vec::new(),
        });
    }

    tracing::debug!(bytes = normalized.len(), "re-parsing normalized code");
    let parsed = parse_stage_input(&normalized, Stage::Main)?;
    let output = stages::main::run(&normalized, &parsed, options)
        .map_err(|error| patch_error(&normalized, Stage::Main, error))?;
    Ok(assemble(output, options))
}

fn parse_stage_input(source: &str, stage: Stage) -> Result<ParsedSource, ConvertError> {
    decaf_coffee::parse(source).map_err(|err| parse_error(source, stage, err))
}

fn parse_error(source: &str, stage: Stage, err: ParseError) -> ConvertError {
    let (line, col) = byte_offset_to_position(source, err.offset());
    tracing::debug!(%stage, line, col, error = %err, "stage input did not parse");
    ConvertError::Parse {
        stage,
        source: err,
        line,
        col,
    }
}

fn patch_error(source: &str, stage: Stage, error: PatchError) -> ConvertError {
    let position = error
        .span
        .map(|span| byte_offset_to_position(source, span.start.min(source.len())));
    ConvertError::Patch {
        stage,
        error,
        position,
    }
}

fn assemble(output: StageOutput, options: &ConvertOptions) -> ConvertOutput {
    let mut code = String::new();
    if !options.disable_suggestion_comment {
        code.push_str(&output.suggestions.render_comment());
    }
    let body = output.code.trim_end();
    if !body.is_empty() {
        code.push_str(body);
        code.push('\n');
    }
    if !output.helpers.is_empty() {
        if !code.is_empty() {
            code.push('\n');
        }
        code.push_str(&output.helpers.render());
    }
    ConvertOutput {
        code,
        suggestions: output.suggestions.infos(),
        helpers: output.helpers.names(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PatchErrorKind;

    fn plain_options() -> ConvertOptions {
        ConvertOptions {
            disable_suggestion_comment: true,
            ..ConvertOptions::default()
        }
    }

    fn convert_plain(source: &str) -> String {
        convert(source, &plain_options()).unwrap().code
    }

    mod stages {
        use super::*;

        #[test]
        fn both_stages_run_by_default() {
            assert_eq!(convert_plain("f a"), "f(a);\n");
        }

        #[test]
        fn stopping_after_normalize_returns_coffeescript() {
            let options = ConvertOptions {
                run_to_stage: Stage::Normalize,
                ..ConvertOptions::default()
            };
            let output = convert("f x unless g y", &options).unwrap();
            assert_eq!(output.code, "unless g(y) then f(x)");
            assert!(output.suggestions.is_empty());
            assert!(output.helpers.is_empty());
        }

        #[test]
        fn empty_input_is_empty_output() {
            assert_eq!(convert_plain(""), "");
        }
    }

    mod assembly {
        use super::*;

        #[test]
        fn helpers_follow_the_code() {
            let output = convert("x = a %% b", &plain_options()).unwrap();
            assert!(output.code.starts_with("let x = __mod__(a, b);\n\nfunction __mod__("));
            assert_eq!(output.helpers, vec!["__mod__".to_string()]);
        }

        #[test]
        fn suggestion_comment_leads() {
            let output = convert("x = a in b", &ConvertOptions::default()).unwrap();
            assert!(output.code.starts_with("/*\n * decaf suggestions:\n * DS101: "));
            assert!(output.code.contains("let x = Array.from(b).includes(a);\n"));
            let codes: Vec<_> = output.suggestions.iter().map(|s| s.code.as_str()).collect();
            assert_eq!(codes, vec!["DS101", "DS204"]);
        }

        #[test]
        fn suggestion_comment_can_be_disabled() {
            let output = convert("x = a in b", &plain_options()).unwrap();
            assert_eq!(output.code, "let x = Array.from(b).includes(a);\n");
            assert_eq!(output.suggestions.len(), 2);
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn syntax_errors_come_from_the_first_parse() {
            let err = convert("a = (\n", &ConvertOptions::default()).unwrap_err();
            match err {
                ConvertError::Parse { stage, line, .. } => {
                    assert_eq!(stage, Stage::Normalize);
                    assert!(line >= 1);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[test]
        fn patch_errors_carry_a_position() {
            let options = ConvertOptions {
                disallow_invalid_constructors: true,
                ..ConvertOptions::default()
            };
            let source = "class A extends B\n  constructor: ->\n    @a = 1\n    super()\n";
            match convert(source, &options).unwrap_err() {
                ConvertError::Patch {
                    stage,
                    error,
                    position,
                } => {
                    assert_eq!(stage, Stage::Main);
                    assert_eq!(error.kind, PatchErrorKind::Unsupported);
                    assert_eq!(position.map(|(line, _)| line), Some(2));
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }
}
