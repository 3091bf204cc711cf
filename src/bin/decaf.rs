//! Binary entry point for the decaf CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Convert a file, printing JavaScript to stdout
//! decaf src/app.coffee
//!
//! # Convert stdin to a file, using modern operators
//! decaf --optional-chaining --nullish-coalescing -o app.js < app.coffee
//!
//! # Show what the normalize stage produces
//! decaf --run-to-stage normalize src/app.coffee
//!
//! # Machine-readable result
//! decaf --json src/app.coffee
//! ```
//!
//! Exit codes: 0 success, 2 invalid arguments, 3 syntax error, 4 conversion
//! error, 10 internal error.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use decaf::{convert, ConvertOptions, ConvertOutput, Stage};
use decaf_core::error::{DecafError, OutputErrorCode};
use decaf_core::output::{emit_response, ConvertResponse, ErrorResponse};

/// Convert CoffeeScript to modern JavaScript by patching the source.
#[derive(Parser, Debug)]
#[command(name = "decaf", version, about = "Convert CoffeeScript to modern JavaScript")]
struct Cli {
    /// Input file (default: stdin).
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON options file. Flags given on the command line are applied on top.
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,

    #[command(flatten)]
    flags: OptionFlags,

    /// Stop after this stage.
    #[arg(long, value_enum)]
    run_to_stage: Option<Stage>,

    /// Print the result or error as a JSON document.
    #[arg(long)]
    json: bool,

    /// Log level for tracing output (`RUST_LOG` takes precedence).
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Write log lines as JSON.
    #[arg(long)]
    log_json: bool,
}

/// Boolean conversion options. Each flag can only switch an option on.
#[derive(Parser, Debug, Default)]
struct OptionFlags {
    /// Keep `a?.b` as optional chaining.
    #[arg(long)]
    optional_chaining: bool,

    /// Emit `??` for the binary existence operator.
    #[arg(long)]
    nullish_coalescing: bool,

    /// Emit `??=`, `||=` and `&&=`.
    #[arg(long)]
    logical_assignment: bool,

    /// Fail when a subclass constructor uses `this` before `super`.
    #[arg(long)]
    disallow_invalid_constructors: bool,

    /// Rewrite comprehensions over any target with `.filter`/`.map`.
    #[arg(long)]
    loose_for_expressions: bool,

    /// Iterate `for ... in` targets without `Array.from`.
    #[arg(long, alias = "loose-for-of")]
    no_array_from: bool,

    /// Use the `__in__` helper instead of `.includes`.
    #[arg(long)]
    no_array_includes: bool,

    /// Allow `!(a < b)` to become `a >= b`.
    #[arg(long)]
    loose_comparison_negation: bool,

    /// Leave out the leading suggestion comment.
    #[arg(long)]
    disable_suggestion_comment: bool,
}

impl OptionFlags {
    fn apply(&self, options: &mut ConvertOptions) {
        options.optional_chaining |= self.optional_chaining;
        options.nullish_coalescing |= self.nullish_coalescing;
        options.logical_assignment |= self.logical_assignment;
        options.disallow_invalid_constructors |= self.disallow_invalid_constructors;
        options.loose_for_expressions |= self.loose_for_expressions;
        options.no_array_from |= self.no_array_from;
        options.no_array_includes |= self.no_array_includes;
        options.loose_comparison_negation |= self.loose_comparison_negation;
        options.disable_suggestion_comment |= self.disable_suggestion_comment;
    }
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.log_level, cli.log_json);

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            if cli.json {
                let response = ErrorResponse::from_error(&err);
                let _ = emit_response(&response, &mut io::stdout());
                let _ = io::stdout().flush();
            } else {
                eprintln!("decaf: {}", err);
            }
            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Convert the input and write the result.
fn execute(cli: &Cli) -> Result<(), DecafError> {
    let options = resolve_options(cli)?;
    let file = cli.input.as_ref().map(|path| path.display().to_string());
    let source = read_input(cli.input.as_deref())?;
    tracing::debug!(
        file = file.as_deref().unwrap_or("<stdin>"),
        stage = %options.run_to_stage,
        "converting"
    );

    let output = convert(&source, &options).map_err(|err| err.into_decaf_error(file.as_deref()))?;

    if cli.json {
        let ConvertOutput {
            code,
            suggestions,
            helpers,
        } = output;
        let response = ConvertResponse::new(file, code, suggestions, helpers);
        let mut buffer = Vec::new();
        emit_response(&response, &mut buffer).map_err(|e| DecafError::internal(e.to_string()))?;
        write_output(cli.output.as_deref(), &buffer)
    } else {
        write_output(cli.output.as_deref(), output.code.as_bytes())
    }
}

/// Options from `--options`, if given, with command-line flags on top.
fn resolve_options(cli: &Cli) -> Result<ConvertOptions, DecafError> {
    let mut options = match &cli.options {
        Some(path) => ConvertOptions::from_file(path)?,
        None => ConvertOptions::default(),
    };
    cli.flags.apply(&mut options);
    if let Some(stage) = cli.run_to_stage {
        options.run_to_stage = stage;
    }
    Ok(options)
}

fn read_input(path: Option<&Path>) -> Result<String, DecafError> {
    match path {
        Some(path) => fs::read_to_string(path)
            .map_err(|err| DecafError::file_not_found(path.display().to_string(), err)),
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .map_err(|err| DecafError::file_not_found("<stdin>", err))?;
            Ok(source)
        }
    }
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<(), DecafError> {
    match path {
        Some(path) => fs::write(path, bytes).map_err(|err| {
            DecafError::invalid_args(format!("cannot write {}: {}", path.display(), err))
        }),
        None => {
            let mut stdout = io::stdout();
            stdout
                .write_all(bytes)
                .and_then(|()| stdout.flush())
                .map_err(|err| DecafError::internal(format!("cannot write output: {}", err)))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_parsing {
        use super::*;

        #[test]
        fn input_and_output_paths() {
            let cli = Cli::try_parse_from(["decaf", "a.coffee", "-o", "a.js"]).unwrap();
            assert_eq!(cli.input, Some(PathBuf::from("a.coffee")));
            assert_eq!(cli.output, Some(PathBuf::from("a.js")));
            assert!(!cli.json);
        }

        #[test]
        fn no_input_reads_stdin() {
            let cli = Cli::try_parse_from(["decaf"]).unwrap();
            assert!(cli.input.is_none());
            assert!(matches!(cli.log_level, LogLevel::Warn));
        }

        #[test]
        fn run_to_stage_values() {
            let cli = Cli::try_parse_from(["decaf", "--run-to-stage", "normalize"]).unwrap();
            assert_eq!(cli.run_to_stage, Some(Stage::Normalize));
            assert!(Cli::try_parse_from(["decaf", "--run-to-stage", "lint"]).is_err());
        }

        #[test]
        fn loose_for_of_is_an_alias() {
            let cli = Cli::try_parse_from(["decaf", "--loose-for-of"]).unwrap();
            assert!(cli.flags.no_array_from);
        }
    }

    mod options {
        use super::*;

        #[test]
        fn flags_switch_options_on() {
            let cli = Cli::try_parse_from([
                "decaf",
                "--optional-chaining",
                "--no-array-includes",
                "--run-to-stage",
                "normalize",
            ])
            .unwrap();
            let options = resolve_options(&cli).unwrap();
            assert!(options.optional_chaining);
            assert!(options.no_array_includes);
            assert!(!options.nullish_coalescing);
            assert_eq!(options.run_to_stage, Stage::Normalize);
        }

        #[test]
        fn flags_apply_on_top_of_an_options_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("options.json");
            fs::write(&path, r#"{"nullish-coalescing": true, "run-to-stage": "normalize"}"#)
                .unwrap();
            let path_arg = path.display().to_string();
            let cli = Cli::try_parse_from([
                "decaf",
                "--options",
                path_arg.as_str(),
                "--logical-assignment",
            ])
            .unwrap();
            let options = resolve_options(&cli).unwrap();
            assert!(options.nullish_coalescing);
            assert!(options.logical_assignment);
            assert_eq!(options.run_to_stage, Stage::Normalize);
        }

        #[test]
        fn missing_options_file_is_invalid_arguments() {
            let cli = Cli::try_parse_from(["decaf", "--options", "/nonexistent/options.json"])
                .unwrap();
            let err = resolve_options(&cli).unwrap_err();
            assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
        }
    }
}
