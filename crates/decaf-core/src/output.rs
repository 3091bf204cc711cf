//! JSON output types for `decaf --json`.
//!
//! ## Design Principles
//!
//! 1. **Status first:** Every response has `status` as its first field
//! 2. **Deterministic:** Same input produces the same bytes
//! 3. **Nullable vs absent:** Optional fields are omitted when not applicable
//! 4. **Versioned:** `schema_version` enables forward compatibility

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::error::{DecafError, OutputErrorCode, SourceLocation};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

/// A cleanup suggestion attached to converted output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionInfo {
    /// Stable code, e.g. `DS102`.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl SuggestionInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        SuggestionInfo {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Response for a successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Input path, when the input came from a file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Converted code.
    pub code: String,
    /// Suggestions recorded during conversion, sorted by code.
    pub suggestions: Vec<SuggestionInfo>,
    /// Runtime helpers appended to the output, in registration order.
    pub helpers: Vec<String>,
}

impl ConvertResponse {
    pub fn new(
        file: Option<String>,
        code: impl Into<String>,
        suggestions: Vec<SuggestionInfo>,
        helpers: Vec<String>,
    ) -> Self {
        ConvertResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            file,
            code: code.into(),
            suggestions,
            helpers,
        }
    }
}

/// Error information for error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code (same as the exit status).
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Where the error occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl ErrorInfo {
    /// Create from a DecafError.
    pub fn from_error(err: &DecafError) -> Self {
        let details = match err {
            DecafError::InvalidArguments { details, .. } => details.clone(),
            DecafError::FileNotFound { path, .. } => Some(serde_json::json!({ "path": path })),
            _ => None,
        };
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
            details,
            location: err.location().cloned(),
        }
    }
}

/// Response for a failed conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from a DecafError.
    pub fn from_error(err: &DecafError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_response_status_comes_first() {
        let response = ConvertResponse::new(None, "a;\n", vec![], vec![]);
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.starts_with(r#"{"status":"ok","schema_version":"1""#));
        assert!(!json.contains("\"file\""));
    }

    #[test]
    fn error_response_carries_code_and_location() {
        let err = DecafError::syntax(
            "unexpected `)`",
            SourceLocation::new(Some("x.coffee".to_string()), 2, 5),
        );
        let response = ErrorResponse::from_error(&err);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"]["code"], 3);
        assert_eq!(value["error"]["location"]["line"], 2);
        assert_eq!(value["error"]["location"]["file"], "x.coffee");
    }

    #[test]
    fn missing_file_details_include_path() {
        let err = DecafError::file_not_found("gone.coffee", "not found");
        let info = ErrorInfo::from_error(&err);
        assert_eq!(info.code, 2);
        assert_eq!(info.details.unwrap()["path"], "gone.coffee");
        assert!(info.location.is_none());
    }

    #[test]
    fn emit_response_is_deterministic() {
        let response = ConvertResponse::new(
            Some("a.coffee".to_string()),
            "let a = 1;\n",
            vec![SuggestionInfo::new("DS102", "Remove unnecessary code")],
            vec!["__guard__".to_string()],
        );
        let mut first = Vec::new();
        let mut second = Vec::new();
        emit_response(&response, &mut first).unwrap();
        emit_response(&response, &mut second).unwrap();
        assert_eq!(first, second);
        let parsed: serde_json::Value = serde_json::from_slice(&first).unwrap();
        assert_eq!(parsed["suggestions"][0]["code"], "DS102");
    }
}
