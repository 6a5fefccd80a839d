//! Structured output formatting for CLI commands.
//!
//! Human output goes through [`OutputContext`], which honours `--quiet` and
//! `--json`. With `--json` every command prints exactly one [`JsonOutput`]
//! (or [`JsonError`]) document on stdout.

use crate::errors::{ActionableError, PmuError};
use chrono::Utc;
use serde::{Serialize, Serializer};
use std::fmt::Display;
use std::io::{self, Write};

/// Version of the JSON output format
const OUTPUT_VERSION: &str = "1.0.0";

/// Titles longer than this are shortened in listings
pub const TITLE_WIDTH: usize = 50;

// ============================================================================
// Output Context for Quiet Mode
// ============================================================================

/// Context for controlling output verbosity
pub struct OutputContext {
    quiet: bool,
    json: bool,
}

impl OutputContext {
    pub fn new(quiet: bool, json: bool) -> Self {
        Self { quiet, json }
    }

    /// Print essential output (always shown unless --json)
    pub fn print_data(&self, msg: impl Display) -> io::Result<()> {
        if !self.json {
            writeln_safe(&format!("{}", msg))
        } else {
            Ok(())
        }
    }

    /// Print informational message (suppressed by --quiet or --json)
    pub fn print_info(&self, msg: impl Display) -> io::Result<()> {
        if !self.quiet && !self.json {
            writeln_safe(&format!("{}", msg))
        } else {
            Ok(())
        }
    }

    /// Print warning to stderr (suppressed by --quiet or --json)
    pub fn print_warning(&self, msg: impl Display) -> io::Result<()> {
        if !self.quiet && !self.json {
            writeln_safe_stderr(&format!("Warning: {}", msg))
        } else {
            Ok(())
        }
    }

    /// Print a JSON document to stdout
    pub fn print_json<T: Serialize>(&self, output: &JsonOutput<T>) -> anyhow::Result<()> {
        writeln_safe(&output.to_json_string()?)?;
        Ok(())
    }
}

/// Safe println that handles broken pipes gracefully
fn writeln_safe(msg: &str) -> io::Result<()> {
    match writeln!(io::stdout(), "{}", msg) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            // Expected when piping to head
            std::process::exit(0);
        }
        Err(e) => Err(e),
    }
}

fn writeln_safe_stderr(msg: &str) -> io::Result<()> {
    match writeln!(io::stderr(), "{}", msg) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => std::process::exit(0),
        Err(e) => Err(e),
    }
}

/// Shorten `title` to [`TITLE_WIDTH`] characters, ending in `...`.
///
/// # Examples
///
/// ```
/// use pmu::output::truncate_title;
///
/// assert_eq!(truncate_title("Short"), "Short");
/// assert_eq!(truncate_title(&"x".repeat(60)).chars().count(), 50);
/// ```
pub fn truncate_title(title: &str) -> String {
    if title.chars().count() <= TITLE_WIDTH {
        return title.to_string();
    }
    let kept: String = title.chars().take(TITLE_WIDTH - 3).collect();
    format!("{}...", kept)
}

// ============================================================================
// JSON Output Types
// ============================================================================

/// Wrapper for successful command output with metadata
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub metadata: Metadata,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(data: T, command: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            metadata: Metadata::new(command),
        }
    }

    /// Output whose `success` reflects a batch that had failures
    pub fn with_outcome(data: T, command: impl Into<String>, success: bool) -> Self {
        Self {
            success,
            data,
            metadata: Metadata::new(command),
        }
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Wrapper for error output with suggestions
#[derive(Debug, Serialize)]
pub struct JsonError {
    pub success: bool,
    pub error: ErrorDetail,
    pub metadata: Metadata,
}

impl JsonError {
    pub fn new(code: impl Into<String>, message: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                suggestions: Vec::new(),
            },
            metadata: Metadata::new(command),
        }
    }

    /// Build from any error, picking code and suggestions from its type
    pub fn from_error(error: &anyhow::Error, command: impl Into<String>) -> Self {
        let mut json = Self::new(ErrorCode::for_error(error), format!("{:#}", error), command);
        if let Some(pmu) = error.downcast_ref::<PmuError>() {
            json.error.suggestions = pmu.to_actionable().remedies().to_vec();
        } else if let Some(actionable) = error.downcast_ref::<ActionableError>() {
            json.error.message = actionable.message().to_string();
            json.error.suggestions = actionable.remedies().to_vec();
        }
        json
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Error details including code, message, and suggestions
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code (e.g., "UNKNOWN_FIELD", "CONFIG_NOT_FOUND")
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

/// Metadata included in all responses
#[derive(Debug, Serialize)]
pub struct Metadata {
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: chrono::DateTime<Utc>,
    pub version: String,
    pub command: String,
}

impl Metadata {
    fn new(command: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            version: OUTPUT_VERSION.to_string(),
            command: command.into(),
        }
    }
}

/// Serialize timestamp in ISO 8601 format
fn serialize_timestamp<S>(dt: &chrono::DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&dt.to_rfc3339())
}

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes of the `pmu` binary
///
/// # Examples
///
/// ```rust
/// use pmu::output::ExitCode;
///
/// assert_eq!(ExitCode::PartialFailure.code(), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command succeeded (0)
    Success = 0,

    /// Generic error (1)
    GenericError = 1,

    /// Invalid arguments or usage error (2)
    InvalidArgument = 2,

    /// Field, option, rule, issue or config file not found (3)
    NotFound = 3,

    /// A batch finished but some items failed (7)
    PartialFailure = 7,

    /// External dependency failed - network, git, file system (10)
    ExternalError = 10,
}

impl ExitCode {
    /// Convert exit code to i32 for `std::process::exit`
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Command succeeded",
            ExitCode::GenericError => "Generic error occurred",
            ExitCode::InvalidArgument => "Invalid arguments or usage error",
            ExitCode::NotFound => "Field, option, triage rule, issue or config not found",
            ExitCode::PartialFailure => "Some items in a batch failed",
            ExitCode::ExternalError => "External dependency failed (network, git, file system)",
        }
    }

    /// Exit code for an error that ended a command
    pub fn for_error(error: &anyhow::Error) -> Self {
        if let Some(pmu) = error.downcast_ref::<PmuError>() {
            if pmu.is_usage_error() {
                return ExitCode::InvalidArgument;
            }
            if pmu.is_not_found() {
                return ExitCode::NotFound;
            }
            return ExitCode::GenericError;
        }
        if error.downcast_ref::<ActionableError>().is_some() {
            return ExitCode::NotFound;
        }
        let external = error.chain().any(|cause| {
            cause.downcast_ref::<ureq::Error>().is_some()
                || cause.downcast_ref::<git2::Error>().is_some()
                || cause.downcast_ref::<io::Error>().is_some()
        });
        if external {
            ExitCode::ExternalError
        } else {
            ExitCode::GenericError
        }
    }
}

// ============================================================================
// Error Codes (String constants for JSON responses)
// ============================================================================

/// Error codes used in JSON error output
pub struct ErrorCode;

impl ErrorCode {
    pub const UNKNOWN_FIELD: &'static str = "UNKNOWN_FIELD";
    pub const UNKNOWN_OPTION: &'static str = "UNKNOWN_OPTION";
    pub const CONFIG_NOT_FOUND: &'static str = "CONFIG_NOT_FOUND";
    pub const INVALID_ARGUMENT: &'static str = "INVALID_ARGUMENT";
    pub const MUTATION_FAILED: &'static str = "MUTATION_FAILED";
    pub const NOT_CONFIGURED: &'static str = "NOT_CONFIGURED";
    pub const EXTERNAL_ERROR: &'static str = "EXTERNAL_ERROR";
    pub const GENERIC_ERROR: &'static str = "GENERIC_ERROR";

    fn for_error(error: &anyhow::Error) -> &'static str {
        match error.downcast_ref::<PmuError>() {
            Some(PmuError::UnknownField { .. }) => Self::UNKNOWN_FIELD,
            Some(PmuError::UnknownOption { .. }) => Self::UNKNOWN_OPTION,
            Some(PmuError::ConfigNotFound { .. }) => Self::CONFIG_NOT_FOUND,
            Some(PmuError::MutationFailed { .. }) => Self::MUTATION_FAILED,
            Some(_) => Self::INVALID_ARGUMENT,
            None => match ExitCode::for_error(error) {
                ExitCode::NotFound => Self::NOT_CONFIGURED,
                ExitCode::ExternalError => Self::EXTERNAL_ERROR,
                _ => Self::GENERIC_ERROR,
            },
        }
    }
}
