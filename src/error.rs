//! Unified error types for the Studio operator.
//!
//! Defines [`OperatorError`] (the main crate error enum) and
//! [`ValidationError`] for option validation failures. Both use
//! `thiserror` for `Display` and `Error` derives. None of these errors
//! terminate the operator while it is dispatching events: the
//! [`Driver`](crate::driver::Driver) turns them into a unit status.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub option: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "  option '{}': {}", self.option, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    use std::fmt::Write;
    let mut buf = String::new();
    for (i, e) in errors.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        // write! to String is infallible (only fails on OOM which is unrecoverable)
        let _ = write!(buf, "{e}");
    }
    buf
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum OperatorError {
    #[error("Options file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("Options parse error in {path}:\n  {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Options validation failed:\n{}", format_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error("Unsupported options format: '{0}'")]
    UnsupportedFormat(String),

    #[error("State file not found: {}", path.display())]
    StateFileNotFound { path: PathBuf },

    #[error("State file {} is corrupt: {source}", path.display())]
    StateCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not deserialize {relation} relation data: {source}")]
    RelationPayload {
        relation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid {relation} relation data: {message}")]
    RelationIncomplete {
        relation: &'static str,
        message: String,
    },

    #[error("Event parse error on line {line}: {source}")]
    EventParse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not serialize {what}: {message}")]
    Serialize { what: &'static str, message: String },

    #[error("Supervisor connection failed ({}): {source}", socket.display())]
    SupervisorConnect {
        socket: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Supervisor request {op} failed: {message}")]
    SupervisorApi { op: &'static str, message: String },

    #[error("Configuration is blocked: {0}")]
    Blocked(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for OperatorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialize {
            what: "JSON document",
            message: e.to_string(),
        }
    }
}
