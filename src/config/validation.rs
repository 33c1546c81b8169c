//! Option validation with detailed error reporting.
//!
//! [`validate_log_level`] is the single-option check used by the
//! reconciliation chain. [`validate`] checks every option of an
//! [`OperatorConfig`] and returns all failures at once, which is what the
//! `validate` subcommand reports.

use std::fmt;

use super::model::OperatorConfig;
use crate::error::ValidationError;

pub const VALID_LOG_LEVELS: &[&str] = &["INFO", "WARN", "DEBUG", "TRACE", "OFF"];

pub const SERVER_LOGGING_LEVEL: &str = "server-logging-level";
pub const PAC4J_LOGGING_LEVEL: &str = "server-pac4j-logging-level";

/// A `java.util.logging` level accepted by the Studio server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JavaLogLevel {
    Info,
    Warn,
    Debug,
    Trace,
    Off,
}

impl JavaLogLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
            Self::Off => "OFF",
        }
    }
}

impl fmt::Display for JavaLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a logging option was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLogLevel {
    pub option: &'static str,
    pub value: String,
}

impl fmt::Display for InvalidLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "option '{}' is '{}' but must be one of {}",
            self.option,
            self.value,
            VALID_LOG_LEVELS.join(", ")
        )
    }
}

/// Validate one logging option. Matching is exact: `info` is rejected.
pub fn validate_log_level(option: &'static str, raw: &str) -> Result<JavaLogLevel, InvalidLogLevel> {
    match raw {
        "INFO" => Ok(JavaLogLevel::Info),
        "WARN" => Ok(JavaLogLevel::Warn),
        "DEBUG" => Ok(JavaLogLevel::Debug),
        "TRACE" => Ok(JavaLogLevel::Trace),
        "OFF" => Ok(JavaLogLevel::Off),
        other => Err(InvalidLogLevel {
            option,
            value: other.to_string(),
        }),
    }
}

pub fn validate(config: &OperatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (option, value) in [
        (SERVER_LOGGING_LEVEL, &config.server_logging_level),
        (PAC4J_LOGGING_LEVEL, &config.server_pac4j_logging_level),
    ] {
        if let Err(invalid) = validate_log_level(option, value) {
            let upper = value.to_uppercase();
            errors.push(ValidationError {
                option: option.into(),
                message: format!(
                    "'{}' is not a valid Java logging level (expected one of {})",
                    invalid.value,
                    VALID_LOG_LEVELS.join(", ")
                ),
                suggestion: VALID_LOG_LEVELS
                    .contains(&upper.as_str())
                    .then(|| format!("did you mean '{upper}'?")),
            });
        }
    }

    if !config.server_ui_path.starts_with('/') {
        errors.push(ValidationError {
            option: "server-ui-path".into(),
            message: "path must start with '/'".into(),
            suggestion: Some(format!("did you mean '/{}'?", config.server_ui_path)),
        });
    }

    if config.http_port == 0 {
        errors.push(ValidationError {
            option: "server-application-connector-port-http".into(),
            message: "port must be between 1 and 65535".into(),
            suggestion: None,
        });
    }

    if config.gitlab_client_id.is_some() != config.gitlab_client_secret.is_some() {
        errors.push(ValidationError {
            option: "gitlab-client-secret".into(),
            message: "gitlab-client-id and gitlab-client-secret must be set together".into(),
            suggestion: None,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[must_use]
pub fn format_validation_report(path: &str, config: &OperatorConfig) -> String {
    let identity = if config.gitlab_client().is_some() {
        "options (gitlab-client-id)"
    } else {
        "relation only"
    };
    let lines = [
        format!("  ui path:        {}", config.server_ui_path),
        format!("  http port:      {}", config.http_port),
        format!(
            "  logging:        {} (pac4j: {})",
            config.server_logging_level, config.server_pac4j_logging_level
        ),
        format!("  gitlab client:  {identity}"),
    ];
    format!("{path} is valid\n{}", lines.join("\n"))
}
