//! Serde data structures for the operator options.
//!
//! [`OperatorConfig`] mirrors the options an administrator sets on the
//! deployed application. Keys are kebab-case to match the option names
//! surfaced to users, and unknown keys are rejected.

use serde::{Deserialize, Serialize};

fn default_ui_path() -> String {
    "/studio".to_string()
}

const fn default_http_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn is_default_ui_path(v: &str) -> bool {
    v == default_ui_path()
}

fn is_default_http_port(v: &u16) -> bool {
    *v == default_http_port()
}

fn is_default_log_level(v: &str) -> bool {
    v == default_log_level()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct OperatorConfig {
    #[serde(default = "default_ui_path", skip_serializing_if = "is_default_ui_path")]
    pub server_ui_path: String,

    #[serde(
        rename = "server-application-connector-port-http",
        default = "default_http_port",
        skip_serializing_if = "is_default_http_port"
    )]
    pub http_port: u16,

    #[serde(
        default = "default_log_level",
        skip_serializing_if = "is_default_log_level"
    )]
    pub server_logging_level: String,

    #[serde(
        default = "default_log_level",
        skip_serializing_if = "is_default_log_level"
    )]
    pub server_pac4j_logging_level: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab_client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab_client_secret: Option<String>,

    /// Hostname requested from the ingress controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_hostname: Option<String>,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            server_ui_path: default_ui_path(),
            http_port: default_http_port(),
            server_logging_level: default_log_level(),
            server_pac4j_logging_level: default_log_level(),
            gitlab_client_id: None,
            gitlab_client_secret: None,
            external_hostname: None,
        }
    }
}

impl OperatorConfig {
    /// The UI path without a trailing slash, so paths can be appended to it.
    #[must_use]
    pub fn ui_path(&self) -> &str {
        self.server_ui_path.trim_end_matches('/')
    }

    /// GitLab client credentials set through options, if both are present
    /// and non-empty.
    #[must_use]
    pub fn gitlab_client(&self) -> Option<(&str, &str)> {
        match (
            self.gitlab_client_id.as_deref(),
            self.gitlab_client_secret.as_deref(),
        ) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some((id, secret)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: OperatorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, OperatorConfig::default());
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.server_logging_level, "INFO");
    }

    #[test]
    fn kebab_case_keys_are_read() {
        let json = r#"{
            "server-ui-path": "/legend",
            "server-application-connector-port-http": 9000,
            "server-pac4j-logging-level": "DEBUG",
            "gitlab-client-id": "abc"
        }"#;
        let config: OperatorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.server_ui_path, "/legend");
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.server_pac4j_logging_level, "DEBUG");
        assert_eq!(config.gitlab_client_id.as_deref(), Some("abc"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<OperatorConfig, _> = serde_json::from_str(r#"{"bogus": 1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn ui_path_trims_trailing_slash() {
        let config = OperatorConfig {
            server_ui_path: "/studio/".into(),
            ..OperatorConfig::default()
        };
        assert_eq!(config.ui_path(), "/studio");
    }

    #[test]
    fn gitlab_client_requires_both_values() {
        let mut config = OperatorConfig {
            gitlab_client_id: Some("id".into()),
            ..OperatorConfig::default()
        };
        assert!(config.gitlab_client().is_none());
        config.gitlab_client_secret = Some(String::new());
        assert!(config.gitlab_client().is_none());
        config.gitlab_client_secret = Some("secret".into());
        assert_eq!(config.gitlab_client(), Some(("id", "secret")));
    }
}
