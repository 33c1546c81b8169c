//! Operator options: loading and validation.
//!
//! Options arrive either from an options file given on the command line
//! (YAML or JSON, TOML behind the `toml` feature) or inline with a
//! `config-changed` event. Submodules provide the data model and the
//! validation logic.

pub mod model;
pub mod validation;

use std::path::Path;

use crate::error::OperatorError;
use model::OperatorConfig;

/// Parse an options string based on file extension.
pub fn parse_options_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<OperatorConfig, OperatorError> {
    let parse_err = |source: Box<dyn std::error::Error + Send + Sync>| OperatorError::ConfigParse {
        path: path_display.to_string(),
        source,
    };

    match ext {
        "yaml" | "yml" => serde_yml::from_str(content).map_err(|e| parse_err(Box::new(e))),

        "json" => serde_json::from_str(content).map_err(|e| parse_err(Box::new(e))),

        #[cfg(feature = "toml")]
        "toml" => toml::from_str(content).map_err(|e| parse_err(Box::new(e))),

        other => Err(OperatorError::UnsupportedFormat(other.to_string())),
    }
}

/// Read and parse an options file. Validation is left to the caller: the
/// reconciliation chain reports invalid options as a status instead of
/// refusing to start.
pub async fn load(path: &Path) -> Result<OperatorConfig, OperatorError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            OperatorError::ConfigFileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            OperatorError::Io(e)
        }
    })?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    parse_options_str(ext, &content, &path.display().to_string())
}

/// Load the options file if one was given, defaults otherwise.
pub async fn load_or_default(path: Option<&Path>) -> Result<OperatorConfig, OperatorError> {
    match path {
        Some(path) => {
            let config = load(path).await?;
            tracing::info!(path = %path.display(), "loaded options file");
            Ok(config)
        }
        None => Ok(OperatorConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_options_parse() {
        let yaml = "server-ui-path: /legend\nserver-logging-level: DEBUG\n";
        let config = parse_options_str("yaml", yaml, "options.yaml").unwrap();
        assert_eq!(config.server_ui_path, "/legend");
        assert_eq!(config.server_logging_level, "DEBUG");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = parse_options_str("xml", "{}", "options.xml").unwrap_err();
        assert!(matches!(err, OperatorError::UnsupportedFormat(ref ext) if ext == "xml"));
    }

    #[test]
    fn parse_error_names_the_file() {
        let err = parse_options_str("json", "{", "broken.json").unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = load(Path::new("/nonexistent/options.yaml")).await.unwrap_err();
        assert!(matches!(err, OperatorError::ConfigFileNotFound { .. }));
    }
}
