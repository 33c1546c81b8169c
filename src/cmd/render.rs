//! `studio-operator render` — print the Studio configuration documents.
//!
//! Runs the same assembly as a reconciliation, against an options file and
//! a state file, without touching any workload. Prints the first unmet
//! precondition instead when the documents cannot be built.

use crate::cli::{DocumentKind, RenderArgs};
use crate::config;
use crate::error::OperatorError;
use crate::render::{self, HTTP_CONFIG_PATH, UI_CONFIG_PATH};
use crate::state::RelationStore;

pub async fn execute(args: &RenderArgs) -> Result<(), OperatorError> {
    let options = config::load_or_default(args.config.as_deref()).await?;

    if !args.state_file.exists() {
        return Err(OperatorError::StateFileNotFound {
            path: args.state_file.clone(),
        });
    }
    let store = RelationStore::open(&args.state_file)?;
    let cache = store.cache();

    // Each document is checked on its own so that one can be previewed
    // while the other is still blocked.
    let http = match args.document {
        DocumentKind::Http | DocumentKind::Both => Some(render::build_http_config(&options, cache)),
        DocumentKind::Ui => None,
    };
    let ui = match args.document {
        DocumentKind::Ui | DocumentKind::Both => Some(render::build_ui_config(cache)),
        DocumentKind::Http => None,
    };

    let mut blocked = Vec::new();
    if let Some(http) = http {
        match http {
            Ok(doc) => print_document(HTTP_CONFIG_PATH, &doc)?,
            Err(unmet) => {
                eprintln!("\u{2717} {HTTP_CONFIG_PATH}: {unmet}");
                blocked.push(unmet.to_string());
            }
        }
    }
    if let Some(ui) = ui {
        match ui {
            Ok(doc) => print_document(UI_CONFIG_PATH, &doc)?,
            Err(unmet) => {
                eprintln!("\u{2717} {UI_CONFIG_PATH}: {unmet}");
                blocked.push(unmet.to_string());
            }
        }
    }

    match blocked.into_iter().next() {
        Some(reason) => Err(OperatorError::Blocked(reason)),
        None => Ok(()),
    }
}

fn print_document<T: serde::Serialize>(path: &str, document: &T) -> Result<(), OperatorError> {
    println!("# {path}");
    println!("{}", serde_json::to_string_pretty(document)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_state_file_is_named() {
        let dir = tempfile::TempDir::new().unwrap();
        let args = RenderArgs {
            config: None,
            state_file: dir.path().join("state.json"),
            document: DocumentKind::Both,
        };
        let err = execute(&args).await.unwrap_err();
        assert!(matches!(err, OperatorError::StateFileNotFound { .. }));
        assert!(err.to_string().starts_with("State file not found:"));
    }
}
