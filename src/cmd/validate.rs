//! `studio-operator validate` — check an options file for errors.
//!
//! Parses and validates the options file, reporting results in either
//! human-readable text or machine-readable JSON format.

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config;
use crate::config::validation;
use crate::error::OperatorError;

pub async fn execute(args: &ValidateArgs) -> Result<(), OperatorError> {
    let path = &args.config;
    let options = config::load(path).await?;

    if let Err(errors) = validation::validate(&options) {
        match args.format {
            ValidateFormat::Text => {
                eprintln!("\u{2717} {} has {} errors\n", path.display(), errors.len());
                for error in &errors {
                    eprintln!("{error}");
                }
            }
            ValidateFormat::Json => {
                let json_errors: Vec<serde_json::Value> = errors
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "option": e.option,
                            "message": e.message,
                            "suggestion": e.suggestion,
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "valid": false,
                        "errors": json_errors,
                    })
                );
            }
        }
        return Err(OperatorError::ConfigValidation { errors });
    }

    match args.format {
        ValidateFormat::Text => {
            println!(
                "\u{2713} {}",
                validation::format_validation_report(&path.display().to_string(), &options)
            );
        }
        ValidateFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "valid": true,
                    "ui_path": options.server_ui_path,
                    "http_port": options.http_port,
                })
            );
        }
    }

    Ok(())
}
