//! `legend-sdlc` and `legend-engine` relations: each peer publishes the URL
//! of its API as a plain string.

use url::Url;

use super::{RelationClient, RelationData, RelationName};
use crate::error::OperatorError;
use crate::state::RelationCache;

pub const SDLC_URL_KEY: &str = "legend-sdlc-url";
pub const ENGINE_URL_KEY: &str = "legend-engine-url";

/// Check that a published service URL is an absolute http(s) URL.
pub fn validate_service_url(url: &str) -> Result<(), String> {
    match Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            if scheme == "http" || scheme == "https" {
                Ok(())
            } else {
                Err(format!(
                    "unsupported scheme '{scheme}' (expected http or https)"
                ))
            }
        }
        Err(_) => Err(format!("'{url}' is not a valid URL")),
    }
}

fn read_url(
    data: &RelationData,
    key: &str,
    relation: RelationName,
) -> Result<Option<String>, OperatorError> {
    let Some(url) = data.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    validate_service_url(url).map_err(|message| OperatorError::RelationIncomplete {
        relation: relation.endpoint(),
        message,
    })?;
    Ok(Some(url.to_string()))
}

pub struct LegendSdlc;

impl RelationClient for LegendSdlc {
    type Value = String;

    const RELATION: RelationName = RelationName::Sdlc;
    const WAITING_MESSAGE: &'static str = "Waiting for SDLC relation to report service URL.";

    fn parse(data: &RelationData) -> Result<Option<String>, OperatorError> {
        read_url(data, SDLC_URL_KEY, Self::RELATION)
    }

    fn slot(cache: &mut RelationCache) -> &mut Option<String> {
        &mut cache.sdlc_url
    }

    fn cached(cache: &RelationCache) -> Option<&String> {
        cache.sdlc_url.as_ref()
    }
}

pub struct LegendEngine;

impl RelationClient for LegendEngine {
    type Value = String;

    const RELATION: RelationName = RelationName::Engine;
    const WAITING_MESSAGE: &'static str = "Waiting for Engine relation to report service URL.";

    fn parse(data: &RelationData) -> Result<Option<String>, OperatorError> {
        read_url(data, ENGINE_URL_KEY, Self::RELATION)
    }

    fn slot(cache: &mut RelationCache) -> &mut Option<String> {
        &mut cache.engine_url
    }

    fn cached(cache: &RelationCache) -> Option<&String> {
        cache.engine_url.as_ref()
    }
}
