//! Typed clients for the relations this operator takes part in.
//!
//! Each inbound relation is described by a [`RelationClient`]: the
//! endpoint it is bound to, how a peer's application data bag is parsed,
//! and which slot of the [`RelationCache`](crate::state::RelationCache)
//! the parsed value lives in. Outbound announcements (GitLab redirect
//! URIs, ingress requests) are returned as [`RelationWrite`] values and
//! published by the host.

pub mod database;
pub mod gitlab;
pub mod ingress;
pub mod upstream;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::OperatorError;
use crate::state::RelationCache;

/// A peer application's data bag, as delivered by the host.
pub type RelationData = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum RelationName {
    #[serde(rename = "legend-db")]
    Database,
    #[serde(rename = "legend-studio-gitlab")]
    Gitlab,
    #[serde(rename = "legend-sdlc")]
    Sdlc,
    #[serde(rename = "legend-engine")]
    Engine,
    #[serde(rename = "ingress")]
    Ingress,
}

impl RelationName {
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Database => "legend-db",
            Self::Gitlab => "legend-studio-gitlab",
            Self::Sdlc => "legend-sdlc",
            Self::Engine => "legend-engine",
            Self::Ingress => "ingress",
        }
    }
}

impl fmt::Display for RelationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// Data this unit publishes into its own application bag on a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationWrite {
    pub relation: RelationName,
    pub relation_id: u32,
    pub data: RelationData,
}

/// An inbound relation whose peer supplies one cached value.
pub trait RelationClient {
    type Value: Clone + PartialEq + fmt::Debug;

    const RELATION: RelationName;

    /// Status shown while the peer has not published its data yet.
    const WAITING_MESSAGE: &'static str;

    /// Parse the peer's data bag. `Ok(None)` means the peer has not
    /// published anything yet; `Err` means it published something unusable.
    fn parse(data: &RelationData) -> Result<Option<Self::Value>, OperatorError>;

    fn slot(cache: &mut RelationCache) -> &mut Option<Self::Value>;

    fn cached(cache: &RelationCache) -> Option<&Self::Value>;
}

/// Read a key holding a JSON document, treating a missing or blank key as
/// "not published yet".
pub(crate) fn read_json_key<T: serde::de::DeserializeOwned>(
    data: &RelationData,
    key: &str,
    relation: RelationName,
) -> Result<Option<T>, OperatorError> {
    let Some(raw) = data.get(key).filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    serde_json::from_str(raw)
        .map(Some)
        .map_err(|source| OperatorError::RelationPayload {
            relation: relation.endpoint(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_names_use_endpoint_strings() {
        let json = serde_json::to_string(&RelationName::Gitlab).unwrap();
        assert_eq!(json, "\"legend-studio-gitlab\"");
        let parsed: RelationName = serde_json::from_str("\"legend-db\"").unwrap();
        assert_eq!(parsed, RelationName::Database);
        assert_eq!(RelationName::Engine.to_string(), "legend-engine");
    }

    #[test]
    fn blank_key_reads_as_absent() {
        let mut data = RelationData::new();
        data.insert("k".into(), "  ".into());
        let value: Option<Vec<String>> = read_json_key(&data, "k", RelationName::Database).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn invalid_json_is_a_payload_error() {
        let mut data = RelationData::new();
        data.insert("k".into(), "{not json".into());
        let err = read_json_key::<Vec<String>>(&data, "k", RelationName::Database).unwrap_err();
        assert!(matches!(
            err,
            OperatorError::RelationPayload {
                relation: "legend-db",
                ..
            }
        ));
    }
}
