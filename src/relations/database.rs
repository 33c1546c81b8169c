//! `legend-db` relation: MongoDB credentials published by the Legend
//! database manager.
//!
//! The peer publishes a JSON document under `legend-db-connection`. Both
//! the current `{uri, database}` shape and the older
//! `{replica_set_uri, databases: [..]}` shape are accepted.

use serde::{Deserialize, Serialize};

use super::{read_json_key, RelationClient, RelationData, RelationName};
use crate::error::OperatorError;
use crate::state::RelationCache;

pub const CONNECTION_KEY: &str = "legend-db-connection";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseCredentials {
    pub uri: String,
    pub database: String,
}

#[derive(Deserialize)]
struct ConnectionPayload {
    #[serde(alias = "replica_set_uri")]
    uri: Option<String>,
    #[serde(default)]
    database: Option<String>,
    #[serde(default)]
    databases: Vec<String>,
}

impl DatabaseCredentials {
    /// The connection URI with its database path segment removed.
    ///
    /// The Studio's Mongo client rejects a database name inside the URI, so
    /// the last `/`-separated segment is dropped and the name is passed
    /// separately. Empty segments are dropped too and the scheme's `//` is
    /// restored. A URI with nothing after the authority is returned as is.
    #[must_use]
    pub fn uri_without_database(&self) -> String {
        let segments: Vec<&str> = self.uri.split('/').collect();
        if segments.len() <= 3 {
            return self.uri.clone();
        }
        let kept: Vec<&str> = segments[..segments.len() - 1]
            .iter()
            .copied()
            .filter(|s| !s.is_empty())
            .collect();
        match kept.split_first() {
            Some((scheme, rest)) => format!("{scheme}//{}", rest.join("/")),
            None => self.uri.clone(),
        }
    }
}

pub struct LegendDatabase;

impl RelationClient for LegendDatabase {
    type Value = DatabaseCredentials;

    const RELATION: RelationName = RelationName::Database;
    const WAITING_MESSAGE: &'static str = "Awaiting DB relation data.";

    fn parse(data: &RelationData) -> Result<Option<DatabaseCredentials>, OperatorError> {
        let Some(payload) =
            read_json_key::<ConnectionPayload>(data, CONNECTION_KEY, Self::RELATION)?
        else {
            return Ok(None);
        };

        let incomplete = |message: &str| OperatorError::RelationIncomplete {
            relation: Self::RELATION.endpoint(),
            message: message.to_string(),
        };

        let uri = payload
            .uri
            .filter(|u| !u.is_empty())
            .ok_or_else(|| incomplete("connection data has no URI"))?;
        let database = payload
            .database
            .or_else(|| payload.databases.into_iter().next())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| incomplete("connection data names no database"))?;

        Ok(Some(DatabaseCredentials { uri, database }))
    }

    fn slot(cache: &mut RelationCache) -> &mut Option<DatabaseCredentials> {
        &mut cache.database
    }

    fn cached(cache: &RelationCache) -> Option<&DatabaseCredentials> {
        cache.database.as_ref()
    }
}
