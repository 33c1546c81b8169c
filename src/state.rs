//! Durable cache of relation data.
//!
//! [`RelationCache`] has one slot per inbound relation plus the digest of
//! the last configuration pair applied to the workload. [`RelationStore`]
//! owns the cache and rewrites the state file after every mutation, so an
//! operator restart resumes with the data peers already sent. A slot is
//! only written by its own relation's handler; relation teardown clears it.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::OperatorError;
use crate::relations::database::DatabaseCredentials;
use crate::relations::gitlab::IdentityClientCredentials;
use crate::relations::{RelationClient, RelationData};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationCache {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseCredentials>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab: Option<IdentityClientCredentials>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdlc_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_url: Option<String>,

    /// SHA-256 of the documents last written before a successful restart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_digest: Option<String>,
}

impl RelationCache {
    /// True once every relation the workload needs has delivered data.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.database.is_some()
            && self.gitlab.is_some()
            && self.sdlc_url.is_some()
            && self.engine_url.is_some()
    }
}

/// Result of applying a peer's data bag to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update<T> {
    /// The peer has not published data yet; the cache is untouched.
    Absent,
    /// Same value as already cached.
    Unchanged(T),
    /// New value, persisted.
    Stored(T),
}

#[derive(Debug)]
pub struct RelationStore {
    path: Option<PathBuf>,
    cache: RelationCache,
}

impl RelationStore {
    /// A store that lives only as long as the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            cache: RelationCache::default(),
        }
    }

    /// Open the state file, starting empty if it does not exist yet.
    pub fn open(path: &Path) -> Result<Self, OperatorError> {
        let cache = match std::fs::read(path) {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| OperatorError::StateCorrupt {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RelationCache::default(),
            Err(e) => return Err(OperatorError::Io(e)),
        };
        tracing::debug!(path = %path.display(), complete = cache.is_complete(), "opened state file");
        Ok(Self {
            path: Some(path.to_path_buf()),
            cache,
        })
    }

    #[must_use]
    pub fn cache(&self) -> &RelationCache {
        &self.cache
    }

    /// Parse a peer's data bag and cache the result. A malformed bag leaves
    /// the cached value untouched.
    pub fn update<C: RelationClient>(
        &mut self,
        relation_id: u32,
        data: &RelationData,
    ) -> Result<Update<C::Value>, OperatorError> {
        let Some(value) = C::parse(data)? else {
            return Ok(Update::Absent);
        };

        let slot = C::slot(&mut self.cache);
        if slot.as_ref() == Some(&value) {
            tracing::debug!(relation = %C::RELATION, relation_id, "relation data unchanged");
            return Ok(Update::Unchanged(value));
        }
        *slot = Some(value.clone());
        self.persist()?;
        tracing::info!(relation = %C::RELATION, relation_id, "stored relation data");
        Ok(Update::Stored(value))
    }

    /// Forget a relation's data. Returns whether anything was cached.
    pub fn clear<C: RelationClient>(&mut self) -> Result<bool, OperatorError> {
        if C::slot(&mut self.cache).take().is_none() {
            return Ok(false);
        }
        self.persist()?;
        tracing::info!(relation = %C::RELATION, "cleared relation data");
        Ok(true)
    }

    pub fn set_applied_digest(&mut self, digest: Option<String>) -> Result<(), OperatorError> {
        if self.cache.applied_digest == digest {
            return Ok(());
        }
        self.cache.applied_digest = digest;
        self.persist()
    }

    fn persist(&self) -> Result<(), OperatorError> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(&self.cache)?;
        atomic_write(path, &bytes)
    }
}

/// Atomically write `data` to `path` using a tempfile in the same directory.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), OperatorError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            parent
        }
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::database::{LegendDatabase, CONNECTION_KEY};
    use crate::relations::upstream::{LegendSdlc, SDLC_URL_KEY};
    use tempfile::TempDir;

    fn db_bag(database: &str) -> RelationData {
        let mut data = RelationData::new();
        data.insert(
            CONNECTION_KEY.into(),
            format!(r#"{{"uri": "mongodb://h:27017/admin", "database": "{database}"}}"#),
        );
        data
    }

    #[test]
    fn missing_state_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = RelationStore::open(&dir.path().join("state.json")).unwrap();
        assert_eq!(store.cache(), &RelationCache::default());
    }

    #[test]
    fn stored_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/state.json");
        let mut store = RelationStore::open(&path).unwrap();
        let update = store.update::<LegendDatabase>(1, &db_bag("studio")).unwrap();
        assert!(matches!(update, Update::Stored(_)));

        let reopened = RelationStore::open(&path).unwrap();
        assert_eq!(reopened.cache().database.as_ref().unwrap().database, "studio");
    }

    #[test]
    fn identical_payload_is_unchanged() {
        let mut store = RelationStore::in_memory();
        store.update::<LegendDatabase>(1, &db_bag("studio")).unwrap();
        let again = store.update::<LegendDatabase>(1, &db_bag("studio")).unwrap();
        assert!(matches!(again, Update::Unchanged(_)));
    }

    #[test]
    fn malformed_payload_keeps_previous_value() {
        let mut store = RelationStore::in_memory();
        store.update::<LegendDatabase>(1, &db_bag("studio")).unwrap();

        let mut bad = RelationData::new();
        bad.insert(CONNECTION_KEY.into(), "{".into());
        assert!(store.update::<LegendDatabase>(1, &bad).is_err());
        assert_eq!(store.cache().database.as_ref().unwrap().database, "studio");
    }

    #[test]
    fn absent_payload_leaves_cache_alone() {
        let mut store = RelationStore::in_memory();
        let update = store.update::<LegendSdlc>(2, &RelationData::new()).unwrap();
        assert_eq!(update, Update::Absent);
        assert!(store.cache().sdlc_url.is_none());
    }

    #[test]
    fn clear_reports_whether_slot_was_set() {
        let mut store = RelationStore::in_memory();
        assert!(!store.clear::<LegendSdlc>().unwrap());
        let mut data = RelationData::new();
        data.insert(SDLC_URL_KEY.into(), "http://sdlc/api".into());
        store.update::<LegendSdlc>(2, &data).unwrap();
        assert!(store.clear::<LegendSdlc>().unwrap());
        assert!(store.cache().sdlc_url.is_none());
    }

    #[test]
    fn corrupt_state_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();
        let err = RelationStore::open(&path).unwrap_err();
        assert!(matches!(err, OperatorError::StateCorrupt { .. }));
    }
}
