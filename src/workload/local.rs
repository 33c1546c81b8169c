//! A [`Supervisor`] backed by a local directory standing in for the
//! container root.
//!
//! Layers are kept as YAML under `.pebble/layers/`, and every restart is
//! appended to `.pebble/restarts.log`. Used for development runs and
//! end-to-end tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{Layer, Supervisor};
use crate::error::OperatorError;
use crate::state::atomic_write;

const STATE_DIR: &str = ".pebble";

pub struct LocalSupervisor {
    root: PathBuf,
}

impl LocalSupervisor {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Host path of a container path.
    #[must_use]
    pub fn host_path(&self, container_path: &str) -> PathBuf {
        self.root.join(container_path.trim_start_matches('/'))
    }

    fn layer_path(&self, label: &str) -> PathBuf {
        self.root
            .join(STATE_DIR)
            .join("layers")
            .join(format!("{label}.yaml"))
    }

    fn restart_log(&self) -> PathBuf {
        self.root.join(STATE_DIR).join("restarts.log")
    }

    pub async fn layer(&self, label: &str) -> Result<Option<Layer>, OperatorError> {
        let path = self.layer_path(label);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_yml::from_str(&content).map(Some).map_err(|e| {
                OperatorError::ConfigParse {
                    path: path.display().to_string(),
                    source: Box::new(e),
                }
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(OperatorError::Io(e)),
        }
    }

    /// Services restarted so far, oldest first.
    pub async fn restarts(&self) -> Result<Vec<String>, OperatorError> {
        match tokio::fs::read_to_string(self.restart_log()).await {
            Ok(content) => Ok(content.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(OperatorError::Io(e)),
        }
    }

    async fn known_services(&self) -> Result<BTreeMap<String, String>, OperatorError> {
        let mut services = BTreeMap::new();
        let dir = self.root.join(STATE_DIR).join("layers");
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(services),
            Err(e) => return Err(OperatorError::Io(e)),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(label) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(layer) = self.layer(label).await? {
                for name in layer.services.into_keys() {
                    services.insert(name, label.to_string());
                }
            }
        }
        Ok(services)
    }
}

#[async_trait]
impl Supervisor for LocalSupervisor {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn can_connect(&self) -> bool {
        tokio::fs::metadata(&self.root)
            .await
            .is_ok_and(|m| m.is_dir())
    }

    async fn add_layer(&self, label: &str, layer: &Layer, combine: bool) -> Result<(), OperatorError> {
        let merged = match self.layer(label).await? {
            Some(mut existing) if combine => {
                existing.summary.clone_from(&layer.summary);
                existing.description.clone_from(&layer.description);
                for (name, service) in &layer.services {
                    existing.services.insert(name.clone(), service.clone());
                }
                existing
            }
            Some(_) => {
                return Err(OperatorError::SupervisorApi {
                    op: "add-layer",
                    message: format!("layer '{label}' already exists"),
                })
            }
            None => layer.clone(),
        };
        let yaml = serde_yml::to_string(&merged).map_err(|e| OperatorError::Serialize {
            what: "layer",
            message: e.to_string(),
        })?;
        atomic_write(&self.layer_path(label), yaml.as_bytes())
    }

    async fn push(&self, path: &str, content: &[u8], make_dirs: bool) -> Result<(), OperatorError> {
        let target = self.host_path(path);
        if !make_dirs && !target.parent().is_some_and(Path::is_dir) {
            return Err(OperatorError::SupervisorApi {
                op: "push",
                message: format!("parent directory of '{path}' does not exist"),
            });
        }
        atomic_write(&target, content)
    }

    async fn restart(&self, services: &[&str]) -> Result<(), OperatorError> {
        let known = self.known_services().await?;
        if let Some(missing) = services.iter().find(|s| !known.contains_key(**s)) {
            return Err(OperatorError::SupervisorApi {
                op: "restart",
                message: format!("service '{missing}' is not defined in any layer"),
            });
        }

        let log = self.restart_log();
        if let Some(parent) = log.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log)
            .await?;
        for service in services {
            file.write_all(format!("{service}\n").as_bytes()).await?;
        }
        file.flush().await?;
        Ok(())
    }
}
