//! Control of the Studio workload container.
//!
//! The [`Supervisor`] trait abstracts the container's process manager:
//! [`PebbleClient`](pebble::PebbleClient) talks to Pebble over its unix
//! socket, [`LocalSupervisor`](local::LocalSupervisor) treats a local
//! directory as the container root. [`WorkloadController`] layers the
//! Studio-specific operations on top.

pub mod local;
pub mod pebble;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OperatorError;
use crate::render::HTTP_CONFIG_PATH;

pub const CONTAINER_NAME: &str = "studio";
pub const SERVICE_NAME: &str = "studio";
pub const LAYER_LABEL: &str = "studio";

/// A Pebble configuration layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub summary: String,
    pub description: String,
    pub services: BTreeMap<String, ServiceSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    #[serde(rename = "override")]
    pub override_mode: String,
    pub summary: String,
    pub command: String,
    /// `disabled` keeps Pebble from starting the service on its own.
    pub startup: String,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

// async_trait is required here because Supervisor is used as Box<dyn Supervisor>
// and native async fn in traits does not support dyn dispatch.
#[async_trait]
pub trait Supervisor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn can_connect(&self) -> bool;

    /// Add a layer under `label`. With `combine`, services of an existing
    /// layer with the same label are merged instead of rejected.
    async fn add_layer(&self, label: &str, layer: &Layer, combine: bool) -> Result<(), OperatorError>;

    /// Write `content` to `path` inside the container, replacing any
    /// previous content.
    async fn push(&self, path: &str, content: &[u8], make_dirs: bool) -> Result<(), OperatorError>;

    /// Stop then start the named services.
    async fn restart(&self, services: &[&str]) -> Result<(), OperatorError>;
}

/// Layer running the Studio static server against `/http-config.json`.
#[must_use]
pub fn studio_layer() -> Layer {
    // The shell is needed to expand the classpath glob.
    let command = format!(
        "/bin/sh -c 'java -XX:+ExitOnOutOfMemoryError -Xss4M -XX:MaxRAMPercentage=60 \
         -Dfile.encoding=UTF8 -cp /app/bin/webapp-content:/app/bin/* \
         org.finos.legend.server.shared.staticserver.Server server {HTTP_CONFIG_PATH}'"
    );

    let mut services = BTreeMap::new();
    services.insert(
        SERVICE_NAME.to_string(),
        ServiceSpec {
            override_mode: "replace".into(),
            summary: SERVICE_NAME.into(),
            command,
            startup: "disabled".into(),
            environment: BTreeMap::new(),
        },
    );

    Layer {
        summary: "Studio layer.".into(),
        description: "Pebble config layer for FINOS Legend Studio.".into(),
        services,
    }
}

pub struct WorkloadController {
    supervisor: Box<dyn Supervisor>,
}

impl WorkloadController {
    #[must_use]
    pub fn new(supervisor: Box<dyn Supervisor>) -> Self {
        Self { supervisor }
    }

    #[must_use]
    pub fn supervisor_name(&self) -> &'static str {
        self.supervisor.name()
    }

    pub async fn ensure_process_layer(&self) -> Result<(), OperatorError> {
        self.supervisor
            .add_layer(LAYER_LABEL, &studio_layer(), true)
            .await?;
        tracing::info!(
            supervisor = self.supervisor.name(),
            label = LAYER_LABEL,
            "process layer registered"
        );
        Ok(())
    }

    pub async fn can_connect(&self) -> bool {
        self.supervisor.can_connect().await
    }

    /// Serialize `document` as compact JSON and push it to `path`.
    pub async fn write_config_file<T: Serialize + Sync>(
        &self,
        path: &str,
        document: &T,
    ) -> Result<(), OperatorError> {
        let content = serde_json::to_vec(document)?;
        tracing::debug!(path, bytes = content.len(), "writing config file to container");
        self.supervisor.push(path, &content, true).await?;
        tracing::info!(path, "wrote config file in container");
        Ok(())
    }

    pub async fn restart_service(&self, name: &str) -> Result<(), OperatorError> {
        tracing::debug!(service = name, "restarting service");
        self.supervisor.restart(&[name]).await?;
        tracing::info!(service = name, "service restarted");
        Ok(())
    }
}
