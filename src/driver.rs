//! Event dispatch and reconciliation.
//!
//! The host delivers one [`Event`] at a time to [`Driver::handle`], which
//! runs it to completion and returns an [`Outcome`]: the unit status, whether
//! the host must redeliver the event later, and any relation data to
//! publish. Errors never escape `handle`; they surface as a status.
//!
//! Every event that can change an input ends in a full reconciliation:
//! render both documents from the current cache, and only when both render
//! and the supervisor is reachable, push them and restart the service.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::model::OperatorConfig;
use crate::error::OperatorError;
use crate::relations::database::LegendDatabase;
use crate::relations::gitlab::{redirect_uris_write, LegendGitlab};
use crate::relations::ingress::IngressRequest;
use crate::relations::upstream::{LegendEngine, LegendSdlc};
use crate::relations::{RelationClient, RelationData, RelationName, RelationWrite};
use crate::render::{self, RenderedPair, HTTP_CONFIG_PATH, UI_CONFIG_PATH};
use crate::state::{RelationStore, Update};
use crate::workload::{WorkloadController, SERVICE_NAME};

pub const NEEDS_RELATIONS: &str = "needs relations";
pub const AWAITING_WORKLOAD: &str = "awaiting workload container";
pub const ACTIVE_MESSAGE: &str = "Studio service has been started.";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Event {
    ConfigChanged {
        #[serde(default)]
        options: OperatorConfig,
    },
    WorkloadReady,
    RelationJoined {
        relation: RelationName,
        id: u32,
    },
    RelationChanged {
        relation: RelationName,
        id: u32,
        #[serde(default)]
        data: RelationData,
    },
    RelationBroken {
        relation: RelationName,
        id: u32,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ConfigChanged { .. } => "config-changed",
            Self::WorkloadReady => "workload-ready",
            Self::RelationJoined { .. } => "relation-joined",
            Self::RelationChanged { .. } => "relation-changed",
            Self::RelationBroken { .. } => "relation-broken",
        }
    }

    #[must_use]
    pub const fn relation(&self) -> Option<RelationName> {
        match self {
            Self::RelationJoined { relation, .. }
            | Self::RelationChanged { relation, .. }
            | Self::RelationBroken { relation, .. } => Some(*relation),
            Self::ConfigChanged { .. } | Self::WorkloadReady => None,
        }
    }

    /// The relation endpoint and relation id this event concerns.
    #[must_use]
    pub const fn relation_key(&self) -> Option<(RelationName, u32)> {
        match self {
            Self::RelationJoined { relation, id }
            | Self::RelationChanged { relation, id, .. }
            | Self::RelationBroken { relation, id } => Some((*relation, *id)),
            Self::ConfigChanged { .. } | Self::WorkloadReady => None,
        }
    }
}

/// The unit status shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum Status {
    Maintenance(String),
    Waiting(String),
    Blocked(String),
    Active(String),
}

impl Status {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Maintenance(m) | Self::Waiting(m) | Self::Blocked(m) | Self::Active(m) => m,
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Maintenance(_) => "maintenance",
            Self::Waiting(_) => "waiting",
            Self::Blocked(_) => "blocked",
            Self::Active(_) => "active",
        };
        write!(f, "{kind}: {}", self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub event: &'static str,
    #[serde(flatten)]
    pub status: Status,
    /// The event could not be completed; the host must deliver it again.
    pub deferred: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relation_writes: Vec<RelationWrite>,
}

/// Identity of this unit, as known to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitContext {
    pub app_name: String,
    /// Address peers reach this unit on. Falls back to the application name.
    pub unit_address: Option<String>,
}

impl UnitContext {
    /// Base URL of the Studio UI served by this unit.
    #[must_use]
    pub fn base_url(&self, config: &OperatorConfig) -> String {
        let host = self.unit_address.as_deref().unwrap_or(&self.app_name);
        format!("http://{host}:{}{}", config.http_port, config.ui_path())
    }
}

pub struct Driver {
    config: OperatorConfig,
    unit: UnitContext,
    store: RelationStore,
    workload: WorkloadController,
    status: Status,
}

impl Driver {
    #[must_use]
    pub fn new(
        config: OperatorConfig,
        unit: UnitContext,
        store: RelationStore,
        workload: WorkloadController,
    ) -> Self {
        Self {
            config,
            unit,
            store,
            workload,
            status: Status::Maintenance("waiting for first event".into()),
        }
    }

    #[must_use]
    pub fn status(&self) -> &Status {
        &self.status
    }

    #[must_use]
    pub fn config(&self) -> &OperatorConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &RelationStore {
        &self.store
    }

    pub async fn handle(&mut self, event: Event) -> Outcome {
        let name = event.name();
        tracing::info!(event = name, relation = ?event.relation(), "dispatching event");

        let mut deferred = false;
        let mut relation_writes = Vec::new();

        match event {
            Event::ConfigChanged { options } => {
                self.config = options;
                self.reconcile().await;
            }
            Event::WorkloadReady => self.on_workload_ready().await,
            Event::RelationJoined { relation, id } => {
                relation_writes.extend(self.on_relation_joined(relation, id));
            }
            Event::RelationChanged { relation, id, data } => match relation {
                RelationName::Database => {
                    deferred = self.on_relation_changed::<LegendDatabase>(id, &data).await;
                }
                RelationName::Gitlab => {
                    deferred = self.on_relation_changed::<LegendGitlab>(id, &data).await;
                }
                RelationName::Sdlc => {
                    deferred = self.on_relation_changed::<LegendSdlc>(id, &data).await;
                }
                RelationName::Engine => {
                    deferred = self.on_relation_changed::<LegendEngine>(id, &data).await;
                }
                RelationName::Ingress => {
                    relation_writes.push(self.ingress_request().to_write(id));
                }
            },
            Event::RelationBroken { relation, id } => self.on_relation_broken(relation, id).await,
        }

        tracing::info!(event = name, status = %self.status, deferred, "event handled");
        Outcome {
            event: name,
            status: self.status.clone(),
            deferred,
            relation_writes,
        }
    }

    #[must_use]
    pub fn ingress_request(&self) -> IngressRequest {
        IngressRequest::from_config(&self.config, &self.unit.app_name)
    }

    async fn on_workload_ready(&mut self) {
        if let Err(e) = self.workload.ensure_process_layer().await {
            tracing::error!(error = %e, "could not register process layer");
            self.status = Status::Blocked(format!("failed to register process layer: {e}"));
            return;
        }

        // A fresh container has none of the previously pushed files.
        if let Err(e) = self.store.set_applied_digest(None) {
            tracing::warn!(error = %e, "could not reset applied configuration digest");
        }

        if self.inputs_ready() {
            self.reconcile().await;
        } else {
            self.status = Status::Blocked(NEEDS_RELATIONS.into());
        }
    }

    fn inputs_ready(&self) -> bool {
        let cache = self.store.cache();
        cache.database.is_some()
            && render::identity_credentials(&self.config, cache).is_some()
            && cache.sdlc_url.is_some()
            && cache.engine_url.is_some()
    }

    fn on_relation_joined(&self, relation: RelationName, id: u32) -> Option<RelationWrite> {
        match relation {
            RelationName::Gitlab => {
                // TODO: use the ingress hostname once the ingress relation reports it back.
                let base_url = self.unit.base_url(&self.config);
                match redirect_uris_write(id, &base_url) {
                    Ok(write) => {
                        tracing::info!(relation_id = id, %base_url, "publishing redirect URIs");
                        Some(write)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "could not build redirect URIs");
                        None
                    }
                }
            }
            RelationName::Ingress => Some(self.ingress_request().to_write(id)),
            other => {
                tracing::debug!(relation = %other, relation_id = id, "nothing to do on join");
                None
            }
        }
    }

    /// Returns whether the event must be deferred.
    async fn on_relation_changed<C: RelationClient>(&mut self, id: u32, data: &RelationData) -> bool {
        match self.store.update::<C>(id, data) {
            Ok(Update::Absent) if C::cached(self.store.cache()).is_some() => {
                tracing::debug!(relation = %C::RELATION, relation_id = id, "empty data bag, keeping cached value");
                false
            }
            Ok(Update::Absent) => {
                tracing::info!(relation = %C::RELATION, relation_id = id, "peer has not published data yet");
                self.status = Status::Waiting(C::WAITING_MESSAGE.into());
                true
            }
            Ok(Update::Stored(_) | Update::Unchanged(_)) => {
                self.reconcile().await;
                false
            }
            Err(e) => {
                tracing::warn!(relation = %C::RELATION, relation_id = id, error = %e, "rejected relation data");
                self.status = Status::Blocked(e.to_string());
                false
            }
        }
    }

    async fn on_relation_broken(&mut self, relation: RelationName, id: u32) {
        let cleared = match relation {
            RelationName::Database => self.store.clear::<LegendDatabase>(),
            RelationName::Gitlab => self.store.clear::<LegendGitlab>(),
            RelationName::Sdlc => self.store.clear::<LegendSdlc>(),
            RelationName::Engine => self.store.clear::<LegendEngine>(),
            RelationName::Ingress => Ok(false),
        };
        match cleared {
            Ok(true) => {
                tracing::info!(%relation, relation_id = id, "relation removed");
                self.reconcile().await;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(%relation, error = %e, "could not clear relation data");
                self.status = Status::Blocked(e.to_string());
            }
        }
    }

    async fn reconcile(&mut self) {
        let pair = match render::render(&self.config, self.store.cache()) {
            Ok(pair) => pair,
            Err(unmet) => {
                tracing::info!(reason = %unmet, "reconciliation blocked");
                self.status = Status::Blocked(unmet.to_string());
                return;
            }
        };

        if !self.workload.can_connect().await {
            tracing::info!(
                supervisor = self.workload.supervisor_name(),
                "workload container not reachable yet"
            );
            self.status = Status::Blocked(AWAITING_WORKLOAD.into());
            return;
        }

        self.status = match self.apply(&pair).await {
            Ok(()) => Status::Active(ACTIVE_MESSAGE.into()),
            Err(e) => {
                tracing::error!(error = %e, "could not apply configuration");
                Status::Blocked(format!("failed to apply configuration: {e}"))
            }
        };
    }

    /// Push both documents and restart the service, unless the same pair was
    /// already applied.
    async fn apply(&mut self, pair: &RenderedPair) -> Result<(), OperatorError> {
        let digest = pair.digest()?;

        // Relation data can arrive before the workload-ready event.
        self.workload.ensure_process_layer().await?;
        self.workload
            .write_config_file(HTTP_CONFIG_PATH, &pair.http)
            .await?;
        self.workload
            .write_config_file(UI_CONFIG_PATH, &pair.ui)
            .await?;

        if self.store.cache().applied_digest.as_deref() == Some(digest.as_str()) {
            tracing::debug!(%digest, "configuration unchanged, not restarting");
            return Ok(());
        }

        self.workload.restart_service(SERVICE_NAME).await?;
        self.store.set_applied_digest(Some(digest))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_parse_from_host_json() {
        let event: Event = serde_json::from_str(
            r#"{"kind": "relation-changed", "relation": "legend-sdlc", "id": 4, "data": {"legend-sdlc-url": "http://sdlc/api"}}"#,
        )
        .unwrap();
        assert_eq!(event.name(), "relation-changed");
        assert_eq!(event.relation(), Some(RelationName::Sdlc));

        let event: Event = serde_json::from_str(r#"{"kind": "workload-ready"}"#).unwrap();
        assert_eq!(event, Event::WorkloadReady);

        let event: Event = serde_json::from_str(r#"{"kind": "config-changed"}"#).unwrap();
        assert_eq!(
            event,
            Event::ConfigChanged {
                options: OperatorConfig::default()
            }
        );
    }

    #[test]
    fn unknown_relation_is_rejected() {
        let result: Result<Event, _> =
            serde_json::from_str(r#"{"kind": "relation-joined", "relation": "mystery", "id": 1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn status_serializes_with_message() {
        let json = serde_json::to_value(Status::Blocked("needs relations".into())).unwrap();
        assert_eq!(json["status"], "blocked");
        assert_eq!(json["message"], "needs relations");
        assert_eq!(
            Status::Waiting("x".into()).to_string(),
            "waiting: x"
        );
    }

    #[test]
    fn outcome_flattens_status() {
        let outcome = Outcome {
            event: "workload-ready",
            status: Status::Active(ACTIVE_MESSAGE.into()),
            deferred: false,
            relation_writes: Vec::new(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "active");
        assert_eq!(json["event"], "workload-ready");
        assert!(json.get("relation_writes").is_none());
    }

    #[test]
    fn base_url_prefers_unit_address() {
        let config = OperatorConfig::default();
        let unit = UnitContext {
            app_name: "legend-studio".into(),
            unit_address: Some("10.0.0.5".into()),
        };
        assert_eq!(unit.base_url(&config), "http://10.0.0.5:8080/studio");
        let unit = UnitContext {
            unit_address: None,
            ..unit
        };
        assert_eq!(unit.base_url(&config), "http://legend-studio:8080/studio");
    }
}
