//! Serde data structures for the two documents the Studio server reads.
//!
//! [`HttpConfig`] is the server configuration passed on the command line
//! (`/http-config.json`); [`UiConfig`] is served to the browser as
//! `config.json` (`/ui-config.json`). Field order is fixed by the struct
//! layout and maps are `BTreeMap`, so serialization is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    pub ui_path: String,
    pub html5_router: bool,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub pac4j: Pac4jConfig,
    pub router_exempt_paths: Vec<String>,
    pub local_asset_paths: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub application_context_path: String,
    pub admin_context_path: String,
    pub connector: Connector,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    #[serde(rename = "type")]
    pub kind: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub loggers: BTreeMap<String, LoggerLevel>,
    pub appenders: Vec<Appender>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerLevel {
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appender {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pac4jConfig {
    pub callback_prefix: String,
    pub bypass_paths: Vec<String>,
    pub mongo_uri: String,
    pub mongo_db: String,
    pub clients: Vec<Pac4jClient>,
    pub mongo_session: MongoSession,
}

/// pac4j clients are keyed by their Java class name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pac4jClient {
    #[serde(rename = "org.finos.legend.server.pac4j.gitlab.GitlabClient")]
    pub gitlab: GitlabClient,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitlabClient {
    pub name: String,
    pub client_id: String,
    pub secret: String,
    pub discovery_uri: String,
    /// Space-separated, as the pac4j OIDC client expects.
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MongoSession {
    pub enabled: bool,
    pub collection: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiConfig {
    pub app_name: String,
    pub env: String,
    pub sdlc: ServiceUrl,
    pub metadata: ServiceUrl,
    pub engine: ServiceUrl,
    pub documentation: ServiceUrl,
    pub options: UiOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiOptions {
    pub core: CoreOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreOptions {
    #[serde(rename = "TEMPORARY__disableServiceRegistration")]
    pub disable_service_registration: bool,
}
