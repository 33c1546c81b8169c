//! Assembly of the Studio configuration documents.
//!
//! Both documents are rebuilt from scratch on every reconciliation from the
//! current options and the relation cache. Preconditions are checked in a
//! fixed order and the first one that fails is reported as an [`Unmet`];
//! reasons are never aggregated.
//!
//! Order: database, identity, logging options (server document), then SDLC
//! and Engine URLs (UI document).

pub mod model;

use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};

use crate::config::model::OperatorConfig;
use crate::config::validation::{
    validate_log_level, InvalidLogLevel, PAC4J_LOGGING_LEVEL, SERVER_LOGGING_LEVEL,
};
use crate::error::OperatorError;
use crate::relations::gitlab::{IdentityClientCredentials, GITLAB_OPENID_DISCOVERY_URL};
use crate::state::RelationCache;
use model::{
    Appender, Connector, CoreOptions, GitlabClient, HttpConfig, LoggerLevel, LoggingConfig,
    MongoSession, Pac4jClient, Pac4jConfig, ServerConfig, ServiceUrl, UiConfig, UiOptions,
};

pub const HTTP_CONFIG_PATH: &str = "/http-config.json";
pub const UI_CONFIG_PATH: &str = "/ui-config.json";

pub const GITLAB_REQUIRED_SCOPES: &[&str] = &["openid", "profile", "api"];

pub const CONNECTOR_TYPE_HTTP: &str = "http";
pub const MONGO_SESSION_COLLECTION: &str = "userSessions";
pub const METADATA_URL: &str = "__LEGEND_DEPOT_URL__/api";
pub const DOCUMENTATION_URL: &str = "https://legend.finos.org";
pub const UI_APP_NAME: &str = "studio";
pub const UI_ENV: &str = "test";

pub const ROUTER_EXEMPT_PATHS: &[&str] = &[
    "/editor.worker.js",
    "/json.worker.js",
    "/editor.worker.js.map",
    "/json.worker.js.map",
    "/version.json",
    "/config.json",
    "/favicon.ico",
    "/static",
];

/// The first precondition that stops the workload from being configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unmet {
    MissingDatabase,
    MissingIdentity,
    InvalidLogging(InvalidLogLevel),
    MissingSdlc,
    MissingEngine,
}

impl fmt::Display for Unmet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDatabase => f.write_str("needs database relation"),
            Self::MissingIdentity => f.write_str("needs identity relation"),
            Self::InvalidLogging(invalid) => {
                write!(f, "invalid logging configuration: {invalid}")
            }
            Self::MissingSdlc => f.write_str("needs SDLC relation"),
            Self::MissingEngine => f.write_str("needs Engine relation"),
        }
    }
}

/// Identity client credentials: relation data first, then the
/// `gitlab-client-id`/`gitlab-client-secret` options against gitlab.com.
#[must_use]
pub fn identity_credentials(
    config: &OperatorConfig,
    cache: &RelationCache,
) -> Option<IdentityClientCredentials> {
    if let Some(ref creds) = cache.gitlab {
        return Some(creds.clone());
    }
    config
        .gitlab_client()
        .map(|(client_id, client_secret)| IdentityClientCredentials {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            openid_discovery_url: GITLAB_OPENID_DISCOVERY_URL.to_string(),
        })
}

pub fn build_http_config(
    config: &OperatorConfig,
    cache: &RelationCache,
) -> Result<HttpConfig, Unmet> {
    let database = cache.database.as_ref().ok_or(Unmet::MissingDatabase)?;
    let identity = identity_credentials(config, cache).ok_or(Unmet::MissingIdentity)?;

    let server_level = validate_log_level(SERVER_LOGGING_LEVEL, &config.server_logging_level)
        .map_err(Unmet::InvalidLogging)?;
    let pac4j_level = validate_log_level(PAC4J_LOGGING_LEVEL, &config.server_pac4j_logging_level)
        .map_err(Unmet::InvalidLogging)?;

    let ui_path = config.ui_path();

    let mut loggers = BTreeMap::new();
    loggers.insert(
        "root".to_string(),
        LoggerLevel {
            level: server_level.to_string(),
        },
    );
    loggers.insert(
        "org.pac4j".to_string(),
        LoggerLevel {
            level: pac4j_level.to_string(),
        },
    );

    let mut local_asset_paths = BTreeMap::new();
    local_asset_paths.insert(format!("{ui_path}/config.json"), UI_CONFIG_PATH.to_string());

    Ok(HttpConfig {
        ui_path: ui_path.to_string(),
        html5_router: true,
        server: ServerConfig {
            kind: "simple".into(),
            application_context_path: "/".into(),
            admin_context_path: format!("{ui_path}/admin"),
            connector: Connector {
                kind: CONNECTOR_TYPE_HTTP.into(),
                port: config.http_port,
            },
        },
        logging: LoggingConfig {
            level: server_level.to_string(),
            loggers,
            appenders: vec![Appender {
                kind: "console".into(),
            }],
        },
        pac4j: Pac4jConfig {
            callback_prefix: format!("{ui_path}/log.in"),
            bypass_paths: vec![format!("{ui_path}/admin/healthcheck")],
            mongo_uri: database.uri_without_database(),
            mongo_db: database.database.clone(),
            clients: vec![Pac4jClient {
                gitlab: GitlabClient {
                    name: "gitlab".into(),
                    client_id: identity.client_id,
                    secret: identity.client_secret,
                    discovery_uri: identity.openid_discovery_url,
                    scope: GITLAB_REQUIRED_SCOPES.join(" "),
                },
            }],
            mongo_session: MongoSession {
                enabled: true,
                collection: MONGO_SESSION_COLLECTION.into(),
            },
        },
        router_exempt_paths: ROUTER_EXEMPT_PATHS.iter().map(|p| (*p).to_string()).collect(),
        local_asset_paths,
    })
}

pub fn build_ui_config(cache: &RelationCache) -> Result<UiConfig, Unmet> {
    let sdlc_url = cache.sdlc_url.as_ref().ok_or(Unmet::MissingSdlc)?;
    let engine_url = cache.engine_url.as_ref().ok_or(Unmet::MissingEngine)?;

    Ok(UiConfig {
        app_name: UI_APP_NAME.into(),
        env: UI_ENV.into(),
        sdlc: ServiceUrl {
            url: sdlc_url.clone(),
        },
        metadata: ServiceUrl {
            url: METADATA_URL.into(),
        },
        engine: ServiceUrl {
            url: engine_url.clone(),
        },
        documentation: ServiceUrl {
            url: DOCUMENTATION_URL.into(),
        },
        options: UiOptions {
            core: CoreOptions {
                disable_service_registration: true,
            },
        },
    })
}

/// Both documents, ready to be pushed into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPair {
    pub http: HttpConfig,
    pub ui: UiConfig,
}

impl RenderedPair {
    pub fn http_json(&self) -> Result<Vec<u8>, OperatorError> {
        Ok(serde_json::to_vec(&self.http)?)
    }

    pub fn ui_json(&self) -> Result<Vec<u8>, OperatorError> {
        Ok(serde_json::to_vec(&self.ui)?)
    }

    /// Lowercase hex SHA-256 over both serialized documents.
    pub fn digest(&self) -> Result<String, OperatorError> {
        let mut hasher = Sha256::new();
        hasher.update(self.http_json()?);
        hasher.update([0u8]);
        hasher.update(self.ui_json()?);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Build both documents. Each is assembled independently; when both are
/// blocked the server document's reason wins.
pub fn render(config: &OperatorConfig, cache: &RelationCache) -> Result<RenderedPair, Unmet> {
    let http = build_http_config(config, cache);
    let ui = build_ui_config(cache);
    match (http, ui) {
        (Ok(http), Ok(ui)) => Ok(RenderedPair { http, ui }),
        (Err(unmet), _) | (Ok(_), Err(unmet)) => Err(unmet),
    }
}
