//! `legend-studio-gitlab` relation: OAuth client credentials from the
//! Legend GitLab integrator, and the redirect URIs this unit announces
//! back to it.

use serde::{Deserialize, Serialize};

use super::{read_json_key, RelationClient, RelationData, RelationName, RelationWrite};
use crate::error::OperatorError;
use crate::state::RelationCache;

pub const CONNECTION_KEY: &str = "legend-gitlab-connection";
pub const REDIRECT_URIS_KEY: &str = "legend-gitlab-redirect-uris";

/// Discovery document of gitlab.com, used when the client credentials come
/// from options rather than from the relation.
pub const GITLAB_OPENID_DISCOVERY_URL: &str = "https://gitlab.com/.well-known/openid-configuration";

pub const CALLBACK_SUFFIX: &str = "/log.in/callback";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClientCredentials {
    pub client_id: String,
    #[serde(alias = "secret")]
    pub client_secret: String,
    pub openid_discovery_url: String,
}

pub struct LegendGitlab;

impl RelationClient for LegendGitlab {
    type Value = IdentityClientCredentials;

    const RELATION: RelationName = RelationName::Gitlab;
    const WAITING_MESSAGE: &'static str = "Awaiting GitLab relation data.";

    fn parse(data: &RelationData) -> Result<Option<IdentityClientCredentials>, OperatorError> {
        let Some(creds) =
            read_json_key::<IdentityClientCredentials>(data, CONNECTION_KEY, Self::RELATION)?
        else {
            return Ok(None);
        };
        if creds.client_id.is_empty() || creds.client_secret.is_empty() {
            return Err(OperatorError::RelationIncomplete {
                relation: Self::RELATION.endpoint(),
                message: "client id and secret must both be non-empty".into(),
            });
        }
        Ok(Some(creds))
    }

    fn slot(cache: &mut RelationCache) -> &mut Option<IdentityClientCredentials> {
        &mut cache.gitlab
    }

    fn cached(cache: &RelationCache) -> Option<&IdentityClientCredentials> {
        cache.gitlab.as_ref()
    }
}

/// The OAuth callback under the given externally reachable base URL.
#[must_use]
pub fn redirect_uri(base_url: &str) -> String {
    format!("{}{CALLBACK_SUFFIX}", base_url.trim_end_matches('/'))
}

/// Announcement of this unit's redirect URIs, published on relation join.
pub fn redirect_uris_write(relation_id: u32, base_url: &str) -> Result<RelationWrite, OperatorError> {
    let uris = serde_json::to_string(&[redirect_uri(base_url)]).map_err(|e| {
        OperatorError::Serialize {
            what: "redirect URIs",
            message: e.to_string(),
        }
    })?;
    let mut data = RelationData::new();
    data.insert(REDIRECT_URIS_KEY.into(), uris);
    Ok(RelationWrite {
        relation: RelationName::Gitlab,
        relation_id,
        data,
    })
}
