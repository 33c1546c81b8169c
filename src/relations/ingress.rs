//! `ingress` relation: the request this unit sends to the ingress
//! controller so the Studio UI is reachable from outside the cluster.

use super::{RelationData, RelationName, RelationWrite};
use crate::config::model::OperatorConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRequest {
    pub service_hostname: String,
    pub service_name: String,
    pub service_port: u16,
}

impl IngressRequest {
    /// Hostname defaults to the application name when `external-hostname`
    /// is not set.
    #[must_use]
    pub fn from_config(config: &OperatorConfig, app_name: &str) -> Self {
        Self {
            service_hostname: config
                .external_hostname
                .clone()
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| app_name.to_string()),
            service_name: app_name.to_string(),
            service_port: config.http_port,
        }
    }

    #[must_use]
    pub fn to_write(&self, relation_id: u32) -> RelationWrite {
        let mut data = RelationData::new();
        data.insert("service-hostname".into(), self.service_hostname.clone());
        data.insert("service-name".into(), self.service_name.clone());
        data.insert("service-port".into(), self.service_port.to_string());
        RelationWrite {
            relation: RelationName::Ingress,
            relation_id,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostname_falls_back_to_app_name() {
        let request = IngressRequest::from_config(&OperatorConfig::default(), "legend-studio");
        assert_eq!(request.service_hostname, "legend-studio");
        assert_eq!(request.service_port, 8080);
    }

    #[test]
    fn write_uses_ingress_keys() {
        let config = OperatorConfig {
            external_hostname: Some("studio.example.com".into()),
            http_port: 9000,
            ..OperatorConfig::default()
        };
        let write = IngressRequest::from_config(&config, "legend-studio").to_write(3);
        assert_eq!(write.relation, RelationName::Ingress);
        assert_eq!(write.data["service-hostname"], "studio.example.com");
        assert_eq!(write.data["service-name"], "legend-studio");
        assert_eq!(write.data["service-port"], "9000");
    }
}
