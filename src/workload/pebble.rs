//! Pebble API client over the container's unix socket.
//!
//! Speaks HTTP/1.1 with hyper's low-level connection API, one connection
//! per request. Every response uses Pebble's envelope
//! (`type`/`status-code`/`result`/`change`); `error` envelopes become
//! [`OperatorError::SupervisorApi`].

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use http::{header, Method, Request};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use super::{Layer, Supervisor};
use crate::error::OperatorError;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "status-code", default)]
    status_code: u16,
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    change: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileResult {
    path: String,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Change {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    err: Option<String>,
    #[serde(default)]
    status: String,
}

pub struct PebbleClient {
    socket: PathBuf,
}

impl PebbleClient {
    #[must_use]
    pub fn new(socket: PathBuf) -> Self {
        Self { socket }
    }

    /// Socket Pebble exposes to the operator for a named container.
    #[must_use]
    pub fn for_container(container: &str) -> Self {
        Self::new(PathBuf::from(format!(
            "/charm/containers/{container}/pebble.socket"
        )))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<(http::StatusCode, Bytes), OperatorError> {
        let connect_err = |source: Box<dyn std::error::Error + Send + Sync>| {
            OperatorError::SupervisorConnect {
                socket: self.socket.clone(),
                source,
            }
        };

        let stream = tokio::net::UnixStream::connect(&self.socket)
            .await
            .map_err(|e| connect_err(Box::new(e)))?;
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| connect_err(Box::new(e)))?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "pebble connection closed with error");
            }
        });

        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::HOST, "localhost");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder
            .body(Full::new(body))
            .map_err(|e| connect_err(Box::new(e)))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|e| connect_err(Box::new(e)))?;
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| connect_err(Box::new(e)))?
            .to_bytes();
        Ok((status, body))
    }

    async fn call(
        &self,
        op: &'static str,
        method: Method,
        path: &str,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<Envelope, OperatorError> {
        let (status, body) = self.send(method, path, content_type, body).await?;
        let envelope: Envelope =
            serde_json::from_slice(&body).map_err(|e| OperatorError::SupervisorApi {
                op,
                message: format!("unreadable response (HTTP {status}): {e}"),
            })?;

        if envelope.kind == "error" || !status.is_success() {
            let message = envelope
                .result
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("no error message")
                .to_string();
            return Err(OperatorError::SupervisorApi {
                op,
                message: format!("HTTP {}: {message}", envelope.status_code),
            });
        }
        Ok(envelope)
    }

    async fn call_json(
        &self,
        op: &'static str,
        method: Method,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<Envelope, OperatorError> {
        let body = Bytes::from(serde_json::to_vec(body)?);
        self.call(op, method, path, Some("application/json"), body)
            .await
    }

    async fn wait_change(&self, op: &'static str, id: &str) -> Result<(), OperatorError> {
        let envelope = self
            .call(op, Method::GET, &format!("/v1/changes/{id}/wait"), None, Bytes::new())
            .await?;
        let change: Change =
            serde_json::from_value(envelope.result).map_err(|e| OperatorError::SupervisorApi {
                op,
                message: format!("unreadable change {id}: {e}"),
            })?;
        match change.err {
            Some(err) if !err.is_empty() => Err(OperatorError::SupervisorApi {
                op,
                message: format!("change {id} {}: {err}", change.status),
            }),
            _ if !change.ready => Err(OperatorError::SupervisorApi {
                op,
                message: format!("change {id} did not complete ({})", change.status),
            }),
            _ => Ok(()),
        }
    }
}

/// Build a `multipart/form-data` body for `POST /v1/files`. Returns the
/// content type (with boundary) and the body.
fn files_write_body(path: &str, content: &[u8], make_dirs: bool) -> Result<(String, Vec<u8>), OperatorError> {
    // Derived from the content so it cannot occur inside it by accident.
    let boundary = format!("{:x}", Sha256::digest(content));
    let request = serde_json::to_vec(&json!({
        "action": "write",
        "files": [{ "path": path, "make-dirs": make_dirs }],
    }))?;

    let mut body = Vec::with_capacity(content.len() + request.len() + 512);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json\r\n");
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"request\"\r\n\r\n");
    body.extend_from_slice(&request);
    body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"files\"; filename=\"{path}\"\r\n\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Ok((format!("multipart/form-data; boundary={boundary}"), body))
}

#[async_trait]
impl Supervisor for PebbleClient {
    fn name(&self) -> &'static str {
        "pebble"
    }

    async fn can_connect(&self) -> bool {
        match self
            .call("system-info", Method::GET, "/v1/system-info", None, Bytes::new())
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, socket = %self.socket.display(), "pebble not reachable");
                false
            }
        }
    }

    async fn add_layer(&self, label: &str, layer: &Layer, combine: bool) -> Result<(), OperatorError> {
        let yaml = serde_yml::to_string(layer).map_err(|e| OperatorError::Serialize {
            what: "layer",
            message: e.to_string(),
        })?;
        self.call_json(
            "add-layer",
            Method::POST,
            "/v1/layers",
            &json!({
                "action": "add",
                "combine": combine,
                "label": label,
                "format": "yaml",
                "layer": yaml,
            }),
        )
        .await?;
        Ok(())
    }

    async fn push(&self, path: &str, content: &[u8], make_dirs: bool) -> Result<(), OperatorError> {
        let (content_type, body) = files_write_body(path, content, make_dirs)?;
        let envelope = self
            .call("push", Method::POST, "/v1/files", Some(&content_type), Bytes::from(body))
            .await?;

        let results: Vec<FileResult> =
            serde_json::from_value(envelope.result).map_err(|e| OperatorError::SupervisorApi {
                op: "push",
                message: format!("unreadable files result: {e}"),
            })?;
        if let Some(failed) = results.into_iter().find(|r| r.error.is_some()) {
            let message = failed.error.map(|e| e.message).unwrap_or_default();
            return Err(OperatorError::SupervisorApi {
                op: "push",
                message: format!("{}: {message}", failed.path),
            });
        }
        Ok(())
    }

    async fn restart(&self, services: &[&str]) -> Result<(), OperatorError> {
        let envelope = self
            .call_json(
                "restart",
                Method::POST,
                "/v1/services",
                &json!({ "action": "restart", "services": services }),
            )
            .await?;
        match envelope.change {
            Some(ref id) => self.wait_change("restart", id).await,
            None => Ok(()),
        }
    }
}
