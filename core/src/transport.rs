//! Blocking HTTP execution of a `SignedRequest`.
//!
//! # Design
//! The client builds and parses; a `Transport` performs the single round
//! trip in between. `UreqTransport` creates a fresh agent per call so the
//! timeout and TLS settings always come from the config passed in, and no
//! pooled connection outlives the call. Non-2xx statuses are returned as
//! data, not errors, so the client owns status interpretation.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use tracing::debug;
use ureq::tls::TlsConfig;

use crate::config::PanelConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpResponse, SignedRequest, FORM_CONTENT_TYPE};

/// Executes one signed request and returns the raw response.
pub trait Transport {
    fn execute(&self, request: &SignedRequest, config: &PanelConfig) -> Result<HttpResponse, ApiError>;
}

/// Default transport backed by `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

impl UreqTransport {
    fn agent(config: &PanelConfig) -> ureq::Agent {
        ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .http_status_as_error(false)
            .tls_config(
                TlsConfig::builder()
                    .disable_verification(!config.verify_tls)
                    .build(),
            )
            .build()
            .new_agent()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &SignedRequest, config: &PanelConfig) -> Result<HttpResponse, ApiError> {
        let agent = Self::agent(config);
        let url = request.target_url();

        let result = match (request.method, request.body()) {
            (HttpMethod::Get, _) => agent.get(&url).call(),
            (HttpMethod::Post, Some(body)) => agent
                .post(&url)
                .content_type(FORM_CONTENT_TYPE)
                .send(body.as_bytes()),
            (HttpMethod::Post, None) => agent.post(&url).send_empty(),
        };
        let mut response = result.map_err(|e| classify(e, config.timeout_seconds))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let bytes = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| classify(e, config.timeout_seconds))?;
        debug!(status, bytes = bytes.len(), "panel response received");

        Ok(HttpResponse {
            status,
            headers,
            body: bytes,
        })
    }
}

/// Sort a `ureq` failure into the client's error kinds.
pub(crate) fn classify(err: ureq::Error, timeout_seconds: u64) -> ApiError {
    match err {
        ureq::Error::Timeout(_) => ApiError::Timeout {
            seconds: timeout_seconds,
        },
        ureq::Error::Io(ref e)
            if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) =>
        {
            ApiError::Timeout {
                seconds: timeout_seconds,
            }
        }
        ureq::Error::Tls(msg) => ApiError::Tls(msg.to_string()),
        other => {
            let message = error_chain(&other);
            if looks_like_tls(&message) {
                ApiError::Tls(message)
            } else {
                ApiError::Network(message)
            }
        }
    }
}

/// `Display` of an error followed by each of its sources.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

// rustls surfaces handshake failures through io errors, so the text is all we have.
fn looks_like_tls(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    ["certificate", "tls", "handshake", "unknownissuer", "rustls"]
        .iter()
        .any(|needle| lower.contains(needle))
}
