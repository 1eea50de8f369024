//! Request signer and dispatcher for the BT Panel API.
//!
//! # Design
//! `PanelClient` holds only its `PanelConfig` and a `Transport`; it keeps no
//! state between calls. Each call is split into `build_request` (validate
//! config, sign, merge params), the transport round trip, and
//! `parse_response` (classify status, decode JSON). Every failure on the way
//! comes back as an `ApiError` with secrets scrubbed; nothing panics.

use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{md5_hex, AuthParams, REQUEST_TIME, REQUEST_TOKEN};
use crate::config::{describe, PanelConfig};
use crate::error::{truncate_body, ApiError};
use crate::http::{HttpResponse, Params, SignedRequest};
use crate::transport::{Transport, UreqTransport};
use crate::types::{Endpoint, PanelResponse};

/// Outcome of one panel call.
pub type ApiResult = Result<PanelResponse, ApiError>;

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Number of sites requested by `list_sites`.
pub const SITE_PAGE_SIZE: u32 = 15;

/// Stateless client for one BT Panel instance.
#[derive(Debug, Clone)]
pub struct PanelClient<T = UreqTransport> {
    config: PanelConfig,
    transport: T,
}

impl PanelClient<UreqTransport> {
    pub fn new(config: PanelConfig) -> Self {
        Self::with_transport(config, UreqTransport)
    }
}

impl<T: Transport> PanelClient<T> {
    pub fn with_transport(config: PanelConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Sign `endpoint` with the current time.
    pub fn build_request(&self, endpoint: &Endpoint) -> Result<SignedRequest, ApiError> {
        self.build_request_at(endpoint, chrono::Utc::now().timestamp())
    }

    /// Sign `endpoint` as if issued at `unix_seconds`.
    ///
    /// Auth fields are inserted last, so they replace any caller-supplied
    /// `request_time` or `request_token`.
    pub fn build_request_at(&self, endpoint: &Endpoint, unix_seconds: i64) -> Result<SignedRequest, ApiError> {
        self.config
            .validate()
            .map_err(|errors| ApiError::Configuration(describe(&errors)))?;

        let auth = AuthParams::at(unix_seconds, &self.config.api_key, self.config.token_mode);
        let mut params = endpoint.params.clone();
        params.insert(REQUEST_TIME.to_string(), auth.request_time);
        params.insert(REQUEST_TOKEN.to_string(), auth.request_token);

        Ok(SignedRequest {
            method: endpoint.method,
            url: format!("{}{}", self.config.normalized_base_url(), endpoint.path),
            params,
            encoding: endpoint.encoding,
        })
    }

    /// Turn a raw response into a decoded object or a classified failure.
    pub fn parse_response(&self, response: HttpResponse) -> ApiResult {
        if response.status != 200 {
            return Err(ApiError::HttpStatus {
                status: response.status,
                body: truncate_body(response.text().trim(), MAX_ERROR_BODY_CHARS),
            });
        }
        let value: Value = serde_json::from_slice(&response.body).map_err(|e| {
            ApiError::Decode(format!(
                "{e} (body: {})",
                truncate_body(response.text().trim(), MAX_ERROR_BODY_CHARS)
            ))
        })?;
        match value {
            Value::Object(map) => Ok(PanelResponse::new(map)),
            other => Err(ApiError::Decode(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Sign, send and decode one request.
    pub fn call(&self, endpoint: &Endpoint) -> ApiResult {
        let api_key_hash = md5_hex(self.config.api_key.as_bytes());
        let mut token = String::new();

        let result = self.build_request(endpoint).and_then(|request| {
            token = request.param(REQUEST_TOKEN).unwrap_or_default().to_string();
            debug!(
                method = request.method.as_str(),
                url = %request.url,
                encoding = ?request.encoding,
                "dispatching panel request"
            );
            let response = self.transport.execute(&request, &self.config)?;
            self.parse_response(response)
        });

        result.map_err(|err| {
            let err = err.scrub(&[&self.config.api_key, &api_key_hash, &token]);
            warn!(kind = %err.kind(), path = %endpoint.path, error = %err, "panel request failed");
            err
        })
    }

    pub fn system_status(&self) -> ApiResult {
        self.call(&Endpoint::system_total())
    }

    pub fn network(&self) -> ApiResult {
        self.call(&Endpoint::network())
    }

    pub fn list_sites(&self) -> ApiResult {
        self.call(&Endpoint::site_list(SITE_PAGE_SIZE, 1))
    }

    pub fn restart_panel(&self) -> ApiResult {
        self.call(&Endpoint::reboot_panel())
    }
}

/// One-shot call: form-encoded POST of `params` to `endpoint`.
pub fn call(endpoint: &str, params: &Params, config: &PanelConfig) -> ApiResult {
    PanelClient::new(config.clone()).call(&Endpoint::post(endpoint).with_params(params.clone()))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
