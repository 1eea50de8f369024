//! A fake BT Panel for integration tests and local experiments.
//!
//! Serves the handful of panel actions the plugin uses, checks
//! `request_time`/`request_token` against its own key, and records every
//! request it sees. The `/fault/*` routes misbehave on purpose.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::any,
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use md5::{Digest, Md5};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};

pub const AUTH_FAILED_MSG: &str = "密钥校验失败";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenMode {
    TimeKey,
    #[default]
    TimeMd5Key,
}

/// How the fake panel authenticates and what it answers.
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub api_key: String,
    pub token_mode: TokenMode,
    canned: HashMap<String, Value>,
}

impl MockConfig {
    pub fn new(api_key: &str, token_mode: TokenMode) -> Self {
        Self {
            api_key: api_key.to_string(),
            token_mode,
            canned: HashMap::new(),
        }
    }

    /// Answer `action` with `body` instead of the built-in reply.
    pub fn respond(mut self, action: &str, body: Value) -> Self {
        self.canned.insert(action.to_string(), body);
        self
    }
}

/// One request as the fake panel received it.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedRequest {
    pub method: String,
    pub module: String,
    pub query: HashMap<String, String>,
    pub form: HashMap<String, String>,
    pub content_type: Option<String>,
    pub authenticated: bool,
}

impl RecordedRequest {
    /// Look a field up in the form body first, then the query string.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.form
            .get(name)
            .or_else(|| self.query.get(name))
            .map(String::as_str)
    }
}

pub type RequestLog = Arc<RwLock<Vec<RecordedRequest>>>;

pub fn new_log() -> RequestLog {
    Arc::new(RwLock::new(Vec::new()))
}

#[derive(Clone)]
struct AppState {
    config: Arc<MockConfig>,
    log: RequestLog,
}

pub fn app(config: MockConfig, log: RequestLog) -> Router {
    let state = AppState {
        config: Arc::new(config),
        log,
    };
    Router::new()
        .route("/fault/status/{code}", any(fault_status))
        .route("/fault/slow/{millis}", any(fault_slow))
        .route("/fault/text", any(fault_text))
        .route("/fault/array", any(fault_array))
        .route("/fault/binary", any(fault_binary))
        .route("/{module}", any(panel_action))
        .with_state(state)
}

pub async fn run(listener: TcpListener, config: MockConfig, log: RequestLog) -> Result<(), std::io::Error> {
    axum::serve(listener, app(config, log)).await
}

/// Self-signed certificate for `localhost` / `127.0.0.1`.
pub const TLS_CERT_PEM: &[u8] = include_bytes!("../certs/cert.pem");
pub const TLS_KEY_PEM: &[u8] = include_bytes!("../certs/key.pem");

/// Same panel over HTTPS, presenting the bundled self-signed certificate.
pub async fn run_tls(
    listener: std::net::TcpListener,
    config: MockConfig,
    log: RequestLog,
) -> Result<(), std::io::Error> {
    // Err only means a provider is already installed for this process.
    let _ = rustls::crypto::ring::default_provider().install_default();
    let tls = RustlsConfig::from_pem(TLS_CERT_PEM.to_vec(), TLS_KEY_PEM.to_vec()).await?;
    listener.set_nonblocking(true)?;
    info!(addr = ?listener.local_addr().ok(), "mock panel serving TLS");
    axum_server::from_tcp_rustls(listener, tls)
        .serve(app(config, log).into_make_service())
        .await
}

pub fn md5_hex(input: &[u8]) -> String {
    hex::encode(Md5::digest(input))
}

/// The token the panel expects for `request_time` under `config`.
pub fn expected_token(config: &MockConfig, request_time: &str) -> String {
    let seed = match config.token_mode {
        TokenMode::TimeKey => format!("{request_time}{}", config.api_key),
        TokenMode::TimeMd5Key => format!("{request_time}{}", md5_hex(config.api_key.as_bytes())),
    };
    md5_hex(seed.as_bytes())
}

fn is_authenticated(config: &MockConfig, fields: &HashMap<String, String>) -> bool {
    match (fields.get("request_time"), fields.get("request_token")) {
        (Some(time), Some(token)) => {
            time.parse::<i64>().is_ok() && *token == expected_token(config, time)
        }
        _ => false,
    }
}

async fn panel_action(
    State(state): State<AppState>,
    Path(module): Path<String>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Json<Value> {
    let form: HashMap<String, String> = url::form_urlencoded::parse(&body).into_owned().collect();
    let mut fields = query.clone();
    fields.extend(form.clone());

    let authenticated = is_authenticated(&state.config, &fields);
    let action = fields.get("action").cloned().unwrap_or_default();
    info!(%method, %module, %action, authenticated, "panel request");

    state.log.write().await.push(RecordedRequest {
        method: method.to_string(),
        module: module.clone(),
        query,
        form,
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        authenticated,
    });

    if !authenticated {
        warn!(%module, %action, "rejecting request with bad token");
        return Json(json!({"status": false, "msg": AUTH_FAILED_MSG}));
    }
    if let Some(body) = state.config.canned.get(&action) {
        return Json(body.clone());
    }
    Json(builtin_reply(&module, &action, &fields))
}

fn builtin_reply(module: &str, action: &str, fields: &HashMap<String, String>) -> Value {
    match (module, action) {
        ("system", "GetSystemTotal") => json!({
            "system": "Ubuntu 22.04.4 LTS x86_64(Py3.7.9)",
            "version": "8.0.6",
            "time": "12天",
            "cpu": "4核 12.5%",
            "mem": "2134/7821 MB",
            "disk": "63%",
            "isport": true,
        }),
        ("system", "GetNetWork") => json!({
            "status": true,
            "up": 12.41,
            "down": 3.07,
            "upTotal": 1_073_741_824u64,
            "downTotal": 536_870_912u64,
            "network": "eth0",
        }),
        ("system", "RebootPanel") => json!({"status": true, "msg": "面板已重启"}),
        ("data", "getData") if fields.get("table").map(String::as_str) == Some("sites") => {
            let limit = fields
                .get("limit")
                .and_then(|l| l.parse::<usize>().ok())
                .unwrap_or(15);
            let sites: Vec<Value> = sample_sites().into_iter().take(limit).collect();
            json!({"data": sites, "page": "<div>1/1</div>", "where": ""})
        }
        _ => json!({"status": false, "msg": "指定参数无效!"}),
    }
}

fn sample_sites() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "example.com", "status": "1", "domain": 2, "ps": "main"}),
        json!({"id": 2, "name": "blog.example.com", "status": "1", "domain": 1, "ps": ""}),
        json!({"id": 3, "name": "old.example.com", "status": "0", "domain": 1, "ps": "archived"}),
    ]
}

async fn fault_status(Path(code): Path<u16>) -> impl IntoResponse {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, "simulated failure")
}

async fn fault_slow(Path(millis): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Json(json!({"status": true}))
}

async fn fault_text() -> &'static str {
    "not json"
}

async fn fault_array() -> Json<Value> {
    Json(json!([1, 2, 3]))
}

/// JSON-shaped body whose string holds bytes that are not UTF-8.
async fn fault_binary() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        Bytes::from_static(b"{\"msg\":\"\xff\xfe\"}"),
    )
}
