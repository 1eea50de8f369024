//! Panel endpoints and the decoded response wrapper.
//!
//! # Design
//! BT Panel response schemas differ per action and are owned by the panel,
//! so a success is kept as the raw JSON object. `PanelResponse` only adds
//! the two lookups every caller needs: a display message and the panel's
//! own success flag (which is independent of the HTTP status).

use serde_json::{Map, Value};

use crate::http::{HttpMethod, ParamEncoding, Params};

/// Decoded JSON object returned by a successful call.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelResponse {
    pub raw: Map<String, Value>,
}

impl PanelResponse {
    pub fn new(raw: Map<String, Value>) -> Self {
        Self { raw }
    }

    /// First of `msg`, `message`, `error`, or `"OK"`.
    pub fn message(&self) -> String {
        ["msg", "message", "error"]
            .iter()
            .find_map(|key| self.raw.get(*key))
            .map(display_value)
            .unwrap_or_else(|| "OK".to_string())
    }

    /// The panel's `status` flag, falling back to `success`, else true.
    pub fn is_success(&self) -> bool {
        self.raw
            .get("status")
            .or_else(|| self.raw.get("success"))
            .map(is_truthy)
            .unwrap_or(true)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.raw)
    }
}

/// Render a JSON value for chat: strings without quotes, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Loose truthiness for panel flags: the panel mixes `true`, `1` and `"1"`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => {
            let s = s.trim();
            !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
        }
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// One panel API action: where it lives, how it is sent, and its fixed params.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: String,
    pub method: HttpMethod,
    pub encoding: ParamEncoding,
    pub params: Params,
}

impl Endpoint {
    /// Form-encoded POST to `path`, the convention most panel actions use.
    pub fn post(path: &str) -> Self {
        Self {
            path: path.to_string(),
            method: HttpMethod::Post,
            encoding: ParamEncoding::Form,
            params: Params::new(),
        }
    }

    /// GET with all params in the query string.
    pub fn get(path: &str) -> Self {
        Self {
            path: path.to_string(),
            method: HttpMethod::Get,
            encoding: ParamEncoding::Query,
            params: Params::new(),
        }
    }

    pub fn with_encoding(mut self, encoding: ParamEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params.extend(params);
        self
    }

    pub fn system_total() -> Self {
        Self::post("/system?action=GetSystemTotal")
    }

    pub fn network() -> Self {
        Self::post("/system?action=GetNetWork")
    }

    pub fn site_list(limit: u32, page: u32) -> Self {
        Self::post("/data?action=getData")
            .with_param("table", "sites")
            .with_param("limit", limit)
            .with_param("p", page)
    }

    pub fn reboot_panel() -> Self {
        Self::post("/system?action=RebootPanel")
    }
}
