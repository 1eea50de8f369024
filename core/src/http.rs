//! HTTP request and response values.
//!
//! # Design
//! A `SignedRequest` is plain data: method, URL, the merged parameter map
//! (caller params plus `request_time`/`request_token`) and where those
//! parameters travel. The transport turns it into bytes on the wire, and
//! tests can inspect it without any network. `HttpResponse` is the
//! transport's answer handed back to the client for classification.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use url::form_urlencoded;

use crate::auth::REQUEST_TOKEN;

/// Request parameters. Ordered so encoded bodies are deterministic.
pub type Params = BTreeMap<String, String>;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Where the signed parameters are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamEncoding {
    /// `application/x-www-form-urlencoded` request body.
    #[default]
    Form,
    /// Appended to the URL query string.
    Query,
}

/// A fully signed request, ready for one HTTP exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub method: HttpMethod,
    /// `base_url + endpoint`, before any query-encoded params are added.
    pub url: String,
    pub params: Params,
    pub encoding: ParamEncoding,
}

impl SignedRequest {
    /// `key=value&...` encoding of `params`.
    pub fn encoded_params(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish()
    }

    /// The URL to hit, including params when they travel in the query.
    pub fn target_url(&self) -> String {
        match self.encoding {
            ParamEncoding::Form => self.url.clone(),
            ParamEncoding::Query if self.params.is_empty() => self.url.clone(),
            ParamEncoding::Query => {
                let sep = if self.url.contains('?') { '&' } else { '?' };
                format!("{}{sep}{}", self.url, self.encoded_params())
            }
        }
    }

    /// Form body, if the params travel in the body.
    pub fn body(&self) -> Option<String> {
        match self.encoding {
            ParamEncoding::Form => Some(self.encoded_params()),
            ParamEncoding::Query => None,
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

impl fmt::Debug for SignedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: BTreeMap<&str, &str> = self
            .params
            .iter()
            .map(|(k, v)| {
                let shown = if k == REQUEST_TOKEN { "***" } else { v.as_str() };
                (k.as_str(), shown)
            })
            .collect();
        f.debug_struct("SignedRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("params", &params)
            .field("encoding", &self.encoding)
            .finish()
    }
}

/// Status and body of a completed exchange. The body is kept as raw bytes
/// so decoding, not the transport, decides what counts as valid.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body as text for messages, with invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
