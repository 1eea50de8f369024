//! Request token derivation.
//!
//! # Design
//! BT Panel authenticates each call with two form fields: `request_time`
//! (Unix seconds) and `request_token`, an MD5 digest over the time and the
//! API key. Panels accept one of two formulas, modelled as `TokenMode` and
//! resolved once per call. `derive_token` is a pure function so it can be
//! checked against fixed vectors; only `AuthParams::now` reads the clock.

use std::fmt;
use std::str::FromStr;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const REQUEST_TIME: &str = "request_time";
pub const REQUEST_TOKEN: &str = "request_token";

/// Formula used to turn `(request_time, api_key)` into `request_token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TokenMode {
    /// `md5(request_time || api_key)`
    #[serde(rename = "time+key")]
    TimeKey,
    /// `md5(request_time || md5_hex(api_key))`
    #[default]
    #[serde(rename = "time+md5key")]
    TimeMd5Key,
}

impl TokenMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenMode::TimeKey => "time+key",
            TokenMode::TimeMd5Key => "time+md5key",
        }
    }
}

impl fmt::Display for TokenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported token_mode: {0} (expected time+key or time+md5key)")]
pub struct UnknownTokenMode(pub String);

impl FromStr for TokenMode {
    type Err = UnknownTokenMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "time+key" => Ok(TokenMode::TimeKey),
            "time+md5key" => Ok(TokenMode::TimeMd5Key),
            other => Err(UnknownTokenMode(other.to_string())),
        }
    }
}

/// Lowercase hex MD5 of `input`.
pub fn md5_hex(input: &[u8]) -> String {
    hex::encode(Md5::digest(input))
}

/// Compute `request_token` for the given time string, key and mode.
pub fn derive_token(request_time: &str, api_key: &str, mode: TokenMode) -> String {
    let seed = match mode {
        TokenMode::TimeKey => format!("{request_time}{api_key}"),
        TokenMode::TimeMd5Key => format!("{request_time}{}", md5_hex(api_key.as_bytes())),
    };
    md5_hex(seed.as_bytes())
}

/// The two authentication fields attached to every request.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthParams {
    pub request_time: String,
    pub request_token: String,
}

impl AuthParams {
    pub fn at(unix_seconds: i64, api_key: &str, mode: TokenMode) -> Self {
        let request_time = unix_seconds.to_string();
        let request_token = derive_token(&request_time, api_key, mode);
        Self {
            request_time,
            request_token,
        }
    }

    pub fn now(api_key: &str, mode: TokenMode) -> Self {
        Self::at(chrono::Utc::now().timestamp(), api_key, mode)
    }
}

impl fmt::Debug for AuthParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthParams")
            .field("request_time", &self.request_time)
            .field("request_token", &"***")
            .finish()
    }
}
