//! Error types for the BT Panel client.
//!
//! # Design
//! Every failure a call can produce is one variant of `ApiError`, and every
//! variant maps onto exactly one `ErrorKind`. Timeouts keep their own variant
//! so callers can tell them apart, but they report `ErrorKind::Network`.
//! Messages are scrubbed of the API key and request token before they are
//! stored, so `Display` output is always safe to show in a chat.

use std::fmt;

use thiserror::Error;

/// Closed set of failure categories a caller can match on exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Network,
    Tls,
    HttpStatus,
    Decode,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Network => "NetworkError",
            ErrorKind::Tls => "TlsError",
            ErrorKind::HttpStatus => "HttpStatusError",
            ErrorKind::Decode => "DecodeError",
        };
        f.write_str(name)
    }
}

/// Errors returned by `PanelClient::call` and friends.
#[derive(Debug, Error)]
pub enum ApiError {
    /// `base_url` or `api_key` is missing, or another setting is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request did not finish within `timeout_seconds`.
    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Connection refused, DNS failure, reset, or any other transport fault.
    #[error("network error: {0}")]
    Network(String),

    /// Certificate verification or handshake failure.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The panel answered with something other than 200.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The body was not a JSON object.
    #[error("invalid JSON response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Configuration(_) => ErrorKind::Configuration,
            ApiError::Timeout { .. } | ApiError::Network(_) => ErrorKind::Network,
            ApiError::Tls(_) => ErrorKind::Tls,
            ApiError::HttpStatus { .. } => ErrorKind::HttpStatus,
            ApiError::Decode(_) => ErrorKind::Decode,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout { .. })
    }

    /// Status code for `HttpStatus` failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Strip secrets from every message this error carries.
    pub(crate) fn scrub(self, secrets: &[&str]) -> Self {
        match self {
            ApiError::Configuration(m) => ApiError::Configuration(redact(&m, secrets)),
            ApiError::Timeout { seconds } => ApiError::Timeout { seconds },
            ApiError::Network(m) => ApiError::Network(redact(&m, secrets)),
            ApiError::Tls(m) => ApiError::Tls(redact(&m, secrets)),
            ApiError::HttpStatus { status, body } => ApiError::HttpStatus {
                status,
                body: redact(&body, secrets),
            },
            ApiError::Decode(m) => ApiError::Decode(redact(&m, secrets)),
        }
    }
}

const REDACTED: &str = "***";

/// Secrets at least this long are masked wherever they occur. Shorter ones
/// are masked only where they stand alone, so a one-letter key leaves the
/// words around it intact.
const MIN_EMBEDDED_SECRET_LEN: usize = 8;

/// Replace each non-empty secret in `message`.
pub(crate) fn redact(message: &str, secrets: &[&str]) -> String {
    secrets
        .iter()
        .filter(|s| !s.is_empty())
        .fold(message.to_string(), |acc, secret| {
            if secret.len() >= MIN_EMBEDDED_SECRET_LEN {
                acc.replace(secret, REDACTED)
            } else {
                replace_standalone(&acc, secret)
            }
        })
}

/// Replace `secret` only where neither neighbour is a word character.
fn replace_standalone(message: &str, secret: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut out = String::with_capacity(message.len());
    let mut last = 0;
    for (start, _) in message.match_indices(secret) {
        let end = start + secret.len();
        let before = message[..start].chars().next_back();
        let after = message[end..].chars().next();
        if before.is_some_and(is_word) || after.is_some_and(is_word) {
            continue;
        }
        out.push_str(&message[last..start]);
        out.push_str(REDACTED);
        last = end;
    }
    out.push_str(&message[last..]);
    out
}

/// Cap a response body so a huge HTML error page does not end up in a chat.
pub(crate) fn truncate_body(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_reports_network_kind() {
        let err = ApiError::Timeout { seconds: 5 };
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "request timed out after 5s");
    }

    #[test]
    fn http_status_carries_code() {
        let err = ApiError::HttpStatus {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::HttpStatus);
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_timeout());
    }

    #[test]
    fn kind_display_uses_category_names() {
        assert_eq!(ErrorKind::Configuration.to_string(), "ConfigurationError");
        assert_eq!(ErrorKind::Decode.to_string(), "DecodeError");
    }

    #[test]
    fn redact_replaces_all_secrets() {
        let msg = "key=abc123 token=deadbeef again abc123";
        let out = redact(msg, &["abc123", "deadbeef"]);
        assert_eq!(out, "key=*** token=*** again ***");
    }

    #[test]
    fn short_secret_is_masked_only_when_standalone() {
        assert_eq!(redact("bad token", &["k"]), "bad token");
        assert_eq!(redact("key=k&k k", &["k"]), "key=***&*** ***");
        assert_eq!(redact("keyabc abc", &["abc"]), "keyabc ***");
    }

    #[test]
    fn long_secret_is_masked_inside_words() {
        assert_eq!(redact("xdeadbeefx", &["deadbeef"]), "x***x");
    }

    #[test]
    fn redact_ignores_empty_secret() {
        assert_eq!(redact("hello", &[""]), "hello");
    }

    #[test]
    fn scrub_covers_message_variants() {
        let err = ApiError::Network("GET https://h/?request_token=d41d8cd9 failed".to_string());
        assert_eq!(
            err.scrub(&["d41d8cd9"]).to_string(),
            "network error: GET https://h/?request_token=*** failed"
        );
        let err = ApiError::HttpStatus {
            status: 403,
            body: "bad key sekrit".to_string(),
        };
        assert_eq!(err.scrub(&["sekrit"]).to_string(), "HTTP 403: bad key ***");
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        assert_eq!(truncate_body("短文本", 10), "短文本");
        assert_eq!(truncate_body("系统状态正常", 2), "系统...");
    }
}
