//! Signed API client and chat command layer for BT Panel.
//!
//! # Overview
//! Turns chat commands (`bt status`, `bt sites`, `bt restart panel`,
//! `bt help`) into authenticated calls against a BT Panel instance and
//! renders the JSON replies as chat text.
//!
//! # Design
//! - `PanelClient` is stateless: it holds a `PanelConfig` and a transport.
//! - Each call is split into `build_request` (sign), a single blocking HTTP
//!   exchange, and `parse_response` (classify), so signing and
//!   classification are testable without a network.
//! - `request_token` derivation lives in `auth` as a pure function over
//!   `(request_time, api_key, TokenMode)`.
//! - Every failure is an `ApiError`; callers see `ApiResult` and never a panic.

pub mod auth;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod format;
pub mod http;
pub mod transport;
pub mod types;

pub use auth::{derive_token, AuthParams, TokenMode};
pub use client::{call, ApiResult, PanelClient};
pub use commands::{handle_command, run_command, Command, CommandError};
pub use config::{load_config, read_config, ConfigError, PanelConfig};
pub use error::{ApiError, ErrorKind};
pub use http::{HttpMethod, HttpResponse, ParamEncoding, Params, SignedRequest};
pub use transport::{Transport, UreqTransport};
pub use types::{Endpoint, PanelResponse};
