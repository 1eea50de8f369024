//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Results cross the boundary as one `FfiApiResult` envelope: an error code
//! mirroring `bt_core::ErrorKind` (with timeouts split out), a message, the
//! HTTP status when there is one, and the decoded JSON object re-serialized
//! as text on success. All strings are heap C strings owned by the caller.

use std::ffi::CString;
use std::os::raw::c_char;

use bt_core::{ApiError, PanelResponse};

/// Opaque handle to a `PanelClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiPanelClient {
    pub(crate) inner: bt_core::PanelClient,
}

/// Error codes returned in `FfiApiResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Configuration = 1,
    Network = 2,
    Timeout = 3,
    Tls = 4,
    HttpStatus = 5,
    Decode = 6,
    InvalidArgument = 7,
    NullArg = 8,
    Panic = 9,
}

/// Result envelope for `bt_call`.
///
/// On success `error_code` is `Ok`, `error_message` is null and `body` holds
/// the JSON object text. On failure `body` is null and `error_message`
/// describes the problem.
#[repr(C)]
pub struct FfiApiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub body: *mut c_char,
}

/// Copy `s` into a C string, dropping interior NULs rather than failing.
pub(crate) fn to_c_string(s: &str) -> *mut c_char {
    CString::new(s.replace('\0', ""))
        .unwrap_or_default()
        .into_raw()
}

impl FfiApiResult {
    fn boxed(error_code: FfiErrorCode, message: Option<&str>, http_status: u16, body: Option<&str>) -> *mut Self {
        Box::into_raw(Box::new(FfiApiResult {
            error_code,
            error_message: message.map(to_c_string).unwrap_or(std::ptr::null_mut()),
            http_status,
            body: body.map(to_c_string).unwrap_or(std::ptr::null_mut()),
        }))
    }

    pub(crate) fn ok(response: PanelResponse) -> *mut Self {
        let body = response.into_value().to_string();
        Self::boxed(FfiErrorCode::Ok, None, 200, Some(&body))
    }

    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let code = match &err {
            ApiError::Configuration(_) => FfiErrorCode::Configuration,
            ApiError::Timeout { .. } => FfiErrorCode::Timeout,
            ApiError::Network(_) => FfiErrorCode::Network,
            ApiError::Tls(_) => FfiErrorCode::Tls,
            ApiError::HttpStatus { .. } => FfiErrorCode::HttpStatus,
            ApiError::Decode(_) => FfiErrorCode::Decode,
        };
        Self::boxed(code, Some(&err.to_string()), err.status().unwrap_or(0), None)
    }

    pub(crate) fn invalid_argument(msg: &str) -> *mut Self {
        Self::boxed(FfiErrorCode::InvalidArgument, Some(msg), 0, None)
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::boxed(FfiErrorCode::NullArg, Some(&format!("null argument: {name}")), 0, None)
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::boxed(FfiErrorCode::Panic, Some(msg), 0, None)
    }
}
