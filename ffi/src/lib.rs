//! C-ABI wrapper around `bt-core`.
//!
//! # Overview
//! Lets a chat-bot host written in another language (AstrBot runs on
//! Python) load the plugin as a shared library: create a client from the
//! host's JSON config, hand it chat text, and get reply text back. `bt_call`
//! exposes the raw signed dispatcher for hosts that render replies themselves.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Null or non-UTF-8 arguments yield null (or a `NullArg` /
//!   `InvalidArgument` result), never undefined behaviour on our side.
//! - The caller owns all returned pointers and must release them with the
//!   matching `bt_free_*` / `bt_client_free` function.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::catch_unwind;

use bt_core::types::display_value;
use bt_core::{Endpoint, Params, TokenMode};
use serde_json::{Map, Value};

use types::*;

/// Borrow a C string as `&str`; `None` when null or not UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn borrow_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client from a JSON config object with `base_url`, `api_key`
/// and optional `timeout_seconds`, `verify_tls`, `token_mode`.
///
/// Returns null if `config_json` is null, malformed, or fails validation.
/// When `error_out` is non-null it receives the reason on failure and null
/// on success; free a non-null reason with `bt_free_string`.
/// The caller must free the returned pointer with `bt_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn bt_client_new(config_json: *const c_char, error_out: *mut *mut c_char) -> *mut FfiPanelClient {
    let outcome = catch_unwind(|| {
        if config_json.is_null() {
            return Err("missing plugin configuration".to_string());
        }
        let Some(raw) = (unsafe { borrow_str(config_json) }) else {
            return Err("config_json is not valid UTF-8".to_string());
        };
        bt_core::config::from_json_str(raw)
            .map(|config| {
                Box::into_raw(Box::new(FfiPanelClient {
                    inner: bt_core::PanelClient::new(config),
                }))
            })
            .map_err(|e| e.to_string())
    })
    .unwrap_or_else(|_| Err("panic in bt_client_new".to_string()));

    let (client, reason) = match outcome {
        Ok(client) => (client, std::ptr::null_mut()),
        Err(msg) => (std::ptr::null_mut(), to_c_string(&msg)),
    };
    if error_out.is_null() {
        bt_free_string(reason);
    } else {
        unsafe { *error_out = reason };
    }
    client
}

/// Free a client created by `bt_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn bt_client_free(client: *mut FfiPanelClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Commands and calls
// ---------------------------------------------------------------------------

/// Reply to one chat message such as `bt status`.
///
/// Returns null if `client` or `text` is null. The reply is always text,
/// including for API failures. Free it with `bt_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn bt_handle_command(client: *const FfiPanelClient, text: *const c_char) -> *mut c_char {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let Some(text) = (unsafe { borrow_str(text) }) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        let reply = bt_core::handle_command(&client.inner, text);
        to_c_string(&reply)
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Convert a flat JSON object into request params. Non-string values are
/// rendered as JSON text.
fn params_from_json(raw: &str) -> Result<Params, String> {
    let map: Map<String, Value> =
        serde_json::from_str(raw).map_err(|e| format!("params must be a JSON object: {e}"))?;
    Ok(map.iter().map(|(k, v)| (k.clone(), display_value(v))).collect())
}

/// Signed form POST of `params_json` to `endpoint` (e.g.
/// `/system?action=GetNetWork`). `params_json` may be null for no params.
#[unsafe(no_mangle)]
pub extern "C" fn bt_call(
    client: *const FfiPanelClient,
    endpoint: *const c_char,
    params_json: *const c_char,
) -> *mut FfiApiResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiApiResult::null_arg("client");
        }
        let Some(endpoint) = (unsafe { borrow_str(endpoint) }) else {
            return FfiApiResult::null_arg("endpoint");
        };
        let params = if params_json.is_null() {
            Params::new()
        } else {
            let Some(raw) = (unsafe { borrow_str(params_json) }) else {
                return FfiApiResult::invalid_argument("params_json is not valid UTF-8");
            };
            match params_from_json(raw) {
                Ok(p) => p,
                Err(msg) => return FfiApiResult::invalid_argument(&msg),
            }
        };
        let client = unsafe { &*client };
        match client.inner.call(&Endpoint::post(endpoint).with_params(params)) {
            Ok(response) => FfiApiResult::ok(response),
            Err(e) => FfiApiResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiApiResult::panic("panic in bt_call"))
}

/// Compute a `request_token` so hosts can cross-check their own signing.
///
/// `token_mode` is `time+key` or `time+md5key`. Returns null on null or
/// invalid arguments. Free the result with `bt_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn bt_derive_token(
    request_time: *const c_char,
    api_key: *const c_char,
    token_mode: *const c_char,
) -> *mut c_char {
    catch_unwind(|| {
        let args = unsafe { (borrow_str(request_time), borrow_str(api_key), borrow_str(token_mode)) };
        let (Some(time), Some(key), Some(mode)) = args else {
            return std::ptr::null_mut();
        };
        match mode.parse::<TokenMode>() {
            Ok(mode) => to_c_string(&bt_core::derive_token(time, key, mode)),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiApiResult` returned by `bt_call`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn bt_free_result(result: *mut FfiApiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.body.is_null() {
            drop(unsafe { CString::from_raw(result.body) });
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn bt_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn read(ptr: *const c_char) -> String {
        unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string()
    }

    fn new_client(base_url: &str, api_key: &str) -> *mut FfiPanelClient {
        let json = serde_json::json!({"base_url": base_url, "api_key": api_key, "timeout_seconds": 2});
        let json = CString::new(json.to_string()).unwrap();
        bt_client_new(json.as_ptr(), std::ptr::null_mut())
    }

    /// Try to build a client and return the reported failure reason.
    fn client_error(config_json: Option<&str>) -> String {
        let json = config_json.map(|s| CString::new(s).unwrap());
        let ptr = json.as_ref().map_or(std::ptr::null(), |c| c.as_ptr());
        let mut reason: *mut c_char = std::ptr::null_mut();
        let client = bt_client_new(ptr, &mut reason);
        assert!(client.is_null());
        assert!(!reason.is_null());
        let text = read(reason);
        bt_free_string(reason);
        text
    }

    /// Start the mock panel on a random port and return its base URL.
    fn spawn_panel() -> String {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                let config = mock_panel::MockConfig::new("k", mock_panel::TokenMode::TimeMd5Key);
                mock_panel::run(listener, config, mock_panel::new_log()).await
            })
            .unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn client_new_and_free() {
        let json = CString::new(r#"{"base_url":"https://h:8888","api_key":"k"}"#).unwrap();
        let mut reason: *mut c_char = std::ptr::null_mut();
        let client = bt_client_new(json.as_ptr(), &mut reason);
        assert!(!client.is_null());
        assert!(reason.is_null());
        bt_client_free(client);
    }

    #[test]
    fn client_new_null_returns_null() {
        assert!(bt_client_new(std::ptr::null(), std::ptr::null_mut()).is_null());
        assert_eq!(client_error(None), "missing plugin configuration");
    }

    #[test]
    fn client_new_rejects_empty_key() {
        assert!(new_client("https://h:8888", "").is_null());
        let reason = client_error(Some(r#"{"base_url":"https://h:8888","api_key":""}"#));
        assert_eq!(reason, "invalid config: api_key must not be empty");
    }

    #[test]
    fn client_new_rejects_malformed_json() {
        let reason = client_error(Some("{not json"));
        assert!(reason.starts_with("failed to parse JSON config"), "{reason}");
    }

    #[test]
    fn client_new_reports_unknown_settings() {
        let reason = client_error(Some(r#"{"base_url":"https://h","api_key":"k","retries":3}"#));
        assert!(reason.contains("retries"), "{reason}");
        let reason = client_error(Some(r#"{"base_url":"https://h","api_key":"k","token_mode":"sha1"}"#));
        assert!(reason.contains("sha1"), "{reason}");
    }

    #[test]
    fn client_free_null_is_safe() {
        bt_client_free(std::ptr::null_mut());
    }

    #[test]
    fn help_command_returns_text() {
        let client = new_client("https://h:8888", "k");
        let text = CString::new("bt help").unwrap();
        let reply = bt_handle_command(client, text.as_ptr());
        assert!(!reply.is_null());
        assert!(read(reply).starts_with("可用命令:"));
        bt_free_string(reply);
        bt_client_free(client);
    }

    #[test]
    fn handle_command_null_args_return_null() {
        let text = CString::new("bt help").unwrap();
        assert!(bt_handle_command(std::ptr::null(), text.as_ptr()).is_null());
        let client = new_client("https://h:8888", "k");
        assert!(bt_handle_command(client, std::ptr::null()).is_null());
        bt_client_free(client);
    }

    #[test]
    fn call_against_mock_panel_returns_body() {
        let client = new_client(&spawn_panel(), "k");
        let endpoint = CString::new("/system?action=GetNetWork").unwrap();
        let result = bt_call(client, endpoint.as_ptr(), std::ptr::null());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert!(r.error_message.is_null());
        let body: Value = serde_json::from_str(&read(r.body)).unwrap();
        assert_eq!(body["status"], true);
        bt_free_result(result);
        bt_client_free(client);
    }

    #[test]
    fn call_status_error_carries_code() {
        let client = new_client(&spawn_panel(), "k");
        let endpoint = CString::new("/fault/status/503").unwrap();
        let result = bt_call(client, endpoint.as_ptr(), std::ptr::null());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::HttpStatus);
        assert_eq!(r.http_status, 503);
        assert!(r.body.is_null());
        bt_free_result(result);
        bt_client_free(client);
    }

    #[test]
    fn call_with_bad_params_is_invalid_argument() {
        let client = new_client("https://h:8888", "k");
        let endpoint = CString::new("/data?action=getData").unwrap();
        let params = CString::new("[1,2]").unwrap();
        let result = bt_call(client, endpoint.as_ptr(), params.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::InvalidArgument);
        bt_free_result(result);
        bt_client_free(client);
    }

    #[test]
    fn call_null_client_returns_null_arg() {
        let endpoint = CString::new("/system?action=GetNetWork").unwrap();
        let result = bt_call(std::ptr::null(), endpoint.as_ptr(), std::ptr::null());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::NullArg);
        bt_free_result(result);
    }

    #[test]
    fn params_render_scalars_as_text() {
        let params = params_from_json(r#"{"table":"sites","limit":15,"p":1}"#).unwrap();
        assert_eq!(params.get("table").map(String::as_str), Some("sites"));
        assert_eq!(params.get("limit").map(String::as_str), Some("15"));
    }

    #[test]
    fn derive_token_matches_reference() {
        let time = CString::new("1000").unwrap();
        let key = CString::new("abc123").unwrap();
        let mode = CString::new("time+key").unwrap();
        let token = bt_derive_token(time.as_ptr(), key.as_ptr(), mode.as_ptr());
        assert_eq!(read(token), "47d28005bb9c443ee0b0e4f134b5037d");
        bt_free_string(token);
    }

    #[test]
    fn derive_token_rejects_unknown_mode() {
        let time = CString::new("1000").unwrap();
        let key = CString::new("abc123").unwrap();
        let mode = CString::new("sha1").unwrap();
        assert!(bt_derive_token(time.as_ptr(), key.as_ptr(), mode.as_ptr()).is_null());
    }

    #[test]
    fn free_result_null_is_safe() {
        bt_free_result(std::ptr::null_mut());
    }

    #[test]
    fn free_string_null_is_safe() {
        bt_free_string(std::ptr::null_mut());
    }
}
