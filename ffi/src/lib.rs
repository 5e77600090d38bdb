/*
 * lib.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Curlew, an HTTP client library.
 *
 * Curlew is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Curlew is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Curlew.  If not, see <http://www.gnu.org/licenses/>.
 */

//! C FFI for curlew core. Requests and responses are opaque heap handles; free each with its
//! `*_free` function. Strings returned to the caller are owned (free with curlew_free_string).
//! All string parameters are UTF-8 NUL-terminated.

use libc::{c_char, c_int, size_t};
use std::ffi::{CStr, CString};
use std::fmt::Display;
use std::ptr;
use std::time::Duration;

use curlew_core::config::{default_config_path, ClientDefaults};
use curlew_core::protocol::http::Method;
use curlew_core::response::codes;
use curlew_core::{Batch, Body, Client, RequestSpec, Response, TransferError};

/// Opaque request handle.
pub struct CurlewRequest(RequestSpec);

/// Opaque response handle.
pub struct CurlewResponse(Response);

/// Hosts the shared tokio runtime and the client every call goes through. Defaults come from
/// ~/.curlew/config.xml and `CURLEW_*` environment variables.
struct Registry {
    runtime: tokio::runtime::Runtime,
    client: Client,
}

fn registry() -> Option<&'static Registry> {
    static REGISTRY: once_cell::sync::OnceCell<Registry> = once_cell::sync::OnceCell::new();
    let result = REGISTRY.get_or_try_init(|| {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let defaults = match default_config_path() {
            Some(path) => ClientDefaults::load(&path).unwrap_or_default(),
            None => ClientDefaults::default(),
        };
        Ok::<_, std::io::Error>(Registry {
            runtime,
            client: Client::new().with_defaults(defaults.with_env_overrides()),
        })
    });
    match result {
        Ok(r) => Some(r),
        Err(e) => {
            set_last_error(format!("failed to create runtime: {}", e));
            None
        }
    }
}

thread_local! {
    static LAST_ERROR: std::cell::RefCell<Option<CString>> = std::cell::RefCell::new(None);
}

fn set_last_error(err: impl Display) {
    let msg = CString::new(err.to_string().replace('\0', "")).unwrap_or_default();
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(msg));
}

fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

fn ptr_to_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string()) }
}

fn to_c_string(s: &str) -> *mut c_char {
    CString::new(s.replace('\0', ""))
        .map(CString::into_raw)
        .unwrap_or(ptr::null_mut())
}

/// Version string (static, do not free).
#[no_mangle]
pub extern "C" fn curlew_version() -> *const c_char {
    b"0.1.0\0".as_ptr() as *const c_char
}

/// Last error message from a failed call on this thread. Valid until the next FFI call. Do not free.
#[no_mangle]
pub extern "C" fn curlew_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|s| s.as_ptr())
            .unwrap_or(ptr::null())
    })
}

/// Free a string returned by this library. No-op if ptr is NULL.
#[no_mangle]
pub unsafe extern "C" fn curlew_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        let _ = CString::from_raw(ptr);
    }
}

/// New GET request for `url`. Returns NULL if url is NULL or not UTF-8. The URL is checked
/// when the request is executed.
#[no_mangle]
pub extern "C" fn curlew_request_new(url: *const c_char) -> *mut CurlewRequest {
    clear_last_error();
    match ptr_to_str(url) {
        Some(url) => Box::into_raw(Box::new(CurlewRequest(RequestSpec::get(url)))),
        None => {
            set_last_error("url is NULL or not UTF-8");
            ptr::null_mut()
        }
    }
}

/// Free a request handle. No-op if req is NULL.
#[no_mangle]
pub unsafe extern "C" fn curlew_request_free(req: *mut CurlewRequest) {
    if !req.is_null() {
        drop(Box::from_raw(req));
    }
}

unsafe fn request_mut<'a>(req: *mut CurlewRequest) -> Option<&'a mut RequestSpec> {
    if req.is_null() {
        set_last_error("request is NULL");
        return None;
    }
    Some(&mut (*req).0)
}

/// Set the method (`GET`, `POST`, or any token). Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn curlew_request_set_method(req: *mut CurlewRequest, method: *const c_char) -> c_int {
    clear_last_error();
    let Some(spec) = request_mut(req) else { return -1 };
    let parsed = ptr_to_str(method)
        .ok_or_else(|| "method is NULL or not UTF-8".to_string())
        .and_then(|m| Method::parse(&m).map_err(|e| e.to_string()));
    match parsed {
        Ok(m) => {
            spec.method(m);
            0
        }
        Err(e) => {
            set_last_error(e);
            -1
        }
    }
}

/// Add (or replace) a request header. Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn curlew_request_add_header(
    req: *mut CurlewRequest,
    name: *const c_char,
    value: *const c_char,
) -> c_int {
    clear_last_error();
    let Some(spec) = request_mut(req) else { return -1 };
    match (ptr_to_str(name), ptr_to_str(value)) {
        (Some(n), Some(v)) => {
            spec.header(n, v);
            0
        }
        _ => {
            set_last_error("header name or value is NULL or not UTF-8");
            -1
        }
    }
}

/// Set the request body (copied). data may be NULL when len is 0.
#[no_mangle]
pub unsafe extern "C" fn curlew_request_set_body(req: *mut CurlewRequest, data: *const u8, len: size_t) -> c_int {
    clear_last_error();
    let Some(spec) = request_mut(req) else { return -1 };
    if data.is_null() && len > 0 {
        set_last_error("body is NULL");
        return -1;
    }
    let body = if len == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(data, len).to_vec()
    };
    spec.body(body);
    0
}

/// Whole-transfer and connect timeouts in milliseconds; 0 leaves the value unset.
#[no_mangle]
pub unsafe extern "C" fn curlew_request_set_timeout(req: *mut CurlewRequest, timeout_ms: u64, connect_timeout_ms: u64) -> c_int {
    clear_last_error();
    let Some(spec) = request_mut(req) else { return -1 };
    if timeout_ms > 0 {
        spec.timeout(Duration::from_millis(timeout_ms));
    }
    if connect_timeout_ms > 0 {
        spec.connect_timeout(Duration::from_millis(connect_timeout_ms));
    }
    0
}

/// TLS verification switches (non-zero = verify).
#[no_mangle]
pub unsafe extern "C" fn curlew_request_set_verify(req: *mut CurlewRequest, verify_peer: c_int, verify_host: c_int) -> c_int {
    clear_last_error();
    let Some(spec) = request_mut(req) else { return -1 };
    spec.verify_peer(verify_peer != 0).verify_host(verify_host != 0);
    0
}

/// Follow up to `max` redirects (0 disables following).
#[no_mangle]
pub unsafe extern "C" fn curlew_request_set_max_redirects(req: *mut CurlewRequest, max: u32) -> c_int {
    clear_last_error();
    let Some(spec) = request_mut(req) else { return -1 };
    spec.max_redirects(max);
    0
}

/// Raw transport option by name, e.g. ("CURLOPT_USERAGENT", "probe/1").
#[no_mangle]
pub unsafe extern "C" fn curlew_request_set_option(
    req: *mut CurlewRequest,
    name: *const c_char,
    value: *const c_char,
) -> c_int {
    clear_last_error();
    let Some(spec) = request_mut(req) else { return -1 };
    match (ptr_to_str(name), ptr_to_str(value)) {
        (Some(n), Some(v)) => {
            spec.option(n, v);
            0
        }
        _ => {
            set_last_error("option name or value is NULL or not UTF-8");
            -1
        }
    }
}

/// Execute one request (blocking). Returns NULL if the request cannot be sent at all (see
/// curlew_last_error); network and HTTP failures are reported through the response.
#[no_mangle]
pub unsafe extern "C" fn curlew_execute(req: *const CurlewRequest) -> *mut CurlewResponse {
    clear_last_error();
    if req.is_null() {
        set_last_error("request is NULL");
        return ptr::null_mut();
    }
    let Some(reg) = registry() else { return ptr::null_mut() };
    let spec = &(*req).0;
    match reg.runtime.block_on(reg.client.execute(spec)) {
        Ok(response) => Box::into_raw(Box::new(CurlewResponse(response))),
        Err(e) => {
            set_last_error(e);
            ptr::null_mut()
        }
    }
}

/// Execute `n` requests concurrently (blocking). `out` must have room for `n` responses; every
/// slot is filled, in the order of `reqs`, with a response to free with curlew_response_free.
/// A NULL request yields a response carrying an error. Returns 0, or -1 if nothing could run.
#[no_mangle]
pub unsafe extern "C" fn curlew_batch_execute(
    reqs: *const *const CurlewRequest,
    n: size_t,
    out: *mut *mut CurlewResponse,
) -> c_int {
    clear_last_error();
    if n == 0 {
        return 0;
    }
    if reqs.is_null() || out.is_null() {
        set_last_error("requests or output array is NULL");
        return -1;
    }
    let Some(reg) = registry() else { return -1 };
    let handles = std::slice::from_raw_parts(reqs, n);
    let mut batch = Batch::new();
    let ids: Vec<_> = handles
        .iter()
        .map(|&h| (!h.is_null()).then(|| batch.push((*h).0.clone())))
        .collect();
    let responses = reg.runtime.block_on(reg.client.execute_batch(&batch));
    let out = std::slice::from_raw_parts_mut(out, n);
    for (slot, id) in out.iter_mut().zip(ids) {
        let response = id.and_then(|id| responses.get(id).cloned()).unwrap_or_else(|| {
            Response::failed(None, TransferError::transport(codes::FAILED_INIT, "request is NULL"))
        });
        *slot = Box::into_raw(Box::new(CurlewResponse(response)));
    }
    0
}

/// Free a response handle. No-op if resp is NULL.
#[no_mangle]
pub unsafe extern "C" fn curlew_response_free(resp: *mut CurlewResponse) {
    if !resp.is_null() {
        drop(Box::from_raw(resp));
    }
}

unsafe fn response_ref<'a>(resp: *const CurlewResponse) -> Option<&'a Response> {
    if resp.is_null() {
        None
    } else {
        Some(&(*resp).0)
    }
}

/// HTTP status of the final response, 0 if none was received.
#[no_mangle]
pub unsafe extern "C" fn curlew_response_code(resp: *const CurlewResponse) -> c_int {
    response_ref(resp).map_or(0, |r| r.info().http_code() as c_int)
}

/// Header value by name (any spelling: `Content-Type`, `content_type`). Caller frees; NULL if absent.
#[no_mangle]
pub unsafe extern "C" fn curlew_response_header(resp: *const CurlewResponse, name: *const c_char) -> *mut c_char {
    let (Some(r), Some(name)) = (response_ref(resp), ptr_to_str(name)) else {
        return ptr::null_mut();
    };
    r.headers().get(&name).map_or(ptr::null_mut(), to_c_string)
}

/// Body variant: 1 JSON, 2 XML, 3 query, 4 serialized, 5 HTML, 6 text; 0 for a NULL handle.
#[no_mangle]
pub unsafe extern "C" fn curlew_response_body_kind(resp: *const CurlewResponse) -> c_int {
    response_ref(resp).map_or(0, |r| r.body().kind() as u8 as c_int)
}

/// Body as text: JSON re-serialized, plain text as is, anything else as the raw body bytes
/// (invalid UTF-8 replaced). Caller frees.
#[no_mangle]
pub unsafe extern "C" fn curlew_response_body_text(resp: *const CurlewResponse) -> *mut c_char {
    let Some(r) = response_ref(resp) else { return ptr::null_mut() };
    match r.body() {
        Body::Json(value) => to_c_string(&value.to_string()),
        Body::Text(text) => to_c_string(text),
        _ => to_c_string(&String::from_utf8_lossy(r.raw())),
    }
}

/// Error code (transfer code or HTTP status), 0 if the response has no error.
#[no_mangle]
pub unsafe extern "C" fn curlew_response_error_code(resp: *const CurlewResponse) -> i64 {
    response_ref(resp)
        .and_then(|r| r.error())
        .map_or(0, |e| e.code())
}

/// Error message, NULL if the response has no error. Caller frees.
#[no_mangle]
pub unsafe extern "C" fn curlew_response_error_message(resp: *const CurlewResponse) -> *mut c_char {
    response_ref(resp)
        .and_then(|r| r.error())
        .map_or(ptr::null_mut(), |e| to_c_string(e.message()))
}
