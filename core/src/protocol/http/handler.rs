/*
 * handler.rs
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

//! HTTP response handler trait and the collector the transport uses.
//!
//! Events: head → status → header (×n) → start_body → body_chunk (×n) → end_body → complete.

use bytes::{Bytes, BytesMut};
use log::trace;

/// Handler for HTTP response events (push model). The connection drives this as data arrives.
///
/// Interim (1xx) responses only produce `head`. For the final response:
/// 1. `head(raw)` with the raw status line and header lines
/// 2. `status(version, code, reason)`
/// 3. `header(name, value)` for each response header (and later for each trailer)
/// 4. `start_body()`, then `body_chunk(data)` per chunk, then `end_body()` (not for HEAD, 204, 304)
/// 5. `complete()`
///
/// Connection or protocol failures are returned by `HttpConnection::send` instead.
pub trait ResponseHandler {
    /// Raw header block of a response, interim ones included, terminated by its blank line.
    fn head(&mut self, raw: &[u8]);

    fn status(&mut self, version: &str, code: u16, reason: Option<&str>);

    /// Called for each response or trailer header. Name may repeat for multi-value headers.
    fn header(&mut self, name: &str, value: &str);

    fn start_body(&mut self);

    /// Data is only valid for the duration of the call.
    fn body_chunk(&mut self, data: &[u8]);

    fn end_body(&mut self);

    fn complete(&mut self);
}

/// Accumulates one exchange: every raw header block, the final status and headers, and the body.
#[derive(Debug, Default)]
pub struct TransferCollector {
    head: BytesMut,
    version: Option<String>,
    code: u16,
    reason: Option<String>,
    headers: Vec<(String, String)>,
    body: BytesMut,
    complete: bool,
}

impl TransferCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status code of the final response; 0 before a status line arrived.
    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// `HTTP/<version> <code> <reason>`, if a status line arrived.
    pub fn status_line(&self) -> Option<String> {
        let version = self.version.as_deref()?;
        Some(match &self.reason {
            Some(reason) => format!("HTTP/{} {} {}", version, self.code, reason),
            None => format!("HTTP/{} {}", version, self.code),
        })
    }

    /// First value of a header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a header, in arrival order.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn head_bytes(&self) -> &[u8] {
        &self.head
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Raw header blocks and body.
    pub fn into_parts(self) -> (Bytes, Bytes) {
        (self.head.freeze(), self.body.freeze())
    }
}

impl ResponseHandler for TransferCollector {
    fn head(&mut self, raw: &[u8]) {
        self.head.extend_from_slice(raw);
    }

    fn status(&mut self, version: &str, code: u16, reason: Option<&str>) {
        trace!("status {} {}", code, reason.unwrap_or(""));
        self.version = Some(version.to_string());
        self.code = code;
        self.reason = reason.map(str::to_string);
        // Interim responses do not carry over.
        self.headers.clear();
    }

    fn header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn start_body(&mut self) {}

    fn body_chunk(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
    }

    fn end_body(&mut self) {}

    fn complete(&mut self) {
        self.complete = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_exchange() {
        let mut c = TransferCollector::new();
        c.head(b"HTTP/1.1 100 Continue\r\n\r\n");
        c.head(b"HTTP/1.1 401 Unauthorized\r\nWWW-Authenticate: Basic\r\n\r\n");
        c.status("1.1", 401, Some("Unauthorized"));
        ResponseHandler::header(&mut c, "WWW-Authenticate", "Digest realm=\"r\"");
        ResponseHandler::header(&mut c, "www-authenticate", "Basic realm=\"r\"");
        c.body_chunk(b"no");
        c.complete();
        assert_eq!(c.status_line().as_deref(), Some("HTTP/1.1 401 Unauthorized"));
        assert_eq!(c.header("WWW-AUTHENTICATE"), Some("Digest realm=\"r\""));
        assert_eq!(c.header_values("www-authenticate").count(), 2);
        assert!(c.is_complete());
        let (head, body) = c.into_parts();
        assert!(head.starts_with(b"HTTP/1.1 100"));
        assert_eq!(&body[..], b"no");
    }
}
