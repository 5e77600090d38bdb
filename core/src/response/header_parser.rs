/*
 * header_parser.rs
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

//! Header parser: splits a raw response blob into status line, header fields and body offset.
//!
//! Works on the whole output of a transfer (header block(s) followed by the body), the same
//! shape curl produces with `CURLOPT_HEADER`. Interim (`1xx`) and redirect header blocks that
//! precede the final one are walked over; the final block wins.

use log::trace;

use crate::protocol::http::is_token;
use crate::response::headers::Headers;

/// Parsed `HTTP/<version> <code> [<reason>]` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub version: String,
    pub code: u16,
    pub reason: Option<String>,
}

/// Result of parsing the head of a response.
#[derive(Debug, Clone, Default)]
pub struct ParsedHead {
    pub headers: Headers,
    pub status: Option<StatusLine>,
    /// Byte offset of the first body byte.
    pub header_size: usize,
    /// False when no terminating blank line was found; `header_size` is then the input length.
    pub complete: bool,
}

/// Parse a status line. The version must look like `HTTP/1.1`, `HTTP/1.0` or `HTTP/2`, the
/// code must be three digits.
pub fn parse_status_line(line: &str) -> Option<StatusLine> {
    let line = line.trim();
    let rest = line.strip_prefix("HTTP/")?;
    let (version, rest) = rest.split_once(' ')?;
    if version.is_empty() || !version.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let rest = rest.trim_start();
    let (code, reason) = match rest.split_once(' ') {
        Some((code, reason)) => (code, Some(reason.trim())),
        None => (rest, None),
    };
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(StatusLine {
        version: version.to_string(),
        code: code.parse().ok()?,
        reason: reason.filter(|r| !r.is_empty()).map(str::to_string),
    })
}

/// One line of the input: content without terminator, and offset of the next line.
fn next_line(raw: &[u8], start: usize) -> (&[u8], usize) {
    match raw[start..].iter().position(|&b| b == b'\n') {
        Some(n) => (&raw[start..start + n], start + n + 1),
        None => (&raw[start..], raw.len()),
    }
}

fn starts_with_status_line(raw: &[u8]) -> bool {
    if !raw.starts_with(b"HTTP/") {
        return false;
    }
    let (line, _) = next_line(raw, 0);
    parse_status_line(&String::from_utf8_lossy(line)).is_some()
}

fn is_header_line(line: &str) -> bool {
    matches!(line.split_once(':'), Some((name, _)) if !name.trim().is_empty())
}

/// Header line allowed to open a head that has no status line: the name must be a token, so
/// body text such as `{"a":1}` stays body.
fn opens_bare_head(line: &str) -> bool {
    matches!(line.split_once(':'), Some((name, _)) if is_token(name.trim_end()))
}

/// Parse the head of `raw`. Malformed lines inside a header block are skipped.
///
/// Input whose first line is neither a status line nor a `token: value` header has no head at
/// all: `header_size` is 0 and everything is body.
pub fn parse_head(raw: &[u8]) -> ParsedHead {
    let mut head = ParsedHead::default();
    let mut offset = 0;
    let mut first = true;

    while offset < raw.len() {
        let (line_bytes, next) = next_line(raw, offset);
        let line = String::from_utf8_lossy(line_bytes);
        let line = line.trim();

        if line.is_empty() {
            offset = next;
            if starts_with_status_line(&raw[offset..]) {
                trace!("header block ends at {}, another block follows", offset);
                head.headers = Headers::new();
                first = true;
                continue;
            }
            head.complete = true;
            head.header_size = offset;
            return head;
        }

        let header = if first && head.status.is_none() {
            opens_bare_head(line)
        } else {
            is_header_line(line)
        };
        if let Some(status) = parse_status_line(line) {
            head.status = Some(status);
        } else if header {
            let stripped = line.replace('"', "");
            if let Some((name, value)) = stripped.split_once(':') {
                head.headers.insert(name.trim(), value.trim());
            }
        } else if first {
            trace!("no header block: first line is not a header");
            head.complete = true;
            head.header_size = 0;
            return head;
        }
        first = false;
        offset = next;
    }

    head.header_size = raw.len();
    head
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_shapes() {
        let s = parse_status_line("HTTP/1.1 200 OK").unwrap();
        assert_eq!((s.version.as_str(), s.code, s.reason.as_deref()), ("1.1", 200, Some("OK")));
        let s = parse_status_line("HTTP/2 204").unwrap();
        assert_eq!((s.code, s.reason), (204, None));
        let s = parse_status_line("HTTP/1.0 404 Not Found").unwrap();
        assert_eq!(s.reason.as_deref(), Some("Not Found"));
        assert!(parse_status_line("HTTP/x 200 OK").is_none());
        assert!(parse_status_line("Server: HTTP/1.1 200").is_none());
        assert!(parse_status_line("HTTP/1.1 20 OK").is_none());
    }

    #[test]
    fn header_size_is_offset_after_blank_line() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nX-A: 1\r\n\r\nhello";
        let head = parse_head(raw);
        assert!(head.complete);
        assert_eq!(head.header_size, raw.len() - 5);
        assert_eq!(&raw[head.header_size..], b"hello");
        assert_eq!(head.headers.get("contentType"), Some("text/plain"));
        assert_eq!(head.status.unwrap().code, 200);
    }

    #[test]
    fn bare_lf_terminators() {
        let raw = b"HTTP/1.1 200 OK\nA: b\n\nbody";
        let head = parse_head(raw);
        assert_eq!(&raw[head.header_size..], b"body");
    }

    #[test]
    fn value_keeps_later_colons_and_loses_quotes() {
        let raw = b"HTTP/1.1 200 OK\r\nLocation: http://x/y\r\nETag: \"abc\"\r\n\r\n";
        let head = parse_head(raw);
        assert_eq!(head.headers.get("location"), Some("http://x/y"));
        assert_eq!(head.headers.get("etag"), Some("abc"));
        assert_eq!(head.header_size, raw.len());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let raw = b"HTTP/1.1 200 OK\r\ngarbage line\r\n: novalue\r\nA: 1\r\n\r\nx";
        let head = parse_head(raw);
        assert_eq!(head.headers.len(), 1);
        assert_eq!(head.headers.get("a"), Some("1"));
    }

    #[test]
    fn interim_and_redirect_blocks_are_walked() {
        let raw = b"HTTP/1.1 100 Continue\r\n\r\n\
HTTP/1.1 302 Found\r\nLocation: /next\r\n\r\n\
HTTP/1.1 200 OK\r\nServer: final\r\n\r\ndone";
        let head = parse_head(raw);
        assert_eq!(head.status.unwrap().code, 200);
        assert!(head.headers.get("location").is_none());
        assert_eq!(head.headers.get("server"), Some("final"));
        assert_eq!(&raw[head.header_size..], b"done");
    }

    #[test]
    fn missing_blank_line_is_incomplete() {
        let raw = b"HTTP/1.1 200 OK\r\nA: 1\r\n";
        let head = parse_head(raw);
        assert!(!head.complete);
        assert_eq!(head.header_size, raw.len());
    }

    #[test]
    fn json_body_without_head_is_all_body() {
        for raw in [&br#"{"a":1}"#[..], br#"{"a": "b:c"}"#, b"key value: 1\n\nrest"] {
            let head = parse_head(raw);
            assert_eq!(head.header_size, 0);
            assert!(head.headers.is_empty());
        }
    }

    #[test]
    fn bare_head_without_status_line() {
        let raw = b"Content-Type: text/plain\r\nX-A: 1\r\n\r\nbody";
        let head = parse_head(raw);
        assert!(head.status.is_none());
        assert_eq!(head.headers.get("contentType"), Some("text/plain"));
        assert_eq!(&raw[head.header_size..], b"body");
    }

    #[test]
    fn body_only_input_has_no_head() {
        let head = parse_head(b"a=1&b=2");
        assert!(head.complete);
        assert_eq!(head.header_size, 0);
        assert!(head.headers.is_empty());
    }
}
