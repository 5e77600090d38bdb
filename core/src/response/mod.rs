/*
 * mod.rs
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

//! Typed responses: header parsing, body negotiation and the immutable `Response` container.

pub mod body;
pub mod error;
pub mod header_parser;
pub mod headers;
pub mod info;
pub mod negotiate;
pub mod serialized;
pub mod status;

use bytes::Bytes;
use log::debug;

use crate::protocol::http::RawTransferResult;

pub use body::{Body, BodyKind, HtmlDocument, QueryMap, XmlDocument, XmlElement, XmlNode};
pub use error::{codes, ErrorKind, TransferError};
pub use header_parser::{parse_head, parse_status_line, ParsedHead, StatusLine};
pub use headers::{canonical_name, Headers};
pub use info::{Info, InfoValue};
pub use negotiate::negotiate;
pub use serialized::{SerializedKey, SerializedValue};
pub use status::{CanonicalReasons, StatusLookup};

const UNKNOWN_STATUS: &str = "Unknown Status";

/// Result of one transfer attempt: transfer info, headers, decoded body and optional error.
///
/// A response can carry both a decoded body and an error (a 404 with a JSON error payload).
#[derive(Debug, Clone)]
pub struct Response {
    info: Info,
    headers: Headers,
    body: Body,
    raw_body: Bytes,
    error: Option<TransferError>,
}

impl Response {
    /// Build a response from what the transport produced.
    ///
    /// Order matters: info is seeded from transport metadata, then the header parser updates
    /// it, then the body is negotiated with the final content type.
    pub fn assemble(raw: RawTransferResult, lookup: &dyn StatusLookup) -> Self {
        let info = Info::from_metadata(&raw.metadata);
        let hint = raw.metadata.header_size;
        let mut response = Self::parse(info, &raw.header_block, &raw.body, hint);
        if response.info.http_version().is_none() {
            // Header block without a status line: fall back to the one the transport saw.
            if let Some(status) = raw.status_line.as_deref().and_then(parse_status_line) {
                response
                    .info
                    .set_status(&status.version, status.code, status.reason.as_deref());
            }
        }
        let nothing = raw.header_block.is_empty() && raw.body.is_empty() && raw.status_line.is_none();
        response.error = match raw.error {
            Some(err) => Some(err),
            None if nothing => Some(TransferError::transport(
                codes::GOT_NOTHING,
                "Empty reply from server",
            )),
            None => status_error(&response.info, lookup),
        };
        if let Some(err) = &response.error {
            debug!("response carries error: {}", err);
        }
        response
    }

    /// Parse a complete response blob (header block(s) followed by the body) obtained outside
    /// of an executor. A blob without a status line is not an error; it is all body.
    pub fn from_raw(raw: &[u8], lookup: &dyn StatusLookup) -> Self {
        let mut response = Self::parse(Info::default(), raw, &[], None);
        response.error = status_error(&response.info, lookup);
        response
    }

    /// Response for a request that never produced output: rejected before sending, or
    /// cancelled while in flight.
    pub fn failed(url: Option<&str>, error: TransferError) -> Self {
        let mut info = Info::default();
        if let Some(url) = url {
            info.set_url(url);
        }
        Self {
            info,
            headers: Headers::new(),
            body: Body::default(),
            raw_body: Bytes::new(),
            error: Some(error),
        }
    }

    fn parse(mut info: Info, head_bytes: &[u8], tail: &[u8], hint: Option<usize>) -> Self {
        let head = parse_head(head_bytes);
        let header_size = if head.complete {
            head.header_size
        } else {
            // No blank line: trust the transport's boundary if it has one that fits.
            hint.filter(|&n| n <= head_bytes.len())
                .unwrap_or(head.header_size)
        };
        info.set_header_size(header_size);
        if let Some(status) = &head.status {
            info.set_status(&status.version, status.code, status.reason.as_deref());
        }
        if let Some(content_type) = head.headers.get("contentType") {
            info.set_content_type(content_type);
        }

        let raw_body = if tail.is_empty() {
            Bytes::copy_from_slice(&head_bytes[header_size..])
        } else if header_size == head_bytes.len() {
            Bytes::copy_from_slice(tail)
        } else {
            let mut joined = Vec::with_capacity(head_bytes.len() - header_size + tail.len());
            joined.extend_from_slice(&head_bytes[header_size..]);
            joined.extend_from_slice(tail);
            Bytes::from(joined)
        };
        let body = negotiate(&raw_body, info.content_type());

        Self {
            info,
            headers: head.headers,
            body,
            raw_body,
            error: None,
        }
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn error(&self) -> Option<&TransferError> {
        self.error.as_ref()
    }

    /// Body bytes before negotiation.
    pub fn raw(&self) -> &Bytes {
        &self.raw_body
    }

    /// No error, transport or status.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_body(self) -> Body {
        self.body
    }
}

fn status_error(info: &Info, lookup: &dyn StatusLookup) -> Option<TransferError> {
    let code = info.http_code();
    if code == 0 || (200..300).contains(&code) {
        return None;
    }
    let message = lookup
        .describe(code)
        .or_else(|| info.http_code_description().map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_STATUS.to_string());
    Some(TransferError::status(code, message))
}
