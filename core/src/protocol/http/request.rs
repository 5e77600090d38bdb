/*
 * request.rs
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

//! HTTP request on the wire: method, request target, headers, optional body.
//!
//! Built by the transport from a `RequestSpec`; sending is done by the connection.

use crate::error::ConfigError;

/// HTTP request method.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Trace,
    Connect,
    /// Extension method; must be an RFC 9110 token.
    Other(String),
}

/// RFC 9110 `tchar`.
pub(crate) fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(
                    b,
                    b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^'
                        | b'_' | b'`' | b'|' | b'~'
                )
        })
}

impl Method {
    /// Parse a method name. Standard methods are matched case-insensitively; anything else
    /// must be a valid token and is kept as given.
    pub fn parse(name: &str) -> Result<Method, ConfigError> {
        let name = name.trim();
        let method = match name.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            "TRACE" => Method::Trace,
            "CONNECT" => Method::Connect,
            _ if is_token(name) => Method::Other(name.to_string()),
            _ => return Err(ConfigError::InvalidMethod(name.to_string())),
        };
        Ok(method)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
            Method::Other(s) => s,
        }
    }

    /// Form fields go in the query string instead of the body.
    pub fn fields_in_query(&self) -> bool {
        matches!(self, Method::Get | Method::Head)
    }
}

/// Mutable request: method, target, headers, body.
///
/// Headers keep insertion order; names compare case-insensitively.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    pub method: Method,
    /// Origin-form (`/path?query`) or, through a plain proxy, absolute-form.
    pub target: String,
    /// `HTTP/1.1` or `HTTP/1.0`.
    pub version: &'static str,
    pub headers: Vec<(String, String)>,
    /// If set, body will be sent (chunked unless Content-Length is set).
    pub body: Option<Vec<u8>>,
}

impl RequestBuilder {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            version: "HTTP/1.1",
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add or replace a header.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
        self
    }

    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    pub fn body(&mut self, data: Vec<u8>) -> &mut Self {
        self.body = Some(data);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_methods() {
        assert_eq!(Method::parse("get").unwrap(), Method::Get);
        assert_eq!(Method::parse("PATCH").unwrap(), Method::Patch);
        assert_eq!(Method::parse("PROPFIND").unwrap(), Method::Other("PROPFIND".into()));
        assert!(matches!(Method::parse("BAD METHOD"), Err(ConfigError::InvalidMethod(_))));
        assert!(Method::parse("").is_err());
    }

    #[test]
    fn header_replaces_case_insensitively() {
        let mut req = RequestBuilder::new(Method::Get, "/");
        req.header("Accept", "*/*").header("X-A", "1").header("accept", "text/html");
        assert_eq!(
            req.headers,
            vec![
                ("Accept".to_string(), "text/html".to_string()),
                ("X-A".to_string(), "1".to_string())
            ]
        );
        req.remove_header("x-a");
        assert!(!req.has_header("X-A"));
    }
}
