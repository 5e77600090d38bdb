/*
 * spec.rs
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

//! Request configuration. One typed setter per axis, plus `option` for raw transport options.
//!
//! Setters overwrite: the last value written wins.

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use url::Url;

use crate::error::ConfigError;
use crate::protocol::http::request::{is_token, Method};
use crate::uri;

/// HTTP authentication scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// Sent with the first request.
    Basic,
    /// Answered after a 401 challenge.
    Digest,
    /// Whatever the server asks for (Digest preferred over Basic).
    Any,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub scheme: AuthScheme,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("scheme", &self.scheme)
            .finish()
    }
}

/// HTTP proxy. `https://` targets always go through a CONNECT tunnel; `tunnel` forces one for
/// `http://` targets too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    /// `host:port` or `http://host:port`.
    pub address: String,
    pub credentials: Option<(String, String)>,
    pub tunnel: bool,
}

impl Proxy {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            credentials: None,
            tunnel: false,
        }
    }

    pub(crate) fn url(&self) -> Result<Url, ConfigError> {
        let address = self.address.trim();
        let text = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };
        let invalid = |reason: String| ConfigError::InvalidUri {
            uri: self.address.clone(),
            reason,
        };
        let url = Url::parse(&text).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "http" {
            return Err(ConfigError::UnsupportedScheme(format!("proxy {}", url.scheme())));
        }
        if url.host_str().is_none() {
            return Err(invalid("proxy has no host".to_string()));
        }
        Ok(url)
    }
}

/// Certificate checks for `https://` requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    /// Verify the certificate chain. Unset means on (or the client default).
    pub verify_peer: Option<bool>,
    /// Check that the certificate matches the host name.
    pub verify_host: bool,
    /// PEM bundle used instead of the platform roots.
    pub ca_file: Option<PathBuf>,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            verify_peer: None,
            verify_host: true,
            ca_file: None,
        }
    }
}

/// Content encodings to request and decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Identity,
    Gzip,
    Deflate,
    /// Every supported encoding.
    All,
}

impl Encoding {
    pub fn accept_value(self) -> &'static str {
        match self {
            Encoding::Identity => "identity",
            Encoding::Gzip => "gzip",
            Encoding::Deflate => "deflate",
            Encoding::All => "gzip, deflate",
        }
    }

    pub fn parse(s: &str) -> Option<Encoding> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identity" => Some(Encoding::Identity),
            "gzip" => Some(Encoding::Gzip),
            "deflate" => Some(Encoding::Deflate),
            "" | "all" | "gzip, deflate" | "gzip,deflate" => Some(Encoding::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpVersion {
    Http10,
    #[default]
    Http11,
}

impl HttpVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpVersion::Http10 => "HTTP/1.0",
            HttpVersion::Http11 => "HTTP/1.1",
        }
    }
}

/// Everything needed to issue one request. Read-only once handed to an executor.
#[derive(Debug, Clone, Default)]
pub struct RequestSpec {
    pub method: Method,
    pub uri: Option<String>,
    /// Appended to the URI's query string.
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    /// Form fields: URL-encoded body, or query parameters for GET and HEAD.
    pub fields: Vec<(String, String)>,
    /// Whole transfer.
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub auth: Option<Credentials>,
    pub proxy: Option<Proxy>,
    pub tls: TlsOptions,
    /// Redirects to follow; unset or 0 means redirects are returned as-is.
    pub max_redirects: Option<u32>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    /// Send the previous URL as `Referer` when following a redirect.
    pub auto_referer: bool,
    pub encoding: Option<Encoding>,
    /// `Cookie` header value.
    pub cookie: Option<String>,
    pub http_version: HttpVersion,
    /// Raw transport options by name; see `HttpTransport` for the recognized ones.
    pub options: Vec<(String, String)>,
}

impl RequestSpec {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Default::default()
        }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(uri)
    }

    pub fn post(uri: impl Into<String>) -> Self {
        let mut spec = Self::new(uri);
        spec.method = Method::Post;
        spec
    }

    pub fn put(uri: impl Into<String>) -> Self {
        let mut spec = Self::new(uri);
        spec.method = Method::Put;
        spec
    }

    pub fn delete(uri: impl Into<String>) -> Self {
        let mut spec = Self::new(uri);
        spec.method = Method::Delete;
        spec
    }

    pub fn uri(&mut self, uri: impl Into<String>) -> &mut Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn method(&mut self, method: Method) -> &mut Self {
        self.method = method;
        self
    }

    /// Add or replace a request header (case-insensitive name match).
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        set_pair(&mut self.headers, name.into(), value.into(), true);
        self
    }

    pub fn query(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        set_pair(&mut self.query, key.into(), value.into(), false);
        self
    }

    pub fn field(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        set_pair(&mut self.fields, key.into(), value.into(), false);
        self
    }

    pub fn body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    /// JSON body with `Content-Type: application/json`.
    pub fn json(&mut self, value: &serde_json::Value) -> &mut Self {
        self.header("Content-Type", "application/json");
        self.body(value.to_string())
    }

    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn auth(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        scheme: AuthScheme,
    ) -> &mut Self {
        self.auth = Some(Credentials {
            username: username.into(),
            password: password.into(),
            scheme,
        });
        self
    }

    pub fn basic_auth(&mut self, username: impl Into<String>, password: impl Into<String>) -> &mut Self {
        self.auth(username, password, AuthScheme::Basic)
    }

    pub fn digest_auth(&mut self, username: impl Into<String>, password: impl Into<String>) -> &mut Self {
        self.auth(username, password, AuthScheme::Digest)
    }

    pub fn proxy(&mut self, proxy: Proxy) -> &mut Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn verify_peer(&mut self, verify: bool) -> &mut Self {
        self.tls.verify_peer = Some(verify);
        self
    }

    pub fn verify_host(&mut self, verify: bool) -> &mut Self {
        self.tls.verify_host = verify;
        self
    }

    pub fn ca_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.tls.ca_file = Some(path.into());
        self
    }

    pub fn max_redirects(&mut self, max: u32) -> &mut Self {
        self.max_redirects = Some(max);
        self
    }

    pub fn user_agent(&mut self, agent: impl Into<String>) -> &mut Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn referer(&mut self, referer: impl Into<String>) -> &mut Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn auto_referer(&mut self, on: bool) -> &mut Self {
        self.auto_referer = on;
        self
    }

    pub fn encoding(&mut self, encoding: Encoding) -> &mut Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn cookie(&mut self, cookie: impl Into<String>) -> &mut Self {
        self.cookie = Some(cookie.into());
        self
    }

    pub fn http_version(&mut self, version: HttpVersion) -> &mut Self {
        self.http_version = version;
        self
    }

    /// Raw transport option. Names are matched by canonical form, with or without a
    /// `CURLOPT_` prefix (`CURLOPT_TIMEOUT`, `timeout`).
    pub fn option(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        set_pair(&mut self.options, name.into(), value.into(), true);
        self
    }

    /// Check the request and return the target URL with `query` applied.
    pub fn validate(&self) -> Result<Url, ConfigError> {
        let raw = match self.uri.as_deref().map(str::trim) {
            Some(u) if !u.is_empty() => u,
            _ => return Err(ConfigError::MissingUri),
        };
        let full = uri::append_query(raw, self.query.iter().map(|(k, v)| (k, v)));
        let url = Url::parse(&full).map_err(|e| ConfigError::InvalidUri {
            uri: raw.to_string(),
            reason: e.to_string(),
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ConfigError::InvalidUri {
                uri: raw.to_string(),
                reason: "no host".to_string(),
            });
        }
        if !is_token(self.method.as_str()) {
            return Err(ConfigError::InvalidMethod(self.method.as_str().to_string()));
        }
        if let Some((name, _)) = self.headers.iter().find(|(name, _)| !is_token(name)) {
            return Err(ConfigError::InvalidHeader(name.clone()));
        }
        if self.method == Method::Trace && (self.body.is_some() || !self.fields.is_empty()) {
            return Err(ConfigError::UnexpectedBody("TRACE"));
        }
        if let Some(proxy) = &self.proxy {
            proxy.url()?;
        }
        if let Some(path) = &self.tls.ca_file {
            if !path.is_file() {
                return Err(ConfigError::CaBundle {
                    path: path.clone(),
                    reason: "not a readable file".to_string(),
                });
            }
        }
        Ok(url)
    }

    /// Value of a raw option by name.
    pub fn option_value(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| option_name_matches(k, name))
            .map(|(_, v)| v.as_str())
    }
}

pub(crate) fn option_name_matches(given: &str, wanted: &str) -> bool {
    let given = given.trim();
    let bare = match given.get(..8) {
        Some(prefix) if prefix.eq_ignore_ascii_case("CURLOPT_") => &given[8..],
        _ => given,
    };
    crate::response::headers::same_name(bare, wanted)
}

fn set_pair(pairs: &mut Vec<(String, String)>, key: String, value: String, ignore_case: bool) {
    let existing = pairs.iter_mut().find(|(k, _)| {
        if ignore_case {
            k.eq_ignore_ascii_case(&key)
        } else {
            *k == key
        }
    });
    match existing {
        Some(entry) => entry.1 = value,
        None => pairs.push((key, value)),
    }
}
