/*
 * config.rs
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

//! Client-wide defaults applied to every request that does not set its own value.
//!
//! Defaults are read from ~/.curlew/config.xml (root \<curlew\>, one element per setting) and
//! can be overridden from the environment (`CURLEW_*`). All XML reading uses quick_xml.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::ConfigError;
use crate::protocol::http::RequestSpec;

/// Defaults for requests executed through a `Client`. `None` leaves the transport default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientDefaults {
    pub user_agent: Option<String>,
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub verify_peer: Option<bool>,
    pub max_redirects: Option<u32>,
    /// Maximum transfers in flight for a batch that does not set its own limit.
    pub concurrency: Option<usize>,
}

/// Default config directory: ~/.curlew.
pub fn default_config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from).map(|h| h.join(".curlew"))
}

/// Default defaults file: ~/.curlew/config.xml.
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|d| d.join("config.xml"))
}

fn parse_seconds(s: &str) -> Option<Duration> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(Duration::from_secs_f64)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl ClientDefaults {
    /// Load defaults from an XML file. A missing file gives empty defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no defaults file at {}", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Defaults {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        };
        Self::from_xml(&content).map_err(|reason| ConfigError::Defaults {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse `<curlew><user-agent>..</user-agent><timeout>30</timeout>..</curlew>`.
    /// Durations are in seconds and may be fractional. Unknown elements are ignored.
    pub fn from_xml(content: &str) -> Result<Self, String> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut out = ClientDefaults::default();
        let mut in_root = false;
        let mut element = Vec::<u8>::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Err(e) => return Err(format!("XML parse error: {}", e)),
                Ok(Event::Eof) => break,
                Ok(Event::Start(e)) => {
                    let name = e.name();
                    if name.as_ref() == b"curlew" {
                        in_root = true;
                    } else if in_root {
                        element.clear();
                        element.extend_from_slice(name.as_ref());
                    }
                }
                Ok(Event::Text(e)) => {
                    if element.is_empty() {
                        continue;
                    }
                    let text = e.unescape().map_err(|e| e.to_string())?.trim().to_string();
                    let bad = |what: &str| format!("invalid {}: {:?}", what, text);
                    match element.as_slice() {
                        b"user-agent" => out.user_agent = Some(text.clone()),
                        b"timeout" => out.timeout = Some(parse_seconds(&text).ok_or_else(|| bad("timeout"))?),
                        b"connect-timeout" => {
                            out.connect_timeout = Some(parse_seconds(&text).ok_or_else(|| bad("connect-timeout"))?)
                        }
                        b"verify-peer" => out.verify_peer = Some(parse_bool(&text).ok_or_else(|| bad("verify-peer"))?),
                        b"max-redirects" => {
                            out.max_redirects = Some(text.parse().map_err(|_| bad("max-redirects"))?)
                        }
                        b"concurrency" => {
                            let n: usize = text.parse().map_err(|_| bad("concurrency"))?;
                            out.concurrency = Some(n.max(1));
                        }
                        other => debug!("ignoring defaults element {}", String::from_utf8_lossy(other)),
                    }
                    element.clear();
                }
                Ok(Event::End(e)) => {
                    if e.name().as_ref() == b"curlew" {
                        in_root = false;
                    }
                    element.clear();
                }
                _ => {}
            }
            buf.clear();
        }
        Ok(out)
    }

    /// Defaults from `CURLEW_*` environment variables only.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Override fields from `CURLEW_USER_AGENT`, `CURLEW_TIMEOUT`, `CURLEW_CONNECT_TIMEOUT`,
    /// `CURLEW_VERIFY_PEER`, `CURLEW_MAX_REDIRECTS` and `CURLEW_CONCURRENCY`. Unparseable values
    /// are logged and skipped.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T>(var: &impl Fn(&str) -> Option<String>, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
            let value = var(name)?;
            let out = parse(&value);
            if out.is_none() {
                warn!("ignoring {}={:?}", name, value);
            }
            out
        }
        if let Some(agent) = var("CURLEW_USER_AGENT") {
            self.user_agent = Some(agent);
        }
        if let Some(t) = parsed(&var, "CURLEW_TIMEOUT", parse_seconds) {
            self.timeout = Some(t);
        }
        if let Some(t) = parsed(&var, "CURLEW_CONNECT_TIMEOUT", parse_seconds) {
            self.connect_timeout = Some(t);
        }
        if let Some(v) = parsed(&var, "CURLEW_VERIFY_PEER", parse_bool) {
            self.verify_peer = Some(v);
        }
        if let Some(n) = parsed(&var, "CURLEW_MAX_REDIRECTS", |s| s.trim().parse::<u32>().ok()) {
            self.max_redirects = Some(n);
        }
        if let Some(n) = parsed(&var, "CURLEW_CONCURRENCY", |s| s.trim().parse::<usize>().ok()) {
            self.concurrency = Some(n.max(1));
        }
        self
    }

    /// Copy of `spec` with every unset setting filled from these defaults. A setting given as a
    /// raw option on the request counts as set.
    pub fn apply(&self, spec: &RequestSpec) -> RequestSpec {
        let mut out = spec.clone();
        let raw = |names: &[&str]| names.iter().any(|n| spec.option_value(n).is_some());
        if out.user_agent.is_none() && !raw(&["userAgent"]) {
            out.user_agent = self.user_agent.clone();
        }
        if out.timeout.is_none() && !raw(&["timeout", "timeoutMs"]) {
            out.timeout = self.timeout;
        }
        if out.connect_timeout.is_none() && !raw(&["connectTimeout", "connectTimeoutMs"]) {
            out.connect_timeout = self.connect_timeout;
        }
        if out.tls.verify_peer.is_none() && !raw(&["sslVerifyPeer"]) {
            out.tls.verify_peer = self.verify_peer;
        }
        if out.max_redirects.is_none() && !raw(&["maxRedirs", "followLocation"]) {
            out.max_redirects = self.max_redirects;
        }
        out
    }
}
