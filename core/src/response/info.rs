/*
 * info.rs
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

//! Transfer information attached to every response.

use std::time::Duration;

use crate::protocol::http::TransferMetadata;
use crate::response::headers::canonical_name;

/// Value of a metric looked up by name.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    Text(String),
    Integer(i64),
    /// Durations are reported in seconds, like curl's `*_time` fields.
    Seconds(f64),
}

/// Immutable transfer information: transport metadata plus what the header parser learnt from
/// the status line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Info {
    url: Option<String>,
    http_code: u16,
    http_version: Option<String>,
    http_code_description: Option<String>,
    content_type: Option<String>,
    header_size: usize,
    total_time: Duration,
    connect_time: Duration,
    redirect_count: u32,
    size_download: u64,
    size_upload: u64,
    primary_ip: Option<String>,
    primary_port: Option<u16>,
}

impl Info {
    pub(crate) fn from_metadata(meta: &TransferMetadata) -> Self {
        Self {
            url: meta.effective_url.clone(),
            http_code: meta.http_code,
            http_version: None,
            http_code_description: None,
            content_type: meta.content_type.clone(),
            header_size: meta.header_size.unwrap_or(0),
            total_time: meta.total_time,
            connect_time: meta.connect_time,
            redirect_count: meta.redirect_count,
            size_download: meta.size_download,
            size_upload: meta.size_upload,
            primary_ip: meta.primary_ip.clone(),
            primary_port: meta.primary_port,
        }
    }

    pub(crate) fn set_url(&mut self, url: &str) {
        self.url = Some(url.to_string());
    }

    pub(crate) fn set_status(&mut self, version: &str, code: u16, description: Option<&str>) {
        self.http_version = Some(version.to_string());
        self.http_code = code;
        self.http_code_description = description.map(str::to_string);
    }

    pub(crate) fn set_content_type(&mut self, content_type: &str) {
        self.content_type = Some(content_type.to_string());
    }

    pub(crate) fn set_header_size(&mut self, size: usize) {
        self.header_size = size;
    }

    /// Effective URL (after redirects).
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Status code; 0 if no status line was received.
    pub fn http_code(&self) -> u16 {
        self.http_code
    }

    pub fn http_version(&self) -> Option<&str> {
        self.http_version.as_deref()
    }

    /// Reason phrase from the status line.
    pub fn http_code_description(&self) -> Option<&str> {
        self.http_code_description.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Byte offset of the body in the raw output.
    pub fn header_size(&self) -> usize {
        self.header_size
    }

    pub fn total_time(&self) -> Duration {
        self.total_time
    }

    pub fn connect_time(&self) -> Duration {
        self.connect_time
    }

    pub fn redirect_count(&self) -> u32 {
        self.redirect_count
    }

    pub fn size_download(&self) -> u64 {
        self.size_download
    }

    pub fn size_upload(&self) -> u64 {
        self.size_upload
    }

    pub fn primary_ip(&self) -> Option<&str> {
        self.primary_ip.as_deref()
    }

    pub fn primary_port(&self) -> Option<u16> {
        self.primary_port
    }

    /// Look up a metric by any spelling of its name (`http_code`, `httpCode`, `HTTP-CODE`).
    pub fn get(&self, name: &str) -> Option<InfoValue> {
        let key = canonical_name(name).to_ascii_lowercase();
        let text = |v: &Option<String>| v.clone().map(InfoValue::Text);
        match key.as_str() {
            "url" | "effectiveurl" => text(&self.url),
            "httpcode" => Some(InfoValue::Integer(i64::from(self.http_code))),
            "httpversion" => text(&self.http_version),
            "httpcodedescription" => text(&self.http_code_description),
            "contenttype" => text(&self.content_type),
            "headersize" => Some(InfoValue::Integer(self.header_size as i64)),
            "totaltime" => Some(InfoValue::Seconds(self.total_time.as_secs_f64())),
            "connecttime" => Some(InfoValue::Seconds(self.connect_time.as_secs_f64())),
            "redirectcount" => Some(InfoValue::Integer(i64::from(self.redirect_count))),
            "sizedownload" => Some(InfoValue::Integer(self.size_download as i64)),
            "sizeupload" => Some(InfoValue::Integer(self.size_upload as i64)),
            "primaryip" => text(&self.primary_ip),
            "primaryport" => self.primary_port.map(|p| InfoValue::Integer(i64::from(p))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_any_spelling() {
        let meta = TransferMetadata {
            effective_url: Some("http://example.com/".into()),
            http_code: 200,
            redirect_count: 2,
            ..Default::default()
        };
        let info = Info::from_metadata(&meta);
        assert_eq!(info.get("http_code"), Some(InfoValue::Integer(200)));
        assert_eq!(info.get("httpCode"), Some(InfoValue::Integer(200)));
        assert_eq!(info.get("redirect-count"), Some(InfoValue::Integer(2)));
        assert_eq!(
            info.get("url"),
            Some(InfoValue::Text("http://example.com/".into()))
        );
        assert_eq!(info.get("no_such_metric"), None);
    }
}
