/*
 * negotiate.rs
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

//! Body content negotiation: picks exactly one `Body` variant for a response body.
//!
//! Servers mislabel content often enough that the declared type is only a hint. Declared JSON
//! and XML are tried first, then the body is sniffed: HTML doctype, PHP serialized value, query
//! string, and finally plain text. Nothing here fails; every path ends at `Body::Text`.

use log::trace;

use crate::response::body::{Body, HtmlDocument, QueryMap, XmlDocument};
use crate::response::headers::{canonical_name, has_separator};
use crate::response::serialized::{self, SerializedKey, SerializedValue};
use crate::uri::decode_component;

/// Characters stripped from both ends of a body before sniffing.
fn is_trim_char(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\0' | '\x0B')
}

/// Lower-cased media type without parameters (`Application/JSON; charset=utf-8` → `application/json`).
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Decode `body` using the optional content-type hint.
pub fn negotiate(body: &[u8], content_type: Option<&str>) -> Body {
    let text = String::from_utf8_lossy(body);
    let text = text.trim_matches(is_trim_char);
    let hint = content_type.map(media_type).filter(|m| !m.is_empty());

    let json_candidate = match hint.as_deref() {
        Some(m) => m == "application/json",
        None => text.starts_with('{') || text.starts_with('['),
    };
    if json_candidate {
        if let Some(value) = decode_json(text) {
            trace!("negotiated JSON body");
            return Body::Json(value);
        }
    }

    let xml_candidate = match hint.as_deref() {
        Some(m) => m == "application/xml",
        None => text.contains("?xml"),
    };
    if xml_candidate {
        match XmlDocument::parse(text) {
            Ok(doc) => {
                trace!("negotiated XML body");
                return Body::Xml(doc);
            }
            Err(e) => trace!("XML candidate rejected: {}", e),
        }
    }

    if text.to_ascii_lowercase().contains("!doctype") {
        trace!("negotiated HTML body");
        return Body::Html(HtmlDocument::parse(text));
    }

    if let Some(value) = serialized::decode(text.as_bytes()) {
        trace!("negotiated serialized body");
        return Body::Serialized(camelize_serialized(value));
    }

    if let Some(query) = decode_query(text) {
        trace!("negotiated query-string body");
        return Body::Query(query);
    }

    Body::Text(text.to_string())
}

/// JSON object or array; top-level object keys are canonicalized.
fn decode_json(text: &str) -> Option<serde_json::Value> {
    match serde_json::from_str::<serde_json::Value>(text).ok()? {
        serde_json::Value::Object(map) => Some(serde_json::Value::Object(
            map.into_iter()
                .map(|(k, v)| (camelize(k), v))
                .collect(),
        )),
        array @ serde_json::Value::Array(_) => Some(array),
        _ => None,
    }
}

fn camelize(key: String) -> String {
    if has_separator(&key) {
        canonical_name(&key)
    } else {
        key
    }
}

fn camelize_entries(
    entries: Vec<(SerializedKey, SerializedValue)>,
) -> Vec<(SerializedKey, SerializedValue)> {
    entries
        .into_iter()
        .map(|(k, v)| match k {
            SerializedKey::Str(s) => (SerializedKey::Str(camelize(s)), v),
            int => (int, v),
        })
        .collect()
}

fn camelize_serialized(value: SerializedValue) -> SerializedValue {
    match value {
        SerializedValue::Array(entries) => SerializedValue::Array(camelize_entries(entries)),
        SerializedValue::Object { class, properties } => SerializedValue::Object {
            class,
            properties: camelize_entries(properties),
        },
        other => other,
    }
}

/// Strict `k=v&k2=v2` decoding: every non-empty segment needs `=` and a key without whitespace.
fn decode_query(text: &str) -> Option<QueryMap> {
    if text.is_empty() || text.chars().any(char::is_whitespace) {
        return None;
    }
    let mut map = QueryMap::new();
    for segment in text.split('&').filter(|s| !s.is_empty()) {
        let (raw_key, raw_value) = segment.split_once('=')?;
        let key = decode_component(raw_key);
        if key.is_empty() || key.chars().any(char::is_whitespace) {
            return None;
        }
        map.insert(camelize(key), decode_component(raw_value));
    }
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::body::BodyKind;
    use serde_json::json;

    #[test]
    fn declared_json_with_parameters() {
        let body = negotiate(br#"{"a":1}"#, Some("Application/JSON; charset=utf-8"));
        assert_eq!(body, Body::Json(json!({"a": 1})));
    }

    #[test]
    fn json_keys_camelized_at_top_level_only() {
        let body = negotiate(
            br#"{"user_id":7,"profile":{"first_name":"x"}}"#,
            Some("application/json"),
        );
        assert_eq!(
            body,
            Body::Json(json!({"userId": 7, "profile": {"first_name": "x"}}))
        );
    }

    #[test]
    fn undeclared_json_is_sniffed() {
        assert_eq!(negotiate(b"  [1,2]\n", None), Body::Json(json!([1, 2])));
    }

    #[test]
    fn json_scalar_is_not_json_body() {
        assert_eq!(negotiate(b"42", Some("application/json")), Body::Text("42".into()));
    }

    #[test]
    fn reserialized_json_is_stable() {
        let first = negotiate(br#"{"a":[1,{"b":null}],"c":"d"}"#, None);
        let value = first.as_json().unwrap().clone();
        let again = negotiate(value.to_string().as_bytes(), Some("application/json"));
        assert_eq!(first, again);
    }

    #[test]
    fn invalid_declared_json_falls_through() {
        assert_eq!(
            negotiate(b"a=1", Some("application/json")),
            Body::Query([("a", "1")].into_iter().collect())
        );
    }

    #[test]
    fn xml_by_hint_or_sniff() {
        let body = negotiate(b"<r><v>1</v></r>", Some("application/xml"));
        assert!(matches!(body, Body::Xml(ref d) if d.root().name == "r"));
        let body = negotiate(b"<?xml version=\"1.0\"?><r/>", None);
        assert!(matches!(body, Body::Xml(_)));
    }

    #[test]
    fn broken_xml_degrades() {
        let body = negotiate(b"<?xml version=\"1.0\"?><r>", None);
        assert_eq!(body, Body::Text("<?xml version=\"1.0\"?><r>".into()));
    }

    #[test]
    fn doctype_any_case_is_html() {
        let body = negotiate(b"<!DocType html><title>T</title>", Some("text/html"));
        match body {
            Body::Html(doc) => assert_eq!(doc.title(), Some("T")),
            other => panic!("expected HTML, got {:?}", other),
        }
    }

    #[test]
    fn serialized_array_keys_camelized() {
        let body = negotiate(b"a:1:{s:7:\"the_key\";i:1;}", None);
        match body {
            Body::Serialized(v) => assert_eq!(v.get("theKey").and_then(|v| v.as_i64()), Some(1)),
            other => panic!("expected serialized, got {:?}", other),
        }
    }

    #[test]
    fn query_string_without_hint() {
        let body = negotiate(b"a=1&b=2", None);
        let q = body.as_query().unwrap();
        assert_eq!(q.get("a"), Some("1"));
        assert_eq!(q.get("b"), Some("2"));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn query_decoding() {
        let body = negotiate(b"first_name=J%C3%BCrgen+K&empty=", Some("text/plain"));
        let q = body.as_query().unwrap();
        assert_eq!(q.get("firstName"), Some("Jürgen K"));
        assert_eq!(q.get("empty"), Some(""));
    }

    #[test]
    fn plain_text_fallback() {
        assert_eq!(negotiate(b"Not Found\n", None), Body::Text("Not Found".into()));
        assert_eq!(negotiate(b"token", None), Body::Text("token".into()));
        assert_eq!(negotiate(b"", None), Body::Text(String::new()));
        assert_eq!(negotiate(b"=1", None), Body::Text("=1".into()));
    }

    #[test]
    fn deeply_nested_xml_degrades_to_text() {
        let depth = 50_000;
        let source = format!(
            "<?xml version=\"1.0\"?>{}{}",
            "<a>".repeat(depth),
            "</a>".repeat(depth)
        );
        let body = negotiate(source.as_bytes(), None);
        assert_eq!(body.kind(), BodyKind::Text);
        let body = negotiate(source.as_bytes(), Some("application/xml"));
        assert_eq!(body.kind(), BodyKind::Text);
    }
}
