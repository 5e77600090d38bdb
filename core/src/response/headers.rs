/*
 * headers.rs
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

//! Parsed response headers keyed by canonical (camel-case) name.
//!
//! `Content-Type`, `content_type` and `CONTENT-TYPE` all canonicalize to `contentType`, so
//! lookups do not depend on how the server (or the caller) spelled the name.

/// Separators that split a name into camel-case words.
fn is_separator(c: char) -> bool {
    c == '-' || c == '_' || c == ' '
}

/// True if the name contains a separator and would be rewritten by `canonical_name`.
pub fn has_separator(name: &str) -> bool {
    name.chars().any(is_separator)
}

/// Canonical camel-case form of a header, metric or body key name.
///
/// Names with separators: first word lower-case, following words capitalized
/// (`X-Request-ID` → `xRequestId`). Single words only get their first letter lowered, which
/// keeps names that are already camel-case intact (`contentType` → `contentType`).
pub fn canonical_name(name: &str) -> String {
    let name = name.trim();
    let mut out = String::with_capacity(name.len());
    if !has_separator(name) {
        let mut chars = name.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_lowercase());
            out.push_str(chars.as_str());
        }
        return out;
    }
    let mut words = name.split(is_separator).filter(|w| !w.is_empty());
    if let Some(first) = words.next() {
        out.push_str(&first.to_lowercase());
    }
    for word in words {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out
}

/// Compare two names by canonical form.
pub fn same_name(a: &str, b: &str) -> bool {
    canonical_name(a).eq_ignore_ascii_case(&canonical_name(b))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    key: String,
    name: String,
    value: String,
}

/// Ordered header map. One value per canonical name: a repeated header overwrites the earlier
/// value but keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<Entry>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a header. The name is canonicalized; the spelling as received is kept for `raw_name`.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let key = canonical_name(name);
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.key.eq_ignore_ascii_case(&key)) {
            Some(entry) => {
                entry.name = name.trim().to_string();
                entry.value = value;
            }
            None => self.entries.push(Entry {
                key,
                name: name.trim().to_string(),
                value,
            }),
        }
    }

    /// Look up by any spelling of the name.
    pub fn get(&self, name: &str) -> Option<&str> {
        let key = canonical_name(name);
        self.entries
            .iter()
            .find(|e| e.key.eq_ignore_ascii_case(&key))
            .map(|e| e.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The header name as the server sent it (last occurrence).
    pub fn raw_name(&self, name: &str) -> Option<&str> {
        let key = canonical_name(name);
        self.entries
            .iter()
            .find(|e| e.key.eq_ignore_ascii_case(&key))
            .map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(canonical name, value)` in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|e| (e.key.as_str(), e.value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_camel_case() {
        assert_eq!(canonical_name("Content-Type"), "contentType");
        assert_eq!(canonical_name("content_type"), "contentType");
        assert_eq!(canonical_name("X-Request-ID"), "xRequestId");
        assert_eq!(canonical_name("HTTP_CODE"), "httpCode");
        assert_eq!(canonical_name("Server"), "server");
        assert_eq!(canonical_name("contentType"), "contentType");
    }

    #[test]
    fn lookup_is_shape_independent() {
        let mut h = Headers::new();
        h.insert("Content-Type", "application/json");
        assert_eq!(h.get("contentType"), Some("application/json"));
        assert_eq!(h.get("content_type"), Some("application/json"));
        assert_eq!(h.get("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(h.raw_name("content-type"), Some("Content-Type"));
    }

    #[test]
    fn later_duplicate_overwrites_in_place() {
        let mut h = Headers::new();
        h.insert("Set-Cookie", "a=1");
        h.insert("Server", "test");
        h.insert("set-cookie", "b=2");
        assert_eq!(h.len(), 2);
        let order: Vec<_> = h.iter().collect();
        assert_eq!(order, vec![("setCookie", "b=2"), ("server", "test")]);
    }
}
