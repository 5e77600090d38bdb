/*
 * uri.rs
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

//! URL and query-string helpers. Query strings are encoded per RFC 3986 (space as `%20`) and
//! decoded leniently (`+` and `%20` both become a space).

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except RFC 3986 unreserved characters.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode one query component.
pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, QUERY_COMPONENT).to_string()
}

/// Decode one query component (`+` is a space).
pub fn decode_component(s: &str) -> String {
    let s = s.replace('+', " ");
    percent_decode_str(&s).decode_utf8_lossy().into_owned()
}

/// Build `k=v&k2=v2` from pairs.
pub fn build_query<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = String::new();
    for (k, v) in pairs {
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str(&encode_component(k.as_ref()));
        out.push('=');
        out.push_str(&encode_component(v.as_ref()));
    }
    out
}

/// Split a query string into decoded pairs in order. Empty segments are ignored; a segment
/// without `=` yields an empty value.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((k, v)) => (decode_component(k), decode_component(v)),
            None => (decode_component(segment), String::new()),
        })
        .collect()
}

/// Append query parameters to a URL string, using `&` when it already has a query.
pub fn append_query<K, V>(url: &str, pairs: impl IntoIterator<Item = (K, V)>) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let query = build_query(pairs);
    if query.is_empty() {
        return url.to_string();
    }
    let (base, fragment) = match url.find('#') {
        Some(i) => url.split_at(i),
        None => (url, ""),
    };
    let sep = if !base.contains('?') {
        "?"
    } else if base.ends_with('?') || base.ends_with('&') {
        ""
    } else {
        "&"
    };
    format!("{}{}{}{}", base, sep, query, fragment)
}

/// Join a base URL and a path with exactly one slash between them.
pub fn join_path(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3986_encoding() {
        assert_eq!(build_query([("q", "a b"), ("x", "1&2")]), "q=a%20b&x=1%262");
        assert_eq!(encode_component("a-b_c.d~e"), "a-b_c.d~e");
    }

    #[test]
    fn parse_is_lenient() {
        let pairs = parse_query("a=1&&b=x+y%21&flag");
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "x y!".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn encode_then_parse_round_trips() {
        let input = vec![
            ("name".to_string(), "Zoë & co".to_string()),
            ("path".to_string(), "/a/b?c=d".to_string()),
            ("empty".to_string(), String::new()),
        ];
        assert_eq!(parse_query(&build_query(input.clone())), input);
    }

    #[test]
    fn append_to_url() {
        assert_eq!(append_query("http://h/p", [("a", "1")]), "http://h/p?a=1");
        assert_eq!(append_query("http://h/p?x=2", [("a", "1")]), "http://h/p?x=2&a=1");
        assert_eq!(append_query("http://h/p#frag", [("a", "1")]), "http://h/p?a=1#frag");
        assert_eq!(append_query("http://h/p", Vec::<(&str, &str)>::new()), "http://h/p");
    }

    #[test]
    fn join_single_slash() {
        assert_eq!(join_path("http://h/api/", "/v1/items"), "http://h/api/v1/items");
        assert_eq!(join_path("http://h", ""), "http://h");
    }
}
