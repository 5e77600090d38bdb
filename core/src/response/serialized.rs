/*
 * serialized.rs
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

//! Decoder for the PHP `serialize()` text format, still emitted by legacy endpoints.
//!
//! Grammar: `N;` `b:0;` `i:42;` `d:0.5;` `s:<bytes>:"...";` `a:<n>:{<key><value>...}`
//! `O:<len>:"<class>":<n>:{<key><value>...}`. Keys are `i:` or `s:` values. String lengths are
//! byte counts. References (`r:`/`R:`) and custom (`C:`) payloads are rejected.

/// Array / object key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SerializedKey {
    Int(i64),
    Str(String),
}

impl SerializedKey {
    fn matches(&self, name: &str) -> bool {
        match self {
            SerializedKey::Str(s) => s == name,
            SerializedKey::Int(i) => name.parse::<i64>().map(|n| n == *i).unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SerializedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<(SerializedKey, SerializedValue)>),
    Object {
        class: String,
        properties: Vec<(SerializedKey, SerializedValue)>,
    },
}

impl SerializedValue {
    /// Entry of an array or property of an object.
    pub fn get(&self, key: &str) -> Option<&SerializedValue> {
        let entries = match self {
            SerializedValue::Array(entries) => entries,
            SerializedValue::Object { properties, .. } => properties,
            _ => return None,
        };
        entries.iter().find(|(k, _)| k.matches(key)).map(|(_, v)| v)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SerializedValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SerializedValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

const MAX_DEPTH: usize = 64;

struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn expect(&mut self, byte: u8) -> Option<()> {
        if self.input.get(self.pos) == Some(&byte) {
            self.pos += 1;
            Some(())
        } else {
            None
        }
    }

    /// Bytes up to (not including) `delim`; consumes the delimiter.
    fn until(&mut self, delim: u8) -> Option<&'a [u8]> {
        let input = self.input;
        let rest = &input[self.pos..];
        let n = rest.iter().position(|&b| b == delim)?;
        self.pos += n + 1;
        Some(&rest[..n])
    }

    fn integer(&mut self, delim: u8) -> Option<i64> {
        std::str::from_utf8(self.until(delim)?).ok()?.parse().ok()
    }

    fn length(&mut self) -> Option<usize> {
        usize::try_from(self.integer(b':')?).ok()
    }

    /// `"<len bytes>"` with the length already read.
    fn quoted(&mut self, len: usize) -> Option<String> {
        self.expect(b'"')?;
        let end = self.pos.checked_add(len)?;
        let input = self.input;
        let bytes = input.get(self.pos..end)?;
        self.pos = end;
        self.expect(b'"')?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    fn key(&mut self) -> Option<SerializedKey> {
        match self.value(MAX_DEPTH)? {
            SerializedValue::Int(i) => Some(SerializedKey::Int(i)),
            SerializedValue::Str(s) => Some(SerializedKey::Str(s)),
            _ => None,
        }
    }

    fn entries(&mut self, depth: usize) -> Option<Vec<(SerializedKey, SerializedValue)>> {
        let count = self.length()?;
        self.expect(b'{')?;
        let mut entries = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let key = self.key()?;
            let value = self.value(depth - 1)?;
            entries.push((key, value));
        }
        self.expect(b'}')?;
        Some(entries)
    }

    fn value(&mut self, depth: usize) -> Option<SerializedValue> {
        if depth == 0 {
            return None;
        }
        let tag = *self.input.get(self.pos)?;
        self.pos += 1;
        if tag == b'N' {
            self.expect(b';')?;
            return Some(SerializedValue::Null);
        }
        self.expect(b':')?;
        match tag {
            b'b' => match self.until(b';')? {
                b"0" => Some(SerializedValue::Bool(false)),
                b"1" => Some(SerializedValue::Bool(true)),
                _ => None,
            },
            b'i' => self.integer(b';').map(SerializedValue::Int),
            b'd' => {
                let text = std::str::from_utf8(self.until(b';')?).ok()?;
                text.parse::<f64>().ok().map(SerializedValue::Float)
            }
            b's' => {
                let len = self.length()?;
                let s = self.quoted(len)?;
                self.expect(b';')?;
                Some(SerializedValue::Str(s))
            }
            b'a' => self.entries(depth).map(SerializedValue::Array),
            b'O' => {
                let len = self.length()?;
                let class = self.quoted(len)?;
                self.expect(b':')?;
                let properties = self.entries(depth)?;
                Some(SerializedValue::Object { class, properties })
            }
            _ => None,
        }
    }
}

/// Decode a complete serialized value. Returns `None` unless the whole input is one well-formed
/// value.
pub fn decode(input: &[u8]) -> Option<SerializedValue> {
    let mut reader = Reader { input, pos: 0 };
    let value = reader.value(MAX_DEPTH)?;
    if reader.pos == input.len() {
        Some(value)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars() {
        assert_eq!(decode(b"N;"), Some(SerializedValue::Null));
        assert_eq!(decode(b"b:1;"), Some(SerializedValue::Bool(true)));
        assert_eq!(decode(b"i:-42;"), Some(SerializedValue::Int(-42)));
        assert_eq!(decode(b"d:0.5;"), Some(SerializedValue::Float(0.5)));
        assert_eq!(decode(b"s:5:\"hello\";"), Some(SerializedValue::Str("hello".into())));
    }

    #[test]
    fn string_length_counts_bytes() {
        // "é" is two bytes; an embedded quote does not end the string.
        assert_eq!(
            decode("s:4:\"é\"x\";".as_bytes()),
            Some(SerializedValue::Str("é\"x".into()))
        );
        assert_eq!(decode(b"s:9:\"short\";"), None);
    }

    #[test]
    fn nested_array() {
        let v = decode(b"a:2:{s:4:\"user\";a:1:{s:2:\"id\";i:7;}i:0;s:1:\"x\";}").unwrap();
        assert_eq!(v.get("user").and_then(|u| u.get("id")).and_then(|i| i.as_i64()), Some(7));
        assert_eq!(v.get("0").and_then(|x| x.as_str()), Some("x"));
    }

    #[test]
    fn object_with_class() {
        let v = decode(b"O:8:\"stdClass\":1:{s:4:\"name\";s:3:\"abc\";}").unwrap();
        match &v {
            SerializedValue::Object { class, .. } => assert_eq!(class, "stdClass"),
            other => panic!("expected object, got {:?}", other),
        }
        assert_eq!(v.get("name").and_then(|n| n.as_str()), Some("abc"));
    }

    #[test]
    fn rejects_trailing_data_and_plain_text() {
        assert_eq!(decode(b"i:1;i:2;"), None);
        assert_eq!(decode(b"Not Found"), None);
        assert_eq!(decode(b"a=1&b=2"), None);
        assert_eq!(decode(b"a:1:{i:0;r:1;}"), None);
    }

    #[test]
    fn depth_is_bounded() {
        let mut deep = String::new();
        for _ in 0..100 {
            deep.push_str("a:1:{i:0;");
        }
        deep.push_str("N;");
        for _ in 0..100 {
            deep.push('}');
        }
        assert_eq!(decode(deep.as_bytes()), None);
    }
}
