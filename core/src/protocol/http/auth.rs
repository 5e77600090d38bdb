/*
 * auth.rs
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

//! HTTP authentication: Basic (RFC 7617) and Digest (RFC 7616, MD5 and SHA-256, `qop=auth`).

use base64::Engine;
use md5::{Digest, Md5};
use sha2::Sha256;

/// `Authorization` value for Basic.
pub fn basic(username: &str, password: &str) -> String {
    let token = base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username, password));
    format!("Basic {}", token)
}

/// A parsed `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// `MD5` when absent.
    pub algorithm: Option<String>,
    /// Comma-separated qop options offered by the server.
    pub qop: Option<String>,
}

impl DigestChallenge {
    /// Parse a challenge value. Returns `None` for other schemes or when `nonce` is missing.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let scheme = value.get(..6)?;
        if !scheme.eq_ignore_ascii_case("digest") {
            return None;
        }
        let mut challenge = DigestChallenge::default();
        let mut nonce = None;
        for (key, val) in auth_params(&value[6..]) {
            match key.to_ascii_lowercase().as_str() {
                "realm" => challenge.realm = val,
                "nonce" => nonce = Some(val),
                "opaque" => challenge.opaque = Some(val),
                "algorithm" => challenge.algorithm = Some(val),
                "qop" => challenge.qop = Some(val),
                _ => {}
            }
        }
        challenge.nonce = nonce?;
        Some(challenge)
    }

    fn algorithm(&self) -> &str {
        self.algorithm.as_deref().unwrap_or("MD5")
    }

    /// Only MD5 and SHA-256 (and their `-sess` forms) are supported.
    pub fn is_supported(&self) -> bool {
        matches!(
            self.algorithm().to_ascii_uppercase().as_str(),
            "MD5" | "MD5-SESS" | "SHA-256" | "SHA-256-SESS"
        )
    }

    fn offers_auth_qop(&self) -> bool {
        self.qop
            .as_deref()
            .map_or(false, |q| q.split(',').any(|o| o.trim().eq_ignore_ascii_case("auth")))
    }

    fn hash(&self, data: &str) -> String {
        if self.algorithm().to_ascii_uppercase().starts_with("SHA-256") {
            format!("{:x}", Sha256::digest(data.as_bytes()))
        } else {
            format!("{:x}", Md5::digest(data.as_bytes()))
        }
    }

    /// `Authorization` value answering this challenge.
    pub fn respond(
        &self,
        username: &str,
        password: &str,
        method: &str,
        uri: &str,
        nc: u32,
        cnonce: &str,
    ) -> String {
        let mut ha1 = self.hash(&format!("{}:{}:{}", username, self.realm, password));
        if self.algorithm().to_ascii_uppercase().ends_with("-SESS") {
            ha1 = self.hash(&format!("{}:{}:{}", ha1, self.nonce, cnonce));
        }
        let ha2 = self.hash(&format!("{}:{}", method, uri));
        let nc = format!("{:08x}", nc);
        let qop = self.offers_auth_qop();
        let response = if qop {
            self.hash(&format!("{}:{}:{}:{}:auth:{}", ha1, self.nonce, nc, cnonce, ha2))
        } else {
            self.hash(&format!("{}:{}:{}", ha1, self.nonce, ha2))
        };

        let mut out = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\"",
            username, self.realm, self.nonce, uri
        );
        if let Some(alg) = &self.algorithm {
            out.push_str(&format!(", algorithm={}", alg));
        }
        if qop {
            out.push_str(&format!(", qop=auth, nc={}, cnonce=\"{}\"", nc, cnonce));
        }
        out.push_str(&format!(", response=\"{}\"", response));
        if let Some(opaque) = &self.opaque {
            out.push_str(&format!(", opaque=\"{}\"", opaque));
        }
        out
    }
}

/// Client nonce: 16 random bytes, hex.
pub fn cnonce() -> String {
    let mut bytes = [0u8; 16];
    if getrandom::getrandom(&mut bytes).is_err() {
        // Uniqueness is all that matters here.
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        bytes.copy_from_slice(&nanos.to_le_bytes());
    }
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// True if any challenge offers Basic.
pub fn offers_basic<'a>(challenges: impl IntoIterator<Item = &'a str>) -> bool {
    challenges.into_iter().any(|c| {
        c.trim()
            .get(..5)
            .map_or(false, |s| s.eq_ignore_ascii_case("basic"))
    })
}

/// `key=value` / `key="quoted, value"` pairs of a challenge.
fn auth_params(s: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut chars = s.chars().peekable();
    loop {
        while matches!(chars.peek(), Some(c) if *c == ',' || c.is_whitespace()) {
            chars.next();
        }
        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ',' {
                break;
            }
            key.push(c);
            chars.next();
        }
        if key.is_empty() && chars.peek().is_none() {
            break;
        }
        let mut value = String::new();
        if chars.peek() == Some(&'=') {
            chars.next();
            if chars.peek() == Some(&'"') {
                chars.next();
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                value.push(escaped);
                            }
                        }
                        '"' => break,
                        _ => value.push(c),
                    }
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c == ',' {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
            }
        }
        let key = key.trim();
        if !key.is_empty() {
            out.push((key.to_string(), value.trim().to_string()));
        }
        if chars.peek().is_none() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_header() {
        assert_eq!(basic("Aladdin", "open sesame"), "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
    }

    #[test]
    fn parse_challenge() {
        let c = DigestChallenge::parse(
            "Digest realm=\"testrealm@host.com\", qop=\"auth,auth-int\", \
             nonce=\"dcd98b7102dd2f0e8b11d0f600bfb0c093\", opaque=\"5ccc069c403ebaf9f0171e9517f40e41\"",
        )
        .unwrap();
        assert_eq!(c.realm, "testrealm@host.com");
        assert_eq!(c.qop.as_deref(), Some("auth,auth-int"));
        assert_eq!(c.opaque.as_deref(), Some("5ccc069c403ebaf9f0171e9517f40e41"));
        assert!(c.is_supported());
        assert!(DigestChallenge::parse("Basic realm=\"x\"").is_none());
        assert!(DigestChallenge::parse("Digest realm=\"x\"").is_none());
    }

    #[test]
    fn rfc2617_response() {
        let c = DigestChallenge {
            realm: "testrealm@host.com".into(),
            nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093".into(),
            opaque: Some("5ccc069c403ebaf9f0171e9517f40e41".into()),
            algorithm: None,
            qop: Some("auth,auth-int".into()),
        };
        let header = c.respond("Mufasa", "Circle Of Life", "GET", "/dir/index.html", 1, "0a4f113b");
        assert!(header.contains("response=\"6629fae49393a05397450978507c4ef1\""));
        assert!(header.contains("nc=00000001"));
        assert!(header.contains("opaque=\"5ccc069c403ebaf9f0171e9517f40e41\""));
    }

    #[test]
    fn basic_offered() {
        assert!(offers_basic(["Digest realm=\"a\"", "basic realm=\"b\""]));
        assert!(!offers_basic(["Bearer"]));
    }

    #[test]
    fn cnonce_is_hex() {
        let n = cnonce();
        assert_eq!(n.len(), 32);
        assert!(n.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
