/*
 * encoding.rs
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

//! Content-Encoding decoding (gzip, deflate) with flate2.

use std::io::{self, Read};

use flate2::read::{DeflateDecoder, MultiGzDecoder, ZlibDecoder};

/// Decode `data` according to a `Content-Encoding` value. Stacked encodings (`gzip, identity`)
/// are undone in reverse order.
pub fn decode(content_encoding: &str, data: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = data.to_vec();
    for coding in content_encoding.rsplit(',').map(str::trim) {
        out = match coding.to_ascii_lowercase().as_str() {
            "" | "identity" => out,
            "gzip" | "x-gzip" => read_all(MultiGzDecoder::new(&out[..]))?,
            "deflate" => inflate(&out)?,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("unsupported content encoding {}", other),
                ))
            }
        };
    }
    Ok(out)
}

/// `deflate` is meant to be zlib-wrapped, but some servers send raw deflate.
fn inflate(data: &[u8]) -> io::Result<Vec<u8>> {
    read_all(ZlibDecoder::new(data)).or_else(|_| read_all(DeflateDecoder::new(data)))
}

fn read_all(mut reader: impl Read) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    reader.read_to_end(&mut out)?;
    Ok(out)
}
