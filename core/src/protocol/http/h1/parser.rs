/*
 * parser.rs
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

//! HTTP/1.x response push parser: status line, headers, body (Content-Length, chunked, or read
//! until close).
//!
//! Lines end in CRLF; a bare LF is accepted too. The raw bytes of the status line and headers
//! are kept so the caller can hand the exact header block on (`take_head`).

use bytes::Buf;
use bytes::BytesMut;
use std::io;

use crate::response::parse_status_line;

/// Upper bound for one header block.
const MAX_HEAD: usize = 64 * 1024;

/// Callback for HTTP/1.x response events.
pub trait H1ResponseHandler {
    fn status(&mut self, version: &str, code: u16, reason: Option<&str>);
    fn header(&mut self, name: &str, value: &str);
    fn start_body(&mut self);
    fn body_chunk(&mut self, data: &[u8]);
    fn end_body(&mut self);
    fn trailer(&mut self, name: &str, value: &str);
    fn complete(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Idle,
    StatusLine,
    Headers,
    /// Headers done; the connection must call set_body_mode() (and optionally handler.start_body()).
    HeadersComplete,
    Body,
    ChunkSize,
    ChunkData,
    ChunkTrailer,
}

/// Push parser for one HTTP/1.x response. Feed bytes via `receive`; the handler is invoked as
/// complete tokens are parsed.
pub struct ResponseParser {
    state: ParseState,
    /// Content-Length when known (-1 for chunked or read-until-close).
    content_length: i64,
    bytes_received: i64,
    /// Current chunk size (for chunked encoding).
    chunk_remaining: i64,
    head: BytesMut,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::StatusLine,
            content_length: -1,
            bytes_received: 0,
            chunk_remaining: 0,
            head: BytesMut::new(),
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Ready for the next response on the same stream (also used after a 1xx interim response).
    pub fn reset(&mut self) {
        self.state = ParseState::StatusLine;
        self.content_length = -1;
        self.bytes_received = 0;
        self.chunk_remaining = 0;
        self.head.clear();
    }

    /// Raw status line and header lines received so far, including the blank line.
    pub fn take_head(&mut self) -> BytesMut {
        self.head.split()
    }

    /// Length of the line at the start of buf without its terminator, and the terminator length.
    fn find_line(buf: &[u8]) -> Option<(usize, usize)> {
        let lf = buf.iter().position(|&b| b == b'\n')?;
        if lf > 0 && buf[lf - 1] == b'\r' {
            Some((lf - 1, 2))
        } else {
            Some((lf, 1))
        }
    }

    fn head_line(&mut self, buf: &mut BytesMut) -> Result<Option<(String, bool)>, io::Error> {
        let (line_end, term) = match Self::find_line(buf) {
            Some(found) => found,
            None if buf.len() + self.head.len() > MAX_HEAD => {
                return Err(invalid("response header block too large"))
            }
            None => return Ok(None),
        };
        let line = buf.split_to(line_end + term);
        self.head.extend_from_slice(&line);
        if self.head.len() > MAX_HEAD {
            return Err(invalid("response header block too large"));
        }
        let text = String::from_utf8_lossy(&line[..line_end]).into_owned();
        Ok(Some((text, line_end == 0)))
    }

    /// Consume and parse as much as possible from buf. Partial data remains in buf.
    pub fn receive<H: H1ResponseHandler>(
        &mut self,
        buf: &mut BytesMut,
        handler: &mut H,
    ) -> Result<(), io::Error> {
        while !buf.is_empty() {
            match self.state {
                ParseState::StatusLine => {
                    let Some((line, blank)) = self.head_line(buf)? else {
                        return Ok(());
                    };
                    if blank {
                        // Stray CRLF between responses.
                        self.head.clear();
                        continue;
                    }
                    let status = parse_status_line(&line)
                        .ok_or_else(|| invalid("malformed status line"))?;
                    handler.status(&status.version, status.code, status.reason.as_deref());
                    self.state = ParseState::Headers;
                }
                ParseState::Headers => {
                    let Some((line, blank)) = self.head_line(buf)? else {
                        return Ok(());
                    };
                    if blank {
                        self.state = ParseState::HeadersComplete;
                        return Ok(()); // Connection will set_body_mode and call receive again
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        handler.header(name.trim(), value.trim());
                    }
                }
                ParseState::Body => {
                    if self.content_length >= 0 {
                        let remaining = (self.content_length - self.bytes_received) as usize;
                        let to_read = remaining.min(buf.len());
                        if to_read > 0 {
                            let chunk = buf.split_to(to_read);
                            handler.body_chunk(&chunk);
                            self.bytes_received += to_read as i64;
                        }
                        if self.bytes_received >= self.content_length {
                            handler.end_body();
                            handler.complete();
                            self.state = ParseState::Idle;
                        }
                    } else {
                        // Read until close: deliver all available
                        let chunk = buf.split_to(buf.len());
                        handler.body_chunk(&chunk);
                        return Ok(());
                    }
                }
                ParseState::ChunkSize => {
                    let Some((line_end, term)) = Self::find_line(buf) else {
                        return Ok(());
                    };
                    let line = buf.split_to(line_end + term);
                    let line_str = std::str::from_utf8(&line[..line_end])
                        .map_err(|_| invalid("invalid chunk size"))?;
                    let hex_part = line_str.split(';').next().unwrap_or(line_str).trim();
                    self.chunk_remaining =
                        i64::from_str_radix(hex_part, 16).map_err(|_| invalid("invalid chunk size"))?;
                    if self.chunk_remaining < 0 {
                        return Err(invalid("invalid chunk size"));
                    }
                    if self.chunk_remaining == 0 {
                        self.state = ParseState::ChunkTrailer;
                    } else {
                        self.state = ParseState::ChunkData;
                    }
                }
                ParseState::ChunkData => {
                    let to_read = (self.chunk_remaining as usize).min(buf.len());
                    if to_read > 0 {
                        let chunk = buf.split_to(to_read);
                        handler.body_chunk(&chunk);
                        self.chunk_remaining -= to_read as i64;
                    }
                    if self.chunk_remaining > 0 {
                        return Ok(());
                    }
                    // Trailing CRLF after the chunk data
                    match Self::find_line(buf) {
                        Some((0, term)) => {
                            buf.advance(term);
                            self.state = ParseState::ChunkSize;
                        }
                        Some(_) => return Err(invalid("missing CRLF after chunk")),
                        None => return Ok(()),
                    }
                }
                ParseState::HeadersComplete => {
                    // Waiting for connection to call set_body_mode()
                    return Ok(());
                }
                ParseState::ChunkTrailer => {
                    let Some((line_end, term)) = Self::find_line(buf) else {
                        return Ok(());
                    };
                    let line = buf.split_to(line_end + term);
                    if line_end == 0 {
                        handler.end_body();
                        handler.complete();
                        self.state = ParseState::Idle;
                    } else {
                        let line_str = String::from_utf8_lossy(&line[..line_end]);
                        if let Some((name, value)) = line_str.split_once(':') {
                            handler.trailer(name.trim(), value.trim());
                        }
                    }
                }
                ParseState::Idle => return Ok(()),
            }
        }
        Ok(())
    }

    /// Called by the connection after headers are received (state HeadersComplete).
    pub fn set_body_mode(&mut self, content_length: Option<u64>, chunked: bool) {
        if self.state != ParseState::HeadersComplete {
            return;
        }
        if chunked {
            self.content_length = -1;
            self.state = ParseState::ChunkSize;
        } else if let Some(cl) = content_length {
            self.content_length = cl as i64;
            self.bytes_received = 0;
            if cl == 0 {
                self.state = ParseState::Idle;
            } else {
                self.state = ParseState::Body;
            }
        } else {
            self.content_length = -1;
            self.state = ParseState::Body; // read until close
        }
    }

    /// The peer closed the connection. Returns true if that legitimately ends the response
    /// (read-until-close body).
    pub fn finish<H: H1ResponseHandler>(&mut self, handler: &mut H) -> bool {
        match self.state {
            ParseState::Idle => true,
            ParseState::Body if self.content_length < 0 => {
                handler.end_body();
                handler.complete();
                self.state = ParseState::Idle;
                true
            }
            _ => false,
        }
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}
