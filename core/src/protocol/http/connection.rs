/*
 * connection.rs
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

//! HTTP connection: one TCP or TLS stream, drives the HTTP/1.x parser, invokes ResponseHandler.

use bytes::BytesMut;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream as TokioTlsStream;

use log::trace;

use crate::protocol::http::h1::{H1ResponseHandler, ParseState, ResponseParser};
use crate::protocol::http::request::{Method, RequestBuilder};
use crate::protocol::http::ResponseHandler;

/// Unified stream: plain TCP or TLS. Implements AsyncRead + AsyncWrite.
pub enum HttpStream {
    Plain(TcpStream),
    Tls(Box<TokioTlsStream<TcpStream>>),
}

impl AsyncRead for HttpStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for HttpStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_flush(cx),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Bridges parser callbacks to the connection state and the caller's ResponseHandler.
struct H1Driver<'a> {
    status: &'a mut Option<(String, u16, Option<String>)>,
    headers: &'a mut Vec<(String, String)>,
    handler: &'a mut (dyn ResponseHandler + Send),
}

impl H1ResponseHandler for H1Driver<'_> {
    fn status(&mut self, version: &str, code: u16, reason: Option<&str>) {
        *self.status = Some((version.to_string(), code, reason.map(|s| s.to_string())));
    }

    fn header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn start_body(&mut self) {
        self.handler.start_body();
    }

    fn body_chunk(&mut self, data: &[u8]) {
        self.handler.body_chunk(data);
    }

    fn end_body(&mut self) {
        self.handler.end_body();
    }

    fn trailer(&mut self, name: &str, value: &str) {
        self.handler.header(name, value);
    }

    fn complete(&mut self) {
        self.handler.complete();
    }
}

/// HTTP connection: holds the stream and drives the read loop. Call send() to issue a request.
pub struct HttpConnection {
    stream: HttpStream,
    host: String,
    port: u16,
    secure: bool,
    peer: Option<SocketAddr>,

    read_buf: BytesMut,
    parser: ResponseParser,
    status: Option<(String, u16, Option<String>)>,
    headers: Vec<(String, String)>,
    /// Bytes of request head and body written so far.
    bytes_sent: u64,
}

impl HttpConnection {
    /// Wrap an already-connected stream. Used by HttpClient::connect().
    pub fn new(stream: HttpStream, host: String, port: u16, secure: bool) -> Self {
        Self {
            stream,
            host,
            port,
            secure,
            peer: None,
            read_buf: BytesMut::with_capacity(8192),
            parser: ResponseParser::new(),
            status: None,
            headers: Vec::new(),
            bytes_sent: 0,
        }
    }

    pub(crate) fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Address of the socket's remote end (the proxy, when tunnelling).
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Send the request and run the read loop until the response is complete. The handler is
    /// invoked as data arrives.
    pub async fn send(
        &mut self,
        request: &RequestBuilder,
        handler: &mut (dyn ResponseHandler + Send),
    ) -> io::Result<()> {
        self.status = None;
        self.headers.clear();
        self.parser.reset();

        self.write_request(request).await?;

        let head_request = request.method == Method::Head;
        let mut received = false;
        loop {
            self.drive(head_request, handler)?;
            if self.parser.state() == ParseState::Idle {
                break;
            }
            let mut tmp = [0u8; 8192];
            let n = self.stream.read(&mut tmp).await?;
            if n == 0 {
                let mut driver = H1Driver {
                    status: &mut self.status,
                    headers: &mut self.headers,
                    handler: &mut *handler,
                };
                if self.parser.finish(&mut driver) {
                    break;
                }
                let msg = if received {
                    "connection closed before response was complete"
                } else {
                    "Empty reply from server"
                };
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, msg));
            }
            received = true;
            self.read_buf.extend_from_slice(&tmp[..n]);
        }
        Ok(())
    }

    /// Parse buffered bytes, handling end-of-headers transitions, until more input is needed.
    fn drive(&mut self, head_request: bool, handler: &mut (dyn ResponseHandler + Send)) -> io::Result<()> {
        loop {
            let mut driver = H1Driver {
                status: &mut self.status,
                headers: &mut self.headers,
                handler: &mut *handler,
            };
            self.parser.receive(&mut self.read_buf, &mut driver)?;

            if self.parser.state() != ParseState::HeadersComplete {
                return Ok(());
            }
            let (version, code, reason) = self
                .status
                .take()
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing status line"))?;
            let head = self.parser.take_head();
            handler.head(&head);

            if (100..200).contains(&code) && code != 101 {
                trace!("interim response {}", code);
                self.headers.clear();
                self.parser.reset();
                continue;
            }

            handler.status(&version, code, reason.as_deref());
            for (name, value) in &self.headers {
                handler.header(name, value);
            }
            let content_length = self
                .headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.trim().parse::<u64>().ok());
            let chunked = self.headers.iter().any(|(k, v)| {
                k.eq_ignore_ascii_case("transfer-encoding") && v.to_ascii_lowercase().contains("chunked")
            });

            if head_request || code == 204 || code == 304 {
                self.parser.set_body_mode(Some(0), false);
            } else {
                let has_body = chunked || content_length.map_or(true, |cl| cl > 0);
                if has_body {
                    handler.start_body();
                }
                self.parser.set_body_mode(content_length, chunked);
            }
            if self.parser.state() == ParseState::Idle {
                handler.complete();
                return Ok(());
            }
        }
    }

    async fn write_request(&mut self, request: &RequestBuilder) -> io::Result<()> {
        let host_header = if (self.secure && self.port != 443) || (!self.secure && self.port != 80) {
            format!("{}:{}", self.host, self.port)
        } else {
            self.host.clone()
        };
        let use_chunked = request.body.is_some()
            && !request.has_header("Content-Length")
            && !request.has_header("Transfer-Encoding");
        let mut req = format!(
            "{} {} {}\r\n",
            request.method.as_str(),
            request.target,
            request.version
        );
        if !request.has_header("Host") {
            req.push_str("Host: ");
            req.push_str(&host_header);
            req.push_str("\r\n");
        }
        for (k, v) in &request.headers {
            req.push_str(k);
            req.push_str(": ");
            req.push_str(v);
            req.push_str("\r\n");
        }
        if use_chunked {
            req.push_str("Transfer-Encoding: chunked\r\n");
        }
        req.push_str("\r\n");
        trace!("request head:\n{}", req.trim_end());
        self.stream.write_all(req.as_bytes()).await?;
        self.bytes_sent += req.len() as u64;
        if let Some(body) = &request.body {
            if use_chunked {
                let hex_len = format!("{:x}\r\n", body.len());
                self.stream.write_all(hex_len.as_bytes()).await?;
                self.stream.write_all(body).await?;
                self.stream.write_all(b"\r\n").await?;
                self.stream.write_all(b"0\r\n\r\n").await?;
            } else {
                self.stream.write_all(body).await?;
            }
            self.bytes_sent += body.len() as u64;
        }
        self.stream.flush().await?;
        Ok(())
    }
}
