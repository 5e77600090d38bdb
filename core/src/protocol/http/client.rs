/*
 * client.rs
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

//! HTTP client: resolve and connect to a host (directly or through a proxy tunnel), then use
//! the connection to send requests with a callback handler.
//!
//! Failures are reported as `TransferError`s here because the code depends on the stage that
//! failed (resolving, connecting, tunnelling, TLS).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::ClientConfig;
use tokio_rustls::TlsConnector;

use crate::protocol::http::connection::{HttpConnection, HttpStream};
use crate::response::header_parser::parse_status_line;
use crate::response::{codes, TransferError};

/// Used when the request does not set a connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Proxy to tunnel through: address plus a ready `Proxy-Authorization` value.
#[derive(Debug, Clone)]
pub struct TunnelProxy {
    pub host: String,
    pub port: u16,
    pub authorization: Option<String>,
}

/// Connection plus how long establishing it took.
pub struct Connected {
    pub connection: HttpConnection,
    pub connect_time: Duration,
}

/// HTTP client. `HttpClient::connect` returns a connection ready for `send`.
pub struct HttpClient;

impl HttpClient {
    /// Connect to `host:port`. With `tls` set, performs the TLS handshake (after the CONNECT
    /// tunnel, when a proxy is given).
    pub async fn connect(
        host: &str,
        port: u16,
        tls: Option<Arc<ClientConfig>>,
        proxy: Option<&TunnelProxy>,
        connect_timeout: Option<Duration>,
    ) -> Result<Connected, TransferError> {
        let started = Instant::now();
        let limit = connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let (tcp, peer) = match proxy {
            Some(p) => {
                let (mut tcp, peer) = Self::open(&p.host, p.port, true, limit).await?;
                Self::tunnel(&mut tcp, host, port, p.authorization.as_deref()).await?;
                (tcp, peer)
            }
            None => Self::open(host, port, false, limit).await?,
        };

        let stream = match tls {
            Some(config) => {
                let server_name = ServerName::try_from(host.to_string()).map_err(|_| {
                    TransferError::transport(codes::URL_MALFORMAT, format!("invalid host name {}", host))
                })?;
                let connector = TlsConnector::from(config);
                let tls = connector.connect(server_name, tcp).await.map_err(|e| {
                    TransferError::transport(codes::SSL_CONNECT_ERROR, format!("TLS handshake with {} failed: {}", host, e))
                })?;
                HttpStream::Tls(Box::new(tls))
            }
            None => HttpStream::Plain(tcp),
        };
        let secure = matches!(stream, HttpStream::Tls(_));
        let connect_time = started.elapsed();
        debug!("connected to {}:{} via {} in {:?}", host, port, peer, connect_time);
        Ok(Connected {
            connection: HttpConnection::new(stream, host.to_string(), port, secure).with_peer(peer),
            connect_time,
        })
    }

    /// Resolve and open a TCP connection, trying each resolved address in turn.
    async fn open(
        host: &str,
        port: u16,
        is_proxy: bool,
        limit: Duration,
    ) -> Result<(TcpStream, SocketAddr), TransferError> {
        let resolve_code = if is_proxy {
            codes::COULDNT_RESOLVE_PROXY
        } else {
            codes::COULDNT_RESOLVE_HOST
        };
        let what = if is_proxy { "proxy" } else { "host" };
        let lookup = timeout(limit, lookup_host((host, port)))
            .await
            .map_err(|_| TransferError::transport(codes::OPERATION_TIMEDOUT, format!("Resolving timed out after {} milliseconds", limit.as_millis())))?;
        let addrs: Vec<SocketAddr> = lookup
            .map_err(|e| TransferError::transport(resolve_code, format!("Could not resolve {}: {} ({})", what, host, e)))?
            .collect();
        if addrs.is_empty() {
            return Err(TransferError::transport(resolve_code, format!("Could not resolve {}: {}", what, host)));
        }

        let attempt = async {
            let mut last_err = None;
            for addr in &addrs {
                match TcpStream::connect(addr).await {
                    Ok(tcp) => return Ok((tcp, *addr)),
                    Err(e) => {
                        debug!("connect to {} failed: {}", addr, e);
                        last_err = Some(e);
                    }
                }
            }
            Err(last_err)
        };
        match timeout(limit, attempt).await {
            Err(_) => Err(TransferError::transport(
                codes::OPERATION_TIMEDOUT,
                format!("Connection timed out after {} milliseconds", limit.as_millis()),
            )),
            Ok(Ok(connected)) => Ok(connected),
            Ok(Err(e)) => Err(TransferError::transport(
                codes::COULDNT_CONNECT,
                format!(
                    "Failed to connect to {} port {}: {}",
                    host,
                    port,
                    e.map(|e| e.to_string()).unwrap_or_else(|| "no address".to_string())
                ),
            )),
        }
    }

    /// Ask the proxy for a tunnel with CONNECT and wait for a 2xx.
    async fn tunnel(
        tcp: &mut TcpStream,
        host: &str,
        port: u16,
        authorization: Option<&str>,
    ) -> Result<(), TransferError> {
        let authority = format!("{}:{}", host, port);
        let mut req = format!("CONNECT {0} HTTP/1.1\r\nHost: {0}\r\n", authority);
        if let Some(auth) = authorization {
            req.push_str("Proxy-Authorization: ");
            req.push_str(auth);
            req.push_str("\r\n");
        }
        req.push_str("\r\n");
        tcp.write_all(req.as_bytes())
            .await
            .map_err(|e| TransferError::transport(codes::SEND_ERROR, e.to_string()))?;

        // Read only up to the end of the proxy's head; anything after belongs to TLS.
        let mut head = Vec::with_capacity(256);
        let mut byte = [0u8; 1];
        while !head.ends_with(b"\r\n\r\n") && !head.ends_with(b"\n\n") {
            let n = tcp
                .read(&mut byte)
                .await
                .map_err(|e| TransferError::transport(codes::RECV_ERROR, e.to_string()))?;
            if n == 0 || head.len() > 16 * 1024 {
                return Err(TransferError::transport(codes::RECV_ERROR, "Proxy CONNECT aborted"));
            }
            head.push(byte[0]);
        }
        let text = String::from_utf8_lossy(&head);
        let code = text
            .lines()
            .next()
            .and_then(parse_status_line)
            .map(|s| s.code)
            .unwrap_or(0);
        if !(200..300).contains(&code) {
            return Err(TransferError::transport(
                codes::RECV_ERROR,
                format!("Received HTTP code {} from proxy after CONNECT", code),
            ));
        }
        debug!("tunnel to {} established", authority);
        Ok(())
    }
}
