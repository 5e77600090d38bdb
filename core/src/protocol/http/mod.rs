/*
 * mod.rs
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

//! HTTP/1.1 client: push-parsed responses over plain TCP or rustls TLS.
//!
//! - `ResponseHandler` receives callbacks as the response arrives (status, headers, raw head,
//!   body chunks). `TransferCollector` accumulates them into the raw pieces a `Response` is
//!   assembled from.
//! - `HttpClient::connect` resolves, connects (optionally through a proxy tunnel) and wraps the
//!   socket in TLS; `HttpConnection::send` writes one request and drives the parser.
//! - `HttpTransport` implements `Transport` on top: redirects, authentication, content
//!   decoding, timeouts and transfer metadata.
//! - Buffers use the `bytes` crate (BytesMut for the parse buffer, Bytes for finished payloads).

mod handler;
mod request;
mod spec;
mod transfer;

pub mod auth;
pub mod client;
pub mod connection;
pub mod encoding;
pub mod h1;
pub mod transport;

pub use client::HttpClient;
pub use connection::{HttpConnection, HttpStream};
pub use h1::H1ResponseHandler;
pub use handler::{ResponseHandler, TransferCollector};
pub use request::{Method, RequestBuilder};
pub use spec::{AuthScheme, Credentials, Encoding, HttpVersion, Proxy, RequestSpec, TlsOptions};
pub use transfer::{RawTransferResult, TransferMetadata, Transport};
pub use transport::HttpTransport;

pub(crate) use request::is_token;
