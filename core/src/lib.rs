/*
 * lib.rs
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

//! Curlew core: an HTTP client that turns raw responses into structured, content-aware data.
//!
//! Build a [`RequestSpec`], run it with [`Client::execute`] (or many at once with
//! [`Client::execute_batch`]) and read the [`Response`]: transfer info, canonical headers, a
//! negotiated [`Body`] and an optional [`TransferError`].

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod net;
pub mod protocol;
pub mod response;
pub mod uri;

pub use batch::{Batch, BatchResponses, RequestId};
pub use client::Client;
pub use config::ClientDefaults;
pub use error::ConfigError;
pub use protocol::http::{
    AuthScheme, Encoding, HttpTransport, HttpVersion, Method, Proxy, RawTransferResult, RequestSpec,
    TransferMetadata, Transport,
};
pub use response::{Body, BodyKind, Headers, Info, Response, StatusLookup, TransferError};
pub use tokio_util::sync::CancellationToken;
