/*
 * transfer.rs
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

//! Transport capability and the raw result it hands back.

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::protocol::http::spec::RequestSpec;
use crate::response::TransferError;

/// Facts about a transfer known to the transport, independent of the response bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferMetadata {
    pub effective_url: Option<String>,
    /// Status of the final response; 0 if none was received.
    pub http_code: u16,
    pub content_type: Option<String>,
    /// Length of the recorded header block(s). Only used when the block has no terminating
    /// blank line.
    pub header_size: Option<usize>,
    pub total_time: Duration,
    pub connect_time: Duration,
    pub redirect_count: u32,
    pub size_download: u64,
    pub size_upload: u64,
    pub primary_ip: Option<String>,
    pub primary_port: Option<u16>,
}

/// Output of one transfer attempt.
///
/// `header_block` holds every header block received, in order (interim, redirect and
/// authentication hops included); the final one describes `body`.
#[derive(Debug, Clone, Default)]
pub struct RawTransferResult {
    pub status_line: Option<String>,
    pub header_block: Bytes,
    pub body: Bytes,
    pub metadata: TransferMetadata,
    pub error: Option<TransferError>,
}

impl RawTransferResult {
    /// Result for a transfer that failed before producing any output.
    pub fn failed(error: TransferError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }
}

/// Something that can carry out a request.
///
/// The returned future is the transfer: polling it makes progress, its output is the result,
/// dropping it aborts the transfer and closes its connection. It never fails; problems are
/// reported in `RawTransferResult::error`.
pub trait Transport: Send + Sync {
    fn transfer<'a>(&'a self, spec: &'a RequestSpec) -> BoxFuture<'a, RawTransferResult>;
}
