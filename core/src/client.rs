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

//! Request executors: one request at a time or a concurrent batch.

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::batch::{self, Batch, BatchResponses};
use crate::config::ClientDefaults;
use crate::error::ConfigError;
use crate::protocol::http::{HttpTransport, RequestSpec, Transport};
use crate::response::{codes, CanonicalReasons, Response, StatusLookup, TransferError};

/// Executes requests through a transport and assembles typed responses.
///
/// Cheap to clone; clones share the transport and status lookup.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    lookup: Arc<dyn StatusLookup>,
    defaults: ClientDefaults,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// HTTP/1.1 transport, canonical reason phrases, no defaults.
    pub fn new() -> Self {
        Client {
            transport: Arc::new(HttpTransport::new()),
            lookup: Arc::new(CanonicalReasons),
            defaults: ClientDefaults::default(),
        }
    }

    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn with_status_lookup(mut self, lookup: impl StatusLookup + 'static) -> Self {
        self.lookup = Arc::new(lookup);
        self
    }

    pub fn with_defaults(mut self, defaults: ClientDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &ClientDefaults {
        &self.defaults
    }

    /// Run one request. The only error returned is a request that cannot be sent at all;
    /// anything that goes wrong on the wire is reported in the response.
    pub async fn execute(&self, spec: &RequestSpec) -> Result<Response, ConfigError> {
        let spec = self.defaults.apply(spec);
        if let Err(e) = spec.validate() {
            warn!("request rejected: {}", e);
            return Err(e);
        }
        let raw = self.transport.transfer(&spec).await;
        let response = Response::assemble(raw, self.lookup.as_ref());
        debug!(
            "{} {} -> {}",
            spec.method.as_str(),
            response.info().url().unwrap_or_default(),
            response.info().http_code()
        );
        Ok(response)
    }

    /// `execute` for synchronous callers, on a private current-thread runtime. Must not be
    /// called from inside an async context.
    pub fn execute_blocking(&self, spec: &RequestSpec) -> Result<Response, ConfigError> {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                return Ok(Response::failed(
                    spec.uri.as_deref(),
                    TransferError::transport(codes::FAILED_INIT, format!("cannot start runtime: {}", e)),
                ))
            }
        };
        runtime.block_on(self.execute(spec))
    }

    /// Run every request in `batch` concurrently. Exactly one response per request.
    pub async fn execute_batch(&self, batch: &Batch) -> BatchResponses {
        self.execute_batch_with_cancel(batch, CancellationToken::new()).await
    }

    /// `execute_batch` that stops when `cancel` fires: transfers still running are dropped and
    /// answered with an aborted error, completed responses are kept.
    pub async fn execute_batch_with_cancel(&self, batch: &Batch, cancel: CancellationToken) -> BatchResponses {
        batch::run(
            self.transport.as_ref(),
            self.lookup.as_ref(),
            &self.defaults,
            batch,
            cancel,
        )
        .await
    }
}
