/*
 * batch.rs
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

//! Concurrent batch execution.
//!
//! One driving task owns every in-flight transfer: they sit in a `FuturesUnordered` and are
//! advanced together, the task sleeping on I/O readiness when none can make progress. Results
//! come back tagged with their position, so every submitted request gets exactly one response
//! no matter how many transfers fail or the order in which they finish.

use std::collections::VecDeque;

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::config::ClientDefaults;
use crate::protocol::http::{RequestSpec, Transport};
use crate::response::{codes, Response, StatusLookup, TransferError};

/// Identifies a request within its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(usize);

impl RequestId {
    /// Position in submission order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Requests to run together.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    specs: Vec<RequestSpec>,
    concurrency: Option<usize>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, spec: RequestSpec) -> RequestId {
        self.specs.push(spec);
        RequestId(self.specs.len() - 1)
    }

    /// Cap the number of transfers in flight; the rest start as others finish. 0 is treated as 1.
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = Some(limit.max(1));
        self
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn get(&self, id: RequestId) -> Option<&RequestSpec> {
        self.specs.get(id.0)
    }
}

impl FromIterator<RequestSpec> for Batch {
    fn from_iter<I: IntoIterator<Item = RequestSpec>>(iter: I) -> Self {
        Batch {
            specs: iter.into_iter().collect(),
            concurrency: None,
        }
    }
}

/// One response per submitted request.
#[derive(Debug, Clone)]
pub struct BatchResponses {
    responses: Vec<Response>,
}

impl BatchResponses {
    pub fn get(&self, id: RequestId) -> Option<&Response> {
        self.responses.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Responses in submission order.
    pub fn iter(&self) -> impl Iterator<Item = (RequestId, &Response)> {
        self.responses.iter().enumerate().map(|(i, r)| (RequestId(i), r))
    }

    pub fn into_vec(self) -> Vec<Response> {
        self.responses
    }
}

fn aborted(spec: &RequestSpec) -> Response {
    Response::failed(
        spec.uri.as_deref(),
        TransferError::transport(codes::ABORTED_BY_CALLBACK, "Operation aborted"),
    )
}

/// Drive every request in `batch` to completion (or until `cancel` fires).
pub(crate) async fn run(
    transport: &dyn Transport,
    lookup: &dyn StatusLookup,
    defaults: &ClientDefaults,
    batch: &Batch,
    cancel: CancellationToken,
) -> BatchResponses {
    let specs: Vec<RequestSpec> = batch.specs.iter().map(|s| defaults.apply(s)).collect();
    let mut slots: Vec<Option<Response>> = vec![None; specs.len()];
    let mut pending = VecDeque::with_capacity(specs.len());

    for (i, spec) in specs.iter().enumerate() {
        match spec.validate() {
            Ok(_) => pending.push_back(i),
            Err(e) => {
                warn!("batch entry {} rejected: {}", i, e);
                slots[i] = Some(Response::failed(
                    spec.uri.as_deref(),
                    TransferError::transport(e.transfer_code(), e.to_string()),
                ));
            }
        }
    }

    let limit = batch
        .concurrency
        .or(defaults.concurrency)
        .unwrap_or(usize::MAX)
        .max(1);
    debug!("batch of {} ({} valid), limit {}", specs.len(), pending.len(), limit);

    let mut in_flight = FuturesUnordered::new();
    loop {
        while in_flight.len() < limit {
            match pending.pop_front() {
                Some(i) => {
                    let spec = &specs[i];
                    in_flight.push(transport.transfer(spec).map(move |raw| (i, raw)));
                }
                None => break,
            }
        }
        if in_flight.is_empty() {
            break;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("batch cancelled with {} in flight, {} queued", in_flight.len(), pending.len());
                break;
            }
            Some((i, raw)) = in_flight.next() => {
                slots[i] = Some(Response::assemble(raw, lookup));
            }
        }
    }
    // Dropping the set closes whatever is still running.
    drop(in_flight);

    let responses = slots
        .into_iter()
        .zip(&specs)
        .map(|(slot, spec)| slot.unwrap_or_else(|| aborted(spec)))
        .collect();
    BatchResponses { responses }
}
