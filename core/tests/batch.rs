/*
 * batch.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Batch execution against in-memory transports: one response per request, failure isolation,
 * cancellation and the in-flight limit.
 *
 * Run with:
 *   cargo test -p curlew_core --test batch
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use tokio::time::sleep;

use curlew_core::response::{codes, TransferError};
use curlew_core::{
    Batch, CancellationToken, Client, ClientDefaults, RawTransferResult, RequestSpec,
    TransferMetadata, Transport,
};

/// Answers 200 with the request URI as a text body. The path picks the behaviour:
/// `/sleep/<ms>` waits first, `/fail` reports a refused connection, `/empty` returns nothing,
/// `/hang` never completes.
#[derive(Default)]
struct Scripted {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Transport for Scripted {
    fn transfer<'a>(&'a self, spec: &'a RequestSpec) -> BoxFuture<'a, RawTransferResult> {
        async move {
            let uri = spec.uri.clone().unwrap_or_default();
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let path = uri.splitn(4, '/').nth(3).unwrap_or("").to_string();

            let result = if path == "hang" {
                future::pending::<RawTransferResult>().await
            } else if path == "fail" {
                RawTransferResult::failed(TransferError::transport(codes::COULDNT_CONNECT, "Connection refused"))
            } else if path == "empty" {
                RawTransferResult::default()
            } else {
                if let Some(ms) = path.strip_prefix("sleep/").and_then(|ms| ms.parse().ok()) {
                    sleep(Duration::from_millis(ms)).await;
                }
                RawTransferResult {
                    status_line: Some("HTTP/1.1 200 OK".into()),
                    header_block: Bytes::from_static(b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n"),
                    body: Bytes::from(uri.clone()),
                    metadata: TransferMetadata {
                        effective_url: Some(uri),
                        http_code: 200,
                        ..Default::default()
                    },
                    error: None,
                }
            };
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
        .boxed()
    }
}

/// Shares one `Scripted` between the client and the test.
#[derive(Clone, Default)]
struct Shared(Arc<Scripted>);

impl Transport for Shared {
    fn transfer<'a>(&'a self, spec: &'a RequestSpec) -> BoxFuture<'a, RawTransferResult> {
        self.0.transfer(spec)
    }
}

fn url(path: &str) -> String {
    format!("http://mock.test/{}", path)
}

#[tokio::test]
async fn one_response_per_request_in_submission_order() {
    let client = Client::new().with_transport(Scripted::default());
    let mut batch = Batch::new();
    let ids: Vec<_> = [50, 10, 30, 0, 20]
        .iter()
        .map(|ms| batch.push(RequestSpec::get(url(&format!("sleep/{}", ms)))))
        .collect();

    let responses = client.execute_batch(&batch).await;
    assert_eq!(responses.len(), ids.len());
    for (id, (got_id, response)) in ids.iter().zip(responses.iter()) {
        assert_eq!(*id, got_id);
        let expected = batch.get(*id).and_then(|s| s.uri.clone()).unwrap();
        assert_eq!(response.body().as_text(), Some(expected.as_str()));
        assert!(response.error().is_none());
    }
}

#[tokio::test]
async fn failures_do_not_affect_siblings() {
    let client = Client::new().with_transport(Scripted::default());
    let mut batch = Batch::new();
    let ok = batch.push(RequestSpec::get(url("sleep/5")));
    let refused = batch.push(RequestSpec::get(url("fail")));
    let empty = batch.push(RequestSpec::get(url("empty")));
    let missing = batch.push(RequestSpec::default());
    let ftp = batch.push(RequestSpec::get("ftp://mock.test/file"));

    let responses = client.execute_batch(&batch).await;
    assert_eq!(responses.len(), 5);
    assert!(responses.get(ok).unwrap().is_success());
    assert_eq!(responses.get(refused).unwrap().error().unwrap().code(), codes::COULDNT_CONNECT);
    assert_eq!(responses.get(empty).unwrap().error().unwrap().code(), codes::GOT_NOTHING);
    assert_eq!(responses.get(missing).unwrap().error().unwrap().code(), codes::URL_MALFORMAT);
    assert_eq!(responses.get(ftp).unwrap().error().unwrap().code(), codes::UNSUPPORTED_PROTOCOL);
}

#[tokio::test]
async fn cancellation_keeps_completed_responses() {
    let client = Client::new().with_transport(Scripted::default());
    let mut batch = Batch::new();
    let fast = batch.push(RequestSpec::get(url("sleep/1")));
    let stuck = batch.push(RequestSpec::get(url("hang")));
    let also_stuck = batch.push(RequestSpec::get(url("hang")));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });
    let responses = client.execute_batch_with_cancel(&batch, cancel).await;

    assert_eq!(responses.len(), 3);
    assert!(responses.get(fast).unwrap().is_success());
    for id in [stuck, also_stuck] {
        let r = responses.get(id).unwrap();
        assert_eq!(r.error().unwrap().code(), codes::ABORTED_BY_CALLBACK);
        assert_eq!(r.info().url(), Some(url("hang").as_str()));
    }
}

#[tokio::test]
async fn cancellation_answers_queued_requests() {
    let transport = Shared::default();
    let client = Client::new().with_transport(transport.clone());
    let mut batch = Batch::new();
    let first = batch.push(RequestSpec::get(url("sleep/1")));
    let stuck = batch.push(RequestSpec::get(url("hang")));
    let queued: Vec<_> = (0..3).map(|_| batch.push(RequestSpec::get(url("sleep/1")))).collect();
    let batch = batch.with_concurrency(1);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });
    let responses = client.execute_batch_with_cancel(&batch, cancel).await;
    assert_eq!(responses.len(), 5);
    assert!(responses.get(first).unwrap().is_success());
    for id in std::iter::once(stuck).chain(queued) {
        let r = responses.get(id).unwrap();
        assert_eq!(r.error().unwrap().code(), codes::ABORTED_BY_CALLBACK);
        assert_eq!(r.info().url(), batch.get(id).and_then(|s| s.uri.as_deref()));
    }
    assert_eq!(transport.0.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrency_limit_is_respected() {
    let transport = Shared::default();
    let client = Client::new().with_transport(transport.clone());
    let batch: Batch = (0..6).map(|_| RequestSpec::get(url("sleep/20"))).collect();
    let batch = batch.with_concurrency(2);

    let responses = client.execute_batch(&batch).await;
    assert_eq!(responses.len(), 6);
    assert!(responses.iter().all(|(_, r)| r.is_success()));
    assert_eq!(transport.0.max_in_flight.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn default_concurrency_applies_when_batch_sets_none() {
    let transport = Shared::default();
    let client = Client::new()
        .with_transport(transport.clone())
        .with_defaults(ClientDefaults {
            concurrency: Some(1),
            ..Default::default()
        });
    let batch: Batch = (0..3).map(|_| RequestSpec::get(url("sleep/5"))).collect();

    let responses = client.execute_batch(&batch).await;
    assert_eq!(responses.len(), 3);
    assert_eq!(transport.0.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_batch() {
    let client = Client::new().with_transport(Scripted::default());
    let responses = client.execute_batch(&Batch::new()).await;
    assert!(responses.is_empty());
}

#[tokio::test]
async fn single_execute_reports_config_errors() {
    let client = Client::new().with_transport(Scripted::default());
    assert!(client.execute(&RequestSpec::default()).await.is_err());
    let r = client.execute(&RequestSpec::get(url("fail"))).await.unwrap();
    assert_eq!(r.error().unwrap().code(), codes::COULDNT_CONNECT);
}
