/*
 * http_transport.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Integration tests for the HTTP/1.1 transport against a scripted local server: one accepted
 * connection per reply, each request recorded for inspection.
 *
 * Run with:
 *   cargo test -p curlew_core --test http_transport -- --nocapture
 * The network test is ignored by default:
 *   cargo test -p curlew_core --test http_transport -- --ignored
 */

use std::io::Write;
use std::time::Duration;

use flate2::write::GzEncoder;
use flate2::Compression;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use curlew_core::response::codes;
use curlew_core::{BodyKind, Client, Encoding, Method, RequestSpec};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn reply(status: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {}\r\n", status);
    for (name, value) in headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));
    let mut out = out.into_bytes();
    out.extend_from_slice(body);
    out
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Read one request (head plus Content-Length body).
async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = find(&buf, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while buf.len() < end + 4 + len {
                let n = stream.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Serve `replies` in order, one connection each. Returns the base URL and a handle yielding
/// the requests received.
async fn serve(replies: Vec<Vec<u8>>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut seen = Vec::new();
        for reply in replies {
            let (mut stream, _) = listener.accept().await.unwrap();
            seen.push(read_request(&mut stream).await);
            let _ = stream.write_all(&reply).await;
            let _ = stream.shutdown().await;
        }
        seen
    });
    (format!("http://{}", addr), handle)
}

#[tokio::test]
async fn json_get() {
    init_logging();
    let (base, server) = serve(vec![reply(
        "200 OK",
        &[("Content-Type", "application/json"), ("X-Request-Id", "42")],
        b"{\"ok\":true,\"user_name\":\"ada\"}",
    )])
    .await;

    let r = Client::new().execute(&RequestSpec::get(format!("{}/status", base))).await.unwrap();
    assert_eq!(r.info().http_code(), 200);
    assert!(r.error().is_none());
    assert_eq!(r.headers().get("xRequestId"), Some("42"));
    let json = r.body().as_json().expect("json body");
    assert_eq!(json["userName"], "ada");
    assert_eq!(r.info().url(), Some(format!("{}/status", base).as_str()));
    assert_eq!(r.info().primary_ip(), Some("127.0.0.1"));

    let requests = server.await.unwrap();
    let req = &requests[0];
    assert!(req.starts_with("GET /status HTTP/1.1\r\n"), "{}", req);
    assert!(req.contains("User-Agent: Curlew/0.1\r\n"));
    assert!(req.contains(&format!("Host: {}\r\n", base.trim_start_matches("http://"))));
    assert!(req.contains("Connection: close\r\n"));
}

#[tokio::test]
async fn chunked_body() {
    let (base, _server) = serve(vec![b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
          5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n"
        .to_vec()])
    .await;
    let r = Client::new().execute(&RequestSpec::get(base)).await.unwrap();
    assert_eq!(r.body().as_text(), Some("hello world"));
    assert_eq!(r.info().size_download(), 11);
}

#[tokio::test]
async fn form_post_and_query_fields() {
    let (base, server) = serve(vec![
        reply("201 Created", &[], b""),
        reply("200 OK", &[], b"ok"),
    ])
    .await;
    let client = Client::new();

    let mut post = RequestSpec::post(format!("{}/submit", base));
    post.field("a", "1").field("b", "two words");
    let r = client.execute(&post).await.unwrap();
    assert_eq!(r.info().http_code(), 201);

    let mut get = RequestSpec::get(format!("{}/search", base));
    get.field("q", "rust lang");
    client.execute(&get).await.unwrap();

    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("POST /submit HTTP/1.1\r\n"));
    assert!(requests[0].contains("Content-Type: application/x-www-form-urlencoded\r\n"));
    assert!(requests[0].ends_with("\r\n\r\na=1&b=two%20words"));
    assert!(requests[1].starts_with("GET /search?q=rust%20lang HTTP/1.1\r\n"));
}

#[tokio::test]
async fn redirect_followed_and_post_becomes_get() {
    let (base, server) = serve(vec![
        reply("302 Found", &[("Location", "/next")], b""),
        reply("200 OK", &[("Content-Type", "text/plain")], b"landed"),
    ])
    .await;
    let mut spec = RequestSpec::post(format!("{}/start", base));
    spec.body("payload").max_redirects(5).auto_referer(true);
    let r = Client::new().execute(&spec).await.unwrap();

    assert_eq!(r.info().http_code(), 200);
    assert_eq!(r.info().redirect_count(), 1);
    assert_eq!(r.info().url(), Some(format!("{}/next", base).as_str()));
    assert_eq!(r.body().as_text(), Some("landed"));
    assert!(r.headers().get("location").is_none());

    let requests = server.await.unwrap();
    assert!(requests[1].starts_with("GET /next HTTP/1.1\r\n"));
    assert!(requests[1].contains(&format!("Referer: {}/start\r\n", base)));
    assert!(!requests[1].contains("payload"));
}

#[tokio::test]
async fn too_many_redirects() {
    let (base, _server) = serve(vec![
        reply("301 Moved Permanently", &[("Location", "/a")], b""),
        reply("307 Temporary Redirect", &[("Location", "/b")], b""),
    ])
    .await;
    let mut spec = RequestSpec::get(base);
    spec.max_redirects(1);
    let r = Client::new().execute(&spec).await.unwrap();
    let err = r.error().expect("error");
    assert_eq!(err.code(), codes::TOO_MANY_REDIRECTS);
    assert_eq!(err.message(), "Maximum (1) redirects followed");
}

#[tokio::test]
async fn redirect_not_followed_by_default() {
    let (base, _server) = serve(vec![reply("302 Found", &[("Location", "/elsewhere")], b"")]).await;
    let r = Client::new().execute(&RequestSpec::get(base)).await.unwrap();
    assert_eq!(r.info().http_code(), 302);
    assert_eq!(r.error().map(|e| e.code()), Some(302));
    assert_eq!(r.headers().get("location"), Some("/elsewhere"));
}

#[tokio::test]
async fn basic_auth_is_preemptive() {
    let (base, server) = serve(vec![reply("200 OK", &[], b"")]).await;
    let mut spec = RequestSpec::get(base);
    spec.basic_auth("user", "pass");
    Client::new().execute(&spec).await.unwrap();
    let requests = server.await.unwrap();
    assert!(requests[0].contains("Authorization: Basic dXNlcjpwYXNz\r\n"));
}

#[tokio::test]
async fn digest_challenge_answered_once() {
    let (base, server) = serve(vec![
        reply(
            "401 Unauthorized",
            &[("WWW-Authenticate", "Digest realm=\"test\", nonce=\"abc123\", qop=\"auth\"")],
            b"",
        ),
        reply("200 OK", &[], b"secret"),
    ])
    .await;
    let mut spec = RequestSpec::get(format!("{}/private", base));
    spec.digest_auth("user", "pass");
    let r = Client::new().execute(&spec).await.unwrap();
    assert_eq!(r.info().http_code(), 200);
    assert_eq!(r.body().as_text(), Some("secret"));

    let requests = server.await.unwrap();
    assert!(!requests[0].contains("Authorization:"));
    assert!(requests[1].contains("Authorization: Digest username=\"user\", realm=\"test\", nonce=\"abc123\", uri=\"/private\""));
    assert!(requests[1].contains("qop=auth, nc=00000001"));
}

#[tokio::test]
async fn rejected_credentials_are_not_retried() {
    let (base, _server) = serve(vec![reply(
        "401 Unauthorized",
        &[("WWW-Authenticate", "Basic realm=\"x\"")],
        b"denied",
    )])
    .await;
    let mut spec = RequestSpec::get(base);
    spec.basic_auth("user", "wrong");
    let r = Client::new().execute(&spec).await.unwrap();
    assert_eq!(r.error().map(|e| e.code()), Some(401));
    assert_eq!(r.body().as_text(), Some("denied"));
}

#[tokio::test]
async fn gzip_body_decoded() {
    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(b"{\"z\":1}").unwrap();
    let body = gz.finish().unwrap();
    let (base, server) = serve(vec![reply(
        "200 OK",
        &[("Content-Type", "application/json"), ("Content-Encoding", "gzip")],
        &body,
    )])
    .await;
    let mut spec = RequestSpec::get(base);
    spec.encoding(Encoding::Gzip);
    let r = Client::new().execute(&spec).await.unwrap();
    assert_eq!(r.body().kind(), BodyKind::Json);
    assert_eq!(r.body().as_json().unwrap()["z"], 1);
    let requests = server.await.unwrap();
    assert!(requests[0].contains("Accept-Encoding: gzip\r\n"));
}

#[tokio::test]
async fn bad_gzip_is_an_encoding_error() {
    let (base, _server) = serve(vec![reply("200 OK", &[("Content-Encoding", "gzip")], b"not gzip")]).await;
    let mut spec = RequestSpec::get(base);
    spec.encoding(Encoding::All);
    let r = Client::new().execute(&spec).await.unwrap();
    assert_eq!(r.error().unwrap().code(), codes::BAD_CONTENT_ENCODING);
}

#[tokio::test]
async fn head_request_has_no_body() {
    let (base, _server) = serve(vec![
        b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nContent-Type: text/html\r\n\r\n".to_vec(),
    ])
    .await;
    let mut spec = RequestSpec::get(base);
    spec.method(Method::Head);
    let r = Client::new().execute(&spec).await.unwrap();
    assert_eq!(r.info().http_code(), 200);
    assert!(r.error().is_none());
    assert!(r.raw().is_empty());
}

#[tokio::test]
async fn timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            read_request(&mut stream).await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    });
    let mut spec = RequestSpec::get(format!("http://{}/slow", addr));
    spec.timeout(Duration::from_millis(200));
    let r = Client::new().execute(&spec).await.unwrap();
    let err = r.error().expect("timeout");
    assert_eq!(err.code(), codes::OPERATION_TIMEDOUT);
    assert!(err.message().starts_with("Operation timed out after 200 milliseconds"));
}

#[tokio::test]
async fn connection_refused() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let r = Client::new().execute(&RequestSpec::get(format!("http://{}/", addr))).await.unwrap();
    let err = r.error().expect("connect error");
    assert_eq!(err.code(), codes::COULDNT_CONNECT);
    assert!(r.headers().is_empty());
    assert_eq!(r.info().http_code(), 0);
}

#[tokio::test]
async fn empty_reply() {
    let (base, _server) = serve(vec![Vec::new()]).await;
    let r = Client::new().execute(&RequestSpec::get(base)).await.unwrap();
    assert_eq!(r.error().unwrap().code(), codes::GOT_NOTHING);
}

#[test]
fn blocking_execute() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (base, _server) = runtime.block_on(serve(vec![reply("200 OK", &[], b"a=1&b=2")]));
    let r = Client::new().execute_blocking(&RequestSpec::get(base)).unwrap();
    assert_eq!(r.body().as_query().and_then(|q| q.get("b")), Some("2"));
}

#[tokio::test]
#[ignore]
async fn network_get() {
    init_logging();
    let mut spec = RequestSpec::get("https://example.com/");
    spec.encoding(Encoding::All).timeout(Duration::from_secs(20));
    let r = Client::new().execute(&spec).await.unwrap();
    assert_eq!(r.info().http_code(), 200);
    assert_eq!(r.body().kind(), BodyKind::Html);
}
