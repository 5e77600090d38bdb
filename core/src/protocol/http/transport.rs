/*
 * transport.rs
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

//! `Transport` over HTTP/1.1: one connection per hop, redirects, authentication, content
//! decoding, timeouts and transfer metadata.
//!
//! Raw options recognized by name (canonical form, optional `CURLOPT_` prefix): `timeout`,
//! `timeoutMs`, `connectTimeout`, `connectTimeoutMs`, `maxRedirs`, `followLocation`,
//! `userAgent`, `referer`, `autoReferer`, `encoding`, `cookie`, `sslVerifyPeer`,
//! `sslVerifyHost`, `caInfo`. Typed settings take precedence over raw ones.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, warn};
use tokio::time::timeout;
use tokio_rustls::rustls::ClientConfig;
use url::{Host, Position, Url};

use crate::net;
use crate::protocol::http::auth::{self, DigestChallenge};
use crate::protocol::http::client::{HttpClient, TunnelProxy};
use crate::protocol::http::encoding;
use crate::protocol::http::handler::TransferCollector;
use crate::protocol::http::request::{Method, RequestBuilder};
use crate::protocol::http::spec::{
    option_name_matches, AuthScheme, Credentials, Encoding, RequestSpec, TlsOptions,
};
use crate::protocol::http::transfer::{RawTransferResult, TransferMetadata, Transport};
use crate::response::{codes, TransferError};
use crate::uri;

pub const DEFAULT_USER_AGENT: &str = "Curlew/0.1";

/// Redirect limit when `followLocation` is switched on without `maxRedirs`.
const DEFAULT_MAX_REDIRECTS: u32 = 20;

const RAW_OPTIONS: &[&str] = &[
    "timeout",
    "timeoutMs",
    "connectTimeout",
    "connectTimeoutMs",
    "maxRedirs",
    "followLocation",
    "userAgent",
    "referer",
    "autoReferer",
    "encoding",
    "cookie",
    "sslVerifyPeer",
    "sslVerifyHost",
    "caInfo",
];

/// HTTP/1.1 transport. Stateless: every transfer opens its own connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpTransport;

impl HttpTransport {
    pub fn new() -> Self {
        HttpTransport
    }
}

impl Transport for HttpTransport {
    fn transfer<'a>(&'a self, spec: &'a RequestSpec) -> BoxFuture<'a, RawTransferResult> {
        run(spec).boxed()
    }
}

/// Effective settings: typed fields, then raw options, then defaults.
#[derive(Debug, Clone)]
struct Settings {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    max_redirects: u32,
    user_agent: String,
    referer: Option<String>,
    auto_referer: bool,
    encoding: Option<Encoding>,
    cookie: Option<String>,
    tls: TlsOptions,
}

fn seconds(v: &str) -> Option<Duration> {
    v.trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(Duration::from_secs_f64)
}

fn millis(v: &str) -> Option<Duration> {
    v.trim().parse::<u64>().ok().map(Duration::from_millis)
}

fn flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "2" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Settings {
    fn resolve(spec: &RequestSpec) -> Self {
        for (name, _) in &spec.options {
            if !RAW_OPTIONS.iter().any(|known| option_name_matches(name, known)) {
                debug!("ignoring unrecognized transport option {}", name);
            }
        }
        let opt = |name: &str| spec.option_value(name);

        let max_redirects = spec.max_redirects.unwrap_or_else(|| {
            let max = opt("maxRedirs").and_then(|v| v.trim().parse::<u32>().ok());
            match opt("followLocation").and_then(flag) {
                Some(false) => 0,
                Some(true) => max.unwrap_or(DEFAULT_MAX_REDIRECTS),
                None => max.unwrap_or(0),
            }
        });
        let mut tls = spec.tls.clone();
        if tls.verify_peer.is_none() {
            tls.verify_peer = opt("sslVerifyPeer").and_then(flag);
        }
        if let Some(false) = opt("sslVerifyHost").and_then(flag) {
            tls.verify_host = false;
        }
        if tls.ca_file.is_none() {
            tls.ca_file = opt("caInfo").map(Into::into);
        }

        Settings {
            timeout: spec
                .timeout
                .or_else(|| opt("timeout").and_then(seconds))
                .or_else(|| opt("timeoutMs").and_then(millis)),
            connect_timeout: spec
                .connect_timeout
                .or_else(|| opt("connectTimeout").and_then(seconds))
                .or_else(|| opt("connectTimeoutMs").and_then(millis)),
            max_redirects,
            user_agent: spec
                .user_agent
                .clone()
                .or_else(|| opt("userAgent").map(str::to_string))
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            referer: spec.referer.clone().or_else(|| opt("referer").map(str::to_string)),
            auto_referer: spec.auto_referer || opt("autoReferer").and_then(flag).unwrap_or(false),
            encoding: spec.encoding.or_else(|| opt("encoding").and_then(Encoding::parse)),
            cookie: spec.cookie.clone().or_else(|| opt("cookie").map(str::to_string)),
            tls,
        }
    }
}

/// Accumulated state of one transfer across hops.
#[derive(Default)]
struct Progress {
    head: BytesMut,
    body: Bytes,
    status_line: Option<String>,
    metadata: TransferMetadata,
}

async fn run(spec: &RequestSpec) -> RawTransferResult {
    let started = Instant::now();
    let url = match spec.validate() {
        Ok(url) => url,
        Err(e) => {
            warn!("request rejected: {}", e);
            return RawTransferResult::failed(TransferError::transport(e.transfer_code(), e.to_string()));
        }
    };
    let settings = Settings::resolve(spec);
    debug!("{} {}", spec.method.as_str(), url);

    let mut progress = Progress::default();
    let outcome = match settings.timeout {
        Some(limit) => match timeout(limit, exchange(spec, &settings, url, &mut progress)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(TransferError::transport(
                codes::OPERATION_TIMEDOUT,
                format!("Operation timed out after {} milliseconds", limit.as_millis()),
            )),
        },
        None => exchange(spec, &settings, url, &mut progress).await,
    };

    let mut metadata = progress.metadata;
    metadata.total_time = started.elapsed();
    if !progress.head.is_empty() {
        metadata.header_size = Some(progress.head.len());
    }
    let error = outcome.err();
    match &error {
        Some(e) => debug!("transfer failed after {:?}: {}", metadata.total_time, e),
        None => debug!(
            "transfer complete: {} in {:?}, {} bytes",
            metadata.http_code, metadata.total_time, metadata.size_download
        ),
    }
    RawTransferResult {
        status_line: progress.status_line,
        header_block: progress.head.freeze(),
        body: progress.body,
        metadata,
        error,
    }
}

/// Host as used for DNS and TLS (no IPv6 brackets).
fn connect_host(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(d) => Some(d.to_string()),
        Host::Ipv4(a) => Some(a.to_string()),
        Host::Ipv6(a) => Some(a.to_string()),
    }
}

/// `Host` header value.
fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

fn is_redirect(code: u16) -> bool {
    matches!(code, 301 | 302 | 303 | 307 | 308)
}

fn io_error(err: std::io::Error, received_status: bool) -> TransferError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof && !received_status {
        TransferError::transport(codes::GOT_NOTHING, "Empty reply from server")
    } else {
        TransferError::from_io(&err)
    }
}

/// `Authorization` answering a 401, if the credentials fit one of the challenges.
fn answer_challenge(
    creds: &Credentials,
    collector: &TransferCollector,
    method: &Method,
    target: &str,
    nc: &mut u32,
) -> Option<String> {
    if creds.scheme == AuthScheme::Basic {
        return None;
    }
    let challenges: Vec<&str> = collector.header_values("www-authenticate").collect();
    let digest = challenges
        .iter()
        .filter_map(|c| DigestChallenge::parse(c))
        .find(DigestChallenge::is_supported);
    if let Some(challenge) = digest {
        *nc += 1;
        return Some(challenge.respond(
            &creds.username,
            &creds.password,
            method.as_str(),
            target,
            *nc,
            &auth::cnonce(),
        ));
    }
    if creds.scheme == AuthScheme::Any && auth::offers_basic(challenges.iter().copied()) {
        return Some(auth::basic(&creds.username, &creds.password));
    }
    None
}

/// Credentials sent with the first request to a host.
fn preemptive(spec: &RequestSpec) -> Option<String> {
    match &spec.auth {
        Some(c) if c.scheme == AuthScheme::Basic => Some(auth::basic(&c.username, &c.password)),
        _ => None,
    }
}

struct Hop<'a> {
    method: &'a Method,
    url: &'a Url,
    body: Option<&'a [u8]>,
    content_type: Option<&'a str>,
    referer: Option<&'a str>,
    authorization: Option<&'a str>,
    /// Plain (non-tunnel) proxy: absolute-form target plus this `Proxy-Authorization`.
    via_proxy: Option<Option<String>>,
}

fn build_request(spec: &RequestSpec, settings: &Settings, hop: &Hop<'_>) -> RequestBuilder {
    let target = match hop.via_proxy {
        Some(_) => hop.url[..Position::AfterQuery].to_string(),
        None => hop.url[Position::BeforePath..Position::AfterQuery].to_string(),
    };
    let mut req = RequestBuilder::new(hop.method.clone(), target);
    req.version = spec.http_version.as_str();
    req.header("Host", authority(hop.url));
    req.header("User-Agent", settings.user_agent.as_str());
    req.header("Accept", "*/*");
    if let Some(encoding) = settings.encoding {
        req.header("Accept-Encoding", encoding.accept_value());
    }
    if let Some(referer) = hop.referer {
        req.header("Referer", referer);
    }
    if let Some(cookie) = &settings.cookie {
        req.header("Cookie", cookie.as_str());
    }
    if let Some(authorization) = hop.authorization {
        req.header("Authorization", authorization);
    }
    if let Some(Some(proxy_auth)) = &hop.via_proxy {
        req.header("Proxy-Authorization", proxy_auth.as_str());
    }
    for (name, value) in &spec.headers {
        req.header(name.as_str(), value.as_str());
    }
    if let Some(content_type) = hop.content_type {
        if !req.has_header("Content-Type") {
            req.header("Content-Type", content_type);
        }
    }
    match hop.body {
        Some(body) => {
            req.header("Content-Length", body.len().to_string());
            req.body(body.to_vec());
        }
        None if matches!(hop.method, Method::Post | Method::Put | Method::Patch) => {
            req.header("Content-Length", "0");
        }
        None => {}
    }
    req.header("Connection", "close");
    req
}

async fn exchange(
    spec: &RequestSpec,
    settings: &Settings,
    mut url: Url,
    progress: &mut Progress,
) -> Result<(), TransferError> {
    let mut method = spec.method.clone();
    let mut body: Option<Vec<u8>> = spec.body.as_ref().map(|b| b.to_vec());
    let mut content_type: Option<&str> = None;
    if !spec.fields.is_empty() {
        let pairs = spec.fields.iter().map(|(k, v)| (k, v));
        if method.fields_in_query() {
            let with_fields = uri::append_query(url.as_str(), pairs);
            url = Url::parse(&with_fields)
                .map_err(|e| TransferError::transport(codes::URL_MALFORMAT, e.to_string()))?;
        } else if body.is_none() {
            body = Some(uri::build_query(pairs).into_bytes());
            content_type = Some("application/x-www-form-urlencoded");
        } else {
            warn!("request has both a body and form fields; sending the body");
        }
    }

    let proxy = match &spec.proxy {
        Some(p) => {
            let purl = p
                .url()
                .map_err(|e| TransferError::transport(e.transfer_code(), e.to_string()))?;
            let credentials = p.credentials.clone().or_else(|| {
                (!purl.username().is_empty()).then(|| {
                    (
                        uri::decode_component(purl.username()),
                        uri::decode_component(purl.password().unwrap_or("")),
                    )
                })
            });
            Some((p.tunnel, purl, credentials.map(|(u, pw)| auth::basic(&u, &pw))))
        }
        None => None,
    };

    let first_host = url.host_str().map(str::to_string);
    let mut referer = settings.referer.clone();
    let mut authorization = preemptive(spec);
    let mut auth_answered = false;
    let mut nc = 0u32;
    let mut redirects = 0u32;
    let mut tls_config: Option<Arc<ClientConfig>> = None;

    loop {
        let host = connect_host(&url)
            .ok_or_else(|| TransferError::transport(codes::URL_MALFORMAT, "URL has no host"))?;
        let port = url.port_or_known_default().unwrap_or(80);
        let https = url.scheme() == "https";
        let tls = if https {
            let config = match &tls_config {
                Some(c) => c.clone(),
                None => {
                    let c = net::tls_config(&settings.tls)
                        .map_err(|e| TransferError::transport(e.transfer_code(), e.to_string()))?;
                    tls_config = Some(c.clone());
                    c
                }
            };
            Some(config)
        } else {
            None
        };

        let (connected, via_proxy) = match &proxy {
            Some((tunnel, purl, proxy_auth)) if *tunnel || https => {
                let through = TunnelProxy {
                    host: connect_host(purl).unwrap_or_default(),
                    port: purl.port_or_known_default().unwrap_or(1080),
                    authorization: proxy_auth.clone(),
                };
                let c = HttpClient::connect(&host, port, tls, Some(&through), settings.connect_timeout).await?;
                (c, None)
            }
            Some((_, purl, proxy_auth)) => {
                let proxy_host = connect_host(purl).unwrap_or_default();
                let proxy_port = purl.port_or_known_default().unwrap_or(1080);
                let c = HttpClient::connect(&proxy_host, proxy_port, None, None, settings.connect_timeout).await?;
                (c, Some(proxy_auth.clone()))
            }
            None => (
                HttpClient::connect(&host, port, tls, None, settings.connect_timeout).await?,
                None,
            ),
        };
        let mut connection = connected.connection;
        progress.metadata.connect_time = connected.connect_time;
        if let Some(peer) = connection.peer() {
            progress.metadata.primary_ip = Some(peer.ip().to_string());
            progress.metadata.primary_port = Some(peer.port());
        }
        progress.metadata.effective_url = Some(url.to_string());

        let hop = Hop {
            method: &method,
            url: &url,
            body: body.as_deref(),
            content_type,
            referer: referer.as_deref(),
            authorization: authorization.as_deref(),
            via_proxy,
        };
        let request = build_request(spec, settings, &hop);
        let mut collector = TransferCollector::new();
        let sent = connection.send(&request, &mut collector).await;
        progress.metadata.size_upload += connection.bytes_sent();
        progress.head.extend_from_slice(collector.head_bytes());
        progress.metadata.size_download += collector.body_len() as u64;
        if collector.code() != 0 {
            progress.metadata.http_code = collector.code();
            progress.status_line = collector.status_line();
        }
        if let Err(e) = sent {
            return Err(io_error(e, collector.code() != 0));
        }
        let code = collector.code();

        if code == 401 && !auth_answered {
            let target = &url[Position::BeforePath..Position::AfterQuery];
            if let Some(creds) = &spec.auth {
                if let Some(answer) = answer_challenge(creds, &collector, &method, target, &mut nc) {
                    debug!("answering authentication challenge from {}", authority(&url));
                    authorization = Some(answer);
                    auth_answered = true;
                    continue;
                }
            }
        }

        if is_redirect(code) && settings.max_redirects > 0 {
            if let Some(location) = collector.header("location") {
                if redirects >= settings.max_redirects {
                    return Err(TransferError::transport(
                        codes::TOO_MANY_REDIRECTS,
                        format!("Maximum ({}) redirects followed", settings.max_redirects),
                    ));
                }
                let next = url.join(location).map_err(|e| {
                    TransferError::transport(codes::URL_MALFORMAT, format!("bad redirect location {}: {}", location, e))
                })?;
                if next.scheme() != "http" && next.scheme() != "https" {
                    return Err(TransferError::transport(
                        codes::UNSUPPORTED_PROTOCOL,
                        format!("redirect to unsupported scheme {}", next.scheme()),
                    ));
                }
                redirects += 1;
                progress.metadata.redirect_count = redirects;
                debug!("redirect {} to {}", code, next);
                if settings.auto_referer {
                    referer = Some(url.to_string());
                }
                let to_get = match code {
                    303 => method != Method::Head,
                    301 | 302 => method == Method::Post,
                    _ => false,
                };
                if to_get {
                    method = Method::Get;
                    body = None;
                    content_type = None;
                }
                if next.host_str() == first_host.as_deref() {
                    authorization = preemptive(spec);
                    auth_answered = false;
                } else {
                    // Credentials stay with the host they were given for.
                    authorization = None;
                    auth_answered = true;
                }
                url = next;
                continue;
            }
        }

        progress.metadata.content_type = collector.header("content-type").map(str::to_string);
        let content_encoding = collector.header("content-encoding").map(str::to_string);
        let (_, raw_body) = collector.into_parts();
        progress.body = match (settings.encoding, content_encoding) {
            (Some(_), Some(coding)) => match encoding::decode(&coding, &raw_body) {
                Ok(decoded) => Bytes::from(decoded),
                Err(e) => {
                    progress.body = raw_body;
                    return Err(TransferError::transport(
                        codes::BAD_CONTENT_ENCODING,
                        format!("Error while processing content unencoding: {}", e),
                    ));
                }
            },
            _ => raw_body,
        };
        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_options_fill_gaps() {
        let mut spec = RequestSpec::get("http://example.com/");
        spec.option("CURLOPT_TIMEOUT", "2.5")
            .option("followLocation", "1")
            .option("user_agent", "raw/1")
            .option("sslVerifyHost", "0");
        spec.user_agent("typed/1");
        let s = Settings::resolve(&spec);
        assert_eq!(s.timeout, Some(Duration::from_millis(2500)));
        assert_eq!(s.max_redirects, DEFAULT_MAX_REDIRECTS);
        assert_eq!(s.user_agent, "typed/1");
        assert!(!s.tls.verify_host);
    }

    #[test]
    fn defaults() {
        let s = Settings::resolve(&RequestSpec::get("http://example.com/"));
        assert_eq!(s.max_redirects, 0);
        assert_eq!(s.user_agent, DEFAULT_USER_AGENT);
        assert!(s.timeout.is_none());
        assert!(s.encoding.is_none());
    }

    #[test]
    fn request_head_for_form_post() {
        let mut spec = RequestSpec::post("http://example.com:8080/submit?x=1#frag");
        spec.header("X-Trace", "abc").cookie("sid=1");
        let settings = Settings::resolve(&spec);
        let url = spec.validate().unwrap();
        let hop = Hop {
            method: &spec.method,
            url: &url,
            body: Some(b"a=1"),
            content_type: Some("application/x-www-form-urlencoded"),
            referer: None,
            authorization: Some("Basic dTpw"),
            via_proxy: None,
        };
        let req = build_request(&spec, &settings, &hop);
        assert_eq!(req.target, "/submit?x=1");
        let get = |n: &str| {
            req.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(n))
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("host"), Some("example.com:8080"));
        assert_eq!(get("content-length"), Some("3"));
        assert_eq!(get("content-type"), Some("application/x-www-form-urlencoded"));
        assert_eq!(get("cookie"), Some("sid=1"));
        assert_eq!(get("authorization"), Some("Basic dTpw"));
        assert_eq!(get("x-trace"), Some("abc"));
        assert_eq!(get("connection"), Some("close"));
    }

    #[test]
    fn absolute_form_through_plain_proxy() {
        let spec = RequestSpec::get("http://example.com/a?b=c");
        let settings = Settings::resolve(&spec);
        let url = spec.validate().unwrap();
        let hop = Hop {
            method: &spec.method,
            url: &url,
            body: None,
            content_type: None,
            referer: None,
            authorization: None,
            via_proxy: Some(Some("Basic eDp5".to_string())),
        };
        let req = build_request(&spec, &settings, &hop);
        assert_eq!(req.target, "http://example.com/a?b=c");
        assert!(req.has_header("Proxy-Authorization"));
    }

    #[tokio::test]
    async fn invalid_spec_is_reported_in_result() {
        let result = HttpTransport::new()
            .transfer(&RequestSpec::get("gopher://example.com/"))
            .await;
        assert_eq!(result.error.unwrap().code(), codes::UNSUPPORTED_PROTOCOL);
    }
}
