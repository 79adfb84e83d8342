//! Upstream forwarding
//!
//! Streams the original request to the origin and the origin's response
//! back to the client. Hop-by-hop headers stay on their own hop; the
//! `X-Forwarded-*` family is injected for the origin. The bypass and
//! enforcement paths both land here, so both produce the same forwarded
//! header set.

use crate::server::admission::RequestContext;
use crate::server::state::AppState;
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use bytes::Bytes;
use futures::StreamExt;
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;
use tracing::error;

/// Headers that are meaningful only for a single connection.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Extract the port part of a `host[:port]` value, if any.
pub fn host_port(host: &str) -> Option<&str> {
    let idx = host.rfind(':')?;
    let port = &host[idx + 1..];
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        // bare IPv6 literals like "[::1]" have colons but no port
        return None;
    }
    Some(port)
}

/// Inject the forwarding headers the origin expects.
///
/// `X-Forwarded-Proto`, `-Host` and `-Port` are preserved when an earlier
/// proxy already set them; `X-Forwarded-Server` is always ours. The proto
/// defaults to `http` because this proxy never terminates TLS.
pub fn apply_forwarding_headers(
    headers: &mut reqwest::header::HeaderMap,
    original_host: &str,
    server_name: &str,
    request_id: &str,
    client_ip: &str,
) {
    use reqwest::header::HeaderValue;

    if !headers.contains_key("x-forwarded-proto") {
        headers.insert("x-forwarded-proto", HeaderValue::from_static("http"));
    }

    if !headers.contains_key("x-forwarded-host") && !original_host.is_empty() {
        if let Ok(value) = HeaderValue::from_str(original_host) {
            headers.insert("x-forwarded-host", value);
        }
    }

    if !headers.contains_key("x-forwarded-port") {
        let proto_is_https = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|proto| proto.eq_ignore_ascii_case("https"));
        let port = match host_port(original_host) {
            Some(port) => port,
            None if proto_is_https => "443",
            None => "80",
        };
        if let Ok(value) = HeaderValue::from_str(port) {
            headers.insert("x-forwarded-port", value);
        }
    }

    if let Ok(value) = HeaderValue::from_str(server_name) {
        headers.insert("x-forwarded-server", value);
    }

    if !headers.contains_key("x-request-id") && !request_id.is_empty() {
        if let Ok(value) = HeaderValue::from_str(request_id) {
            headers.insert("x-request-id", value);
        }
    }

    if !headers.contains_key("x-real-ip") && !client_ip.is_empty() {
        if let Ok(value) = HeaderValue::from_str(client_ip) {
            headers.insert("x-real-ip", value);
        }
    }
}

fn bad_gateway() -> HttpResponse {
    HttpResponse::BadGateway().json(json!({ "error": "bad gateway" }))
}

/// Forward one request to the origin and relay the response.
pub async fn forward(
    req: &HttpRequest,
    payload: web::Payload,
    state: &AppState,
    ctx: &RequestContext,
) -> HttpResponse {
    let mut url = state.target_url.clone();
    let base_path = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{base_path}{}", req.uri().path()));
    url.set_query(req.uri().query());

    let method = match reqwest::Method::from_bytes(req.method().as_str().as_bytes()) {
        Ok(method) => method,
        Err(e) => {
            error!(error = %e, "unsupported request method");
            return bad_gateway();
        }
    };

    let original_host = req
        .headers()
        .get("host")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default();

    // actix and reqwest sit on different http crate versions, so headers
    // cross the boundary as raw bytes
    let mut headers = reqwest::header::HeaderMap::new();
    for (name, value) in req.headers() {
        let name_str = name.as_str();
        if is_hop_by_hop(name_str)
            || name_str.eq_ignore_ascii_case("host")
            || name_str.eq_ignore_ascii_case("content-length")
        {
            continue;
        }
        if let (Ok(n), Ok(v)) = (
            reqwest::header::HeaderName::from_bytes(name_str.as_bytes()),
            reqwest::header::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            headers.append(n, v);
        }
    }

    apply_forwarding_headers(
        &mut headers,
        &original_host,
        &state.config.proxy.server_name,
        &ctx.request_id,
        &ctx.client_ip,
    );

    let mut builder = state.http_client.request(method, url).headers(headers);

    // only attach a body when the client actually sent one, so bodyless
    // requests are not turned into chunked transfers
    let has_body = req
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|len| len != "0")
        || req.headers().contains_key("transfer-encoding");
    if has_body {
        // the inbound payload is pinned to this worker thread; bridge it
        // over a channel so the upstream client gets a Send body stream
        let (body_tx, body_rx) = tokio::sync::mpsc::channel::<Result<Bytes, std::io::Error>>(8);
        actix_web::rt::spawn(async move {
            let mut payload = payload;
            while let Some(chunk) = payload.next().await {
                let chunk = chunk
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
                if body_tx.send(chunk).await.is_err() {
                    break;
                }
            }
        });
        builder = builder.body(reqwest::Body::wrap_stream(ReceiverStream::new(body_rx)));
    }

    let upstream = match builder.send().await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "failed to reach origin");
            return bad_gateway();
        }
    };

    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = HttpResponse::build(status);

    for (name, value) in upstream.headers() {
        let name_str = name.as_str();
        if is_hop_by_hop(name_str) || name_str.eq_ignore_ascii_case("content-length") {
            continue;
        }
        if let (Ok(n), Ok(v)) = (
            actix_web::http::header::HeaderName::from_bytes(name_str.as_bytes()),
            actix_web::http::header::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            response.append_header((n, v));
        }
    }

    response.streaming(upstream.bytes_stream())
}
