//! HTTP server for the sales insights API
//! Simple HTTP server using tokio and basic HTTP handling

use crate::error::InsightsError;
use crate::service::SalesInsights;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

const READ_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REQUEST_BYTES: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self { status, body },
            Err(e) => Self::error(500, &format!("Failed to serialize response: {}", e)),
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: serde_json::json!({ "error": message }).to_string(),
        }
    }

    pub fn from_error(err: &InsightsError) -> Self {
        Self::error(err.status_code(), &err.to_string())
    }

    /// Serialize as a complete HTTP/1.1 response.
    pub fn to_http(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: application/json\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Access-Control-Allow-Methods: GET, OPTIONS\r\n\
             Access-Control-Allow-Headers: Content-Type\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {}",
            self.status,
            status_text(self.status),
            self.body.len(),
            self.body
        )
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        _ => "Internal Server Error",
    }
}

/// Accept connections forever, one task per connection.
pub async fn serve(listener: TcpListener, service: Arc<SalesInsights>) -> std::io::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        debug!("New connection from: {}", addr);
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            handle_connection(stream, service).await;
        });
    }
}

async fn handle_connection(mut stream: TcpStream, service: Arc<SalesInsights>) {
    let mut buffer = Vec::new();
    let mut temp_buf = [0; 8192];

    let read_result = timeout(READ_TIMEOUT, async {
        loop {
            let n = stream.read(&mut temp_buf).await?;
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&temp_buf[..n]);
            if request_complete(&buffer) || buffer.len() > MAX_REQUEST_BYTES {
                break;
            }
        }
        Ok::<(), std::io::Error>(())
    })
    .await;

    match read_result {
        Err(_) => {
            warn!("Request read timeout");
            return;
        }
        Ok(Err(e)) => {
            error!("Failed to read from stream: {}", e);
            return;
        }
        Ok(Ok(())) => {}
    }

    if buffer.is_empty() {
        return;
    }

    let response = match std::str::from_utf8(&buffer) {
        Ok(request) => handle_request(&service, request).await,
        Err(_) => HttpResponse::error(400, "Request is not valid UTF-8"),
    };

    if let Err(e) = stream.write_all(response.to_http().as_bytes()).await {
        error!("Failed to write response: {}", e);
    }
}

/// Headers received and, if a body was announced, the whole body too.
fn request_complete(buffer: &[u8]) -> bool {
    let Some(headers_end) = find_subsequence(buffer, b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&buffer[..headers_end]);
    let body_len = extract_content_length(&head).unwrap_or(0);
    buffer.len() >= headers_end + 4 + body_len
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn extract_content_length(request: &str) -> Option<usize> {
    request.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

/// Parse the request line of a raw HTTP request and dispatch it.
pub async fn handle_request(service: &SalesInsights, request: &str) -> HttpResponse {
    let Some(request_line) = request.lines().next() else {
        return HttpResponse::error(400, "Bad Request");
    };
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return HttpResponse::error(400, "Bad Request");
    }

    let method = parts[0];
    let (path, query) = split_target(parts[1]);
    let response = route(service, method, &path, &query).await;
    info!("{} {} -> {}", method, path, response.status);
    response
}

/// Split a request target into a normalized path and decoded query parameters.
pub fn split_target(target: &str) -> (String, HashMap<String, String>) {
    let (path, query_string) = match target.split_once('?') {
        Some((path, qs)) => (path, Some(qs)),
        None => (target, None),
    };

    let mut path = path.trim_end_matches('/').to_string();
    if path.is_empty() {
        path = "/".to_string();
    }

    (path, query_string.map(parse_query).unwrap_or_default())
}

/// `a=1&b=x%20y` into a map; the first occurrence of a key wins.
pub fn parse_query(query_string: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query_string.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params
            .entry(percent_decode(key))
            .or_insert_with(|| percent_decode(value));
    }
    params
}

pub fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => decoded.push(b' '),
            b'%' if i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit() =>
            {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        decoded.push(byte);
                        i += 2;
                    }
                    None => decoded.push(b'%'),
                }
            }
            other => decoded.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

pub async fn route(
    service: &SalesInsights,
    method: &str,
    path: &str,
    query: &HashMap<String, String>,
) -> HttpResponse {
    if method == "OPTIONS" {
        return HttpResponse {
            status: 204,
            body: String::new(),
        };
    }

    let known = matches!(
        path,
        "/api/health" | "/api/team_performance" | "/api/performance_trends" | "/api/rep_performance"
    );
    if !known {
        return HttpResponse::error(404, "Not found");
    }
    if method != "GET" {
        return HttpResponse::error(405, "Method not allowed");
    }

    let result = match path {
        "/api/health" => {
            return HttpResponse::json(
                200,
                &serde_json::json!({"status": "ok", "service": "sales-insights"}),
            )
        }
        "/api/team_performance" => service
            .team_performance()
            .await
            .map(|r| HttpResponse::json(200, &r)),
        "/api/performance_trends" => service
            .performance_trends(query.get("time_period").map(String::as_str))
            .await
            .map(|r| HttpResponse::json(200, &r)),
        _ => service
            .rep_performance(query.get("rep_id").map(String::as_str))
            .await
            .map(|r| HttpResponse::json(200, &r)),
    };

    result.unwrap_or_else(|e| {
        if e.status_code() >= 500 {
            error!("{} failed: {}", path, e);
        }
        HttpResponse::from_error(&e)
    })
}
