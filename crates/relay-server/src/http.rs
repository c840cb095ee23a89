//! Minimal HTTP/1.1 ingress.
//!
//! One request per connection, answered with `Connection: close`. Routes:
//!
//! - `POST /event`: relay envelope `{eventType, data}`
//! - `POST /eventsub`: raw platform webhook deliveries
//! - `GET /health`: liveness
//!
//! Accepted events are queued for the game loop and answered immediately;
//! a 200 means "queued", not "applied".

use std::sync::Arc;
use std::time::Duration;

use dispatcher::ConfigStore;
use relay_events::eventsub::{self, Delivery, MessageType, MESSAGE_TYPE_HEADER};
use relay_events::{EnvelopeError, EventEnvelope};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::error::ServerError;
use crate::runtime::{WorkItem, WorkSender};

const MAX_HEAD_BYTES: usize = 16 * 1024;
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// How long a peer gets to deliver a whole request.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Path without query string
    pub path: String,
    /// Header names are lowercased
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Request {
    pub fn new(method: &str, path: &str, body: impl Into<String>) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn from_head(head: &str, body: String) -> Option<Self> {
        let mut lines = head.split("\r\n");
        let mut parts = lines.next()?.split_whitespace();
        let method = parts.next()?.to_ascii_uppercase();
        let target = parts.next()?;
        let path = target.split('?').next().unwrap_or(target).to_string();
        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
            .collect();
        Some(Self {
            method,
            path,
            headers,
            body,
        })
    }
}

/// A response ready to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.into(),
        }
    }

    pub fn no_content() -> Self {
        Self::text(204, "")
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(
            status,
            json!({ "status": "error", "message": message.into() }),
        )
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let status_text = match self.status {
            200 => "OK",
            204 => "No Content",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            413 => "Payload Too Large",
            503 => "Service Unavailable",
            _ => "Internal Server Error",
        };
        let body = if self.status == 204 { "" } else { &self.body };
        let mut out = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status,
            status_text,
            self.content_type,
            body.len()
        )
        .into_bytes();
        out.extend_from_slice(body.as_bytes());
        out
    }
}

/// Why a request could not be read.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("request too large")]
    TooLarge,
    /// Bad request line, or the peer closed before the head or the body ended
    #[error("malformed request")]
    Malformed,
    #[error("request not received within {0:?}")]
    TimedOut(Duration),
}

/// Reads one request: head up to the blank line, then `Content-Length` bytes.
///
/// Returns `Ok(None)` when the peer closes before sending anything. A body
/// shorter than its `Content-Length` is [`ReadError::Malformed`].
pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Option<Request>, ReadError> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(end) = find_head_end(&buf) {
            break end;
        }
        if buf.len() > MAX_HEAD_BYTES {
            return Err(ReadError::TooLarge);
        }
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err(ReadError::Malformed);
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let content_length = content_length(&head);
    if content_length > MAX_BODY_BYTES {
        return Err(ReadError::TooLarge);
    }

    let body_start = head_end + 4;
    while buf.len() < body_start + content_length {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(ReadError::Malformed);
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = body_start + content_length;
    let body = String::from_utf8_lossy(&buf[body_start..body_end]).into_owned();

    Request::from_head(&head, body)
        .map(Some)
        .ok_or(ReadError::Malformed)
}

/// [`read_request`] bounded by `limit`.
pub async fn read_request_within<R: AsyncRead + Unpin>(
    reader: &mut R,
    limit: Duration,
) -> Result<Option<Request>, ReadError> {
    tokio::time::timeout(limit, read_request(reader))
        .await
        .map_err(|_| ReadError::TimedOut(limit))?
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}

fn content_length(head: &str) -> usize {
    head.split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Request router. Holds only the queue and the config store.
#[derive(Debug, Clone)]
pub struct Ingress {
    queue: WorkSender,
    config: Arc<ConfigStore>,
}

impl Ingress {
    pub fn new(queue: WorkSender, config: Arc<ConfigStore>) -> Self {
        Self { queue, config }
    }

    pub async fn route(&self, request: &Request) -> Response {
        let method = request.method.as_str();
        match request.path.as_str() {
            "/event" if method == "POST" => self.handle_event(&request.body).await,
            "/eventsub" if method == "POST" => self.handle_eventsub(request).await,
            "/health" if method == "GET" => Response::json(200, json!({ "status": "ok" })),
            "/event" | "/eventsub" | "/health" => Response::error(405, "Method not allowed"),
            _ => Response::error(404, "Not found"),
        }
    }

    async fn handle_event(&self, body: &str) -> Response {
        if self.config.snapshot().debug.log_events {
            tracing::info!(body = %body, "received event");
        }

        let envelope = match EventEnvelope::from_json(body) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(error = %e, "error parsing event");
                return Response::error(500, e.to_string());
            }
        };
        match envelope.parse() {
            Ok(_) | Err(EnvelopeError::UnknownKind(_)) => {}
            Err(e) => {
                tracing::error!(event_type = %envelope.event_type, error = %e, "error parsing event");
                return Response::error(500, e.to_string());
            }
        }

        self.enqueue(envelope).await
    }

    async fn handle_eventsub(&self, request: &Request) -> Response {
        let message_type = request
            .header(MESSAGE_TYPE_HEADER)
            .map(MessageType::from_header);
        let delivery: Delivery = match serde_json::from_str(&request.body) {
            Ok(delivery) => delivery,
            Err(e) => {
                tracing::warn!(error = %e, "malformed eventsub delivery");
                return Response::error(400, e.to_string());
            }
        };

        match message_type {
            Some(MessageType::Verification) => match delivery.challenge {
                Some(challenge) => {
                    tracing::info!(subscription = %delivery.subscription.kind, "eventsub callback verified");
                    Response::text(200, challenge)
                }
                None => Response::error(400, "missing challenge"),
            },
            Some(MessageType::Revocation) => {
                tracing::warn!(subscription = %delivery.subscription.kind, "eventsub subscription revoked");
                Response::no_content()
            }
            Some(MessageType::Notification) => {
                let kind = delivery.subscription.kind.as_str();
                match eventsub::translate(kind, &delivery.event) {
                    Some(envelope) => {
                        tracing::info!(subscription = %kind, "eventsub notification");
                        let response = self.enqueue(envelope).await;
                        if response.status == 200 {
                            Response::no_content()
                        } else {
                            response
                        }
                    }
                    None => {
                        tracing::info!(subscription = %kind, "unhandled eventsub type");
                        Response::no_content()
                    }
                }
            }
            Some(MessageType::Other(other)) => {
                tracing::debug!(message_type = %other, "ignoring eventsub message");
                Response::no_content()
            }
            None => Response::error(400, "missing message type header"),
        }
    }

    async fn enqueue(&self, envelope: EventEnvelope) -> Response {
        match self.queue.send(WorkItem::Event(envelope)).await {
            Ok(()) => Response::json(200, json!({ "status": "success" })),
            Err(_) => Response::error(503, "relay is shutting down"),
        }
    }
}

/// Accepts connections until the listener fails.
pub async fn serve(listener: TcpListener, ingress: Arc<Ingress>) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(addr = %addr, "HTTP server listening");
    }
    loop {
        let (stream, peer) = listener.accept().await?;
        let ingress = Arc::clone(&ingress);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &ingress, READ_TIMEOUT).await {
                tracing::warn!(peer = %peer, error = %e, "connection ended with error");
            }
        });
    }
}

async fn handle_connection<S>(
    mut stream: S,
    ingress: &Ingress,
    read_timeout: Duration,
) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let response = match read_request_within(&mut stream, read_timeout).await {
        Ok(Some(request)) => ingress.route(&request).await,
        Ok(None) => return Ok(()),
        Err(ReadError::Io(e)) => return Err(e),
        Err(ReadError::TooLarge) => Response::error(413, "request too large"),
        Err(ReadError::Malformed) => Response::error(400, "bad request"),
        Err(e @ ReadError::TimedOut(_)) => {
            tracing::debug!(error = %e, "closing idle connection");
            Response::error(408, "request timeout")
        }
    };
    stream.write_all(&response.to_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime;
    use dispatcher::RelayConfig;

    fn ingress() -> (Ingress, tokio::sync::mpsc::Receiver<WorkItem>) {
        let (tx, rx) = runtime::channel();
        let config = Arc::new(ConfigStore::new(RelayConfig::default()));
        (Ingress::new(tx, config), rx)
    }

    #[tokio::test]
    async fn test_read_request_with_body() {
        let raw = b"POST /event?x=1 HTTP/1.1\r\nHost: localhost\r\nContent-Length: 11\r\n\r\n{\"a\": true}";
        let mut reader = &raw[..];
        let request = read_request(&mut reader).await.unwrap().unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/event");
        assert_eq!(request.header("HOST"), Some("localhost"));
        assert_eq!(request.body, "{\"a\": true}");
    }

    #[tokio::test]
    async fn test_read_request_empty_stream() {
        let mut reader = &b""[..];
        assert!(matches!(read_request(&mut reader).await, Ok(None)));
    }

    #[tokio::test]
    async fn test_read_request_truncated_head() {
        let mut reader = &b"GET /health HTTP/1.1\r\n"[..];
        assert!(matches!(
            read_request(&mut reader).await,
            Err(ReadError::Malformed)
        ));
    }

    #[tokio::test]
    async fn test_read_request_short_body_is_malformed() {
        let raw = b"POST /event HTTP/1.1\r\nContent-Length: 200\r\n\r\n{\"eventType\":\"follow\",\"data\":{\"userName\":\"Corin\"}}";
        let mut reader = &raw[..];
        assert!(matches!(
            read_request(&mut reader).await,
            Err(ReadError::Malformed)
        ));
    }

    #[tokio::test]
    async fn test_read_request_oversized_body() {
        let raw = b"POST /event HTTP/1.1\r\nContent-Length: 2000000\r\n\r\n{}";
        let mut reader = &raw[..];
        assert!(matches!(
            read_request(&mut reader).await,
            Err(ReadError::TooLarge)
        ));
    }

    #[tokio::test]
    async fn test_read_request_oversized_head() {
        let mut raw = b"GET /health HTTP/1.1\r\n".to_vec();
        raw.extend(std::iter::repeat(b'a').take(MAX_HEAD_BYTES + 1));
        let mut reader = &raw[..];
        assert!(matches!(
            read_request(&mut reader).await,
            Err(ReadError::TooLarge)
        ));
    }

    #[tokio::test]
    async fn test_idle_connection_gets_408() {
        let (ingress, _rx) = ingress();
        let (mut client, server) = tokio::io::duplex(1024);
        let handler = tokio::spawn(async move {
            handle_connection(server, &ingress, Duration::from_millis(50)).await
        });

        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 408 Request Timeout\r\n"));
        handler.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_connection_answers_request() {
        let (ingress, _rx) = ingress();
        let (mut client, server) = tokio::io::duplex(4096);
        let handler =
            tokio::spawn(async move { handle_connection(server, &ingress, READ_TIMEOUT).await });

        client
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with(r#"{"status":"ok"}"#));
        handler.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_health() {
        let (ingress, _rx) = ingress();
        let response = ingress.route(&Request::new("GET", "/health", "")).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_event_accepted_and_queued() {
        let (ingress, mut rx) = ingress();
        let body = r#"{"eventType":"cheer","data":{"userName":"Voss","bits":500}}"#;
        let response = ingress.route(&Request::new("POST", "/event", body)).await;

        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"status":"success"}"#);
        match rx.try_recv().unwrap() {
            WorkItem::Event(envelope) => assert_eq!(envelope.event_type, "cheer"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_event_method_not_allowed() {
        let (ingress, _rx) = ingress();
        let response = ingress.route(&Request::new("GET", "/event", "")).await;
        assert_eq!(response.status, 405);
    }

    #[tokio::test]
    async fn test_invalid_json_is_500() {
        let (ingress, mut rx) = ingress();
        let response = ingress
            .route(&Request::new("POST", "/event", "{not json"))
            .await;

        assert_eq!(response.status, 500);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["status"], "error");
        assert!(body["message"].is_string());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_field_is_500() {
        let (ingress, mut rx) = ingress();
        let body = r#"{"eventType":"cheer","data":{"userName":"Voss"}}"#;
        let response = ingress.route(&Request::new("POST", "/event", body)).await;

        assert_eq!(response.status, 500);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_kind_is_accepted() {
        let (ingress, mut rx) = ingress();
        let body = r#"{"eventType":"hype_train","data":{}}"#;
        let response = ingress.route(&Request::new("POST", "/event", body)).await;

        assert_eq!(response.status, 200);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let (ingress, _rx) = ingress();
        let response = ingress.route(&Request::new("GET", "/nope", "")).await;
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_eventsub_verification_echoes_challenge() {
        let (ingress, _rx) = ingress();
        let body = r#"{"subscription":{"type":"channel.cheer"},"challenge":"pogchamp-kappa"}"#;
        let request = Request::new("POST", "/eventsub", body)
            .with_header("Twitch-Eventsub-Message-Type", "webhook_callback_verification");
        let response = ingress.route(&request).await;

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "pogchamp-kappa");
    }

    #[tokio::test]
    async fn test_eventsub_notification_is_queued() {
        let (ingress, mut rx) = ingress();
        let body = r#"{"subscription":{"type":"channel.raid"},"event":{"from_broadcaster_user_name":"Voss","viewers":45}}"#;
        let request = Request::new("POST", "/eventsub", body)
            .with_header("twitch-eventsub-message-type", "notification");
        let response = ingress.route(&request).await;

        assert_eq!(response.status, 204);
        match rx.try_recv().unwrap() {
            WorkItem::Event(envelope) => {
                assert_eq!(envelope.event_type, "raid");
                assert_eq!(envelope.data["fromBroadcasterName"], "Voss");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_eventsub_revocation_and_unhandled() {
        let (ingress, mut rx) = ingress();
        let revoked = Request::new("POST", "/eventsub", r#"{"subscription":{"type":"channel.cheer"}}"#)
            .with_header("twitch-eventsub-message-type", "revocation");
        assert_eq!(ingress.route(&revoked).await.status, 204);

        let unhandled = Request::new(
            "POST",
            "/eventsub",
            r#"{"subscription":{"type":"channel.hype_train.begin"},"event":{}}"#,
        )
        .with_header("twitch-eventsub-message-type", "notification");
        assert_eq!(ingress.route(&unhandled).await.status, 204);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_eventsub_missing_message_type_is_400() {
        let (ingress, mut rx) = ingress();
        let body = r#"{"subscription":{"type":"channel.follow"},"event":{"user_name":"Tamsin"}}"#;
        let response = ingress
            .route(&Request::new("POST", "/eventsub", body))
            .await;

        assert_eq!(response.status, 400);
        assert!(response.body.contains("missing message type header"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_eventsub_unparseable_delivery_is_400() {
        let (ingress, mut rx) = ingress();
        let request = Request::new("POST", "/eventsub", "{not json")
            .with_header("twitch-eventsub-message-type", "notification");
        let response = ingress.route(&request).await;

        assert_eq!(response.status, 400);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["status"], "error");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_eventsub_verification_without_challenge_is_400() {
        let (ingress, _rx) = ingress();
        let request = Request::new("POST", "/eventsub", r#"{"subscription":{"type":"channel.cheer"}}"#)
            .with_header("twitch-eventsub-message-type", "webhook_callback_verification");
        let response = ingress.route(&request).await;

        assert_eq!(response.status, 400);
        assert!(response.body.contains("missing challenge"));
    }

    #[tokio::test]
    async fn test_closed_queue_is_503() {
        let (ingress, rx) = ingress();
        drop(rx);
        let body = r#"{"eventType":"follow","data":{"userName":"Corin"}}"#;
        let response = ingress.route(&Request::new("POST", "/event", body)).await;
        assert_eq!(response.status, 503);
    }

    #[test]
    fn test_response_bytes() {
        let bytes = Response::json(200, json!({ "status": "ok" })).to_bytes();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 15\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.ends_with("\r\n\r\n{\"status\":\"ok\"}"));

        let empty = String::from_utf8(Response::no_content().to_bytes()).unwrap();
        assert!(empty.contains("Content-Length: 0\r\n"));
    }
}
