//! Tests for `HttpBackend` against a minimal HTTP server on a local socket.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use chatstream::chat::{ChatController, StreamStatus};
use chatstream::{ChatBackend, ChatRequest, HttpBackend, MemoryTranscript, SessionId};

struct Canned {
    status: u16,
    content_type: &'static str,
    chunks: Vec<String>,
}

impl Canned {
    fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            chunks: vec![body.to_string()],
        }
    }

    fn events(chunks: &[&str]) -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream",
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
        }
    }
}

fn route(method: &str, target: &str) -> Canned {
    let path = target.split('?').next().unwrap_or(target);
    match (method, path) {
        ("POST", "/chat/session") => Canned::json(200, serde_json::json!({"session_id": "s1"})),
        ("POST", "/chat/stream") => Canned::json(200, serde_json::json!({"session_id": "m1"})),
        ("GET", "/chat/stream/s1") => Canned::events(&[
            "data: {\"content\": \"He\"}\n\n",
            "data: {\"content\": \"l",
            "lo\"}\n\n: keep-alive\n\n",
            "data: {\"done\": true}\n\n",
        ]),
        ("GET", "/chat/stream/m1") => Canned::events(&["data: {\"error\": \"quota exceeded\"}\n\n"]),
        ("POST", "/api/chat") => Canned::json(
            200,
            serde_json::json!({"response": "**hi**", "error": null, "model_used": "test-model"}),
        ),
        ("GET", "/history/s1") => Canned::json(
            200,
            serde_json::json!({
                "session_id": "s1",
                "messages": [
                    {"user_message": "hi", "gemini_response": "Hello!", "timestamp": "2024-05-01T10:20:30.5"},
                    {"user_message": "bye", "ai_response": "Goodbye."}
                ],
                "total_count": 2
            }),
        ),
        ("GET", "/history/broken") => {
            Canned::json(500, serde_json::json!({"detail": "database unavailable"}))
        }
        ("GET", "/sessions") => Canned::json(
            200,
            serde_json::json!({
                "sessions": [{
                    "session_id": "s1",
                    "created_at": "2024-05-01T10:00:00",
                    "last_activity": "2024-05-01T10:20:30",
                    "message_count": 2
                }],
                "count": 1
            }),
        ),
        _ => Canned::json(404, serde_json::json!({"detail": "Session not found"})),
    }
}

async fn read_request(socket: &mut TcpStream) -> (String, String, String) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending a request");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .map(|(_, value)| value.trim().parse::<usize>().unwrap())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap();
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..header_end + content_length]).to_string();
    let mut request_line = head.lines().next().unwrap().split(' ');
    let method = request_line.next().unwrap().to_string();
    let target = request_line.next().unwrap().to_string();
    (method, target, body)
}

async fn respond(socket: &mut TcpStream, canned: Canned) {
    let length: usize = canned.chunks.iter().map(|c| c.len()).sum();
    let head = format!(
        "HTTP/1.1 {} Canned\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        canned.status, canned.content_type, length
    );
    socket.write_all(head.as_bytes()).await.unwrap();
    for chunk in canned.chunks {
        socket.write_all(chunk.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let _ = socket.shutdown().await;
}

/// Serve `route` on a fresh port; returns the base URL and a log of requests.
async fn spawn_server() -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let log = log.clone();
            tokio::spawn(async move {
                let (method, target, body) = read_request(&mut socket).await;
                log.lock().unwrap().push(format!("{method} {target} {body}").trim().to_string());
                respond(&mut socket, route(&method, &target)).await;
            });
        }
    });
    (format!("http://{addr}"), seen)
}

#[tokio::test]
async fn create_session_and_stream() {
    let (base_url, seen) = spawn_server().await;
    let backend = HttpBackend::new(&base_url).unwrap();

    let session = backend.create_session().await.unwrap();
    assert_eq!(session.as_str(), "s1");

    let stream = backend.open_stream(&session, Some("hi there")).await.unwrap();
    let data: Vec<String> = stream.map(|event| event.unwrap().data).collect().await;
    assert_eq!(
        data,
        vec![
            r#"{"content": "He"}"#,
            r#"{"content": "llo"}"#,
            r#"{"done": true}"#,
        ]
    );

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen[0], "POST /chat/session {}");
    assert_eq!(seen[1], "GET /chat/stream/s1?message=hi+there");
}

#[tokio::test]
async fn per_message_and_single_shot_requests() {
    let (base_url, seen) = spawn_server().await;
    let backend = HttpBackend::new(&base_url).unwrap();
    let request = ChatRequest::new("hi").unwrap();

    assert_eq!(backend.start_stream(&request).await.unwrap().as_str(), "m1");
    let reply = backend.chat(&request).await.unwrap();
    assert_eq!(reply.response, "**hi**");
    assert_eq!(reply.model_used.as_deref(), Some("test-model"));

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen[0], r#"POST /chat/stream {"message":"hi"}"#);
    assert_eq!(seen[1], r#"POST /api/chat {"message":"hi"}"#);
}

#[tokio::test]
async fn history_and_sessions() {
    let (base_url, _) = spawn_server().await;
    let backend = HttpBackend::new(&base_url).unwrap();

    let history = backend.history(&SessionId::new("s1")).await.unwrap();
    assert_eq!(history.messages.len(), 2);
    assert_eq!(history.messages[1].gemini_response, "Goodbye.");
    assert!(history.messages[0].timestamp.is_some());

    let sessions = backend.sessions().await.unwrap();
    assert_eq!(sessions.count, 1);
    assert_eq!(sessions.sessions[0].message_count, 2);
}

#[tokio::test]
async fn error_statuses_are_classified() {
    let (base_url, _) = spawn_server().await;
    let backend = HttpBackend::new(&base_url).unwrap();

    let err = backend.history(&SessionId::new("missing")).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.status_code(), Some(404));
    assert!(err.to_string().contains("Session not found"));

    let err = backend.history(&SessionId::new("broken")).await.unwrap_err();
    assert!(err.is_server_error());
    assert!(err.to_string().contains("database unavailable"));

    let Err(err) = backend.open_stream(&SessionId::new("nope"), None).await else {
        panic!("opening a stream for an unknown session should fail");
    };
    assert!(err.is_not_found());
}

#[tokio::test]
async fn unreachable_backend_is_a_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpBackend::new(&format!("http://{addr}")).unwrap();
    let err = backend.create_session().await.unwrap_err();
    assert!(err.is_connection(), "unexpected error: {err}");
}

#[tokio::test]
async fn controller_over_http() {
    let (base_url, _) = spawn_server().await;
    let backend = Arc::new(HttpBackend::new(&base_url).unwrap());
    let mut chat = ChatController::new(backend, MemoryTranscript::new());
    chat.initialize_session().await.unwrap();

    assert_eq!(chat.send_message("hi").await, Some(StreamStatus::Done));
    assert_eq!(chat.view().last().unwrap().rendered(), "<p>Hello</p>\n");

    assert_eq!(chat.load_history(&SessionId::new("s1")).await.unwrap(), 2);
    assert_eq!(chat.view().len(), 4);
    assert_eq!(chat.view().entries()[3].rendered(), "<p>Goodbye.</p>\n");
}
