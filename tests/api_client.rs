//! Client tests against a one-shot HTTP/1.1 mock of the orchestrator: they
//! check the request the client sends and how the reply lands in the session.

use health_harbor_lib::api::{auth, chat, ApiConfig, ApiError};
use health_harbor_lib::commands::chat::{resume_session, send_message, APOLOGY};
use health_harbor_lib::session::models::{MessageBody, Sender};
use health_harbor_lib::Session;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

#[derive(Debug)]
struct CapturedRequest {
    method: String,
    path: String,
    authorization: Option<String>,
    body: Value,
}

/// Accept exactly one request on a random loopback port, capture it and
/// answer with `status` and a JSON `resp_body`.
async fn mock_server_once(
    status: u16,
    resp_body: impl Into<String> + Send + 'static,
) -> (ApiConfig, tokio::sync::oneshot::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = tokio::sync::oneshot::channel::<CapturedRequest>();

    tokio::spawn(async move {
        let resp_body: String = resp_body.into();
        let (stream, _) = listener.accept().await.expect("accept");
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let mut request_line = String::new();
        reader.read_line(&mut request_line).await.unwrap();
        let mut parts = request_line.trim().splitn(3, ' ');
        let method = parts.next().unwrap_or("").to_string();
        let path = parts.next().unwrap_or("").to_string();

        let mut authorization = None;
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            if let Some((k, v)) = trimmed.split_once(": ") {
                match k.to_lowercase().as_str() {
                    "content-length" => content_length = v.parse().unwrap_or(0),
                    "authorization" => authorization = Some(v.to_string()),
                    _ => {}
                }
            }
        }

        let mut body_bytes = vec![0u8; content_length];
        reader.read_exact(&mut body_bytes).await.unwrap();
        let body = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        let _ = tx.send(CapturedRequest {
            method,
            path,
            authorization,
            body,
        });

        let http_resp = format!(
            "HTTP/1.1 {status} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            resp_body.len(),
            resp_body,
        );
        let _ = write_half.write_all(http_resp.as_bytes()).await;
    });

    (ApiConfig::new(format!("http://127.0.0.1:{port}")), rx)
}

fn chat_reply(text: &str) -> String {
    json!({
        "userMessage": {"id": "1", "text": "q", "sender": "user"},
        "aiMessage": {"id": "2", "text": text, "sender": "ai"},
    })
    .to_string()
}

#[tokio::test]
async fn login_posts_credentials_and_returns_token() {
    let body = json!({
        "message": "Login successful",
        "token": "jwt-abcdefghijkl",
        "user": {"id": "u1", "email": "ada@example.com", "fullName": "Ada"},
    });
    let (config, req_rx) = mock_server_once(200, body.to_string()).await;

    let resp = auth::login(&config, "ada@example.com", "pw").await.unwrap();
    assert_eq!(resp.token, "jwt-abcdefghijkl");
    assert_eq!(resp.user.full_name, "Ada");

    let req = req_rx.await.unwrap();
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/api/auth/login");
    assert_eq!(req.body, json!({"email": "ada@example.com", "password": "pw"}));
}

#[tokio::test]
async fn register_sends_full_name() {
    let body = json!({
        "message": "User created successfully",
        "token": "jwt-abcdefghijkl",
        "user": {"id": "u2", "email": "bo@example.com", "fullName": "Bo"},
    });
    let (config, req_rx) = mock_server_once(201, body.to_string()).await;

    let resp = auth::register(&config, "bo@example.com", "pw", "Bo")
        .await
        .unwrap();
    assert_eq!(resp.message, "User created successfully");

    let req = req_rx.await.unwrap();
    assert_eq!(req.path, "/api/auth/register");
    assert_eq!(req.body["fullName"], "Bo");
}

#[tokio::test]
async fn login_failure_uses_server_error_field() {
    let (config, _req_rx) =
        mock_server_once(401, json!({"error": "Invalid credentials"}).to_string()).await;

    let err = auth::login(&config, "ada@example.com", "bad").await.unwrap_err();
    match err {
        ApiError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn chat_send_returns_nested_text_with_bearer_token() {
    let (config, req_rx) = mock_server_once(200, chat_reply(r#"{"answer":"hi"}"#)).await;

    let raw = chat::send(&config, "tok", Some("s-1"), "hello").await.unwrap();
    assert_eq!(raw, r#"{"answer":"hi"}"#);
    assert_eq!(chat::extract_answer(&raw), "hi");

    let req = req_rx.await.unwrap();
    assert_eq!(req.path, "/api/chat");
    assert_eq!(req.authorization.as_deref(), Some("Bearer tok"));
    assert_eq!(req.body, json!({"message": "hello", "sessionId": "s-1"}));
}

#[tokio::test]
async fn chat_send_rejects_unexpected_shape() {
    let (config, _req_rx) = mock_server_once(200, json!({"ok": true}).to_string()).await;

    let err = chat::send(&config, "tok", None, "hello").await.unwrap_err();
    assert!(matches!(err, ApiError::Parse(_)));
}

#[tokio::test]
async fn send_message_parses_answer_into_sections() {
    let answer = json!({
        "answer": "## Summary\nOats are rich in fibre.\n\n## Recommendations\n* Eat oats\n* Add berries\n\nThis information is for general knowledge only."
    })
    .to_string();
    let (config, _req_rx) = mock_server_once(200, chat_reply(&answer)).await;

    let mut session = Session::with_token("jwt-abcdefghijkl");
    let reply = send_message(&config, &mut session, "Is oatmeal healthy?")
        .await
        .unwrap()
        .clone();

    assert_eq!(reply.sender, Sender::Assistant);
    let MessageBody::Parsed(parsed) = reply.body else {
        panic!("expected a parsed reply");
    };
    assert_eq!(parsed.summary, "Oats are rich in fibre.");
    assert_eq!(parsed.recommendations, "* Eat oats\n* Add berries");
    assert_eq!(
        parsed.disclaimer,
        "This information is for general knowledge only."
    );
    assert_eq!(session.messages().len(), 3);
}

#[tokio::test]
async fn send_message_keeps_plain_reply_as_summary() {
    let (config, _req_rx) = mock_server_once(200, chat_reply("I can't answer that question.")).await;

    let mut session = Session::with_token("jwt-abcdefghijkl");
    let reply = send_message(&config, &mut session, "What's the capital of France?")
        .await
        .unwrap();

    let MessageBody::Parsed(parsed) = &reply.body else {
        panic!("expected a parsed reply");
    };
    assert_eq!(parsed.summary, "I can't answer that question.");
    assert!(parsed.recommendations.is_empty());
}

#[tokio::test]
async fn send_message_server_error_degrades_to_apology() {
    let (config, _req_rx) =
        mock_server_once(500, json!({"error": "Could not save message"}).to_string()).await;

    let mut session = Session::with_token("jwt-abcdefghijkl");
    let reply = send_message(&config, &mut session, "hello").await.unwrap();

    assert_eq!(reply.body, MessageBody::Text(APOLOGY.to_string()));
    assert_eq!(session.messages().len(), 3);
}

fn history_reply() -> String {
    json!({
        "messages": [
            {"id": "m1", "userId": "u1", "text": "Is oatmeal healthy?", "sender": "user",
             "timestamp": "2024-05-01T09:30:00Z", "sessionId": "s-1"},
            {"id": "m2", "userId": "u1",
             "text": "{\"answer\": \"Summary: Yes.\\nRecommendations:\\n- Add berries\"}",
             "sender": "ai", "timestamp": "2024-05-01T09:30:05Z", "sessionId": "s-1"},
        ],
        "count": 2,
        "userId": "u1",
    })
    .to_string()
}

#[tokio::test]
async fn chat_history_sends_query_and_bearer_token() {
    let (config, req_rx) = mock_server_once(200, history_reply()).await;

    let entries = chat::history(&config, "tok", Some("s-1"), Some(20))
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].sender, Sender::User);
    assert_eq!(entries[1].sender, Sender::Assistant);

    let req = req_rx.await.unwrap();
    assert_eq!(req.method, "GET");
    assert_eq!(req.path, "/api/chat/history?sessionId=s-1&limit=20");
    assert_eq!(req.authorization.as_deref(), Some("Bearer tok"));
}

#[tokio::test]
async fn chat_history_null_messages_is_empty() {
    let (config, req_rx) = mock_server_once(
        200,
        json!({"messages": null, "count": 0, "userId": "u1"}).to_string(),
    )
    .await;

    let entries = chat::history(&config, "tok", None, None).await.unwrap();
    assert!(entries.is_empty());
    assert_eq!(req_rx.await.unwrap().path, "/api/chat/history");
}

#[tokio::test]
async fn resume_session_seeds_history_and_adopts_id() {
    let (config, _req_rx) = mock_server_once(200, history_reply()).await;

    let mut session = Session::with_token("jwt-abcdefghijkl");
    let count = resume_session(&config, &mut session, "s-1", None)
        .await
        .unwrap();

    assert_eq!(count, 2);
    assert_eq!(session.session_id(), "s-1");
    let messages = session.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(
        messages[1].body,
        MessageBody::Text("Is oatmeal healthy?".to_string())
    );
    let MessageBody::Parsed(parsed) = &messages[2].body else {
        panic!("expected a parsed reply");
    };
    assert_eq!(parsed.summary, "Yes.");
    assert_eq!(parsed.recommendations, "- Add berries");
}

#[tokio::test]
async fn resume_session_server_error_leaves_session_alone() {
    let (config, _req_rx) =
        mock_server_once(500, json!({"error": "Failed to fetch"}).to_string()).await;

    let mut session = Session::with_token("jwt-abcdefghijkl");
    let before = session.session_id().to_string();
    assert!(resume_session(&config, &mut session, "s-1", None)
        .await
        .is_err());
    assert_eq!(session.session_id(), before);
    assert_eq!(session.messages().len(), 1);
}
