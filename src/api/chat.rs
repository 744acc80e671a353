use super::{check_status, ApiConfig, ApiError};
use crate::session::models::Sender;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatEnvelope {
    ai_message: RemoteMessage,
}

#[derive(Deserialize)]
struct RemoteMessage {
    text: String,
}

/// One stored message from `GET /api/chat/history`.
#[derive(Debug, Deserialize, Clone)]
pub struct HistoryEntry {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
struct HistoryEnvelope {
    // The server sends `null` rather than `[]` for an empty history.
    #[serde(default)]
    messages: Option<Vec<HistoryEntry>>,
}

#[derive(Deserialize)]
struct AnswerPayload {
    answer: String,
}

/// Post one user message and return the assistant's raw reply text.
pub async fn send(
    config: &ApiConfig,
    token: &str,
    session_id: Option<&str>,
    message: &str,
) -> Result<String, ApiError> {
    let url = config.url("/api/chat");
    debug!(%url, len = message.len(), "sending chat message");

    let resp = config
        .client()?
        .post(url)
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {}", token))
        .json(&ChatRequest {
            message,
            session_id,
        })
        .send()
        .await?;
    let resp = check_status(resp).await?;

    let text = resp.text().await?;
    let envelope: ChatEnvelope =
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))?;
    Ok(envelope.ai_message.text)
}

/// Fetch stored messages, oldest first. Without `session_id` the server
/// returns the user's messages across all sessions; `limit` defaults to 50
/// server side.
pub async fn history(
    config: &ApiConfig,
    token: &str,
    session_id: Option<&str>,
    limit: Option<u32>,
) -> Result<Vec<HistoryEntry>, ApiError> {
    let url = config.url("/api/chat/history");
    let mut query: Vec<(&str, String)> = Vec::new();
    if let Some(id) = session_id {
        query.push(("sessionId", id.to_string()));
    }
    if let Some(limit) = limit {
        query.push(("limit", limit.to_string()));
    }
    debug!(%url, ?session_id, ?limit, "fetching chat history");

    let resp = config
        .client()?
        .get(url)
        .header("Authorization", format!("Bearer {}", token))
        .query(&query)
        .send()
        .await?;
    let resp = check_status(resp).await?;

    let text = resp.text().await?;
    let envelope: HistoryEnvelope =
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))?;
    Ok(envelope.messages.unwrap_or_default())
}

/// The reply text may itself be a JSON `{"answer": ...}` document; unwrap it
/// when it is, otherwise hand the raw text back.
pub fn extract_answer(raw: &str) -> String {
    match serde_json::from_str::<AnswerPayload>(raw) {
        Ok(payload) => payload.answer,
        Err(_) => raw.to_string(),
    }
}
