use crate::api::{chat, ApiConfig, ApiError};
use crate::parser::parse_response;
use crate::session::models::{ChatMessage, MessageBody, Sender};
use crate::session::Session;
use tracing::{debug, warn};

pub const APOLOGY: &str =
    "Sorry, I'm having trouble reaching Health Harbor AI right now. Please try again in a moment.";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("not signed in")]
    NotSignedIn,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Send one user message and append the assistant's answer to the session.
///
/// Transport and server failures never surface here: they are logged and an
/// apology is appended in place of the answer. Holding `&mut Session` for the
/// whole round trip keeps a session to one request in flight.
pub async fn send_message<'s>(
    config: &ApiConfig,
    session: &'s mut Session,
    content: &str,
) -> Result<&'s ChatMessage, ChatError> {
    // 1. Validate input
    if content.trim().is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    let token = session.token().ok_or(ChatError::NotSignedIn)?.to_string();

    // 2. Record the user message
    session.push(Sender::User, MessageBody::Text(content.to_string()));

    // 3. Ask the orchestrator
    let session_id = session.session_id().to_string();
    let reply = chat::send(config, &token, Some(&session_id), content).await;

    // 4. Record the answer, or an apology
    let body = match reply {
        Ok(raw) => {
            let parsed = parse_response(&chat::extract_answer(&raw));
            debug!(empty = parsed.is_empty(), "assistant reply parsed");
            MessageBody::Parsed(parsed)
        }
        Err(e) => {
            warn!(error = %e, "chat request failed");
            MessageBody::Text(APOLOGY.to_string())
        }
    };

    Ok(session.push(Sender::Assistant, body))
}

/// Load an earlier session's messages from the server and continue it.
/// Returns the number of messages restored.
pub async fn resume_session(
    config: &ApiConfig,
    session: &mut Session,
    session_id: &str,
    limit: Option<u32>,
) -> Result<usize, ChatError> {
    let token = session.token().ok_or(ChatError::NotSignedIn)?.to_string();
    let entries = chat::history(config, &token, Some(session_id), limit).await?;
    let count = entries.len();

    let history = entries.into_iter().map(|entry| {
        let body = match entry.sender {
            Sender::User => MessageBody::Text(entry.text),
            Sender::Assistant => {
                MessageBody::Parsed(parse_response(&chat::extract_answer(&entry.text)))
            }
        };
        (entry.sender, body, entry.timestamp)
    });
    session.restore(session_id, history);

    debug!(session_id, count, "session resumed");
    Ok(count)
}
