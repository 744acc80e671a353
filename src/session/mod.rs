pub mod models;

use crate::api::auth::AuthResponse;
use chrono::{DateTime, Utc};
use models::{ChatMessage, MessageBody, Sender, UserProfile};
use tracing::info;

pub const GREETING: &str = "Hello! I'm Health Harbor AI, your personal health advisor. How can I assist you with your health concerns today?";

/// Per-user context: bearer token, signed-in user and the chat history.
///
/// Lives from sign-in until [`Session::logout`]; nothing here is persisted.
#[derive(Debug, Clone)]
pub struct Session {
    session_id: String,
    token: Option<String>,
    user: Option<UserProfile>,
    messages: Vec<ChatMessage>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let mut session = Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            token: None,
            user: None,
            messages: Vec::new(),
        };
        session.push(Sender::Assistant, MessageBody::Text(GREETING.to_string()));
        session
    }

    /// A session that already holds a token, e.g. one passed on the command line.
    pub fn with_token(token: impl Into<String>) -> Self {
        let mut session = Self::new();
        session.token = Some(token.into());
        session
    }

    pub fn sign_in(&mut self, auth: AuthResponse) {
        info!(email = %auth.user.email, "signed in");
        self.token = Some(auth.token);
        self.user = Some(auth.user);
    }

    /// Drop credentials and history and start over with a fresh session id.
    pub fn logout(&mut self) {
        if let Some(user) = &self.user {
            info!(email = %user.email, "signed out");
        }
        *self = Self::new();
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Token with everything but the first and last four characters hidden.
    pub fn masked_token(&self) -> Option<String> {
        self.token.as_deref().map(|token| {
            let chars: Vec<char> = token.chars().collect();
            if chars.len() > 8 {
                let head: String = chars[..4].iter().collect();
                let tail: String = chars[chars.len() - 4..].iter().collect();
                format!("{}...{}", head, tail)
            } else {
                "********".to_string()
            }
        })
    }

    /// Continue an earlier session: adopt its id and replace the history with
    /// the given messages (oldest first) behind the greeting.
    pub fn restore(
        &mut self,
        session_id: impl Into<String>,
        history: impl IntoIterator<Item = (Sender, MessageBody, DateTime<Utc>)>,
    ) {
        self.session_id = session_id.into();
        self.messages.clear();
        self.push(Sender::Assistant, MessageBody::Text(GREETING.to_string()));
        for (sender, body, timestamp) in history {
            self.push_at(sender, body, timestamp);
        }
    }

    pub(crate) fn push(&mut self, sender: Sender, body: MessageBody) -> &ChatMessage {
        self.push_at(sender, body, Utc::now())
    }

    fn push_at(
        &mut self,
        sender: Sender,
        body: MessageBody,
        timestamp: DateTime<Utc>,
    ) -> &ChatMessage {
        let id = self.messages.len() as u64 + 1;
        self.messages.push(ChatMessage {
            id,
            sender,
            body,
            timestamp,
        });
        &self.messages[self.messages.len() - 1]
    }
}
