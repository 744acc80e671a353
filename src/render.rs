use crate::parser::bullets::format_bullets;
use crate::parser::ParsedResponse;
use crate::session::models::{ChatMessage, MessageBody, Sender};

/// Lay out a parsed reply as headed blocks for a terminal.
pub fn render_parsed(parsed: &ParsedResponse) -> String {
    let mut blocks = Vec::new();

    if !parsed.summary.is_empty() {
        blocks.push(format!("Summary\n{}", parsed.summary));
    }
    if !parsed.recommendations.is_empty() {
        let items: Vec<String> = format_bullets(&parsed.recommendations)
            .into_iter()
            .map(|item| format!("  • {}", item))
            .collect();
        blocks.push(format!("Recommendations\n{}", items.join("\n")));
    }
    if !parsed.disclaimer.is_empty() {
        blocks.push(format!("Disclaimer\n{}", parsed.disclaimer));
    }

    blocks.join("\n\n")
}

pub fn render_message(message: &ChatMessage) -> String {
    let label = match message.sender {
        Sender::User => "You",
        Sender::Assistant => "Health Harbor AI",
    };
    let body = match &message.body {
        MessageBody::Text(text) => text.clone(),
        MessageBody::Parsed(parsed) => render_parsed(parsed),
    };
    format!("[{}] {}:\n{}", message.timestamp.format("%H:%M"), label, body)
}
