pub mod api;
pub mod commands;
pub mod parser;
pub mod render;
pub mod session;

pub use parser::bullets::format_bullets;
pub use parser::{parse_response, ParsedResponse};
pub use session::Session;
