//! Canned replies used when the agent service cannot answer.

use chrono::{DateTime, Local, TimeZone};

pub const HELP_REPLY: &str =
    "Available commands:\n/help - Show this help\n/ping - Test connection\n/time - Get current time";
pub const PING_REPLY: &str = "Pong! 🏓";
pub const GREETING_REPLY: &str = "Hello! 👋 How can I help you?";
pub const GENERIC_REPLY: &str =
    "Sorry, I'm having trouble generating a response right now. Please try again later.";

/// Keyword-based reply for `text`, using the local clock for `/time`.
#[must_use]
pub fn canned_reply(text: &str) -> String {
    canned_reply_at(text, &Local::now())
}

/// Keyword-based reply for `text` at a fixed instant.
///
/// Commands are matched as prefixes of the trimmed, lowercased text;
/// greetings as whole words anywhere in it.
#[must_use]
pub fn canned_reply_at<Tz: TimeZone>(text: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let lower = text.trim().to_lowercase();

    if lower.starts_with("/help") {
        HELP_REPLY.to_string()
    } else if lower.starts_with("/ping") {
        PING_REPLY.to_string()
    } else if lower.starts_with("/time") {
        format!("Current time: {}", now.format("%Y-%m-%d %H:%M:%S"))
    } else if is_greeting(&lower) {
        GREETING_REPLY.to_string()
    } else {
        GENERIC_REPLY.to_string()
    }
}

fn is_greeting(lower: &str) -> bool {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| matches!(word, "hello" | "hi"))
}
