//! Bot commands: parsing and the text of instant replies.


use checkin_core::catalog::Catalog;
use chrono::{DateTime, Local, NaiveDateTime, Utc};

/// Known bot commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/track <key-or-category>`.
    Track(String),
    Skip,
    SkipAll,
    /// `/graph <key>`.
    Graph(String),
    Status,
    Help,
    /// Any other `/name`; may be a bare category.
    Other(String),
}

impl Command {
    /// Parse a command from message text. Returns `None` for non-command text.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }
        let mut parts = text.splitn(2, char::is_whitespace);
        let first = parts.next()?;
        let arg = parts.next().unwrap_or("").trim().to_string();
        // Strip @botname suffix (e.g. "/skip@checkin_bot" → "/skip").
        let cmd = first.split('@').next().unwrap_or(first).to_lowercase();
        Some(match cmd.as_str() {
            "/track" => Self::Track(arg),
            "/skip" => Self::Skip,
            "/skip_all" | "/skipall" => Self::SkipAll,
            "/graph" => Self::Graph(arg),
            "/status" => Self::Status,
            "/help" | "/start" => Self::Help,
            other => Self::Other(other.trim_start_matches('/').to_string()),
        })
    }
}

/// Snapshot of the bot for `/status` and `checkin status`.
pub struct StatusView<'a> {
    pub running: bool,
    pub pending_key: Option<&'a str>,
    pub pending_since: Option<DateTime<Utc>>,
    pub answer_count: Option<i64>,
    pub upcoming: &'a [(NaiveDateTime, String)],
}

pub fn format_status(view: &StatusView<'_>) -> String {
    let mut out = String::from("*Check-in status*\n");
    match (view.running, view.pending_key) {
        (_, Some(key)) => {
            let since = view
                .pending_since
                .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
                .unwrap_or_default();
            out.push_str(&format!("Waiting for: `{key}` (asked {since})\n"));
        }
        (true, None) => out.push_str("A check-in is running\n"),
        (false, None) => out.push_str("Idle\n"),
    }
    if let Some(count) = view.answer_count {
        out.push_str(&format!("Answers stored: {count}\n"));
    }
    if !view.upcoming.is_empty() {
        out.push_str("\nNext check-ins:\n");
        for (at, category) in view.upcoming {
            out.push_str(&format!("- {} {category}\n", at.format("%a %d-%m %H:%M")));
        }
    }
    out
}

pub fn format_help(catalog: &Catalog) -> String {
    let mut out = String::from(
        "*Commands*\n\
         /track <category or key> - run a check-in now\n\
         /skip - skip the current question\n\
         /skip_all - skip the rest of this check-in\n\
         /graph <key> - chart recent answers\n\
         /status - current check-in and schedule\n\
         /help - this message\n",
    );
    if !catalog.categories().is_empty() {
        out.push_str("\n*Categories*\n");
        for category in catalog.categories() {
            out.push_str(&format!(
                "/{} ({}, {} questions)",
                category.name,
                category.schedule,
                category.questions.len()
            ));
            if !category.description.is_empty() {
                out.push_str(&format!(" {}", category.description));
            }
            out.push('\n');
        }
    }
    out
}
