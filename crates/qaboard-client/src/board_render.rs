//! Plain-text rendering of a board screen.

use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone, Utc};
use qaboard_core::parse_timestamp_unix_ms;
use qaboard_sync::Question;

use crate::board_session::BoardScreen;
use crate::connection::ConnectionStatus;

pub const LIVE_INDICATOR: &str = "Live updates on";
pub const CONNECTING_INDICATOR: &str = "Connecting...";

pub fn connection_indicator(status: &ConnectionStatus) -> &'static str {
    if status.is_open() {
        LIVE_INDICATOR
    } else {
        CONNECTING_INDICATOR
    }
}

/// Degraded-connectivity banner, present while an error flag is held.
pub fn connection_banner(status: &ConnectionStatus) -> Option<String> {
    status
        .error
        .as_deref()
        .map(|error| format!("{error} — questions will still work but won't live update."))
}

/// Formats a service timestamp in `tz`. Unparseable values are shown as-is.
pub fn format_timestamp<Tz>(raw: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    parse_timestamp_unix_ms(raw)
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|instant| {
            instant
                .with_timezone(tz)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| raw.to_string())
}

pub fn render_board_screen(screen: &BoardScreen<'_>) -> String {
    render_board_screen_in(screen, &Local)
}

pub fn render_board_screen_in<Tz>(screen: &BoardScreen<'_>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut lines = Vec::new();
    lines.push(format!(
        "{} total · page {} of {} · {}",
        screen.page.total_count,
        screen.page.page,
        screen.page.total_pages,
        connection_indicator(screen.connection)
    ));
    if let Some(banner) = connection_banner(screen.connection) {
        lines.push(banner);
    }
    let role = if screen.is_admin { "admin" } else { "guest" };
    let name = if screen.user_name.is_empty() {
        "(no name set)"
    } else {
        screen.user_name
    };
    lines.push(format!("Signed in as {role} · name: {name}"));
    if let Some(notification) = screen.notification {
        lines.push(format!("* {notification}"));
    }
    if let Some(alert) = screen.alert {
        lines.push(format!("! {alert}"));
    }
    if screen.composer.is_submitting() {
        lines.push(format!("Question: {}", screen.composer.progress_label()));
    } else if let Some(error) = screen.composer.error() {
        lines.push(format!("Question not sent: {error}"));
    }
    lines.push(String::new());

    if screen.loading {
        lines.push("Loading questions...".to_string());
    } else if screen.page.questions.is_empty() {
        lines.push("No questions yet.".to_string());
    }
    for question in &screen.page.questions {
        render_question(&mut lines, screen, question, tz);
    }

    let mut footer = Vec::new();
    if screen.page.has_previous() {
        footer.push("prev");
    }
    if screen.page.has_next() {
        footer.push("next");
    }
    if !footer.is_empty() {
        lines.push(format!("[{}]", footer.join(" | ")));
    }
    lines.join("\n")
}

fn render_question<Tz>(lines: &mut Vec<String>, screen: &BoardScreen<'_>, question: &Question, tz: &Tz)
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut header = format!(
        "#{} [{}] {}",
        question.id,
        question.status.as_str().to_uppercase(),
        format_timestamp(&question.created_at, tz)
    );
    if question.answered_after_escalation() {
        header.push_str(" ESCALATED");
    }
    lines.push(header);
    lines.push(format!("    {}", question.message));
    for answer in &question.answers {
        lines.push(format!(
            "    - {} ({}): {}",
            answer.user_name,
            format_timestamp(&answer.created_at, tz),
            answer.message
        ));
    }
    if question.status.is_answered() {
        lines.push("    New answers are disabled.".to_string());
    } else {
        let draft = screen.drafts.text(question.id);
        if screen.drafts.is_submitting(question.id) {
            lines.push(format!("    {}", screen.drafts.progress_label(question.id)));
        } else if !draft.is_empty() {
            lines.push(format!("    draft: {draft}"));
        }
    }
    if screen.is_admin {
        let mut actions = Vec::new();
        if question.status.is_pending() {
            actions.push("escalate");
        }
        if !question.status.is_answered() {
            actions.push("resolve");
        }
        if !actions.is_empty() {
            lines.push(format!("    admin: {}", actions.join(", ")));
        }
    }
}
