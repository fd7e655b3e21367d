//! Decoder for push-stream frames.
//!
//! Every frame is a JSON object `{"type": <kind>, "payload": <object>}`. The
//! decoder separates "not JSON", "unknown kind" and "payload does not match
//! the kind" so the connection layer can log a precise reason and carry on.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::{AnswerAppended, Question, QuestionId};

pub const PUSH_ERROR_CODE_NON_UTF8: &str = "non_utf8";
pub const PUSH_ERROR_CODE_INVALID_JSON: &str = "invalid_json";
pub const PUSH_ERROR_CODE_UNSUPPORTED_KIND: &str = "unsupported_kind";
pub const PUSH_ERROR_CODE_INVALID_PAYLOAD: &str = "invalid_payload";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushEventKind {
    NewQuestion,
    QuestionUpdated,
    NewAnswer,
}

impl PushEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewQuestion => "NEW_QUESTION",
            Self::QuestionUpdated => "QUESTION_UPDATED",
            Self::NewAnswer => "NEW_ANSWER",
        }
    }
}

impl FromStr for PushEventKind {
    type Err = PushDecodeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "NEW_QUESTION" => Ok(Self::NewQuestion),
            "QUESTION_UPDATED" => Ok(Self::QuestionUpdated),
            "NEW_ANSWER" => Ok(Self::NewAnswer),
            other => Err(PushDecodeError::UnsupportedKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    NewQuestion(Question),
    QuestionUpdated(Question),
    NewAnswer(AnswerAppended),
}

impl PushEvent {
    pub fn kind(&self) -> PushEventKind {
        match self {
            Self::NewQuestion(_) => PushEventKind::NewQuestion,
            Self::QuestionUpdated(_) => PushEventKind::QuestionUpdated,
            Self::NewAnswer(_) => PushEventKind::NewAnswer,
        }
    }

    /// Identity of the question the event targets.
    pub fn question_id(&self) -> QuestionId {
        match self {
            Self::NewQuestion(question) | Self::QuestionUpdated(question) => question.id,
            Self::NewAnswer(appended) => appended.question_id,
        }
    }
}

#[derive(Debug, Error)]
pub enum PushDecodeError {
    #[error("push frame is not valid UTF-8")]
    NonUtf8,
    #[error("failed to parse push frame JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("unsupported push event kind '{0}'")]
    UnsupportedKind(String),
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl PushDecodeError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::NonUtf8 => PUSH_ERROR_CODE_NON_UTF8,
            Self::InvalidJson(_) => PUSH_ERROR_CODE_INVALID_JSON,
            Self::UnsupportedKind(_) => PUSH_ERROR_CODE_UNSUPPORTED_KIND,
            Self::InvalidPayload { .. } => PUSH_ERROR_CODE_INVALID_PAYLOAD,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPushFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

/// Decodes one text frame into a typed push event.
pub fn decode_push_frame(raw: &str) -> Result<PushEvent, PushDecodeError> {
    let frame =
        serde_json::from_str::<RawPushFrame>(raw).map_err(PushDecodeError::InvalidJson)?;
    let kind = PushEventKind::from_str(frame.kind.trim())?;
    let invalid_payload = |source| PushDecodeError::InvalidPayload {
        kind: kind.as_str(),
        source,
    };
    match kind {
        PushEventKind::NewQuestion => serde_json::from_value::<Question>(frame.payload)
            .map(PushEvent::NewQuestion)
            .map_err(invalid_payload),
        PushEventKind::QuestionUpdated => serde_json::from_value::<Question>(frame.payload)
            .map(PushEvent::QuestionUpdated)
            .map_err(invalid_payload),
        PushEventKind::NewAnswer => serde_json::from_value::<AnswerAppended>(frame.payload)
            .map(PushEvent::NewAnswer)
            .map_err(invalid_payload),
    }
}

/// Decodes a binary frame carrying UTF-8 JSON text.
pub fn decode_push_bytes(bytes: &[u8]) -> Result<PushEvent, PushDecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|_| PushDecodeError::NonUtf8)?;
    decode_push_frame(text)
}

/// Shortens a frame for log output without splitting a character.
pub fn truncate_frame_for_log(raw: &str, max_chars: usize) -> String {
    if raw.chars().count() <= max_chars {
        return raw.to_string();
    }
    let mut truncated = raw.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}
