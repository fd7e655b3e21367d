//! Question and answer records exchanged with the board service.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Identity of a question. Stable for the lifetime of the record.
pub type QuestionId = i64;
/// Identity of an answer. Unique only within its parent question.
pub type AnswerId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
/// Question status as carried on the wire.
///
/// Statuses are open-ended strings; anything outside the three known values
/// is kept verbatim in `Other` and serialized back unchanged.
pub enum QuestionStatus {
    #[default]
    Pending,
    Escalated,
    Answered,
    Other(String),
}

impl QuestionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Escalated => "escalated",
            Self::Answered => "answered",
            Self::Other(raw) => raw.as_str(),
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered)
    }

    pub fn is_escalated(&self) -> bool {
        matches!(self, Self::Escalated)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl From<String> for QuestionStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => Self::Pending,
            "escalated" => Self::Escalated,
            "answered" => Self::Answered,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for QuestionStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<QuestionStatus> for String {
    fn from(value: QuestionStatus) -> Self {
        match value {
            QuestionStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub user_name: String,
    pub message: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub message: String,
    pub status: QuestionStatus,
    pub created_at: String,
    /// Sticky marker set by the service when a question was ever escalated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub was_escalated: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_null_as_empty")]
    pub answers: Vec<Answer>,
}

impl Question {
    pub fn was_escalated(&self) -> bool {
        self.was_escalated.unwrap_or(false)
    }

    /// True when the question closed after having been escalated.
    pub fn answered_after_escalation(&self) -> bool {
        self.status.is_answered() && self.was_escalated()
    }

    pub fn has_answer(&self, answer_id: AnswerId) -> bool {
        self.answers.iter().any(|answer| answer.id == answer_id)
    }
}

/// `NEW_ANSWER` payload: an answer plus the identity of its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerAppended {
    pub question_id: QuestionId,
    #[serde(flatten)]
    pub answer: Answer,
}

fn deserialize_null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Answer>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Answer>>::deserialize(deserializer)?.unwrap_or_default())
}
