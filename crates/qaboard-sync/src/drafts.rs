//! Composition state for questions and per-question answer drafts.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::model::{Question, QuestionId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Local validation failures. Display text is user-facing.
pub enum DraftError {
    #[error("Question cannot be blank.")]
    BlankQuestion,
    #[error("Name is required.")]
    BlankName,
    #[error("Name and answer cannot be blank.")]
    BlankAnswer,
    #[error("A submission is already in progress.")]
    AlreadySubmitting,
    #[error("This question has been marked as answered; new answers are disabled.")]
    QuestionClosed,
    #[error("Question #{0} is not on the board.")]
    UnknownQuestion(QuestionId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSubmission {
    pub user_name: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSubmission {
    pub question_id: QuestionId,
    pub user_name: String,
    pub message: String,
}

#[derive(Debug, Default)]
/// The "ask a question" form.
pub struct QuestionComposer {
    message: String,
    submitting: bool,
    error: Option<String>,
}

impl QuestionComposer {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Last submission error, cleared when a new submission starts.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn progress_label(&self) -> &'static str {
        if self.submitting {
            "Sending..."
        } else {
            "Send"
        }
    }

    /// Validates the form and marks it in flight. Message is checked before
    /// name; both are trimmed in the returned submission.
    pub fn begin_submit(&mut self, user_name: &str) -> Result<QuestionSubmission, DraftError> {
        if self.submitting {
            return Err(DraftError::AlreadySubmitting);
        }
        self.error = None;
        let message = self.message.trim();
        if message.is_empty() {
            self.error = Some(DraftError::BlankQuestion.to_string());
            return Err(DraftError::BlankQuestion);
        }
        let user_name = user_name.trim();
        if user_name.is_empty() {
            self.error = Some(DraftError::BlankName.to_string());
            return Err(DraftError::BlankName);
        }
        self.submitting = true;
        Ok(QuestionSubmission {
            user_name: user_name.to_string(),
            message: message.to_string(),
        })
    }

    /// Clears the message on success; keeps it and records `error` otherwise.
    pub fn finish_submit(&mut self, result: Result<(), String>) {
        self.submitting = false;
        match result {
            Ok(()) => {
                self.message.clear();
                self.error = None;
            }
            Err(error) => self.error = Some(error),
        }
    }
}

#[derive(Debug, Default)]
/// Answer draft text and in-flight flags keyed by question identity.
pub struct AnswerDrafts {
    drafts: HashMap<QuestionId, String>,
    submitting: HashSet<QuestionId>,
}

impl AnswerDrafts {
    pub fn text(&self, question_id: QuestionId) -> &str {
        self.drafts
            .get(&question_id)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn set_text(&mut self, question_id: QuestionId, text: impl Into<String>) {
        self.drafts.insert(question_id, text.into());
    }

    pub fn clear(&mut self, question_id: QuestionId) {
        self.drafts.remove(&question_id);
    }

    pub fn is_submitting(&self, question_id: QuestionId) -> bool {
        self.submitting.contains(&question_id)
    }

    pub fn progress_label(&self, question_id: QuestionId) -> &'static str {
        if self.is_submitting(question_id) {
            "Sending..."
        } else {
            "Answer"
        }
    }

    /// Validates the draft for `question` and marks it in flight.
    pub fn begin_submit(
        &mut self,
        question: &Question,
        user_name: &str,
    ) -> Result<AnswerSubmission, DraftError> {
        if question.status.is_answered() {
            return Err(DraftError::QuestionClosed);
        }
        if self.is_submitting(question.id) {
            return Err(DraftError::AlreadySubmitting);
        }
        let message = self.text(question.id).trim().to_string();
        let user_name = user_name.trim();
        if user_name.is_empty() || message.is_empty() {
            return Err(DraftError::BlankAnswer);
        }
        self.submitting.insert(question.id);
        Ok(AnswerSubmission {
            question_id: question.id,
            user_name: user_name.to_string(),
            message,
        })
    }

    /// Ends the in-flight state; the draft is cleared only on success.
    pub fn finish_submit(&mut self, question_id: QuestionId, succeeded: bool) {
        self.submitting.remove(&question_id);
        if succeeded {
            self.clear(question_id);
        }
    }
}
