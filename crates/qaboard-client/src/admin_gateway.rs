//! Privileged status transitions sent to the board service.
//!
//! The gateway never touches the reconciliation store. It reports an
//! [`AdminActionOutcome`] and leaves reconciliation to the caller.

use std::sync::Arc;

use qaboard_sync::{Question, QuestionId, QuestionStatus};
use tracing::warn;

use crate::api_client::{BoardApiError, QuestionBoardApi};
use crate::session_context::SessionContext;

pub const NOT_AUTHENTICATED_MESSAGE: &str = "Not authenticated. Please log in again.";
pub const AUTHORIZATION_FAILED_MESSAGE: &str = "Authentication failed. Please log in again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    MarkAnswered,
    Escalate,
}

impl AdminAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MarkAnswered => "mark_answered",
            Self::Escalate => "escalate",
        }
    }

    /// Status the service moves the question toward.
    pub fn target_status(self) -> QuestionStatus {
        match self {
            Self::MarkAnswered => QuestionStatus::Answered,
            Self::Escalate => QuestionStatus::Escalated,
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            Self::MarkAnswered => "Failed to mark as answered",
            Self::Escalate => "Failed to escalate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// An admin action that passed the local credential check.
pub struct AdminRequest {
    pub action: AdminAction,
    pub question_id: QuestionId,
    access_token: String,
}

#[derive(Debug)]
pub struct AdminResponse {
    pub request: AdminRequest,
    pub result: Result<Option<Question>, BoardApiError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminActionOutcome {
    /// The service accepted the transition. `question` is the updated
    /// record when the response carried one.
    Accepted { question: Option<Question> },
    NotAuthenticated,
    AuthorizationFailed,
    Failed { reason: String },
}

impl AdminActionOutcome {
    /// User-facing alert text, if the outcome warrants one.
    pub fn user_message(&self, action: AdminAction) -> Option<&'static str> {
        match self {
            Self::Accepted { .. } => None,
            Self::NotAuthenticated => Some(NOT_AUTHENTICATED_MESSAGE),
            Self::AuthorizationFailed => Some(AUTHORIZATION_FAILED_MESSAGE),
            Self::Failed { .. } => Some(action.failure_message()),
        }
    }
}

#[derive(Clone)]
pub struct AdminActionGateway {
    api: Arc<dyn QuestionBoardApi>,
}

impl AdminActionGateway {
    pub fn new(api: Arc<dyn QuestionBoardApi>) -> Self {
        Self { api }
    }

    /// Checks for a held credential. Without one the action is refused
    /// here and no request is made.
    pub fn prepare(
        action: AdminAction,
        question_id: QuestionId,
        context: &SessionContext,
    ) -> Result<AdminRequest, AdminActionOutcome> {
        match context.access_token() {
            Some(token) => Ok(AdminRequest {
                action,
                question_id,
                access_token: token.to_string(),
            }),
            None => Err(AdminActionOutcome::NotAuthenticated),
        }
    }

    /// Sends the request with the credential attached as a bearer token.
    pub async fn execute(&self, request: AdminRequest) -> AdminResponse {
        let result = match request.action {
            AdminAction::MarkAnswered => {
                self.api
                    .mark_answered(request.question_id, &request.access_token)
                    .await
            }
            AdminAction::Escalate => {
                self.api
                    .escalate(request.question_id, &request.access_token)
                    .await
            }
        };
        AdminResponse { request, result }
    }

    /// Maps a response to an outcome. An authorization failure revokes the
    /// held credential when it is still the one the request used; a
    /// rejection of a credential that has since been replaced is reported
    /// as a plain failure and leaves the newer session alone.
    pub fn settle(response: AdminResponse, context: &mut SessionContext) -> AdminActionOutcome {
        let AdminResponse { request, result } = response;
        match result {
            Ok(question) => AdminActionOutcome::Accepted { question },
            Err(error) if error.is_unauthorized() => {
                if context.access_token() != Some(request.access_token.as_str()) {
                    warn!(
                        action = request.action.as_str(),
                        question_id = request.question_id,
                        "replaced admin credential rejected; keeping current session"
                    );
                    return AdminActionOutcome::Failed {
                        reason: error.to_string(),
                    };
                }
                warn!(
                    action = request.action.as_str(),
                    question_id = request.question_id,
                    "admin credential rejected; revoking admin session"
                );
                context.revoke_admin();
                AdminActionOutcome::AuthorizationFailed
            }
            Err(error) => {
                warn!(
                    action = request.action.as_str(),
                    question_id = request.question_id,
                    %error,
                    "admin action failed"
                );
                AdminActionOutcome::Failed {
                    reason: error.to_string(),
                }
            }
        }
    }

    pub async fn run(
        &self,
        action: AdminAction,
        question_id: QuestionId,
        context: &mut SessionContext,
    ) -> AdminActionOutcome {
        let request = match Self::prepare(action, question_id, context) {
            Ok(request) => request,
            Err(outcome) => return outcome,
        };
        let response = self.execute(request).await;
        Self::settle(response, context)
    }
}
