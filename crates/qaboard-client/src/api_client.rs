//! HTTP boundary to the question board service.

use std::time::Duration;

use async_trait::async_trait;
use qaboard_sync::{AnswerSubmission, Question, QuestionId, QuestionSubmission};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardApiConfig {
    pub api_base: String,
    /// Per-request timeout. Zero leaves requests unbounded.
    pub request_timeout_ms: u64,
}

impl Default for BoardApiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_ms: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum BoardApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service rejected the credential")]
    Unauthorized { detail: Option<String> },
    #[error("service returned non-success status {status}")]
    HttpStatus { status: u16, detail: Option<String> },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl BoardApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// True when no response was received at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_))
    }

    /// Service-provided `detail` message from the error body, when present.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { detail } | Self::HttpStatus { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct SubmissionBody<'a> {
    user_name: &'a str,
    message: &'a str,
}

#[async_trait]
/// Request/response operations the board session depends on.
pub trait QuestionBoardApi: Send + Sync {
    async fn list_questions(&self) -> Result<Vec<Question>, BoardApiError>;

    async fn create_question(&self, submission: QuestionSubmission) -> Result<(), BoardApiError>;

    async fn create_answer(&self, submission: AnswerSubmission) -> Result<(), BoardApiError>;

    /// Returns the updated question when the response body decodes as one.
    async fn mark_answered(
        &self,
        question_id: QuestionId,
        access_token: &str,
    ) -> Result<Option<Question>, BoardApiError>;

    async fn escalate(
        &self,
        question_id: QuestionId,
        access_token: &str,
    ) -> Result<Option<Question>, BoardApiError>;

    /// Returns the issued bearer credential.
    async fn login(&self, request: LoginRequest) -> Result<String, BoardApiError>;

    async fn register(&self, request: RegisterRequest) -> Result<String, BoardApiError>;
}

#[derive(Debug, Clone)]
pub struct BoardApiClient {
    http: reqwest::Client,
    api_base: String,
}

impl BoardApiClient {
    pub fn new(config: &BoardApiConfig) -> Result<Self, BoardApiError> {
        let api_base = config.api_base.trim().trim_end_matches('/').to_string();
        if api_base.is_empty() {
            return Err(BoardApiError::InvalidConfig(
                "api base url cannot be empty".to_string(),
            ));
        }
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("qaboard-client"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let mut builder = reqwest::Client::builder().default_headers(headers);
        if config.request_timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(config.request_timeout_ms));
        }
        let http = builder.build()?;
        Ok(Self { http, api_base })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn send(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, BoardApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = extract_error_detail(&body);
        debug!(
            operation,
            status = status.as_u16(),
            detail = detail.as_deref().unwrap_or(""),
            "board api request failed"
        );
        if status == StatusCode::UNAUTHORIZED {
            return Err(BoardApiError::Unauthorized { detail });
        }
        Err(BoardApiError::HttpStatus {
            status: status.as_u16(),
            detail,
        })
    }

    async fn transition(
        &self,
        operation: &str,
        path: String,
        access_token: &str,
    ) -> Result<Option<Question>, BoardApiError> {
        let response = self
            .send(
                operation,
                self.http.patch(self.url(&path)).bearer_auth(access_token),
            )
            .await?;
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<Question>(&body) {
            Ok(question) => Ok(Some(question)),
            Err(error) => {
                debug!(operation, %error, "transition response did not carry a question");
                Ok(None)
            }
        }
    }

    async fn issue_token<B: Serialize + Sync>(
        &self,
        operation: &str,
        path: &str,
        body: &B,
    ) -> Result<String, BoardApiError> {
        let response = self
            .send(operation, self.http.post(self.url(path)).json(body))
            .await?;
        let token = response.json::<TokenResponse>().await?;
        let access_token = token.access_token.trim();
        if access_token.is_empty() {
            return Err(BoardApiError::InvalidResponse(format!(
                "{operation} returned an empty access_token"
            )));
        }
        Ok(access_token.to_string())
    }
}

#[async_trait]
impl QuestionBoardApi for BoardApiClient {
    async fn list_questions(&self) -> Result<Vec<Question>, BoardApiError> {
        let response = self
            .send("list_questions", self.http.get(self.url("/questions")))
            .await?;
        let body = response.text().await?;
        serde_json::from_str::<Vec<Question>>(&body)
            .map_err(|error| BoardApiError::InvalidResponse(format!("question list: {error}")))
    }

    async fn create_question(&self, submission: QuestionSubmission) -> Result<(), BoardApiError> {
        let body = SubmissionBody {
            user_name: &submission.user_name,
            message: &submission.message,
        };
        self.send(
            "create_question",
            self.http.post(self.url("/questions")).json(&body),
        )
        .await?;
        Ok(())
    }

    async fn create_answer(&self, submission: AnswerSubmission) -> Result<(), BoardApiError> {
        let body = SubmissionBody {
            user_name: &submission.user_name,
            message: &submission.message,
        };
        let path = format!("/questions/{}/answers", submission.question_id);
        self.send("create_answer", self.http.post(self.url(&path)).json(&body))
            .await?;
        Ok(())
    }

    async fn mark_answered(
        &self,
        question_id: QuestionId,
        access_token: &str,
    ) -> Result<Option<Question>, BoardApiError> {
        self.transition(
            "mark_answered",
            format!("/questions/{question_id}/answer"),
            access_token,
        )
        .await
    }

    async fn escalate(
        &self,
        question_id: QuestionId,
        access_token: &str,
    ) -> Result<Option<Question>, BoardApiError> {
        self.transition(
            "escalate",
            format!("/questions/{question_id}/escalate"),
            access_token,
        )
        .await
    }

    async fn login(&self, request: LoginRequest) -> Result<String, BoardApiError> {
        self.issue_token("login", "/login", &request).await
    }

    async fn register(&self, request: RegisterRequest) -> Result<String, BoardApiError> {
        self.issue_token("register", "/register", &request).await
    }
}

/// Pulls a string `detail` field out of an error body.
pub fn extract_error_detail(body: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(body).ok()?;
    value
        .get("detail")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|detail| !detail.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests;
