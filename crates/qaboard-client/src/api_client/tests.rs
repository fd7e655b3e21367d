use httpmock::prelude::*;
use qaboard_sync::{AnswerSubmission, QuestionStatus, QuestionSubmission};
use serde_json::json;

use super::{
    extract_error_detail, BoardApiClient, BoardApiConfig, BoardApiError, LoginRequest,
    QuestionBoardApi, RegisterRequest,
};

fn client_for(server: &MockServer) -> BoardApiClient {
    BoardApiClient::new(&BoardApiConfig {
        api_base: format!("{}/", server.base_url()),
        request_timeout_ms: 0,
    })
    .expect("client")
}

#[test]
fn unit_extract_error_detail_reads_string_detail_only() {
    assert_eq!(
        extract_error_detail(r#"{"detail":"Message cannot be empty"}"#),
        Some("Message cannot be empty".to_string())
    );
    assert_eq!(extract_error_detail(r#"{"detail":[{"msg":"bad"}]}"#), None);
    assert_eq!(extract_error_detail(r#"{"detail":"  "}"#), None);
    assert_eq!(extract_error_detail("Internal Server Error"), None);
}

#[test]
fn unit_client_rejects_blank_api_base() {
    let error = BoardApiClient::new(&BoardApiConfig {
        api_base: "  ".to_string(),
        request_timeout_ms: 0,
    })
    .expect_err("blank base");
    assert!(matches!(error, BoardApiError::InvalidConfig(_)));
}

#[tokio::test]
async fn integration_list_questions_decodes_snapshot() {
    let server = MockServer::start();
    let list = server.mock(|when, then| {
        when.method(GET).path("/questions");
        then.status(200).json_body(json!([
            {
                "id": 1,
                "message": "first",
                "status": "pending",
                "created_at": "2024-05-01T10:00:00",
                "answers": [
                    {"id": 3, "user_name": "Bob", "message": "hi", "created_at": "2024-05-01T10:05:00"}
                ]
            },
            {
                "id": 2,
                "message": "second",
                "status": "answered",
                "created_at": "2024-05-01T11:00:00",
                "was_escalated": true,
                "answers": []
            }
        ]));
    });

    let questions = client_for(&server)
        .list_questions()
        .await
        .expect("snapshot");
    list.assert_calls(1);
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].answers[0].user_name, "Bob");
    assert!(questions[1].answered_after_escalation());
}

#[tokio::test]
async fn regression_list_questions_non_success_is_an_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/questions");
        then.status(500).body("boom");
    });

    let error = client_for(&server)
        .list_questions()
        .await
        .expect_err("non-success");
    assert!(matches!(
        error,
        BoardApiError::HttpStatus {
            status: 500,
            detail: None
        }
    ));
}

#[tokio::test]
async fn integration_create_question_posts_submission_body() {
    let server = MockServer::start();
    let create = server.mock(|when, then| {
        when.method(POST)
            .path("/questions")
            .json_body(json!({"user_name": "Ana", "message": "When?"}));
        then.status(200).json_body(json!({"id": 9}));
    });

    client_for(&server)
        .create_question(QuestionSubmission {
            user_name: "Ana".to_string(),
            message: "When?".to_string(),
        })
        .await
        .expect("created");
    create.assert_calls(1);
}

#[tokio::test]
async fn regression_create_question_surfaces_detail() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/questions");
        then.status(400)
            .json_body(json!({"detail": "Message cannot be empty"}));
    });

    let error = client_for(&server)
        .create_question(QuestionSubmission {
            user_name: "Ana".to_string(),
            message: "x".to_string(),
        })
        .await
        .expect_err("rejected");
    assert_eq!(error.detail(), Some("Message cannot be empty"));
    assert!(!error.is_unauthorized());
}

#[tokio::test]
async fn integration_create_answer_targets_parent_question() {
    let server = MockServer::start();
    let answer = server.mock(|when, then| {
        when.method(POST)
            .path("/questions/4/answers")
            .json_body(json!({"user_name": "Bob", "message": "yes"}));
        then.status(200).json_body(json!({"id": 1}));
    });

    client_for(&server)
        .create_answer(AnswerSubmission {
            question_id: 4,
            user_name: "Bob".to_string(),
            message: "yes".to_string(),
        })
        .await
        .expect("answered");
    answer.assert_calls(1);
}

#[tokio::test]
async fn integration_mark_answered_sends_bearer_and_decodes_question() {
    let server = MockServer::start();
    let patch = server.mock(|when, then| {
        when.method(PATCH)
            .path("/questions/7/answer")
            .header("authorization", "Bearer token-1");
        then.status(200).json_body(json!({
            "id": 7,
            "message": "q",
            "status": "answered",
            "created_at": "2024-05-01T10:00:00",
            "answers": []
        }));
    });

    let question = client_for(&server)
        .mark_answered(7, "token-1")
        .await
        .expect("accepted")
        .expect("question body");
    patch.assert_calls(1);
    assert_eq!(question.status, QuestionStatus::Answered);
}

#[tokio::test]
async fn unit_escalate_without_question_body_returns_none() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(PATCH).path("/questions/7/escalate");
        then.status(200).json_body(json!({"ok": true}));
    });

    let question = client_for(&server)
        .escalate(7, "token-1")
        .await
        .expect("accepted");
    assert_eq!(question, None);
}

#[tokio::test]
async fn regression_admin_transition_maps_401_to_unauthorized() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(PATCH).path("/questions/7/escalate");
        then.status(401)
            .json_body(json!({"detail": "Could not validate credentials"}));
    });

    let error = client_for(&server)
        .escalate(7, "stale")
        .await
        .expect_err("unauthorized");
    assert!(error.is_unauthorized());
    assert_eq!(error.detail(), Some("Could not validate credentials"));
}

#[tokio::test]
async fn integration_login_and_register_return_access_token() {
    let server = MockServer::start();
    let login = server.mock(|when, then| {
        when.method(POST)
            .path("/login")
            .json_body(json!({"email": "a@b.c", "password": "secret"}));
        then.status(200)
            .json_body(json!({"access_token": "tok-login", "token_type": "bearer"}));
    });
    let register = server.mock(|when, then| {
        when.method(POST).path("/register").json_body(json!({
            "username": "admin",
            "email": "a@b.c",
            "password": "secret"
        }));
        then.status(200)
            .json_body(json!({"access_token": "tok-register", "token_type": "bearer"}));
    });

    let client = client_for(&server);
    let token = client
        .login(LoginRequest {
            email: "a@b.c".to_string(),
            password: "secret".to_string(),
        })
        .await
        .expect("login");
    assert_eq!(token, "tok-login");
    let token = client
        .register(RegisterRequest {
            username: "admin".to_string(),
            email: "a@b.c".to_string(),
            password: "secret".to_string(),
        })
        .await
        .expect("register");
    assert_eq!(token, "tok-register");
    login.assert_calls(1);
    register.assert_calls(1);
}

#[tokio::test]
async fn regression_login_rejects_empty_access_token() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200).json_body(json!({"access_token": " "}));
    });

    let error = client_for(&server)
        .login(LoginRequest {
            email: "a@b.c".to_string(),
            password: "secret".to_string(),
        })
        .await
        .expect_err("empty token");
    assert!(matches!(error, BoardApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn regression_transport_failure_is_reported_as_http_error() {
    let client = BoardApiClient::new(&BoardApiConfig {
        api_base: "http://127.0.0.1:1".to_string(),
        request_timeout_ms: 2_000,
    })
    .expect("client");
    let error = client.list_questions().await.expect_err("no listener");
    assert!(error.is_transport());
    assert_eq!(error.detail(), None);
}
