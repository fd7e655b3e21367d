use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use httpmock::prelude::*;
use qaboard_client::{
    render_board_screen_in, BoardApiClient, BoardApiConfig, BoardSession, BoardSessionConfig,
    ConnectionConfig, ConnectionState, FileSessionStore, SessionContext, SessionSnapshot,
    SessionStore, CONNECTION_ERROR_MESSAGE,
};
use qaboard_sync::QuestionStatus;
use serde_json::{json, Value};
use tempfile::tempdir;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

const PUSH_PATH: &str = "/ws/questions";

async fn push_handler(
    State(frames): State<broadcast::Sender<String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let receiver = frames.subscribe();
    ws.on_upgrade(move |socket| forward_frames(socket, receiver))
}

async fn forward_frames(mut socket: WebSocket, mut frames: broadcast::Receiver<String>) {
    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Ok(frame) = frame else {
                    break;
                };
                if socket.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

async fn spawn_push_broadcaster() -> (SocketAddr, broadcast::Sender<String>) {
    let (frames, _) = broadcast::channel(64);
    let app = Router::new()
        .route(PUSH_PATH, get(push_handler))
        .with_state(frames.clone());
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral listener");
    let addr = listener.local_addr().expect("resolve listener addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    (addr, frames)
}

fn question_json(id: i64, status: &str, created_at: &str, message: &str) -> Value {
    json!({
        "id": id,
        "message": message,
        "status": status,
        "created_at": created_at,
        "answers": []
    })
}

fn session_for(
    api_base: &str,
    ws_url: String,
    state_file: std::path::PathBuf,
) -> BoardSession {
    let api = BoardApiClient::new(&BoardApiConfig {
        api_base: api_base.to_string(),
        request_timeout_ms: 5_000,
    })
    .expect("api client");
    let context =
        SessionContext::hydrate(Box::new(FileSessionStore::new(state_file))).expect("hydrate");
    let config = BoardSessionConfig {
        connection: ConnectionConfig {
            ws_url,
            keepalive_interval: Duration::from_secs(30),
            ..ConnectionConfig::default()
        },
        ..BoardSessionConfig::default()
    };
    BoardSession::new(config, Arc::new(api), context)
}

async fn pump_until<F>(session: &mut BoardSession, mut done: F)
where
    F: FnMut(&BoardSession) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !done(session) {
        let input = tokio::time::timeout_at(deadline, session.next_input())
            .await
            .expect("condition reached before timeout")
            .expect("session input channel open");
        session.handle_input(input);
    }
}

#[tokio::test]
async fn integration_snapshot_push_and_admin_actions_reconcile_end_to_end() {
    let http = MockServer::start();
    let list = http.mock(|when, then| {
        when.method(GET).path("/questions");
        then.status(200).json_body(json!([
            question_json(1, "pending", "2024-05-01T10:00:00", "Where is room B?"),
            question_json(2, "answered", "2024-05-01T09:00:00", "Is there wifi?")
        ]));
    });
    let escalate = http.mock(|when, then| {
        when.method(PATCH)
            .path("/questions/1/escalate")
            .header("authorization", "Bearer admin-token");
        then.status(200).json_body(json!({
            "id": 1,
            "message": "Where is room B?",
            "status": "escalated",
            "created_at": "2024-05-01T10:00:00",
            "was_escalated": true,
            "answers": []
        }));
    });
    let (push_addr, frames) = spawn_push_broadcaster().await;

    let temp = tempdir().expect("tempdir");
    let state_file = temp.path().join("session.json");
    FileSessionStore::new(&state_file)
        .save(&SessionSnapshot {
            is_admin: true,
            access_token: Some("admin-token".to_string()),
            user_name: Some("Host".to_string()),
        })
        .expect("seed session state");

    let mut session = session_for(
        &http.base_url(),
        format!("ws://{push_addr}{PUSH_PATH}"),
        state_file,
    );
    session.start();
    pump_until(&mut session, |session| {
        session.store().is_seeded() && session.connection_status().is_open()
    })
    .await;
    list.assert_calls(1);
    assert_eq!(session.store().len(), 2);

    frames
        .send(
            json!({
                "type": "NEW_QUESTION",
                "payload": question_json(3, "pending", "2024-05-01T11:00:00", "Slides?")
            })
            .to_string(),
        )
        .expect("broadcast");
    frames
        .send(
            json!({
                "type": "NEW_ANSWER",
                "payload": {
                    "id": 10,
                    "question_id": 3,
                    "user_name": "Host",
                    "message": "Posted after the talk",
                    "created_at": "2024-05-01T11:05:00"
                }
            })
            .to_string(),
        )
        .expect("broadcast");
    pump_until(&mut session, |session| {
        session
            .question(3)
            .is_some_and(|question| question.answers.len() == 1)
    })
    .await;
    assert_eq!(session.notification(), Some("New question #3: Slides?"));

    session.escalate(1).expect("admin credential held");
    pump_until(&mut session, |session| {
        session
            .question(1)
            .is_some_and(|question| question.status == QuestionStatus::Escalated)
    })
    .await;
    escalate.assert_calls(1);
    assert!(session.store().pending_transition(1).is_some());

    frames
        .send(
            json!({
                "type": "QUESTION_UPDATED",
                "payload": {
                    "id": 1,
                    "message": "Where is room B?",
                    "status": "escalated",
                    "created_at": "2024-05-01T10:00:00",
                    "was_escalated": true,
                    "answers": []
                }
            })
            .to_string(),
        )
        .expect("broadcast");
    pump_until(&mut session, |session| {
        session.store().pending_transition(1).is_none()
    })
    .await;

    let ids = session
        .current_page()
        .questions
        .iter()
        .map(|question| question.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![1, 3, 2]);
    let rendered = render_board_screen_in(&session.screen(), &Utc);
    assert!(rendered.starts_with("3 total · page 1 of 1 · Live updates on"));
    assert!(rendered.contains("#1 [ESCALATED]"));
    assert!(rendered.contains("- Host (2024-05-01 11:05): Posted after the talk"));

    session.shutdown().await;
}

#[tokio::test]
async fn integration_rejected_credential_is_revoked_on_disk() {
    let http = MockServer::start();
    http.mock(|when, then| {
        when.method(GET).path("/questions");
        then.status(200).json_body(json!([question_json(
            1,
            "pending",
            "2024-05-01T10:00:00",
            "q"
        )]));
    });
    let resolve = http.mock(|when, then| {
        when.method(PATCH).path("/questions/1/answer");
        then.status(401)
            .json_body(json!({"detail": "Could not validate credentials"}));
    });
    let (push_addr, _frames) = spawn_push_broadcaster().await;

    let temp = tempdir().expect("tempdir");
    let state_file = temp.path().join("session.json");
    FileSessionStore::new(&state_file)
        .save(&SessionSnapshot {
            is_admin: true,
            access_token: Some("expired".to_string()),
            user_name: None,
        })
        .expect("seed session state");

    let mut session = session_for(
        &http.base_url(),
        format!("ws://{push_addr}{PUSH_PATH}"),
        state_file.clone(),
    );
    session.start();
    pump_until(&mut session, |session| session.store().is_seeded()).await;

    session.mark_answered(1).expect("credential held");
    pump_until(&mut session, |session| !session.is_admin()).await;
    resolve.assert_calls(1);
    assert_eq!(
        session.alert(),
        Some("Authentication failed. Please log in again.")
    );
    assert_eq!(
        session.question(1).map(|question| question.status.clone()),
        Some(QuestionStatus::Pending)
    );

    let persisted = FileSessionStore::new(&state_file).load().expect("reload");
    assert!(!persisted.is_admin);
    assert_eq!(persisted.access_token, None);
    session.shutdown().await;
}

#[tokio::test]
async fn integration_board_degrades_when_push_stream_is_unavailable() {
    let http = MockServer::start();
    http.mock(|when, then| {
        when.method(GET).path("/questions");
        then.status(500);
    });
    let create = http.mock(|when, then| {
        when.method(POST)
            .path("/questions")
            .json_body(json!({"user_name": "Ana", "message": "Still there?"}));
        then.status(200).json_body(json!({"id": 1}));
    });
    let unused = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let dead_addr = unused.local_addr().expect("addr");
    drop(unused);

    let temp = tempdir().expect("tempdir");
    let mut session = session_for(
        &http.base_url(),
        format!("ws://{dead_addr}{PUSH_PATH}"),
        temp.path().join("session.json"),
    );
    session.set_user_name("Ana");
    session.start();
    pump_until(&mut session, |session| {
        !session.is_loading()
            && session.connection_status().state == ConnectionState::Disconnected
            && session.connection_status().error.is_some()
    })
    .await;
    assert!(session.store().is_empty());
    assert_eq!(
        session.connection_status().error.as_deref(),
        Some(CONNECTION_ERROR_MESSAGE)
    );
    let rendered = render_board_screen_in(&session.screen(), &Utc);
    assert!(rendered.contains("0 total · page 1 of 1 · Connecting..."));
    assert!(rendered.contains(
        "WebSocket connection error — questions will still work but won't live update."
    ));

    session.set_question_draft("Still there?");
    session.submit_question().expect("valid question");
    pump_until(&mut session, |session| !session.composer().is_submitting()).await;
    create.assert_calls(1);
    assert_eq!(session.composer().message(), "");
    assert_eq!(session.composer().error(), None);
    session.shutdown().await;
}
