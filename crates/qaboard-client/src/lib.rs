//! Networked client for the live Q&A board.
//!
//! [`BoardSession`] owns the reconciliation store and drives the snapshot
//! fetch, the push connection, guest submissions and admin actions against
//! a [`QuestionBoardApi`].

pub mod admin_gateway;
pub mod api_client;
pub mod auth_forms;
pub mod board_commands;
pub mod board_render;
pub mod board_session;
pub mod connection;
pub mod reconnect;
pub mod session_context;

pub use admin_gateway::{
    AdminAction, AdminActionGateway, AdminActionOutcome, AdminRequest, AdminResponse,
    AUTHORIZATION_FAILED_MESSAGE, NOT_AUTHENTICATED_MESSAGE,
};
pub use api_client::{
    BoardApiClient, BoardApiConfig, BoardApiError, LoginRequest, QuestionBoardApi,
    RegisterRequest, DEFAULT_API_BASE,
};
pub use auth_forms::{AuthFormError, AuthKind};
pub use board_commands::{
    board_command_usage, execute_board_command, parse_board_command, BoardCommand, CommandEffect,
};
pub use board_render::{render_board_screen, render_board_screen_in};
pub use board_session::{
    AdminReconcilePolicy, BoardScreen, BoardSession, BoardSessionConfig, SessionInput,
};
pub use connection::{
    push_url_from_api_base, run_push_connection, ConnectionConfig, ConnectionState,
    ConnectionStatus, ConnectionTracker, ConnectionUpdate, CONNECTION_ERROR_MESSAGE,
};
pub use reconnect::{
    ExponentialBackoff, ImmediateReconnect, NoReconnect, ReconnectPolicy, ReconnectStrategy,
};
pub use session_context::{
    FileSessionStore, MemorySessionStore, SessionContext, SessionSnapshot, SessionStore,
    SessionStoreError,
};
