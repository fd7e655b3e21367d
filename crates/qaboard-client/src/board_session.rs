//! Board session: the single owner of board state for one running client.
//!
//! Network work runs in spawned tasks that report back as [`SessionInput`]s.
//! The owner pulls them with [`BoardSession::next_input`] and applies each
//! with [`BoardSession::handle_input`], so store mutations never interleave.

use std::sync::Arc;
use std::time::Duration;

use qaboard_sync::{
    AnswerDrafts, BoardPage, BoardView, DraftError, OptimisticOutcome, PushEvent, Question,
    QuestionComposer, QuestionId, ReconciliationStore, UnknownUpdatePolicy, DEFAULT_PAGE_SIZE,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::admin_gateway::{
    AdminAction, AdminActionGateway, AdminActionOutcome, AdminResponse, NOT_AUTHENTICATED_MESSAGE,
};
use crate::api_client::{BoardApiError, QuestionBoardApi};
use crate::auth_forms::{
    auth_failure_message, validate_login, validate_registration, AuthFormError, AuthKind,
};
use crate::connection::{
    run_push_connection, ConnectionConfig, ConnectionStatus, ConnectionUpdate,
};
use crate::reconnect::ReconnectStrategy;
use crate::session_context::SessionContext;

pub const QUESTION_FAILURE_MESSAGE: &str = "Failed to submit question.";
pub const ANSWER_FAILURE_MESSAGE: &str = "Failed to submit answer";
const CONNECTION_UPDATE_CAPACITY: usize = 256;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// How an accepted admin action reaches the store.
pub enum AdminReconcilePolicy {
    /// Wait for the push update.
    PushOnly,
    /// Apply the transition on success; the next push update still wins.
    #[default]
    Optimistic,
}

impl AdminReconcilePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PushOnly => "push-only",
            Self::Optimistic => "optimistic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSessionConfig {
    pub page_size: usize,
    pub unknown_update_policy: UnknownUpdatePolicy,
    pub admin_reconcile: AdminReconcilePolicy,
    pub connection: ConnectionConfig,
    pub reconnect: ReconnectStrategy,
}

impl Default for BoardSessionConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            unknown_update_policy: UnknownUpdatePolicy::default(),
            admin_reconcile: AdminReconcilePolicy::default(),
            connection: ConnectionConfig::default(),
            reconnect: ReconnectStrategy::default(),
        }
    }
}

#[derive(Debug)]
pub enum SessionInput {
    Snapshot(Result<Vec<Question>, BoardApiError>),
    Connection(ConnectionUpdate),
    QuestionSubmitted(Result<(), BoardApiError>),
    AnswerSubmitted {
        question_id: QuestionId,
        result: Result<(), BoardApiError>,
    },
    AdminCompleted {
        response: AdminResponse,
        /// Store push version of the target question when the request left.
        observed_push_version: u64,
    },
    AuthCompleted {
        kind: AuthKind,
        result: Result<String, BoardApiError>,
    },
}

impl SessionInput {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Snapshot(_) => "snapshot",
            Self::Connection(_) => "connection",
            Self::QuestionSubmitted(_) => "question_submitted",
            Self::AnswerSubmitted { .. } => "answer_submitted",
            Self::AdminCompleted { .. } => "admin_completed",
            Self::AuthCompleted { .. } => "auth_completed",
        }
    }
}

#[derive(Debug)]
/// Borrowed view of everything a front end draws.
pub struct BoardScreen<'a> {
    pub page: BoardPage<'a>,
    pub loading: bool,
    pub connection: &'a ConnectionStatus,
    pub notification: Option<&'a str>,
    pub alert: Option<&'a str>,
    pub is_admin: bool,
    pub user_name: &'a str,
    pub composer: &'a QuestionComposer,
    pub drafts: &'a AnswerDrafts,
}

enum NextInput {
    Task(Option<SessionInput>),
    Connection(Option<ConnectionUpdate>),
}

pub struct BoardSession {
    config: BoardSessionConfig,
    api: Arc<dyn QuestionBoardApi>,
    gateway: AdminActionGateway,
    context: SessionContext,
    store: ReconciliationStore,
    view: BoardView,
    composer: QuestionComposer,
    drafts: AnswerDrafts,
    connection: ConnectionStatus,
    loading: bool,
    auth_in_flight: bool,
    notification: Option<String>,
    alert: Option<String>,
    inputs_tx: mpsc::UnboundedSender<SessionInput>,
    inputs_rx: mpsc::UnboundedReceiver<SessionInput>,
    connection_rx: Option<mpsc::Receiver<ConnectionUpdate>>,
    shutdown_tx: watch::Sender<bool>,
    snapshot_task: Option<JoinHandle<()>>,
    connection_task: Option<JoinHandle<()>>,
}

impl BoardSession {
    /// Builds an idle session. Call [`BoardSession::start`] to fetch the
    /// snapshot and open the push connection.
    pub fn new(
        config: BoardSessionConfig,
        api: Arc<dyn QuestionBoardApi>,
        context: SessionContext,
    ) -> Self {
        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            gateway: AdminActionGateway::new(Arc::clone(&api)),
            store: ReconciliationStore::new(config.unknown_update_policy),
            view: BoardView::new(config.page_size),
            config,
            api,
            context,
            composer: QuestionComposer::default(),
            drafts: AnswerDrafts::default(),
            connection: ConnectionStatus::default(),
            loading: false,
            auth_in_flight: false,
            notification: None,
            alert: None,
            inputs_tx,
            inputs_rx,
            connection_rx: None,
            shutdown_tx,
            snapshot_task: None,
            connection_task: None,
        }
    }

    /// Starts the snapshot fetch and the push connection. Must run inside a
    /// tokio runtime.
    pub fn start(&mut self) {
        self.begin_snapshot_load();
        self.connect_push();
    }

    pub fn begin_snapshot_load(&mut self) {
        if let Some(task) = self.snapshot_task.take() {
            task.abort();
        }
        self.loading = true;
        let api = Arc::clone(&self.api);
        let inputs = self.inputs_tx.clone();
        self.snapshot_task = Some(tokio::spawn(async move {
            let result = api.list_questions().await;
            let _ = inputs.send(SessionInput::Snapshot(result));
        }));
    }

    pub fn connect_push(&mut self) {
        if self.connection_task.is_some() {
            return;
        }
        let (updates_tx, updates_rx) = mpsc::channel(CONNECTION_UPDATE_CAPACITY);
        self.connection_rx = Some(updates_rx);
        self.connection_task = Some(tokio::spawn(run_push_connection(
            self.config.connection.clone(),
            self.config.reconnect.into_policy(),
            updates_tx,
            self.shutdown_tx.subscribe(),
        )));
    }

    /// Waits for the next completed task or connection update.
    pub async fn next_input(&mut self) -> Option<SessionInput> {
        loop {
            let next = tokio::select! {
                input = self.inputs_rx.recv() => NextInput::Task(input),
                update = next_connection_update(&mut self.connection_rx) => NextInput::Connection(update),
            };
            match next {
                NextInput::Task(input) => return input,
                NextInput::Connection(Some(update)) => {
                    return Some(SessionInput::Connection(update));
                }
                NextInput::Connection(None) => self.connection_rx = None,
            }
        }
    }

    /// Applies one input. Returns true when visible state changed.
    pub fn handle_input(&mut self, input: SessionInput) -> bool {
        debug!(input = input.kind(), "handling session input");
        match input {
            SessionInput::Snapshot(result) => {
                self.snapshot_task = None;
                self.apply_snapshot(result);
                true
            }
            SessionInput::Connection(ConnectionUpdate::Status(status)) => {
                let changed = self.connection != status;
                self.connection = status;
                changed
            }
            SessionInput::Connection(ConnectionUpdate::Event(event)) => {
                self.apply_push_event(event)
            }
            SessionInput::QuestionSubmitted(result) => {
                self.finish_question_submit(result);
                true
            }
            SessionInput::AnswerSubmitted {
                question_id,
                result,
            } => {
                self.finish_answer_submit(question_id, result);
                true
            }
            SessionInput::AdminCompleted {
                response,
                observed_push_version,
            } => {
                self.finish_admin_action(response, observed_push_version);
                true
            }
            SessionInput::AuthCompleted { kind, result } => {
                self.finish_auth(kind, result);
                true
            }
        }
    }

    fn apply_snapshot(&mut self, result: Result<Vec<Question>, BoardApiError>) {
        self.loading = false;
        let questions = match result {
            Ok(questions) => questions,
            Err(error) => {
                warn!(%error, "snapshot load failed; continuing with an empty board");
                Vec::new()
            }
        };
        let count = questions.len();
        let replayed = self.store.load_snapshot(questions);
        info!(
            questions = count,
            replayed_events = replayed.len(),
            "board snapshot loaded"
        );
    }

    fn apply_push_event(&mut self, event: PushEvent) -> bool {
        let mut notified = false;
        if let PushEvent::NewQuestion(question) = &event {
            if self.context.is_admin() {
                self.notification = Some(format!(
                    "New question #{}: {}",
                    question.id, question.message
                ));
                notified = true;
            }
        }
        let kind = event.kind();
        let question_id = event.question_id();
        let applied = self.store.apply_push_event(event);
        debug!(
            kind = kind.as_str(),
            question_id,
            outcome = ?applied,
            "applied push event"
        );
        notified || applied.changed_store()
    }

    pub fn store(&self) -> &ReconciliationStore {
        &self.store
    }

    pub fn question(&self, question_id: QuestionId) -> Option<&Question> {
        self.store.get(question_id)
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn is_admin(&self) -> bool {
        self.context.is_admin()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn connection_status(&self) -> &ConnectionStatus {
        &self.connection
    }

    pub fn current_page(&mut self) -> BoardPage<'_> {
        self.view.current_page(&self.store)
    }

    pub fn screen(&mut self) -> BoardScreen<'_> {
        let page = self.view.current_page(&self.store);
        BoardScreen {
            page,
            loading: self.loading,
            connection: &self.connection,
            notification: self.notification.as_deref(),
            alert: self.alert.as_deref(),
            is_admin: self.context.is_admin(),
            user_name: self.context.user_name(),
            composer: &self.composer,
            drafts: &self.drafts,
        }
    }

    pub fn set_page(&mut self, page: usize) -> usize {
        self.view.set_page(page, &self.store)
    }

    pub fn next_page(&mut self) -> usize {
        self.view.next_page(&self.store)
    }

    pub fn previous_page(&mut self) -> usize {
        self.view.previous_page(&self.store)
    }

    pub fn notification(&self) -> Option<&str> {
        self.notification.as_deref()
    }

    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    pub fn user_name(&self) -> &str {
        self.context.user_name()
    }

    pub fn set_user_name(&mut self, user_name: &str) {
        self.context.set_user_name(user_name);
    }

    pub fn composer(&self) -> &QuestionComposer {
        &self.composer
    }

    pub fn set_question_draft(&mut self, message: &str) {
        self.composer.set_message(message);
    }

    /// Validates and sends the composed question. The store is left alone;
    /// the `NEW_QUESTION` push event inserts it.
    pub fn submit_question(&mut self) -> Result<(), DraftError> {
        let submission = self.composer.begin_submit(self.context.user_name())?;
        let api = Arc::clone(&self.api);
        let inputs = self.inputs_tx.clone();
        tokio::spawn(async move {
            let result = api.create_question(submission).await;
            let _ = inputs.send(SessionInput::QuestionSubmitted(result));
        });
        Ok(())
    }

    fn finish_question_submit(&mut self, result: Result<(), BoardApiError>) {
        let result = result.map_err(|error| {
            warn!(%error, "question submission failed");
            error
                .detail()
                .unwrap_or(QUESTION_FAILURE_MESSAGE)
                .to_string()
        });
        self.composer.finish_submit(result);
    }

    pub fn drafts(&self) -> &AnswerDrafts {
        &self.drafts
    }

    pub fn set_answer_draft(&mut self, question_id: QuestionId, text: &str) {
        self.drafts.set_text(question_id, text);
    }

    pub fn submit_answer(&mut self, question_id: QuestionId) -> Result<(), DraftError> {
        let result = match self.store.get(question_id) {
            Some(question) => self.drafts.begin_submit(question, self.context.user_name()),
            None => Err(DraftError::UnknownQuestion(question_id)),
        };
        let submission = match result {
            Ok(submission) => submission,
            Err(error) => {
                if error != DraftError::AlreadySubmitting {
                    self.alert = Some(error.to_string());
                }
                return Err(error);
            }
        };
        let api = Arc::clone(&self.api);
        let inputs = self.inputs_tx.clone();
        tokio::spawn(async move {
            let result = api.create_answer(submission).await;
            let _ = inputs.send(SessionInput::AnswerSubmitted {
                question_id,
                result,
            });
        });
        Ok(())
    }

    fn finish_answer_submit(&mut self, question_id: QuestionId, result: Result<(), BoardApiError>) {
        let succeeded = result.is_ok();
        if let Err(error) = result {
            warn!(question_id, %error, "answer submission failed");
            self.alert = Some(ANSWER_FAILURE_MESSAGE.to_string());
        }
        self.drafts.finish_submit(question_id, succeeded);
    }

    pub fn mark_answered(&mut self, question_id: QuestionId) -> Result<(), AdminActionOutcome> {
        self.dispatch_admin_action(AdminAction::MarkAnswered, question_id)
    }

    pub fn escalate(&mut self, question_id: QuestionId) -> Result<(), AdminActionOutcome> {
        self.dispatch_admin_action(AdminAction::Escalate, question_id)
    }

    /// Sends an admin action. A missing credential is refused here with
    /// no request made.
    fn dispatch_admin_action(
        &mut self,
        action: AdminAction,
        question_id: QuestionId,
    ) -> Result<(), AdminActionOutcome> {
        let request = match AdminActionGateway::prepare(action, question_id, &self.context) {
            Ok(request) => request,
            Err(outcome) => {
                self.alert = Some(NOT_AUTHENTICATED_MESSAGE.to_string());
                return Err(outcome);
            }
        };
        let observed_push_version = self.store.push_version(question_id);
        let gateway = self.gateway.clone();
        let inputs = self.inputs_tx.clone();
        tokio::spawn(async move {
            let response = gateway.execute(request).await;
            let _ = inputs.send(SessionInput::AdminCompleted {
                response,
                observed_push_version,
            });
        });
        Ok(())
    }

    fn finish_admin_action(&mut self, response: AdminResponse, observed_push_version: u64) {
        let action = response.request.action;
        let question_id = response.request.question_id;
        let outcome = AdminActionGateway::settle(response, &mut self.context);
        if let Some(message) = outcome.user_message(action) {
            self.alert = Some(message.to_string());
        }
        let AdminActionOutcome::Accepted { question } = outcome else {
            return;
        };
        if self.config.admin_reconcile != AdminReconcilePolicy::Optimistic {
            return;
        }
        let updated = question
            .filter(|question| question.id == question_id)
            .or_else(|| self.synthesize_transition(action, question_id));
        if let Some(updated) = updated {
            match self.store.apply_optimistic(updated, observed_push_version) {
                OptimisticOutcome::Applied => {}
                OptimisticOutcome::Superseded => {
                    debug!(
                        question_id,
                        "push arrived before the admin response; keeping pushed state"
                    );
                }
                OptimisticOutcome::UnknownQuestion => {
                    debug!(question_id, "optimistic transition skipped for unknown question");
                }
            }
        }
    }

    fn synthesize_transition(
        &self,
        action: AdminAction,
        question_id: QuestionId,
    ) -> Option<Question> {
        let mut question = self.store.get(question_id)?.clone();
        question.status = action.target_status();
        if action == AdminAction::Escalate {
            question.was_escalated = Some(true);
        }
        Some(question)
    }

    pub fn login(&mut self, email: &str, password: &str) -> Result<(), AuthFormError> {
        let request = self.guard_auth(validate_login(email, password))?;
        let api = Arc::clone(&self.api);
        let inputs = self.inputs_tx.clone();
        tokio::spawn(async move {
            let result = api.login(request).await;
            let _ = inputs.send(SessionInput::AuthCompleted {
                kind: AuthKind::Login,
                result,
            });
        });
        Ok(())
    }

    pub fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<(), AuthFormError> {
        let request = self.guard_auth(validate_registration(
            username,
            email,
            password,
            confirm_password,
        ))?;
        let api = Arc::clone(&self.api);
        let inputs = self.inputs_tx.clone();
        tokio::spawn(async move {
            let result = api.register(request).await;
            let _ = inputs.send(SessionInput::AuthCompleted {
                kind: AuthKind::Register,
                result,
            });
        });
        Ok(())
    }

    fn guard_auth<T>(&mut self, validated: Result<T, AuthFormError>) -> Result<T, AuthFormError> {
        if self.auth_in_flight {
            return Err(AuthFormError::AlreadySubmitting);
        }
        let request = validated.inspect_err(|error| {
            self.alert = Some(error.to_string());
        })?;
        self.auth_in_flight = true;
        Ok(request)
    }

    fn finish_auth(&mut self, kind: AuthKind, result: Result<String, BoardApiError>) {
        self.auth_in_flight = false;
        match result {
            Ok(access_token) => {
                info!(kind = kind.as_str(), "admin session granted");
                self.context.grant_admin(access_token);
            }
            Err(error) => {
                warn!(kind = kind.as_str(), %error, "authentication failed");
                self.alert = Some(auth_failure_message(kind, &error));
            }
        }
    }

    pub fn logout(&mut self) {
        self.context.revoke_admin();
    }

    /// Discards a pending snapshot and closes the push connection.
    pub async fn shutdown(&mut self) {
        self.shutdown_tx.send_replace(true);
        if let Some(task) = self.snapshot_task.take() {
            task.abort();
        }
        if let Some(task) = self.connection_task.take() {
            let abort = task.abort_handle();
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                debug!("push connection did not close in time");
                abort.abort();
            }
        }
        self.connection_rx = None;
    }
}

impl Drop for BoardSession {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
        if let Some(task) = self.snapshot_task.take() {
            task.abort();
        }
        if let Some(task) = self.connection_task.take() {
            task.abort();
        }
    }
}

async fn next_connection_update(
    updates: &mut Option<mpsc::Receiver<ConnectionUpdate>>,
) -> Option<ConnectionUpdate> {
    match updates {
        Some(updates) => updates.recv().await,
        None => std::future::pending().await,
    }
}
