//! Locally held session state: admin flag, bearer credential and display name.
//!
//! A [`SessionContext`] is hydrated once from its [`SessionStore`] when a
//! board session starts and written back after every mutation.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use qaboard_core::write_text_atomic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const SESSION_STATE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("failed to read session state {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse session state {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported session state schema: expected {expected}, found {found}")]
    UnsupportedSchema { expected: u32, found: u32 },
    #[error("failed to encode session state: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write session state {path}: {message}")]
    Write { path: PathBuf, message: String },
}

/// Persistence seam for [`SessionContext`].
pub trait SessionStore: Send {
    fn load(&self) -> Result<SessionSnapshot, SessionStoreError>;
    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SessionStoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionStateFile {
    schema_version: u32,
    #[serde(flatten)]
    snapshot: SessionSnapshot,
}

#[derive(Debug, Clone)]
/// Versioned JSON document on disk. A missing file loads as an empty session.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<SessionSnapshot, SessionStoreError> {
        if !self.path.exists() {
            return Ok(SessionSnapshot::default());
        }
        let raw = std::fs::read_to_string(&self.path).map_err(|source| SessionStoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        let state = serde_json::from_str::<SessionStateFile>(&raw).map_err(|source| {
            SessionStoreError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        if state.schema_version != SESSION_STATE_SCHEMA_VERSION {
            return Err(SessionStoreError::UnsupportedSchema {
                expected: SESSION_STATE_SCHEMA_VERSION,
                found: state.schema_version,
            });
        }
        Ok(state.snapshot)
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SessionStoreError> {
        let state = SessionStateFile {
            schema_version: SESSION_STATE_SCHEMA_VERSION,
            snapshot: snapshot.clone(),
        };
        let mut payload = serde_json::to_string_pretty(&state)?;
        payload.push('\n');
        write_text_atomic(&self.path, &payload).map_err(|error| SessionStoreError::Write {
            path: self.path.clone(),
            message: format!("{error:#}"),
        })
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    snapshot: Mutex<SessionSnapshot>,
}

impl MemorySessionStore {
    pub fn new(snapshot: SessionSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }

    /// Last saved value.
    pub fn saved(&self) -> SessionSnapshot {
        self.snapshot
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<SessionSnapshot, SessionStoreError> {
        Ok(self.saved())
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SessionStoreError> {
        let mut guard = self
            .snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = snapshot.clone();
        Ok(())
    }
}

/// Explicit session state passed to the board session.
pub struct SessionContext {
    store: Box<dyn SessionStore>,
    snapshot: SessionSnapshot,
}

impl SessionContext {
    /// Reads the persisted snapshot once. An admin flag without a usable
    /// credential is dropped on the way in.
    pub fn hydrate(store: Box<dyn SessionStore>) -> Result<Self, SessionStoreError> {
        let mut snapshot = store.load()?;
        snapshot.access_token = snapshot
            .access_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        if snapshot.access_token.is_none() {
            snapshot.is_admin = false;
        }
        Ok(Self { store, snapshot })
    }

    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    pub fn is_admin(&self) -> bool {
        self.snapshot.is_admin
    }

    pub fn access_token(&self) -> Option<&str> {
        self.snapshot.access_token.as_deref()
    }

    pub fn user_name(&self) -> &str {
        self.snapshot.user_name.as_deref().unwrap_or_default()
    }

    pub fn set_user_name(&mut self, user_name: &str) {
        let trimmed = user_name.trim();
        self.snapshot.user_name = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self.persist();
    }

    /// Stores the credential and enters admin mode.
    pub fn grant_admin(&mut self, access_token: String) {
        self.snapshot.access_token = Some(access_token);
        self.snapshot.is_admin = true;
        self.persist();
    }

    /// Clears the admin flag and the credential. Used by logout and by
    /// authorization failures.
    pub fn revoke_admin(&mut self) {
        self.snapshot.access_token = None;
        self.snapshot.is_admin = false;
        self.persist();
    }

    fn persist(&self) {
        if let Err(error) = self.store.save(&self.snapshot) {
            warn!(%error, "failed to persist session state");
        }
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("is_admin", &self.snapshot.is_admin)
            .field("has_access_token", &self.snapshot.access_token.is_some())
            .field("user_name", &self.snapshot.user_name)
            .finish()
    }
}
