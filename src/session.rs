//! Session context, the session gate, and the on-disk token store.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SessionStoreError;
use crate::models::{AuthResponse, User};

/// Shared handle to the current bearer token.
///
/// Created once at startup and handed to the API client and the views, so
/// every component that depends on authentication says so in its signature.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    token: Arc<RwLock<Option<String>>>,
}

impl SessionContext {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token)),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    pub fn set_token(&self, token: impl Into<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.into());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    /// Status to start from before the token has been checked against the server.
    pub fn initial_status(&self) -> AuthStatus {
        if self.has_token() {
            AuthStatus::Unknown
        } else {
            AuthStatus::Unauthenticated
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Unknown,
    Authenticated,
    Unauthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Loading,
    Render,
    RedirectToLogin,
}

/// Decide what a protected view may show. A missing session is a normal
/// outcome here, not an error.
pub fn gate(status: AuthStatus) -> Gate {
    match status {
        AuthStatus::Unknown => Gate::Loading,
        AuthStatus::Authenticated => Gate::Render,
        AuthStatus::Unauthenticated => Gate::RedirectToLogin,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
    pub saved_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn from_login(response: &AuthResponse) -> Self {
        Self {
            token: response.token.clone(),
            user: Some(response.user.clone()),
            saved_at: Utc::now(),
        }
    }
}

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<StoredSession>, SessionStoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let session = serde_json::from_str(&raw)?;
        Ok(Some(session))
    }

    pub fn save(&self, session: &StoredSession) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(session)?)?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    /// Remove the stored session. Returns whether one existed.
    pub fn clear(&self) -> Result<bool, SessionStoreError> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)?;
        debug!(path = %self.path.display(), "session cleared");
        Ok(true)
    }
}
