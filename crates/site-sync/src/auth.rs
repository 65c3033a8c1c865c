//! Admin view gate
//!
//! A single configured credential switches the session into admin mode,
//! which is what exposes the write coordinator. The credential lives in
//! configuration; this is a convenience gate, not access control. The
//! remote store's own policy decides what is actually persisted.

use crate::config::AdminConfig;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Which surface the session shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Public pages
    #[default]
    Home,
    /// Edit surface
    Admin,
}

#[derive(Debug, Default)]
struct Session {
    authenticated: bool,
    mode: ViewMode,
}

/// Login state of one session
#[derive(Debug)]
pub struct AdminGate {
    credential: AdminConfig,
    session: RwLock<Session>,
}

impl AdminGate {
    /// Create gate for a credential
    #[must_use]
    pub fn new(credential: AdminConfig) -> Self {
        Self {
            credential,
            session: RwLock::new(Session::default()),
        }
    }

    /// Check the credential; on success switch to admin mode
    pub fn login(&self, username: &str, password: &str) -> bool {
        let ok = username == self.credential.username && password == self.credential.password;
        if ok {
            *self.session.write() = Session {
                authenticated: true,
                mode: ViewMode::Admin,
            };
            tracing::info!(username, "admin login");
        } else {
            tracing::warn!(username, "admin login rejected");
        }
        ok
    }

    /// Leave admin mode
    pub fn logout(&self) {
        *self.session.write() = Session::default();
    }

    /// Switch surface; admin mode requires a login
    pub fn navigate(&self, mode: ViewMode) -> bool {
        let mut session = self.session.write();
        if mode == ViewMode::Admin && !session.authenticated {
            return false;
        }
        session.mode = mode;
        true
    }

    /// Check if logged in
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.read().authenticated
    }

    /// Current surface
    #[must_use]
    pub fn mode(&self) -> ViewMode {
        self.session.read().mode
    }
}
