//! Auth gate: the capability the workflow asks before letting a caller in.
//!
//! The workflow only ever depends on the [`AuthGate`] trait. How a session
//! is obtained (login form, token exchange) is out of scope; the two
//! implementations here cover a bearer-token session with optional expiry
//! and an allow-everything gate for local use.

use crate::error::WorkflowError;
use chrono::{DateTime, Utc};
use std::sync::RwLock;
use tracing::{info, warn};

/// Where unauthorized callers are sent by default.
pub const DEFAULT_REDIRECT: &str = "/login";

/// Admission check guarding the conversion workflow.
pub trait AuthGate: Send + Sync {
    /// Whether the caller currently holds a valid session.
    fn is_authorized(&self) -> bool;

    /// Where to send a caller that is not authorized.
    fn redirect_target(&self) -> &str {
        DEFAULT_REDIRECT
    }

    /// Hook invoked whenever an unauthorized caller is turned away.
    fn on_unauthorized(&self) {}
}

/// Check the gate on workflow entry.
pub fn admit(gate: &dyn AuthGate) -> Result<(), WorkflowError> {
    if gate.is_authorized() {
        return Ok(());
    }
    gate.on_unauthorized();
    Err(WorkflowError::Unauthorized {
        redirect: gate.redirect_target().to_string(),
    })
}

/// Gate that admits everyone. Used by the CLI with the simulated service.
pub struct AllowAll;

impl AuthGate for AllowAll {
    fn is_authorized(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
struct Session {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && self.expires_at.map(|exp| now < exp).unwrap_or(true)
    }
}

/// Bearer-token session with an optional expiry.
#[derive(Debug)]
pub struct SessionAuthGate {
    session: RwLock<Option<Session>>,
    redirect: String,
}

impl Default for SessionAuthGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionAuthGate {
    /// A gate with no session; every check fails until [`Self::login`].
    pub fn new() -> Self {
        Self {
            session: RwLock::new(None),
            redirect: DEFAULT_REDIRECT.to_string(),
        }
    }

    pub fn with_redirect(mut self, target: impl Into<String>) -> Self {
        self.redirect = target.into();
        self
    }

    /// Store a session token, replacing any previous one.
    pub fn login(&self, token: impl Into<String>, expires_at: Option<DateTime<Utc>>) {
        let mut slot = self.session.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Session {
            token: token.into(),
            expires_at,
        });
        info!("Session established");
    }

    /// Drop the session (logout).
    pub fn revoke(&self) {
        let mut slot = self.session.write().unwrap_or_else(|e| e.into_inner());
        if slot.take().is_some() {
            info!("Session revoked");
        }
    }

    /// The current token, if the session is still valid.
    pub fn token(&self) -> Option<String> {
        let slot = self.session.read().unwrap_or_else(|e| e.into_inner());
        slot.as_ref()
            .filter(|s| s.is_valid(Utc::now()))
            .map(|s| s.token.clone())
    }
}

impl AuthGate for SessionAuthGate {
    fn is_authorized(&self) -> bool {
        self.token().is_some()
    }

    fn redirect_target(&self) -> &str {
        &self.redirect
    }

    fn on_unauthorized(&self) {
        warn!("Unauthorized access to the converter, redirecting to {}", self.redirect);
    }
}
