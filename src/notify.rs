//! Single-slot notification channel.
//!
//! Holds at most one user-facing message. Publishing replaces whatever was
//! there; there is no queue. A message may carry a time-to-live, after which
//! [`NotificationChannel::current`] stops returning it. Expiry is lazy and
//! measured on the tokio clock, so paused-time tests can step over it.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Error,
    Success,
}

/// A transient message for the user.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub text: String,
    pub kind: NotificationKind,
    #[serde(skip)]
    expires_at: Option<Instant>,
}

impl Notification {
    pub fn new(text: impl Into<String>, kind: NotificationKind, ttl: Option<Duration>) -> Self {
        Self {
            text: text.into(),
            kind,
            expires_at: ttl.map(|t| Instant::now() + t),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }
}

/// Carries the one active [`Notification`], if any.
#[derive(Debug, Default)]
pub struct NotificationChannel {
    slot: Option<Notification>,
    ttl: Option<Duration>,
}

impl NotificationChannel {
    /// Create a channel whose messages live for `ttl` (`None` = until dismissed).
    pub fn new(ttl: Option<Duration>) -> Self {
        Self { slot: None, ttl }
    }

    /// Publish a message, replacing the previous one. Returns the stored message.
    pub fn publish(&mut self, text: impl Into<String>, kind: NotificationKind) -> &Notification {
        self.slot.insert(Notification::new(text, kind, self.ttl))
    }

    /// Remove the active message. Returns `true` if a live message was removed.
    pub fn dismiss(&mut self) -> bool {
        self.slot.take().is_some_and(|n| !n.is_expired())
    }

    /// The active message, unless it has expired.
    pub fn current(&self) -> Option<&Notification> {
        self.slot.as_ref().filter(|n| !n.is_expired())
    }
}
