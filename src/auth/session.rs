//! Observable session state for one coordinator instance

use super::SupportedMethod;
use serde::Serialize;
use tokio::sync::watch;

/// Lifecycle status of the auth session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    #[default]
    Idle,
    Probing,
    AwaitingUserAction,
    Verifying,
    Succeeded,
    Failed,
}

impl AuthStatus {
    /// A ceremony or capability probe is in flight
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            AuthStatus::Probing | AuthStatus::AwaitingUserAction | AuthStatus::Verifying
        )
    }

    /// A new ceremony may start from this status. Success is terminal.
    pub fn accepts_start(&self) -> bool {
        !self.is_busy() && *self != AuthStatus::Succeeded
    }
}

/// Snapshot of the session as seen by the UI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthSession {
    pub selected_method: Option<SupportedMethod>,
    pub status: AuthStatus,
    pub status_message: String,
}

/// Single-writer session cell.
///
/// Every transition runs under the watch channel's lock, so the start gate is
/// a check-and-set and no lock is ever held across an await.
pub(crate) struct SessionCell {
    tx: watch::Sender<AuthSession>,
}

impl SessionCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AuthSession::default());
        Self { tx }
    }

    pub fn snapshot(&self) -> AuthSession {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSession> {
        self.tx.subscribe()
    }

    /// Idle → Probing. Returns false if anything else is going on.
    pub fn begin_probing(&self) -> bool {
        self.tx.send_if_modified(|session| {
            if session.status != AuthStatus::Idle {
                return false;
            }
            session.status = AuthStatus::Probing;
            session.status_message.clear();
            true
        })
    }

    /// Probing → Idle(ready)
    pub fn ready(&self) {
        self.tx.send_modify(|session| {
            if session.status == AuthStatus::Probing {
                session.status = AuthStatus::Idle;
            }
        });
    }

    /// Idle/Failed → AwaitingUserAction. Returns false (no-op) otherwise.
    pub fn try_begin(&self, method: SupportedMethod) -> bool {
        self.tx.send_if_modified(|session| {
            if !session.status.accepts_start() {
                return false;
            }
            session.selected_method = Some(method);
            session.status = AuthStatus::AwaitingUserAction;
            session.status_message = method.starting_message().to_string();
            true
        })
    }

    /// Update the prompt while the user acts
    pub fn progress(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_if_modified(|session| {
            if session.status != AuthStatus::AwaitingUserAction {
                return false;
            }
            session.status_message = message;
            true
        });
    }

    /// AwaitingUserAction → Verifying
    pub fn verifying(&self) {
        self.tx.send_if_modified(|session| {
            if session.status != AuthStatus::AwaitingUserAction {
                return false;
            }
            session.status = AuthStatus::Verifying;
            true
        });
    }

    pub fn succeeded(&self, message: &str) {
        self.finish(AuthStatus::Succeeded, message);
    }

    pub fn failed(&self, message: &str) {
        self.finish(AuthStatus::Failed, message);
    }

    fn finish(&self, status: AuthStatus, message: &str) {
        self.tx.send_modify(|session| {
            session.status = status;
            session.status_message = message.to_string();
        });
    }

    /// Drop all session state (unmount)
    pub fn discard(&self) {
        self.tx.send_replace(AuthSession::default());
    }
}
