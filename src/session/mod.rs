//! Session state propagation.
//!
//! A [`SessionPropagator`] owns the single registration with the identity
//! provider and republishes its notifications on a `tokio::sync::watch`
//! channel. Everything else reads the session through a [`SessionReader`].


use crate::auth::{AuthClient, Identity};
use crate::core::Subscription;
use std::sync::Arc;
use tokio::sync::watch;

/// Local mirror of the provider's signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Option<Identity>,
    /// True until the provider has reported for the first time.
    pub loading: bool,
}

impl Session {
    pub fn initial() -> Self {
        Self {
            identity: None,
            loading: true,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            identity: None,
            loading: false,
        }
    }

    pub fn signed_in(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            loading: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::initial()
    }
}

/// Owner of the session value and its provider registration.
///
/// Dropping the propagator releases the registration.
pub struct SessionPropagator {
    sender: Arc<watch::Sender<Session>>,
    registration: Subscription,
}

impl SessionPropagator {
    /// Registers with `auth` exactly once and starts mirroring its session.
    pub fn start(auth: &AuthClient) -> Self {
        let (sender, _) = watch::channel(Session::initial());
        let sender = Arc::new(sender);

        let publisher = sender.clone();
        let registration = auth.on_session_change(move |identity| {
            publisher.send_modify(|session| {
                session.identity = identity.cloned();
                session.loading = false;
            });
        });

        Self {
            sender,
            registration,
        }
    }

    pub fn reader(&self) -> SessionReader {
        SessionReader {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn session(&self) -> Session {
        self.sender.borrow().clone()
    }

    /// Releases the provider registration. The last session value stays readable.
    pub fn stop(&self) {
        if self.registration.is_active() {
            tracing::debug!("Session propagation stopped");
        }
        self.registration.unsubscribe();
    }

    pub fn is_running(&self) -> bool {
        self.registration.is_active()
    }
}

/// Read-only view of the session.
#[derive(Debug, Clone)]
pub struct SessionReader {
    receiver: watch::Receiver<Session>,
}

impl SessionReader {
    pub fn current(&self) -> Session {
        self.receiver.borrow().clone()
    }

    /// Like [`current`](Self::current), and marks the value as seen.
    pub fn current_and_mark_seen(&mut self) -> Session {
        self.receiver.borrow_and_update().clone()
    }

    /// Waits for the next update. Returns `false` once the propagator is gone.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }
}
