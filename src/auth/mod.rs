//! Identity provider adapter.
//!
//! [`AuthClient`] is what the rest of the app talks to. It wraps an
//! [`IdentityBackend`], the capability set of the external identity provider:
//! account creation, password sign-in, sign-out and change notification.
//! [`IdentityToolkit`] implements it over the Firebase Identity Toolkit REST API
//! and [`MemoryIdentityBackend`] keeps accounts in process.

mod listeners;
pub mod memory;
pub mod models;
pub mod toolkit;

use crate::core::{FirebaseErrorResponse, Subscription};
use std::sync::Arc;
use thiserror::Error;

pub use listeners::SessionListener;
pub use memory::MemoryIdentityBackend;
pub use models::Identity;
pub use toolkit::IdentityToolkit;

#[cfg(test)]
mod tests;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("The email address is badly formatted")]
    InvalidEmail,
    #[error("The email address is already in use")]
    EmailAlreadyInUse,
    #[error("The password is too weak")]
    WeakPassword,
    #[error("Email or password is incorrect")]
    InvalidCredentials,
    #[error("The account has been disabled")]
    UserDisabled,
    #[error("Too many attempts, try again later")]
    TooManyAttempts,
    #[error("API error: {0}")]
    Api(String),
    #[error("HTTP Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

impl AuthError {
    /// Maps an Identity Toolkit error body onto the error taxonomy.
    pub fn from_response(response: &FirebaseErrorResponse) -> Self {
        match response.reason_code() {
            "INVALID_EMAIL" | "MISSING_EMAIL" => AuthError::InvalidEmail,
            "EMAIL_EXISTS" => AuthError::EmailAlreadyInUse,
            "WEAK_PASSWORD" => AuthError::WeakPassword,
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS"
            | "MISSING_PASSWORD" => AuthError::InvalidCredentials,
            "USER_DISABLED" => AuthError::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::TooManyAttempts,
            _ => AuthError::Api(response.display_message()),
        }
    }
}

/// Capability set of the external identity provider.
#[async_trait::async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Creates an account and signs it in.
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// Signs in an existing account.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// Ends the local session. The session is cleared even when an error is returned.
    async fn deauthenticate(&self) -> Result<(), AuthError>;

    /// Registers `listener`. It is called once immediately with the current
    /// identity, then after every sign-in, sign-up and sign-out.
    fn subscribe(&self, listener: SessionListener) -> Subscription;
}

/// Entry point for sign-up, sign-in, sign-out and session change notifications.
#[derive(Clone)]
pub struct AuthClient {
    backend: Arc<dyn IdentityBackend>,
}

impl AuthClient {
    pub fn new(backend: Arc<dyn IdentityBackend>) -> Self {
        Self { backend }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        match self.backend.create_account(email, password).await {
            Ok(identity) => {
                tracing::info!(uid = %identity.uid, "User signed up");
                Ok(identity)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sign up failed");
                Err(e)
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        match self.backend.authenticate(email, password).await {
            Ok(identity) => {
                tracing::info!(uid = %identity.uid, "User signed in");
                Ok(identity)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sign in failed");
                Err(e)
            }
        }
    }

    /// Ends the local session. Failures are logged, never returned, and not retried.
    pub async fn sign_out(&self) {
        match self.backend.deauthenticate().await {
            Ok(()) => tracing::info!("User signed out"),
            Err(e) => tracing::error!(error = %e, "Sign out failed"),
        }
    }

    /// Registers `callback` for session changes. It fires once right away with
    /// the current identity. Drop or `unsubscribe` the handle to stop it.
    pub fn on_session_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<&Identity>) + Send + Sync + 'static,
    {
        self.backend.subscribe(Arc::new(callback))
    }
}
