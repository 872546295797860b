use super::listeners::{SessionListener, SessionListeners};
use super::models::Identity;
use super::{AuthError, IdentityBackend};
use crate::core::{random_id, Subscription};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    uid: String,
    password: String,
    disabled: bool,
}

/// In-process identity provider with the same rules as Identity Toolkit's
/// email/password provider.
pub struct MemoryIdentityBackend {
    accounts: Mutex<HashMap<String, Account>>,
    listeners: SessionListeners,
    offline: AtomicBool,
}

impl Default for MemoryIdentityBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityBackend {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            listeners: SessionListeners::new(),
            offline: AtomicBool::new(false),
        }
    }

    /// While offline, account calls fail and sign-out reports a failure after
    /// clearing the local session.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn disable_account(&self, email: &str) {
        if let Some(account) = self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&normalize(email))
        {
            account.disabled = true;
        }
    }

    pub fn current(&self) -> Option<Identity> {
        self.listeners.current()
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn ensure_online(&self) -> Result<(), AuthError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AuthError::Api("network unavailable".to_string()));
        }
        Ok(())
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn is_well_formed(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

#[async_trait::async_trait]
impl IdentityBackend for MemoryIdentityBackend {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.ensure_online()?;
        let email = normalize(email);
        if !is_well_formed(&email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let identity = {
            let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            if accounts.contains_key(&email) {
                return Err(AuthError::EmailAlreadyInUse);
            }
            let uid = random_id(28);
            accounts.insert(
                email.clone(),
                Account {
                    uid: uid.clone(),
                    password: password.to_string(),
                    disabled: false,
                },
            );
            Identity::new(uid, Some(email))
        };

        self.listeners.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.ensure_online()?;
        let email = normalize(email);

        let identity = {
            let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            match accounts.get(&email) {
                Some(account) if account.password == password => {
                    if account.disabled {
                        return Err(AuthError::UserDisabled);
                    }
                    Identity::new(account.uid.clone(), Some(email))
                }
                _ => return Err(AuthError::InvalidCredentials),
            }
        };

        self.listeners.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn deauthenticate(&self) -> Result<(), AuthError> {
        self.listeners.clear();
        self.ensure_online()
    }

    fn subscribe(&self, listener: SessionListener) -> Subscription {
        self.listeners.subscribe(listener)
    }
}
