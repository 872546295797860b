use super::{InFlight, Notice, Notifier, Outcome};
use crate::auth::AuthClient;
use std::sync::Arc;

/// Email/password sign-in and sign-up.
///
/// A successful call only changes the session; the navigation guard moves the
/// user off the login route.
pub struct LoginScreen {
    auth: AuthClient,
    notifier: Arc<dyn Notifier>,
    in_flight: InFlight,
    pub email: String,
    pub password: String,
}

impl LoginScreen {
    pub fn new(auth: AuthClient, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            auth,
            notifier,
            in_flight: InFlight::new(),
            email: String::new(),
            password: String::new(),
        }
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    fn has_credentials(&self) -> bool {
        if self.email.is_empty() || self.password.is_empty() {
            self.notifier.notify(Notice::MissingCredentials);
            return false;
        }
        true
    }

    pub async fn login(&self) -> Outcome {
        if !self.has_credentials() {
            return Outcome::Failed;
        }
        let Some(_busy) = self.in_flight.try_begin() else {
            return Outcome::Ignored;
        };

        match self.auth.sign_in(&self.email, &self.password).await {
            Ok(_) => Outcome::Completed,
            Err(_) => {
                self.notifier.notify(Notice::LoginFailed);
                Outcome::Failed
            }
        }
    }

    pub async fn sign_up(&self) -> Outcome {
        if !self.has_credentials() {
            return Outcome::Failed;
        }
        let Some(_busy) = self.in_flight.try_begin() else {
            return Outcome::Ignored;
        };

        match self.auth.sign_up(&self.email, &self.password).await {
            Ok(_) => Outcome::Completed,
            Err(_) => {
                self.notifier.notify(Notice::SignUpFailed);
                Outcome::Failed
            }
        }
    }
}
