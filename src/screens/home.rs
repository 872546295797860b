use crate::auth::AuthClient;
use crate::session::SessionReader;

pub struct HomeScreen {
    auth: AuthClient,
    session: SessionReader,
}

impl HomeScreen {
    pub fn new(auth: AuthClient, session: SessionReader) -> Self {
        Self { auth, session }
    }

    pub fn greeting(&self) -> String {
        match self.session.current().identity {
            Some(identity) => match identity.email {
                Some(email) => format!("Welcome, {}", email),
                None => "Welcome".to_string(),
            },
            None => "Not signed in".to_string(),
        }
    }

    /// Signs out. The guard takes care of leaving this screen.
    pub async fn logout(&self) {
        self.auth.sign_out().await;
    }
}
