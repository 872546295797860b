use super::listeners::{SessionListener, SessionListeners};
use super::models::{
    Credentials, Identity, PasswordRequest, PasswordResponse, RefreshTokenResponse,
};
use super::{AuthError, IdentityBackend};
use crate::config::Config;
use crate::core::middleware::TokenSource;
use crate::core::{FirebaseErrorResponse, Subscription};
use chrono::Duration;
use reqwest::{header, Client};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use tokio::sync::Mutex;
use url::Url;

/// ID tokens are refreshed once they are this close to expiring.
const REFRESH_MARGIN_MINUTES: i64 = 5;

/// Identity backend over the Firebase Identity Toolkit REST API.
///
/// Holds the signed-in user's tokens and hands the ID token to other clients
/// through [`TokenSource`].
pub struct IdentityToolkit {
    client: ClientWithMiddleware,
    auth_url: String,
    token_url: String,
    api_key: String,
    credentials: Mutex<Option<Credentials>>,
    listeners: SessionListeners,
}

impl IdentityToolkit {
    pub fn new(config: &Config) -> Self {
        let client = ClientBuilder::new(Client::new()).build();
        Self::new_with_client(
            client,
            config.auth_url.clone(),
            config.token_url.clone(),
            config.api_key.clone(),
        )
    }

    pub(crate) fn new_with_client(
        client: ClientWithMiddleware,
        auth_url: String,
        token_url: String,
        api_key: String,
    ) -> Self {
        Self {
            client,
            auth_url,
            token_url,
            api_key,
            credentials: Mutex::new(None),
            listeners: SessionListeners::new(),
        }
    }

    fn keyed_url(&self, base: &str, path: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&format!("{}/{}", base.trim_end_matches('/'), path))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn error_from(response: reqwest::Response, action: &str) -> AuthError {
        let status = response.status();
        match response.json::<FirebaseErrorResponse>().await {
            Ok(body) => AuthError::from_response(&body),
            Err(_) => AuthError::Api(format!("{} failed {}", action, status)),
        }
    }

    async fn password_request(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<Credentials, AuthError> {
        let url = self.keyed_url(&self.auth_url, &format!("accounts:{}", endpoint))?;
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };

        let response = self
            .client
            .post(url.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, endpoint).await);
        }

        let body: PasswordResponse = response.json().await?;
        Ok(Credentials::from_password_response(body))
    }

    async fn establish(&self, credentials: Credentials) -> Identity {
        let identity = credentials.identity.clone();
        *self.credentials.lock().await = Some(credentials);
        self.listeners.publish(Some(identity.clone()));
        identity
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshTokenResponse, AuthError> {
        let url = self.keyed_url(&self.token_url, "token")?;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "refresh_token")
            .append_pair("refresh_token", refresh_token)
            .finish();

        let response = self
            .client
            .post(url.as_str())
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, "Token refresh").await);
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl IdentityBackend for IdentityToolkit {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let credentials = self.password_request("signUp", email, password).await?;
        Ok(self.establish(credentials).await)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let credentials = self
            .password_request("signInWithPassword", email, password)
            .await?;
        Ok(self.establish(credentials).await)
    }

    async fn deauthenticate(&self) -> Result<(), AuthError> {
        self.credentials.lock().await.take();
        self.listeners.clear();
        Ok(())
    }

    fn subscribe(&self, listener: SessionListener) -> Subscription {
        self.listeners.subscribe(listener)
    }
}

#[async_trait::async_trait]
impl TokenSource for IdentityToolkit {
    async fn id_token(&self) -> Result<Option<String>, anyhow::Error> {
        let mut credentials = self.credentials.lock().await;
        let Some(current) = credentials.as_mut() else {
            return Ok(None);
        };

        if current.expires_within(Duration::minutes(REFRESH_MARGIN_MINUTES)) {
            tracing::debug!(uid = %current.identity.uid, "Refreshing ID token");
            let refreshed = self.refresh(&current.refresh_token).await?;
            current.apply_refresh(refreshed);
        }

        Ok(Some(current.id_token.clone()))
    }
}
