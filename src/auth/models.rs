use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The signed-in principal as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            email,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PasswordRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub return_secure_token: bool,
}

/// Response of `accounts:signUp` and `accounts:signInWithPassword`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PasswordResponse {
    pub local_id: String,
    pub email: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    /// Seconds, sent as a string.
    pub expires_in: String,
}

/// Response of the Secure Token `token` endpoint. Unlike Identity Toolkit, it
/// uses snake_case keys.
#[derive(Debug, Deserialize)]
pub(crate) struct RefreshTokenResponse {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: String,
}

/// Tokens held for the signed-in user.
#[derive(Debug, Clone)]
pub(crate) struct Credentials {
    pub identity: Identity,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credentials {
    pub fn from_password_response(response: PasswordResponse) -> Self {
        Self {
            identity: Identity::new(response.local_id, response.email),
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            expires_at: expiry_from(&response.expires_in),
        }
    }

    pub fn apply_refresh(&mut self, response: RefreshTokenResponse) {
        self.id_token = response.id_token;
        self.refresh_token = response.refresh_token;
        self.expires_at = expiry_from(&response.expires_in);
    }

    /// True once the ID token is within `margin` of expiring.
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.expires_at - margin <= Utc::now()
    }
}

/// Lifetime assumed when `expiresIn` is missing or out of range.
const DEFAULT_EXPIRES_IN_SECONDS: i64 = 3600;

fn expiry_from(expires_in: &str) -> DateTime<Utc> {
    let now = Utc::now();
    expires_in
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or_else(|| now + Duration::seconds(DEFAULT_EXPIRES_IN_SECONDS))
}
