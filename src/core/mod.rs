pub mod middleware;
pub mod subscription;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;

pub use subscription::Subscription;

#[derive(Debug, Deserialize)]
pub struct FirebaseErrorResponse {
    pub error: FirebaseErrorDetails,
}

#[derive(Debug, Deserialize)]
pub struct FirebaseErrorDetails {
    pub code: u16,
    pub message: String,
    pub status: Option<String>,
    pub errors: Option<Vec<FirebaseSubError>>,
}

#[derive(Debug, Deserialize)]
pub struct FirebaseSubError {
    pub message: String,
    pub domain: Option<String>,
    pub reason: Option<String>,
}

impl FirebaseErrorResponse {
    pub fn display_message(&self) -> String {
        format!("{} (code: {})", self.error.message, self.error.code)
    }

    /// The machine-readable part of the message.
    ///
    /// Identity Toolkit appends a human explanation after `" : "`, as in
    /// `WEAK_PASSWORD : Password should be at least 6 characters`.
    pub fn reason_code(&self) -> &str {
        self.error
            .message
            .split(" : ")
            .next()
            .unwrap_or_default()
            .trim()
    }
}

/// Random alphanumeric identifier, the shape Firebase SDKs use for client-side
/// document ids (20 chars) and local user ids (28 chars).
pub fn random_id(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub async fn parse_error_response(response: reqwest::Response, default_msg: &str) -> String {
    let status = response.status();
    match response.json::<FirebaseErrorResponse>().await {
        Ok(error_resp) => error_resp.display_message(),
        Err(_) => format!("{}: {}", default_msg, status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_code_strips_explanation() {
        let body = serde_json::json!({
            "error": {
                "code": 400,
                "message": "WEAK_PASSWORD : Password should be at least 6 characters",
                "errors": [{ "message": "WEAK_PASSWORD", "domain": "global", "reason": "invalid" }]
            }
        });
        let parsed: FirebaseErrorResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.reason_code(), "WEAK_PASSWORD");

        let body = serde_json::json!({ "error": { "code": 400, "message": "EMAIL_EXISTS" } });
        let parsed: FirebaseErrorResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.reason_code(), "EMAIL_EXISTS");
        assert_eq!(parsed.display_message(), "EMAIL_EXISTS (code: 400)");
    }

    #[test]
    fn test_random_id_shape() {
        let id = random_id(20);
        assert_eq!(id.len(), 20);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(random_id(20), id);
    }
}
