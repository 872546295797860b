use super::*;
use crate::core::middleware::TokenSource;
use httpmock::prelude::*;
use reqwest::Client;
use reqwest_middleware::ClientBuilder;
use serde_json::json;
use std::sync::Mutex;

fn toolkit(server: &MockServer) -> IdentityToolkit {
    let client = ClientBuilder::new(Client::new()).build();
    IdentityToolkit::new_with_client(
        client,
        server.url("/v1"),
        server.url("/v1"),
        "test-key".to_string(),
    )
}

/// Records every uid delivered to a session listener (`None` for signed out).
fn recorder(auth: &AuthClient) -> (Arc<Mutex<Vec<Option<String>>>>, Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let sub = auth.on_session_change(move |identity| {
        sink.lock()
            .unwrap()
            .push(identity.map(|i| i.uid.clone()));
    });
    (seen, sub)
}

fn sign_in_body(uid: &str, email: &str, id_token: &str, expires_in: &str) -> serde_json::Value {
    json!({
        "kind": "identitytoolkit#VerifyPasswordResponse",
        "localId": uid,
        "email": email,
        "displayName": "",
        "idToken": id_token,
        "registered": true,
        "refreshToken": "refresh-1",
        "expiresIn": expires_in
    })
}

#[tokio::test]
async fn test_toolkit_sign_up() {
    let server = MockServer::start();
    let backend = Arc::new(toolkit(&server));
    let auth = AuthClient::new(backend.clone());

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/accounts:signUp")
            .query_param("key", "test-key")
            .header("content-type", "application/json")
            .json_body(json!({
                "email": "alice@example.com",
                "password": "secret123",
                "returnSecureToken": true
            }));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(sign_in_body("uid-alice", "alice@example.com", "token-1", "3600"));
    });

    let (seen, _sub) = recorder(&auth);
    let identity = auth.sign_up("alice@example.com", "secret123").await.unwrap();

    assert_eq!(identity, Identity::new("uid-alice", Some("alice@example.com".to_string())));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![None, Some("uid-alice".to_string())]
    );
    assert_eq!(backend.id_token().await.unwrap().as_deref(), Some("token-1"));
    mock.assert();
}

#[tokio::test]
async fn test_toolkit_sign_in_invalid_credentials() {
    let server = MockServer::start();
    let backend = Arc::new(toolkit(&server));
    let auth = AuthClient::new(backend.clone());

    let mock = server.mock(|when, then| {
        when.method(POST).path("/v1/accounts:signInWithPassword");
        then.status(400)
            .header("content-type", "application/json")
            .json_body(json!({
                "error": {
                    "code": 400,
                    "message": "INVALID_LOGIN_CREDENTIALS",
                    "errors": [{ "message": "INVALID_LOGIN_CREDENTIALS", "domain": "global", "reason": "invalid" }]
                }
            }));
    });

    let (seen, _sub) = recorder(&auth);
    let result = auth.sign_in("alice@example.com", "wrong").await;

    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    assert_eq!(*seen.lock().unwrap(), vec![None]);
    assert!(backend.id_token().await.unwrap().is_none());
    mock.assert();
}

#[tokio::test]
async fn test_toolkit_error_codes() {
    let server = MockServer::start();
    let auth = AuthClient::new(Arc::new(toolkit(&server)));

    server.mock(|when, then| {
        when.method(POST).path("/v1/accounts:signUp");
        then.status(400)
            .header("content-type", "application/json")
            .json_body(json!({
                "error": {
                    "code": 400,
                    "message": "WEAK_PASSWORD : Password should be at least 6 characters"
                }
            }));
    });

    let result = auth.sign_up("bob@example.com", "123").await;
    assert!(matches!(result, Err(AuthError::WeakPassword)));
}

#[tokio::test]
async fn test_toolkit_unparseable_error() {
    let server = MockServer::start();
    let auth = AuthClient::new(Arc::new(toolkit(&server)));

    server.mock(|when, then| {
        when.method(POST).path("/v1/accounts:signInWithPassword");
        then.status(503).body("upstream unavailable");
    });

    match auth.sign_in("bob@example.com", "secret123").await {
        Err(AuthError::Api(message)) => assert!(message.contains("503")),
        other => panic!("unexpected result: {:?}", other.map(|i| i.uid)),
    }
}

#[tokio::test]
async fn test_toolkit_refreshes_expiring_token() {
    let server = MockServer::start();
    let backend = Arc::new(toolkit(&server));
    let auth = AuthClient::new(backend.clone());

    server.mock(|when, then| {
        when.method(POST).path("/v1/accounts:signInWithPassword");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(sign_in_body("uid-alice", "alice@example.com", "token-old", "60"));
    });
    let refresh = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/token")
            .query_param("key", "test-key")
            .body("grant_type=refresh_token&refresh_token=refresh-1");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "expires_in": "3600",
                "token_type": "Bearer",
                "refresh_token": "refresh-2",
                "id_token": "token-new",
                "user_id": "uid-alice",
                "project_id": "1234"
            }));
    });

    auth.sign_in("alice@example.com", "secret123").await.unwrap();

    assert_eq!(backend.id_token().await.unwrap().as_deref(), Some("token-new"));
    // The refreshed token is good for an hour, so no second refresh.
    assert_eq!(backend.id_token().await.unwrap().as_deref(), Some("token-new"));
    refresh.assert_calls(1);
}

#[tokio::test]
async fn test_toolkit_out_of_range_expiry_uses_default_lifetime() {
    let server = MockServer::start();
    let backend = Arc::new(toolkit(&server));
    let auth = AuthClient::new(backend.clone());

    server.mock(|when, then| {
        when.method(POST).path("/v1/accounts:signInWithPassword");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(sign_in_body(
                "uid-alice",
                "alice@example.com",
                "token-1",
                "99999999999999999",
            ));
    });
    let refresh = server.mock(|when, then| {
        when.method(POST).path("/v1/token");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "expires_in": "3600",
                "refresh_token": "refresh-2",
                "id_token": "token-new"
            }));
    });

    let identity = auth.sign_in("alice@example.com", "secret123").await.unwrap();
    assert_eq!(identity.uid, "uid-alice");

    // Falls back to an hour, well outside the refresh margin.
    assert_eq!(backend.id_token().await.unwrap().as_deref(), Some("token-1"));
    refresh.assert_calls(0);
}

#[tokio::test]
async fn test_toolkit_refresh_with_out_of_range_expiry() {
    let server = MockServer::start();
    let backend = Arc::new(toolkit(&server));
    let auth = AuthClient::new(backend.clone());

    server.mock(|when, then| {
        when.method(POST).path("/v1/accounts:signInWithPassword");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(sign_in_body("uid-alice", "alice@example.com", "token-old", "60"));
    });
    let refresh = server.mock(|when, then| {
        when.method(POST).path("/v1/token");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "expires_in": "-99999999999999999",
                "refresh_token": "refresh-2",
                "id_token": "token-new"
            }));
    });

    auth.sign_in("alice@example.com", "secret123").await.unwrap();

    assert_eq!(backend.id_token().await.unwrap().as_deref(), Some("token-new"));
    assert_eq!(backend.id_token().await.unwrap().as_deref(), Some("token-new"));
    refresh.assert_calls(1);
}

#[tokio::test]
async fn test_toolkit_sign_out_clears_session() {
    let server = MockServer::start();
    let backend = Arc::new(toolkit(&server));
    let auth = AuthClient::new(backend.clone());

    server.mock(|when, then| {
        when.method(POST).path("/v1/accounts:signInWithPassword");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(sign_in_body("uid-alice", "alice@example.com", "token-1", "3600"));
    });

    auth.sign_in("alice@example.com", "secret123").await.unwrap();
    let (seen, _sub) = recorder(&auth);
    auth.sign_out().await;
    auth.sign_out().await;

    assert!(backend.id_token().await.unwrap().is_none());
    assert_eq!(
        *seen.lock().unwrap(),
        vec![Some("uid-alice".to_string()), None]
    );
}

#[tokio::test]
async fn test_sign_in_with_unknown_account_leaves_session_unchanged() {
    let backend = Arc::new(MemoryIdentityBackend::new());
    let auth = AuthClient::new(backend.clone());
    auth.sign_up("carol@example.com", "secret123").await.unwrap();
    let before = backend.current();

    let (seen, _sub) = recorder(&auth);
    for (email, password) in [
        ("nobody@example.com", "secret123"),
        ("carol@example.com", "not-her-password"),
        ("", ""),
    ] {
        let result = auth.sign_in(email, password).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    assert_eq!(backend.current(), before);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_successful_sign_in_fires_exactly_one_callback() {
    let backend = Arc::new(MemoryIdentityBackend::new());
    let auth = AuthClient::new(backend.clone());
    let created = auth.sign_up("dave@example.com", "secret123").await.unwrap();
    auth.sign_out().await;

    let (seen, _sub) = recorder(&auth);
    let identity = auth.sign_in("Dave@Example.com", "secret123").await.unwrap();

    assert_eq!(identity.uid, created.uid);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![None, Some(created.uid.clone())]
    );
}

#[tokio::test]
async fn test_sign_up_validation() {
    let auth = AuthClient::new(Arc::new(MemoryIdentityBackend::new()));

    assert!(matches!(
        auth.sign_up("not-an-email", "secret123").await,
        Err(AuthError::InvalidEmail)
    ));
    assert!(matches!(
        auth.sign_up("erin@example.com", "12345").await,
        Err(AuthError::WeakPassword)
    ));
    auth.sign_up("erin@example.com", "secret123").await.unwrap();
    assert!(matches!(
        auth.sign_up("erin@example.com", "other-secret").await,
        Err(AuthError::EmailAlreadyInUse)
    ));
}

#[tokio::test]
async fn test_disabled_account_cannot_sign_in() {
    let backend = Arc::new(MemoryIdentityBackend::new());
    let auth = AuthClient::new(backend.clone());
    auth.sign_up("frank@example.com", "secret123").await.unwrap();
    auth.sign_out().await;
    backend.disable_account("frank@example.com");

    assert!(matches!(
        auth.sign_in("frank@example.com", "secret123").await,
        Err(AuthError::UserDisabled)
    ));
}

#[tokio::test]
async fn test_unsubscribe_twice_stops_callbacks() {
    let backend = Arc::new(MemoryIdentityBackend::new());
    let auth = AuthClient::new(backend.clone());

    let (seen, sub) = recorder(&auth);
    sub.unsubscribe();
    sub.unsubscribe();
    auth.sign_up("gina@example.com", "secret123").await.unwrap();
    drop(sub);

    assert_eq!(*seen.lock().unwrap(), vec![None]);
    assert_eq!(backend.listener_count(), 0);
}

#[tokio::test]
async fn test_sign_out_failure_still_ends_session() {
    let backend = Arc::new(MemoryIdentityBackend::new());
    let auth = AuthClient::new(backend.clone());
    auth.sign_up("hank@example.com", "secret123").await.unwrap();

    backend.set_offline(true);
    auth.sign_out().await;

    assert!(backend.current().is_none());
}

#[test]
fn test_error_mapping() {
    let cases = [
        ("EMAIL_EXISTS", "EmailAlreadyInUse"),
        ("INVALID_EMAIL", "InvalidEmail"),
        ("EMAIL_NOT_FOUND", "InvalidCredentials"),
        ("INVALID_PASSWORD", "InvalidCredentials"),
        ("USER_DISABLED", "UserDisabled"),
        ("TOO_MANY_ATTEMPTS_TRY_LATER : Access disabled", "TooManyAttempts"),
        ("OPERATION_NOT_ALLOWED", "Api"),
    ];

    for (message, expected) in cases {
        let body: FirebaseErrorResponse =
            serde_json::from_value(json!({ "error": { "code": 400, "message": message } }))
                .unwrap();
        let mapped = format!("{:?}", AuthError::from_response(&body));
        assert!(mapped.starts_with(expected), "{} mapped to {}", message, mapped);
    }
}
