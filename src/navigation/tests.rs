use super::*;
use crate::auth::{AuthClient, Identity, MemoryIdentityBackend};
use crate::session::SessionPropagator;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn guard() -> NavigationGuard {
    NavigationGuard::new(&Routes::default())
}

fn alice() -> Session {
    Session::signed_in(Identity::new("u1", Some("alice@example.com".to_string())))
}

/// Navigator that records every replace it performs.
struct RecordingNavigator {
    location: Mutex<Route>,
    replaced: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    fn at(path: &str) -> Self {
        Self {
            location: Mutex::new(Route::new(path)),
            replaced: Mutex::new(Vec::new()),
        }
    }

    fn replaced(&self) -> Vec<Route> {
        self.replaced.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current(&self) -> Route {
        self.location.lock().unwrap().clone()
    }

    fn replace(&self, route: &Route) -> bool {
        let mut location = self.location.lock().unwrap();
        if *location == *route {
            return false;
        }
        *location = route.clone();
        self.replaced.lock().unwrap().push(route.clone());
        true
    }
}

async fn wait_for_route(router: &Router, path: &str) {
    let expected = Route::new(path);
    let mut location = router.watch();
    tokio::time::timeout(Duration::from_secs(2), location.wait_for(|r| *r == expected))
        .await
        .expect("timed out waiting for route")
        .expect("router closed");
}

#[test]
fn test_loading_never_redirects() {
    let guard = guard();
    for path in ["/login", "/", "/home", "/group/create"] {
        let navigator = RecordingNavigator::at(path);
        let evaluation = guard.enforce(&Session::initial(), &navigator);
        assert_eq!(evaluation.state, GuardState::Loading);
        assert!(evaluation.shows_waiting_indicator());
        assert!(navigator.replaced().is_empty());
    }
}

#[test]
fn test_signed_out_elsewhere_redirects_to_login_once() {
    let guard = guard();
    let navigator = RecordingNavigator::at("/home");

    let evaluation = guard.enforce(&Session::signed_out(), &navigator);
    assert_eq!(evaluation.observed, GuardState::UnauthenticatedElsewhere);
    assert_eq!(evaluation.state, GuardState::UnauthenticatedAtLogin);

    guard.enforce(&Session::signed_out(), &navigator);
    assert_eq!(navigator.replaced(), vec![Route::new("/login")]);
}

#[test]
fn test_signed_in_at_login_redirects_home_once() {
    let guard = guard();
    let navigator = RecordingNavigator::at("/login");

    let evaluation = guard.enforce(&alice(), &navigator);
    assert_eq!(evaluation.observed, GuardState::AuthenticatedAtLogin);
    assert_eq!(evaluation.state, GuardState::AuthenticatedElsewhere);
    assert!(!evaluation.shows_waiting_indicator());

    guard.enforce(&alice(), &navigator);
    assert_eq!(navigator.replaced(), vec![Route::new("/")]);
}

#[test]
fn test_stable_combinations_do_not_redirect() {
    let guard = guard();

    let navigator = RecordingNavigator::at("/home");
    let evaluation = guard.enforce(&alice(), &navigator);
    assert_eq!(evaluation.state, GuardState::AuthenticatedElsewhere);
    assert_eq!(evaluation.redirect, None);

    let navigator = RecordingNavigator::at("/login");
    let evaluation = guard.enforce(&Session::signed_out(), &navigator);
    assert_eq!(evaluation.state, GuardState::UnauthenticatedAtLogin);
    assert!(navigator.replaced().is_empty());
}

#[test]
fn test_configured_routes() {
    let guard = NavigationGuard::new(&Routes {
        login: "/sign-in".to_string(),
        home: "/tabs".to_string(),
    });

    let evaluation = guard.evaluate(&alice(), &Route::new("/sign-in"));
    assert_eq!(evaluation.redirect, Some(Route::new("/tabs")));

    // The default login path is an ordinary route here.
    let evaluation = guard.evaluate(&Session::signed_out(), &Route::new("/login"));
    assert_eq!(evaluation.redirect, Some(Route::new("/sign-in")));
}

#[test]
fn test_router_stack() {
    let router = Router::new("/");
    router.push("/group/create");
    assert_eq!(router.current(), Route::new("/group/create"));
    assert_eq!(router.depth(), 2);

    assert!(!router.replace("/group/create"));
    assert!(router.replace("/group"));
    assert_eq!(router.depth(), 2);

    assert!(router.back());
    assert_eq!(router.current(), Route::new("/"));
    assert!(!router.back());
    assert_eq!(router.depth(), 1);
}

#[tokio::test]
async fn test_replace_to_current_route_does_not_notify() {
    let router = Router::new("/login");
    let mut location = router.watch();

    assert!(!router.replace("/login"));
    assert!(!location.has_changed().unwrap());
}

#[tokio::test]
async fn test_spawned_guard_follows_session() {
    let backend = Arc::new(MemoryIdentityBackend::new());
    let auth = AuthClient::new(backend);
    let propagator = SessionPropagator::start(&auth);
    let router = Router::new("/group");

    let guard = guard().spawn(propagator.reader(), router.clone());
    wait_for_route(&router, "/login").await;

    auth.sign_up("alice@example.com", "secret123").await.unwrap();
    wait_for_route(&router, "/").await;

    // Navigating to login while signed in bounces back home.
    router.push("/login");
    wait_for_route(&router, "/").await;

    auth.sign_out().await;
    wait_for_route(&router, "/login").await;

    guard.unsubscribe();
    guard.unsubscribe();
    tokio::task::yield_now().await;

    auth.sign_in("alice@example.com", "secret123").await.unwrap();
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    assert_eq!(router.current(), Route::new("/login"));
}
