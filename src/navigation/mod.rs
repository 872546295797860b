//! Authentication-gated navigation.
//!
//! The [`NavigationGuard`] is the only component that redirects between the
//! login and home routes. Screens never navigate in response to sign-in or
//! sign-out; they change the session and the guard reacts.

mod router;

#[cfg(test)]
mod tests;

pub use router::Router;

use crate::config::Routes;
use crate::core::Subscription;
use crate::session::{Session, SessionReader};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route(String);

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Route {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for Route {
    fn from(path: String) -> Self {
        Self(path)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Loading,
    UnauthenticatedAtLogin,
    UnauthenticatedElsewhere,
    AuthenticatedAtLogin,
    AuthenticatedElsewhere,
}

/// Outcome of evaluating the guard for one `(session, location)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// State of the observed pair.
    pub observed: GuardState,
    /// State once `redirect`, if any, has been followed.
    pub state: GuardState,
    pub redirect: Option<Route>,
}

impl Evaluation {
    /// While loading, the current route is not rendered.
    pub fn shows_waiting_indicator(&self) -> bool {
        self.state == GuardState::Loading
    }
}

/// Something that owns a current location and can replace it.
pub trait Navigator: Send + Sync {
    fn current(&self) -> Route;

    /// Replaces the current location. Returns `false` if `route` was already current.
    fn replace(&self, route: &Route) -> bool;
}

#[derive(Debug, Clone)]
pub struct NavigationGuard {
    login: Route,
    home: Route,
}

impl NavigationGuard {
    pub fn new(routes: &Routes) -> Self {
        Self {
            login: Route::new(routes.login.as_str()),
            home: Route::new(routes.home.as_str()),
        }
    }

    pub fn login(&self) -> &Route {
        &self.login
    }

    pub fn home(&self) -> &Route {
        &self.home
    }

    pub fn evaluate(&self, session: &Session, location: &Route) -> Evaluation {
        let at_login = *location == self.login;

        let observed = match (session.loading, session.is_authenticated(), at_login) {
            (true, _, _) => GuardState::Loading,
            (false, false, true) => GuardState::UnauthenticatedAtLogin,
            (false, false, false) => GuardState::UnauthenticatedElsewhere,
            (false, true, true) => GuardState::AuthenticatedAtLogin,
            (false, true, false) => GuardState::AuthenticatedElsewhere,
        };

        let (state, redirect) = match observed {
            GuardState::UnauthenticatedElsewhere => {
                (GuardState::UnauthenticatedAtLogin, Some(self.login.clone()))
            }
            GuardState::AuthenticatedAtLogin => {
                (GuardState::AuthenticatedElsewhere, Some(self.home.clone()))
            }
            stable => (stable, None),
        };

        Evaluation {
            observed,
            state,
            redirect,
        }
    }

    /// Evaluates the navigator's current location and follows the redirect,
    /// if one is due. Repeating the call for the same session is a no-op.
    pub fn enforce(&self, session: &Session, navigator: &dyn Navigator) -> Evaluation {
        let location = navigator.current();
        let evaluation = self.evaluate(session, &location);

        if let Some(target) = &evaluation.redirect {
            if *target != location && navigator.replace(target) {
                tracing::info!(from = %location, to = %target, "Redirected");
            }
        }

        evaluation
    }

    /// Enforces the guard on `router` now and after every session or location
    /// change, until the returned handle is released or the session goes away.
    /// Must be called within a tokio runtime.
    pub fn spawn(self, mut session: SessionReader, router: Router) -> Subscription {
        let mut location = router.watch();

        let task = tokio::spawn(async move {
            loop {
                let current = session.current_and_mark_seen();
                location.borrow_and_update();
                self.enforce(&current, &router);

                tokio::select! {
                    alive = session.changed() => {
                        if !alive {
                            break;
                        }
                    }
                    changed = location.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Navigation guard stopped");
        });

        Subscription::new(move || task.abort())
    }
}
