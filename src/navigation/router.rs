use super::{Navigator, Route};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

struct RouterInner {
    stack: Mutex<Vec<Route>>,
    location: watch::Sender<Route>,
}

/// In-process navigation stack. Clones share the same stack.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    pub fn new(initial: impl Into<Route>) -> Self {
        let initial = initial.into();
        let (location, _) = watch::channel(initial.clone());
        Self {
            inner: Arc::new(RouterInner {
                stack: Mutex::new(vec![initial]),
                location,
            }),
        }
    }

    fn with_stack<R>(&self, f: impl FnOnce(&mut Vec<Route>) -> R) -> R {
        let mut stack = self
            .inner
            .stack
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut stack)
    }

    fn publish(&self, route: Route) {
        self.inner.location.send_replace(route);
    }

    pub fn current(&self) -> Route {
        self.inner.location.borrow().clone()
    }

    pub fn push(&self, route: impl Into<Route>) {
        let route = route.into();
        self.with_stack(|stack| stack.push(route.clone()));
        tracing::debug!(route = %route, "Navigated");
        self.publish(route);
    }

    /// Replaces the top of the stack. Returns `false`, doing nothing, when
    /// `route` is already current.
    pub fn replace(&self, route: impl Into<Route>) -> bool {
        let route = route.into();
        let replaced = self.with_stack(|stack| match stack.last_mut() {
            Some(top) if *top == route => false,
            Some(top) => {
                *top = route.clone();
                true
            }
            None => {
                stack.push(route.clone());
                true
            }
        });
        if replaced {
            tracing::debug!(route = %route, "Replaced route");
            self.publish(route);
        }
        replaced
    }

    /// Pops the top route. The root route is never popped.
    pub fn back(&self) -> bool {
        let top = self.with_stack(|stack| {
            if stack.len() > 1 {
                stack.pop();
                stack.last().cloned()
            } else {
                None
            }
        });
        match top {
            Some(top) => {
                self.publish(top);
                true
            }
            None => false,
        }
    }

    pub fn depth(&self) -> usize {
        self.with_stack(|stack| stack.len())
    }

    /// Receiver that observes every location change.
    pub fn watch(&self) -> watch::Receiver<Route> {
        self.inner.location.subscribe()
    }
}

impl Navigator for Router {
    fn current(&self) -> Route {
        Router::current(self)
    }

    fn replace(&self, route: &Route) -> bool {
        Router::replace(self, route.clone())
    }
}
