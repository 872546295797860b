//! Cancelable handles for live registrations.
//!
//! Every register/unsubscribe pair in the crate (session listeners, live group
//! queries, the navigation guard task) hands back a [`Subscription`]. Releasing it
//! runs the teardown exactly once, whether through [`Subscription::unsubscribe`]
//! or by dropping the handle.

use std::fmt;
use std::sync::Mutex;

type Teardown = Box<dyn FnOnce() + Send>;

/// An owned, cancelable registration.
#[must_use = "dropping a Subscription releases it immediately"]
pub struct Subscription {
    teardown: Mutex<Option<Teardown>>,
}

impl Subscription {
    /// Wraps `teardown` so that it runs at most once.
    pub fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            teardown: Mutex::new(Some(Box::new(teardown))),
        }
    }

    /// A handle with nothing to release.
    pub fn released() -> Self {
        Self {
            teardown: Mutex::new(None),
        }
    }

    /// Stops the registration. Calling this again is a no-op.
    pub fn unsubscribe(&self) {
        let teardown = match self.teardown.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    /// Returns `true` until the handle has been released.
    pub fn is_active(&self) -> bool {
        match self.teardown.lock() {
            Ok(slot) => slot.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
