use crate::core::Subscription;
use crate::groups::{Group, GroupStore};
use crate::navigation::Router;
use crate::session::Session;
use std::sync::{Arc, Mutex, PoisonError};

pub const CREATE_GROUP_ROUTE: &str = "/group/create";

#[derive(Debug)]
struct ListState {
    groups: Vec<Group>,
    loading: bool,
    /// Bumped on every activate and deactivate. Deliveries tagged with an
    /// older value are dropped.
    generation: u64,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            loading: true,
            generation: 0,
        }
    }
}

/// The groups the signed-in user belongs to, kept live while active.
pub struct GroupListScreen {
    groups: GroupStore,
    state: Arc<Mutex<ListState>>,
    subscription: Option<Subscription>,
}

impl GroupListScreen {
    pub fn new(groups: GroupStore) -> Self {
        Self {
            groups,
            state: Arc::new(Mutex::new(ListState::default())),
            subscription: None,
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ListState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribes to the groups of the session's identity, releasing any
    /// previous subscription first. Does nothing while signed out.
    pub fn activate(&mut self, session: &Session) {
        self.deactivate();
        {
            let mut state = self.state();
            let generation = state.generation;
            *state = ListState {
                generation,
                ..ListState::default()
            };
        }

        let Some(identity) = &session.identity else {
            return;
        };

        let deliver = self.delivery();
        self.subscription = Some(self.groups.subscribe_to_groups_of(&identity.uid, deliver));
    }

    pub fn deactivate(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        let mut state = self.state();
        state.generation = state.generation.wrapping_add(1);
    }

    /// Writer for the current generation. Once the screen is deactivated or
    /// activated again, calls to it no longer touch the state.
    pub(super) fn delivery(&self) -> impl FnMut(Vec<Group>) + Send + 'static {
        let state = self.state.clone();
        let generation = self.state().generation;
        move |groups| {
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.generation != generation {
                return;
            }
            state.groups = groups;
            state.loading = false;
        }
    }

    pub fn is_active(&self) -> bool {
        self.subscription
            .as_ref()
            .map(Subscription::is_active)
            .unwrap_or(false)
    }

    /// Last delivered set. Empty until the first delivery.
    pub fn groups(&self) -> Vec<Group> {
        self.state().groups.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn open_create(&self, router: &Router) {
        router.push(CREATE_GROUP_ROUTE);
    }
}

impl Drop for GroupListScreen {
    fn drop(&mut self) {
        self.deactivate();
    }
}
