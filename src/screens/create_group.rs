use super::{InFlight, Notice, Notifier, Outcome};
use crate::groups::{GroupStore, NewGroup};
use crate::navigation::Router;
use crate::session::SessionReader;
use std::sync::Arc;

pub struct CreateGroupScreen {
    groups: GroupStore,
    session: SessionReader,
    router: Router,
    notifier: Arc<dyn Notifier>,
    in_flight: InFlight,
    pub name: String,
    pub description: String,
    pub goal: String,
}

impl CreateGroupScreen {
    pub fn new(
        groups: GroupStore,
        session: SessionReader,
        router: Router,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            groups,
            session,
            router,
            notifier,
            in_flight: InFlight::new(),
            name: String::new(),
            description: String::new(),
            goal: String::new(),
        }
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Creates the group for the signed-in user and returns to the previous
    /// screen on success.
    pub async fn submit(&self) -> Outcome {
        if self.name.trim().is_empty() || self.goal.trim().is_empty() {
            self.notifier.notify(Notice::MissingGroupFields);
            return Outcome::Failed;
        }
        let Some(identity) = self.session.current().identity else {
            self.notifier.notify(Notice::NotSignedIn);
            return Outcome::Failed;
        };
        let Some(_busy) = self.in_flight.try_begin() else {
            return Outcome::Ignored;
        };

        let mut group = NewGroup::new(self.name.as_str(), self.goal.as_str());
        if !self.description.trim().is_empty() {
            group = group.with_description(self.description.as_str());
        }

        match self.groups.create_group(group, &identity).await {
            Ok(_) => {
                self.notifier.notify(Notice::GroupCreated);
                self.router.back();
                Outcome::Completed
            }
            Err(_) => {
                self.notifier.notify(Notice::GroupCreateFailed);
                Outcome::Failed
            }
        }
    }
}
