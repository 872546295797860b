pub mod auth;
pub mod config;
pub mod core;
pub mod firestore;
pub mod groups;
pub mod navigation;
pub mod screens;
pub mod session;
pub mod store;
pub mod telemetry;


use auth::{AuthClient, IdentityBackend, IdentityToolkit};
use config::{Config, Routes};
use firestore::FirestoreClient;
use groups::GroupStore;
use navigation::NavigationGuard;
use session::SessionPropagator;
use std::sync::Arc;
use store::DocumentStore;

/// Wires the identity provider and the document store together.
pub struct BuddyCallApp {
    identity: Arc<dyn IdentityBackend>,
    store: Arc<dyn DocumentStore>,
    routes: Routes,
}

impl BuddyCallApp {
    /// Firebase-backed app. Firestore requests carry the ID token of whoever
    /// is signed in through the Identity Toolkit client.
    pub fn new(config: Config) -> Self {
        let toolkit = Arc::new(IdentityToolkit::new(&config));
        let firestore = FirestoreClient::new(&config, toolkit.clone());

        Self {
            identity: toolkit,
            store: Arc::new(firestore),
            routes: config.routes,
        }
    }

    pub fn with_backends(
        identity: Arc<dyn IdentityBackend>,
        store: Arc<dyn DocumentStore>,
        routes: Routes,
    ) -> Self {
        Self {
            identity,
            store,
            routes,
        }
    }

    pub fn auth(&self) -> AuthClient {
        AuthClient::new(self.identity.clone())
    }

    pub fn groups(&self) -> GroupStore {
        GroupStore::new(self.store.clone())
    }

    /// Starts the app's session propagator. Call once and keep it for the
    /// lifetime of the app.
    pub fn start_session(&self) -> SessionPropagator {
        SessionPropagator::start(&self.auth())
    }

    pub fn guard(&self) -> NavigationGuard {
        NavigationGuard::new(&self.routes)
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }
}
