//! Group store adapter.
//!
//! Groups live in the `groups` collection of the document store:
//!
//! ```json
//! { "name": "...", "description": "...", "goal": "...",
//!   "memberIds": ["uid"], "createdBy": "uid", "createdAt": <server timestamp> }
//! ```


use crate::auth::Identity;
use crate::core::Subscription;
use crate::store::{ArrayContains, DocumentStore, NewDocument, StoreError, StoredDocument};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Map};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const GROUPS_COLLECTION: &str = "groups";

const MEMBER_IDS: &str = "memberIds";
const CREATED_AT: &str = "createdAt";

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub description: String,
    pub goal: String,
    pub member_ids: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupRecord {
    name: String,
    #[serde(default)]
    description: String,
    goal: String,
    member_ids: Vec<String>,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl Group {
    pub fn from_document(document: StoredDocument) -> Result<Self, StoreError> {
        let record: GroupRecord =
            serde_json::from_value(document.data).map_err(|e| StoreError::Decode {
                id: document.id.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            id: document.id,
            name: record.name,
            description: record.description,
            goal: record.goal,
            member_ids: record.member_ids,
            created_by: record.created_by,
            created_at: record.created_at,
        })
    }
}

/// Input for [`GroupStore::create_group`].
#[derive(Debug, Clone, Default)]
pub struct NewGroup {
    pub name: String,
    pub goal: String,
    pub description: Option<String>,
}

impl NewGroup {
    pub fn new(name: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            goal: goal.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

fn decode_groups(documents: Vec<StoredDocument>) -> Vec<Group> {
    documents
        .into_iter()
        .filter_map(|document| match Group::from_document(document) {
            Ok(group) => Some(group),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed group");
                None
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct GroupStore {
    store: Arc<dyn DocumentStore>,
}

impl GroupStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Creates a group owned by `creator` and returns its id.
    ///
    /// `name` and `goal` must be non-blank; nothing is written otherwise. The
    /// creator becomes the only member.
    pub async fn create_group(
        &self,
        group: NewGroup,
        creator: &Identity,
    ) -> Result<String, StoreError> {
        let name = group.name.trim();
        if name.is_empty() {
            return Err(StoreError::MissingField("name"));
        }
        let goal = group.goal.trim();
        if goal.is_empty() {
            return Err(StoreError::MissingField("goal"));
        }
        let description = group.description.as_deref().unwrap_or_default().trim();

        let mut fields = Map::new();
        fields.insert("name".to_string(), json!(name));
        fields.insert("description".to_string(), json!(description));
        fields.insert("goal".to_string(), json!(goal));
        fields.insert(MEMBER_IDS.to_string(), json!([creator.uid]));
        fields.insert("createdBy".to_string(), json!(creator.uid));

        let document = NewDocument {
            fields,
            server_timestamps: vec![CREATED_AT.to_string()],
        };

        match self.store.create_document(GROUPS_COLLECTION, document).await {
            Ok(id) => {
                tracing::info!(group = %id, uid = %creator.uid, "Group created");
                Ok(id)
            }
            Err(e) => {
                tracing::warn!(error = %e, uid = %creator.uid, "Group creation failed");
                Err(e)
            }
        }
    }

    /// Delivers the complete set of groups `uid` belongs to, once for the
    /// initial load and again on every change.
    ///
    /// Stream errors are logged and the subscription stays open. Releasing the
    /// returned handle stops callbacks and closes the underlying query. Must be
    /// called within a tokio runtime.
    pub fn subscribe_to_groups_of<F>(&self, uid: &str, mut callback: F) -> Subscription
    where
        F: FnMut(Vec<Group>) + Send + 'static,
    {
        let store = self.store.clone();
        let uid = uid.to_string();
        let active = Arc::new(AtomicBool::new(true));
        let task_active = active.clone();

        let task = tokio::spawn(async move {
            let filter = ArrayContains::new(MEMBER_IDS, uid.as_str());
            let mut snapshots = match store.live_query(GROUPS_COLLECTION, filter).await {
                Ok(snapshots) => snapshots,
                Err(e) => {
                    tracing::warn!(error = %e, uid = %uid, "Failed to open group subscription");
                    return;
                }
            };

            while let Some(snapshot) = snapshots.next().await {
                match snapshot {
                    Ok(documents) => {
                        let groups = decode_groups(documents);
                        if !task_active.load(Ordering::SeqCst) {
                            break;
                        }
                        callback(groups);
                    }
                    Err(e) => tracing::warn!(error = %e, uid = %uid, "Group subscription error"),
                }
            }

            tracing::debug!(uid = %uid, "Group subscription ended");
        });

        Subscription::new(move || {
            active.store(false, Ordering::SeqCst);
            task.abort();
        })
    }
}
