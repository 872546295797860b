use super::{ArrayContains, DocumentStore, NewDocument, SnapshotStream, StoreError, StoredDocument};
use crate::core::random_id;
use chrono::{SecondsFormat, Utc};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast::{self, error::RecvError};

type Collections = BTreeMap<String, Vec<StoredDocument>>;

#[derive(Debug, Clone)]
enum StoreEvent {
    Changed,
    Failed(String),
}

/// In-process document store with live queries.
pub struct MemoryDocumentStore {
    collections: Arc<Mutex<Collections>>,
    events: broadcast::Sender<StoreEvent>,
    fail_writes: AtomicBool,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            collections: Arc::new(Mutex::new(BTreeMap::new())),
            events,
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Makes subsequent writes fail as if rejected by the server.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Stores `document` as-is, replacing any document with the same id.
    pub fn insert(&self, collection: &str, document: StoredDocument) {
        {
            let mut collections = self
                .collections
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let docs = collections.entry(collection.to_string()).or_default();
            match docs.iter_mut().find(|d| d.id == document.id) {
                Some(existing) => *existing = document,
                None => docs.push(document),
            }
        }
        let _ = self.events.send(StoreEvent::Changed);
    }

    pub fn remove(&self, collection: &str, id: &str) {
        {
            let mut collections = self
                .collections
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(docs) = collections.get_mut(collection) {
                docs.retain(|d| d.id != id);
            }
        }
        let _ = self.events.send(StoreEvent::Changed);
    }

    /// Delivers an error to every open live query.
    pub fn fail_listeners(&self, message: &str) {
        let _ = self.events.send(StoreEvent::Failed(message.to_string()));
    }

    pub fn documents(&self, collection: &str) -> Vec<StoredDocument> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

struct LiveQuery {
    events: broadcast::Receiver<StoreEvent>,
    collections: Arc<Mutex<Collections>>,
    collection: String,
    filter: ArrayContains,
    last: Option<Vec<StoredDocument>>,
}

impl LiveQuery {
    fn snapshot(&self) -> Vec<StoredDocument> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&self.collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| self.filter.matches(&d.data))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn next(mut self) -> Option<(Result<Vec<StoredDocument>, StoreError>, Self)> {
        loop {
            if self.last.is_some() {
                match self.events.recv().await {
                    Ok(StoreEvent::Changed) | Err(RecvError::Lagged(_)) => {}
                    Ok(StoreEvent::Failed(message)) => {
                        return Some((Err(StoreError::Api(message)), self));
                    }
                    Err(RecvError::Closed) => return None,
                }
            }

            let snapshot = self.snapshot();
            if self.last.as_ref() != Some(&snapshot) {
                self.last = Some(snapshot.clone());
                return Some((Ok(snapshot), self));
            }
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create_document(
        &self,
        collection: &str,
        document: NewDocument,
    ) -> Result<String, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Api("PERMISSION_DENIED".to_string()));
        }

        let mut fields = document.fields;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        for field in document.server_timestamps {
            fields.insert(field, Value::String(now.clone()));
        }

        let id = random_id(20);
        self.insert(
            collection,
            StoredDocument {
                id: id.clone(),
                data: Value::Object(fields),
            },
        );
        Ok(id)
    }

    async fn live_query(
        &self,
        collection: &str,
        filter: ArrayContains,
    ) -> Result<SnapshotStream, StoreError> {
        let query = LiveQuery {
            events: self.events.subscribe(),
            collections: self.collections.clone(),
            collection: collection.to_string(),
            filter,
            last: None,
        };
        Ok(stream::unfold(query, LiveQuery::next).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, members: &[&str]) -> StoredDocument {
        StoredDocument {
            id: id.to_string(),
            data: json!({ "name": id, "memberIds": members }),
        }
    }

    #[tokio::test]
    async fn test_live_query_emits_initial_and_changed_sets() {
        let store = MemoryDocumentStore::new();
        store.insert("groups", doc("g1", &["u1", "u2"]));
        store.insert("groups", doc("g2", &["u2"]));

        let mut stream = store
            .live_query("groups", ArrayContains::new("memberIds", "u1"))
            .await
            .unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, vec![doc("g1", &["u1", "u2"])]);

        // A change outside the result set is not delivered.
        store.insert("groups", doc("g3", &["u3"]));
        store.insert("groups", doc("g4", &["u1"]));
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), ["g1", "g4"]);

        store.fail_listeners("UNAVAILABLE");
        assert!(matches!(stream.next().await, Some(Err(StoreError::Api(_)))));

        store.remove("groups", "g1");
        let third = stream.next().await.unwrap().unwrap();
        assert_eq!(third, vec![doc("g4", &["u1"])]);
    }

    #[tokio::test]
    async fn test_empty_initial_set_is_delivered() {
        let store = MemoryDocumentStore::new();
        let mut stream = store
            .live_query("groups", ArrayContains::new("memberIds", "u1"))
            .await
            .unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), Vec::new());
    }

    #[tokio::test]
    async fn test_create_fills_server_timestamps() {
        let store = MemoryDocumentStore::new();
        let mut fields = serde_json::Map::new();
        fields.insert("name".to_string(), json!("A"));

        let id = store
            .create_document(
                "groups",
                NewDocument {
                    fields,
                    server_timestamps: vec!["createdAt".to_string()],
                },
            )
            .await
            .unwrap();

        let docs = store.documents("groups");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, id);
        assert!(docs[0].data["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_failed_write_stores_nothing() {
        let store = MemoryDocumentStore::new();
        store.set_fail_writes(true);
        let result = store.create_document("groups", NewDocument::default()).await;
        assert!(matches!(result, Err(StoreError::Api(_))));
        assert!(store.documents("groups").is_empty());
    }
}
