//! Document store capability.
//!
//! The group adapter needs two things from the backend: create a document in a
//! collection and run a live "array field contains value" query. [`DocumentStore`]
//! is that capability set. [`crate::firestore::FirestoreClient`] implements it
//! over REST and [`MemoryDocumentStore`] keeps documents in process.

pub mod memory;

use futures::stream::BoxStream;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::MemoryDocumentStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Missing required field `{0}`")]
    MissingField(&'static str),
    #[error("API error: {0}")]
    Api(String),
    #[error("HTTP Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to decode document {id}: {reason}")]
    Decode { id: String, reason: String },
}

/// A document as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    /// JSON object of the document's fields. Timestamps are RFC 3339 strings.
    pub data: Value,
}

/// Payload for creating a document.
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub fields: Map<String, Value>,
    /// Fields the server fills with its own commit time.
    pub server_timestamps: Vec<String>,
}

/// Matches documents whose array field `field` contains `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayContains {
    pub field: String,
    pub value: Value,
}

impl ArrayContains {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, data: &Value) -> bool {
        data.get(&self.field)
            .and_then(Value::as_array)
            .map(|values| values.contains(&self.value))
            .unwrap_or(false)
    }
}

/// Push-based result sets of a live query. Each item is the complete current
/// set; errors do not end the stream.
pub type SnapshotStream = BoxStream<'static, Result<Vec<StoredDocument>, StoreError>>;

/// Capability set of the external document store.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates a document with a store-assigned id and returns that id.
    async fn create_document(
        &self,
        collection: &str,
        document: NewDocument,
    ) -> Result<String, StoreError>;

    /// Opens a live query. The first item is the initial result set, even if empty.
    async fn live_query(
        &self,
        collection: &str,
        filter: ArrayContains,
    ) -> Result<SnapshotStream, StoreError>;
}
