//! Cloud Firestore REST client.
//!
//! Implements [`DocumentStore`] over the Firestore v1 REST API:
//!
//! * document creation is a single `documents:commit` write carrying a
//!   `currentDocument.exists = false` precondition and `REQUEST_TIME`
//!   transforms for server-assigned timestamps.
//! * live queries use the streaming `documents:listen` endpoint with a query
//!   target. Responses are folded by [`watch::WatchState`] into complete result
//!   sets.
//!
//! Requests are authenticated with the signed-in user's ID token through
//! [`IdTokenMiddleware`].

mod convert;
pub mod listen;
pub mod models;
pub mod watch;


use self::convert::{
    convert_fields_to_serde_value, convert_object_to_fields,
    convert_serde_value_to_firestore_value,
};
use self::listen::{listen_request, ListenStream};
use self::models::{
    CollectionSelector, CommitRequest, CommitResponse, Document, FieldFilter, FieldOperator,
    FieldReference, FieldTransform, FilterType, ListenRequest, Precondition, QueryFilter,
    QueryTarget, ServerValue, StructuredQuery, Target, TargetType, Write,
};
use self::watch::WatchState;
use crate::config::Config;
use crate::core::middleware::{IdTokenMiddleware, TokenSource};
use crate::core::{parse_error_response, random_id};
use crate::store::{
    ArrayContains, DocumentStore, NewDocument, SnapshotStream, StoreError, StoredDocument,
};
use futures::stream::{self, StreamExt};
use reqwest::{header, Client};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use std::sync::Arc;
use thiserror::Error;

/// Target id used for the single query target of a listen stream.
const LISTEN_TARGET_ID: i32 = 1;

/// Length of auto-generated document ids.
const AUTO_ID_LENGTH: usize = 20;

/// Errors that can occur during Firestore operations.
#[derive(Error, Debug)]
pub enum FirestoreError {
    /// Wrapper for `reqwest::Error`.
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    /// Wrapper for `reqwest_middleware::Error`.
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    /// Errors returned by the Firestore API.
    #[error("API error: {0}")]
    ApiError(String),
    /// Wrapper for `serde_json::Error`.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<FirestoreError> for StoreError {
    fn from(err: FirestoreError) -> Self {
        match err {
            FirestoreError::RequestError(e) => StoreError::Request(e),
            FirestoreError::MiddlewareError(e) => StoreError::Middleware(e),
            FirestoreError::ApiError(message) => StoreError::Api(message),
            FirestoreError::SerializationError(e) => StoreError::Serialization(e),
        }
    }
}

/// Client for one Firestore database.
pub struct FirestoreClient {
    client: ClientWithMiddleware,
    /// `{firestore_url}/projects/{project}/databases/(default)`
    database_url: String,
    /// `projects/{project}/databases/(default)`
    database: String,
}

impl FirestoreClient {
    /// Creates a client for the project's default database. Requests carry the
    /// ID token supplied by `tokens`.
    pub fn new(config: &Config, tokens: Arc<dyn TokenSource>) -> Self {
        let client = ClientBuilder::new(Client::new())
            .with(IdTokenMiddleware::new(tokens))
            .build();

        Self::new_with_client(client, config.database_url(), config.database_name())
    }

    pub(crate) fn new_with_client(
        client: ClientWithMiddleware,
        database_url: String,
        database: String,
    ) -> Self {
        Self {
            client,
            database_url,
            database,
        }
    }

    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/documents/{}/{}", self.database, collection, id)
    }

    async fn commit(&self, request: &CommitRequest) -> Result<CommitResponse, FirestoreError> {
        let url = format!("{}/documents:commit", self.database_url);

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(request)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FirestoreError::ApiError(
                parse_error_response(response, "Commit failed").await,
            ));
        }

        Ok(response.json().await?)
    }

    async fn open_listen(
        &self,
        collection: &str,
        filter: ArrayContains,
    ) -> Result<ListenStream, FirestoreError> {
        let url = format!("{}/documents:listen", self.database_url);

        let query = StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: collection.to_string(),
                all_descendants: None,
            }],
            where_clause: Some(QueryFilter {
                filter_type: FilterType::FieldFilter(FieldFilter {
                    field: FieldReference {
                        field_path: filter.field,
                    },
                    op: FieldOperator::ArrayContains,
                    value: convert_serde_value_to_firestore_value(filter.value)?,
                }),
            }),
        };

        let request = ListenRequest {
            database: self.database.clone(),
            add_target: Some(Target {
                target_type: TargetType::Query(QueryTarget {
                    parent: format!("{}/documents", self.database),
                    structured_query: query,
                }),
                target_id: LISTEN_TARGET_ID,
                resume_token: None,
            }),
            remove_target: None,
        };

        listen_request(&self.client, &url, &request).await
    }
}

/// Converts a listened document. Documents that cannot be represented as JSON
/// are logged and left out of the snapshot.
fn stored_document(document: Document) -> Option<StoredDocument> {
    let id = document.id().to_string();
    match convert_fields_to_serde_value(document.fields) {
        Ok(data) => Some(StoredDocument { id, data }),
        Err(e) => {
            tracing::warn!(document = %id, error = %e, "Skipping undecodable document");
            None
        }
    }
}

async fn next_snapshot(
    (mut listen, mut state): (ListenStream, WatchState),
) -> Option<(Result<Vec<StoredDocument>, StoreError>, (ListenStream, WatchState))> {
    loop {
        let response = match listen.next().await? {
            Ok(response) => response,
            Err(e) => return Some((Err(e.into()), (listen, state))),
        };

        match state.apply(response) {
            Ok(Some(documents)) => {
                let snapshot = documents.into_iter().filter_map(stored_document).collect();
                return Some((Ok(snapshot), (listen, state)));
            }
            Ok(None) => {}
            Err(e) => return Some((Err(e.into()), (listen, state))),
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for FirestoreClient {
    async fn create_document(
        &self,
        collection: &str,
        document: NewDocument,
    ) -> Result<String, StoreError> {
        let id = random_id(AUTO_ID_LENGTH);

        let write = Write {
            update: Document {
                name: self.document_name(collection, &id),
                fields: convert_object_to_fields(document.fields)?,
                create_time: None,
                update_time: None,
            },
            update_transforms: document
                .server_timestamps
                .into_iter()
                .map(|field_path| FieldTransform {
                    field_path,
                    set_to_server_value: ServerValue::RequestTime,
                })
                .collect(),
            current_document: Some(Precondition { exists: false }),
        };

        let response = self.commit(&CommitRequest { writes: vec![write] }).await?;
        tracing::debug!(
            collection,
            id = %id,
            commit_time = ?response.commit_time,
            "Document created"
        );

        Ok(id)
    }

    async fn live_query(
        &self,
        collection: &str,
        filter: ArrayContains,
    ) -> Result<SnapshotStream, StoreError> {
        let listen = self.open_listen(collection, filter).await?;
        let state = WatchState::new(LISTEN_TARGET_ID);

        Ok(stream::unfold((listen, state), next_snapshot).boxed())
    }
}
