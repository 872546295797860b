//! Folds listen responses into complete result sets.
//!
//! The server sends documents entering and leaving a target one at a time and
//! marks consistent points with a target-less `NO_CHANGE`. A snapshot is taken
//! at each consistent point once the target is `CURRENT`: always the first
//! time, afterwards only when the set changed.

use super::models::{Document, ListenResponse, TargetChange, TargetChangeType};
use super::FirestoreError;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct WatchState {
    target_id: i32,
    documents: BTreeMap<String, Document>,
    current: bool,
    changed: bool,
    delivered: bool,
}

impl WatchState {
    pub fn new(target_id: i32) -> Self {
        Self {
            target_id,
            documents: BTreeMap::new(),
            current: false,
            changed: false,
            delivered: false,
        }
    }

    fn concerns(&self, change: &TargetChange) -> bool {
        change.target_ids.is_empty() || change.target_ids.contains(&self.target_id)
    }

    fn remove(&mut self, name: &str) {
        if self.documents.remove(name).is_some() {
            self.changed = true;
        }
    }

    /// Applies one response. Returns the full result set when a snapshot is due.
    pub fn apply(
        &mut self,
        response: ListenResponse,
    ) -> Result<Option<Vec<Document>>, FirestoreError> {
        if let Some(change) = response.document_change {
            if change.target_ids.contains(&self.target_id) {
                self.documents
                    .insert(change.document.name.clone(), change.document);
                self.changed = true;
            } else if change.removed_target_ids.contains(&self.target_id) {
                self.remove(&change.document.name);
            }
        }

        if let Some(delete) = response.document_delete {
            self.remove(&delete.document);
        }

        if let Some(remove) = response.document_remove {
            self.remove(&remove.document);
        }

        if let Some(filter) = response.filter {
            if filter.target_id == self.target_id && filter.count as usize != self.documents.len() {
                tracing::warn!(
                    expected = filter.count,
                    actual = self.documents.len(),
                    "Listen existence filter mismatch"
                );
            }
        }

        let Some(change) = response.target_change else {
            return Ok(None);
        };

        match change.target_change_type {
            TargetChangeType::NoChange => {
                if change.target_ids.is_empty()
                    && self.current
                    && (self.changed || !self.delivered)
                {
                    self.changed = false;
                    self.delivered = true;
                    return Ok(Some(self.documents.values().cloned().collect()));
                }
            }
            TargetChangeType::Add => {}
            TargetChangeType::Current => {
                if self.concerns(&change) {
                    self.current = true;
                }
            }
            TargetChangeType::Reset => {
                if self.concerns(&change) {
                    self.documents.clear();
                    self.current = false;
                    self.changed = true;
                }
            }
            TargetChangeType::Remove => {
                if self.concerns(&change) {
                    let reason = change
                        .cause
                        .and_then(|status| status.message)
                        .unwrap_or_else(|| "target removed by server".to_string());
                    return Err(FirestoreError::ApiError(format!(
                        "Listen target removed: {}",
                        reason
                    )));
                }
            }
        }

        Ok(None)
    }
}
