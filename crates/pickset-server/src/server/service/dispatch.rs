//! Store-backed dispatchers for the three server-side queues.
//!
//! Each dispatcher takes the store lock once per batch, so a burst of requests
//! costs one pass over the directory rather than one per request. Lock waits
//! and scans run on the blocking pool, never on a runtime worker.

use crate::server::{
    store::{SharedStore, StoreError},
    telemetry::{increment_dispatch_errors, record_batch},
};
use pickset::{DispatchError, Keyed, KeyedDispatch, PayloadDispatch, SetDispatch, SetOutcome};
use pickset_core::{Candidate, Page, RejectReason, Scope, Selection};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

/// One page read, with the page length already resolved.
///
/// The coalescing key covers every field, so only identical queries share a
/// computation. A page for filter `"12"` is never answered with the page for
/// `"123"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub scope: Scope,
    pub filter: String,
    pub offset: usize,
    pub limit: usize,
    key: String,
}

impl PageRequest {
    pub fn new(scope: Scope, filter: &str, offset: usize, limit: usize) -> Self {
        let filter = filter.trim().to_owned();
        let key = format!("{scope}:{offset}:{limit}:{filter}");
        Self {
            scope,
            filter,
            offset,
            limit,
            key,
        }
    }
}

impl Keyed for PageRequest {
    fn key(&self) -> &str {
        &self.key
    }
}

/// Answers every distinct page query of a batch under one read lock.
///
/// Scanning the base range is CPU bound, so the pass runs on the blocking
/// pool.
pub struct PageDispatcher {
    store: SharedStore,
}

impl PageDispatcher {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

impl KeyedDispatch<PageRequest> for PageDispatcher {
    type Output = Arc<Page>;

    async fn dispatch(
        &self,
        requests: Vec<PageRequest>,
    ) -> Result<HashMap<String, Arc<Page>>, DispatchError> {
        record_batch("pages", requests.len());
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let store = store.read();
            requests
                .into_iter()
                .map(|request| {
                    let page = match request.scope {
                        Scope::Available => {
                            store.query_available(&request.filter, request.offset, request.limit)
                        }
                        Scope::Selected => {
                            store.query_selected(&request.filter, request.offset, request.limit)
                        }
                    };
                    (request.key, Arc::new(page))
                })
                .collect::<HashMap<_, _>>()
        })
        .await
        .map_err(|err| {
            increment_dispatch_errors("pages");
            DispatchError::new(err)
        })
    }
}

/// Classifies the union of every caller's candidates and merges the accepted
/// ids into the overflow set as one mutation.
pub struct AddDispatcher {
    store: SharedStore,
}

impl AddDispatcher {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

impl SetDispatch<Candidate> for AddDispatcher {
    type Reason = RejectReason;

    async fn dispatch(
        &self,
        candidates: Vec<Candidate>,
    ) -> Result<SetOutcome<Candidate, RejectReason>, DispatchError> {
        record_batch("adds", candidates.len());
        let store = Arc::clone(&self.store);
        let outcome = tokio::task::spawn_blocking(move || store.write().add_items(candidates))
            .await
            .map_err(|err| {
                increment_dispatch_errors("adds");
                DispatchError::new(err)
            })?;
        tracing::info!(
            accepted = outcome.accepted.len(),
            rejected = outcome.rejected.len(),
            "Merged added ids"
        );
        Ok(outcome)
    }
}

/// Stores the final selection of a window.
pub struct SelectionDispatcher {
    store: SharedStore,
}

impl SelectionDispatcher {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

impl PayloadDispatch<Vec<u64>> for SelectionDispatcher {
    type Output = Selection;

    fn validate(&self, ids: &Vec<u64>) -> Result<(), String> {
        let mut seen = HashSet::with_capacity(ids.len());
        match ids.iter().find(|id| !seen.insert(**id)) {
            Some(id) => Err(StoreError::DuplicateItem(*id).to_string()),
            None => Ok(()),
        }
    }

    async fn dispatch(&self, ids: Vec<u64>) -> Result<Selection, DispatchError> {
        record_batch("selection", ids.len());
        let store = Arc::clone(&self.store);
        let stored = tokio::task::spawn_blocking(move || store.write().replace_selection(ids))
            .await
            .map_err(|err| {
                increment_dispatch_errors("selection");
                DispatchError::new(err)
            })?
            .map_err(|err| {
                increment_dispatch_errors("selection");
                tracing::warn!(error = %err, "Selection rejected by store");
                DispatchError::new(err)
            })?;
        tracing::info!(len = stored.len(), "Saved selection");
        Ok(Selection { ids: stored })
    }
}
