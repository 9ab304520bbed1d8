//! In-memory directory of ids.
//!
//! The directory is made of three parts:
//!
//! - the base range `BASE_MIN..=base_max`, never materialised;
//! - the overflow set of custom ids added at runtime, all above `base_max`;
//! - the ordered selection, a subset of base and overflow ids.
//!
//! An id is *available* when it is known and not selected. The store is owned
//! explicitly and shared behind a [`SharedStore`] lock; it never awaits, so a
//! guard is never held across a suspension point.

use parking_lot::RwLock;
use pickset::{Rejected, SetOutcome};
use pickset_core::{BASE_MIN, Candidate, IdFilter, Page, RejectReason};
use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};


pub type SharedStore = Arc<RwLock<DirectoryStore>>;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The id is neither in the base range nor in the overflow set.
    #[error("unknown item {0}")]
    UnknownItem(u64),

    /// The id appears more than once in a selection.
    #[error("item {0} appears more than once")]
    DuplicateItem(u64),
}

#[derive(Debug)]
pub struct DirectoryStore {
    base_max: u64,
    overflow: BTreeSet<u64>,
    selected: Vec<u64>,
    selected_set: HashSet<u64>,
}

impl DirectoryStore {
    pub fn new(base_max: u64) -> Self {
        Self {
            base_max,
            overflow: BTreeSet::new(),
            selected: Vec::new(),
            selected_set: HashSet::new(),
        }
    }

    pub fn shared(base_max: u64) -> SharedStore {
        Arc::new(RwLock::new(Self::new(base_max)))
    }

    pub fn overflow_len(&self) -> usize {
        self.overflow.len()
    }

    pub fn in_base_range(&self, id: u64) -> bool {
        (BASE_MIN..=self.base_max).contains(&id)
    }

    pub fn is_known(&self, id: u64) -> bool {
        self.in_base_range(id) || self.overflow.contains(&id)
    }

    /// Base ids then overflow ids, ascending, minus the selection.
    pub fn query_available(&self, filter: &str, offset: usize, limit: usize) -> Page {
        let base = BASE_MIN..=self.base_max;
        let ids = base
            .chain(self.overflow.iter().copied())
            .filter(|id| !self.selected_set.contains(id));
        paginate(ids, IdFilter::new(filter), offset, limit)
    }

    /// The selection in its stored order.
    pub fn query_selected(&self, filter: &str, offset: usize, limit: usize) -> Page {
        paginate(
            self.selected.iter().copied(),
            IdFilter::new(filter),
            offset,
            limit,
        )
    }

    pub fn full_selection(&self) -> Page {
        Page {
            items: self.selected.clone(),
            total: self.selected.len(),
        }
    }

    /// Classifies every candidate once and merges the accepted ids into the
    /// overflow set in one step.
    ///
    /// Rejections keep input order. Accepted ids come back ascending and
    /// unique; a candidate repeated in the input is classified only the first
    /// time it appears.
    pub fn add_items(&mut self, candidates: Vec<Candidate>) -> SetOutcome<Candidate, RejectReason> {
        let mut seen = HashSet::with_capacity(candidates.len());
        let mut accepted = BTreeSet::new();
        let mut rejected = Vec::new();

        for candidate in candidates {
            if !seen.insert(candidate.clone()) {
                continue;
            }
            let reason = match candidate {
                Candidate::Malformed(_) => Some(RejectReason::InvalidFormat),
                Candidate::Id(id) if self.in_base_range(id) => Some(RejectReason::InBaseRange),
                Candidate::Id(id) if self.overflow.contains(&id) => {
                    Some(RejectReason::AlreadyAdded)
                }
                Candidate::Id(id) => {
                    accepted.insert(id);
                    None
                }
            };
            if let Some(reason) = reason {
                rejected.push(Rejected::new(candidate, reason));
            }
        }

        self.overflow.extend(accepted.iter().copied());
        SetOutcome::new(accepted.into_iter().map(Candidate::Id).collect(), rejected)
    }

    /// Replaces the whole selection.
    ///
    /// Nothing changes unless every id is known and none repeats.
    pub fn replace_selection(&mut self, ids: Vec<u64>) -> Result<Vec<u64>, StoreError> {
        let mut set = HashSet::with_capacity(ids.len());
        for &id in &ids {
            if !self.is_known(id) {
                return Err(StoreError::UnknownItem(id));
            }
            if !set.insert(id) {
                return Err(StoreError::DuplicateItem(id));
            }
        }
        self.selected_set = set;
        self.selected = ids;
        Ok(self.selected.clone())
    }
}

/// Single pass over `ids`: counts every match and keeps those inside the
/// requested window.
fn paginate(
    ids: impl Iterator<Item = u64>,
    filter: IdFilter<'_>,
    offset: usize,
    limit: usize,
) -> Page {
    let end = offset.saturating_add(limit);
    let mut items = Vec::with_capacity(limit.min(1024));
    let mut total = 0;
    for id in ids.filter(|&id| filter.matches(id)) {
        if total >= offset && total < end {
            items.push(id);
        }
        total += 1;
    }
    Page { items, total }
}
