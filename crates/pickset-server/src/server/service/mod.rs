//! The picker service: one directory store behind three coalescing queues.
//!
//! | queue | window | coalescing |
//! |---|---|---|
//! | pages | `PAGE_WINDOW_MS` | identical page queries share one computation |
//! | adds | `ADD_WINDOW_MS` | candidates of all callers merge into one mutation |
//! | selection | `SAVE_WINDOW_MS` | only the last saved selection is stored |

pub mod dispatch;
pub mod handler;


use crate::server::{config::ServerConfig, store::SharedStore};
use dispatch::{AddDispatcher, PageDispatcher, PageRequest, SelectionDispatcher};
use pickset::{AccumulatingSetQueue, KeyedLatestQueue, SinglePayloadQueue};
use pickset_core::Candidate;

pub type PageQueue = KeyedLatestQueue<PageRequest, PageDispatcher>;
pub type AddQueue = AccumulatingSetQueue<Candidate, AddDispatcher>;
pub type SelectionQueue = SinglePayloadQueue<Vec<u64>, SelectionDispatcher>;

/// Shared handler state. Cloning is cheap; every clone feeds the same queues.
#[derive(Clone)]
pub struct PickerService {
    store: SharedStore,
    pages: PageQueue,
    adds: AddQueue,
    selection: SelectionQueue,
    page_size: usize,
    max_page_size: usize,
}

impl PickerService {
    pub fn new(store: SharedStore, config: &ServerConfig) -> Self {
        Self {
            pages: KeyedLatestQueue::new(config.page_window, PageDispatcher::new(store.clone())),
            adds: AccumulatingSetQueue::new(config.add_window, AddDispatcher::new(store.clone())),
            selection: SinglePayloadQueue::new(
                config.save_window,
                SelectionDispatcher::new(store.clone()),
            ),
            store,
            page_size: config.page_size,
            max_page_size: config.max_page_size,
        }
    }

    /// Requested page length, defaulted and clamped to the configured bounds.
    pub fn page_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.page_size)
            .min(self.max_page_size)
    }
}
