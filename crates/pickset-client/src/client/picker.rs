//! Client-side coalescing in front of a [`Transport`].
//!
//! A UI issues calls far faster than they are worth sending: one page read per
//! keystroke, one add per paste, one save per drag step. [`PickerClient`]
//! absorbs those bursts before they reach the network:
//!
//! - page reads are keyed by `"{scope}:page:{n}"`, so re-reading the same page
//!   while the filter text changes only sends the latest filter;
//! - added tokens from every caller of a window go out as one request, and
//!   each caller gets back only the outcome of its own tokens;
//! - selection saves are last-write-wins, one request per window.

use super::{
    config::ClientConfig,
    error::{ClientError, Result},
    http::HttpTransport,
    transport::Transport,
};
use core::future::Future;
use futures::future::try_join_all;
use pickset::{
    AccumulatingSetQueue, DispatchError, Keyed, KeyedDispatch, KeyedLatestQueue, PayloadDispatch,
    Rejected, SetDispatch, SetOutcome, SinglePayloadQueue,
};
use pickset_core::{
    AddOutcome, Candidate, Page, PageQuery, RejectReason, Rejection, Scope, Selection,
};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

/// One page read. Only the latest read per scope and page number survives a
/// window.
struct PageAsk {
    scope: Scope,
    page: usize,
    filter: String,
    key: String,
}

impl Keyed for PageAsk {
    fn key(&self) -> &str {
        &self.key
    }
}

struct PageFetcher<T> {
    transport: Arc<T>,
    page_size: usize,
}

impl<T: Transport> KeyedDispatch<PageAsk> for PageFetcher<T> {
    type Output = Arc<Page>;

    async fn dispatch(
        &self,
        asks: Vec<PageAsk>,
    ) -> core::result::Result<HashMap<String, Arc<Page>>, DispatchError> {
        let fetches = asks.into_iter().map(|ask| {
            let query = PageQuery::new(
                ask.filter,
                ask.page.saturating_mul(self.page_size),
                Some(self.page_size),
            );
            let fetch = self.transport.fetch_page(ask.scope, query);
            async move { Ok::<_, ClientError>((ask.key, Arc::new(fetch.await?))) }
        });
        let pages = try_join_all(fetches).await?;
        Ok(pages.into_iter().collect())
    }
}

struct AddSender<T> {
    transport: Arc<T>,
}

impl<T: Transport> SetDispatch<String> for AddSender<T> {
    type Reason = RejectReason;

    async fn dispatch(
        &self,
        tokens: Vec<String>,
    ) -> core::result::Result<SetOutcome<String, RejectReason>, DispatchError> {
        let outcome = self.transport.add_items(tokens).await?;
        Ok(SetOutcome::new(
            outcome.accepted.iter().map(u64::to_string).collect(),
            outcome
                .rejected
                .into_iter()
                .map(|rejection| Rejected::new(rejection.item, rejection.reason))
                .collect(),
        ))
    }
}

struct SelectionSaver<T> {
    transport: Arc<T>,
}

impl<T: Transport> PayloadDispatch<Vec<u64>> for SelectionSaver<T> {
    type Output = Selection;

    fn validate(&self, ids: &Vec<u64>) -> core::result::Result<(), String> {
        let mut seen = HashSet::with_capacity(ids.len());
        match ids.iter().find(|id| !seen.insert(**id)) {
            Some(id) => Err(format!("item {id} appears more than once")),
            None => Ok(()),
        }
    }

    async fn dispatch(&self, ids: Vec<u64>) -> core::result::Result<Selection, DispatchError> {
        Ok(self.transport.save_selection(ids).await?)
    }
}

/// Picker API client with per-call coalescing.
///
/// Every method admits its call immediately and returns a future for the
/// result, so calls issued back to back join the same batch even before they
/// are awaited. Must be used from within a tokio runtime.
pub struct PickerClient<T: Transport> {
    transport: Arc<T>,
    pages: KeyedLatestQueue<PageAsk, PageFetcher<T>>,
    adds: AccumulatingSetQueue<String, AddSender<T>>,
    saves: SinglePayloadQueue<Vec<u64>, SelectionSaver<T>>,
}

impl<T: Transport> Clone for PickerClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            pages: self.pages.clone(),
            adds: self.adds.clone(),
            saves: self.saves.clone(),
        }
    }
}

impl<T: Transport> PickerClient<T> {
    pub fn new(transport: T, config: &ClientConfig) -> Self {
        let transport = Arc::new(transport);
        Self {
            pages: KeyedLatestQueue::new(
                config.page_window,
                PageFetcher {
                    transport: Arc::clone(&transport),
                    page_size: config.page_size,
                },
            ),
            adds: AccumulatingSetQueue::new(
                config.add_window,
                AddSender {
                    transport: Arc::clone(&transport),
                },
            ),
            saves: SinglePayloadQueue::new(
                config.save_window,
                SelectionSaver {
                    transport: Arc::clone(&transport),
                },
            ),
            transport,
        }
    }

    /// Reads page `page` of `scope` under `filter`.
    ///
    /// If the same page is read again within the window, both calls resolve
    /// with the page for the later filter.
    pub fn page(
        &self,
        scope: Scope,
        page: usize,
        filter: &str,
    ) -> impl Future<Output = Result<Arc<Page>>> + Send + 'static {
        let completion = self.pages.enqueue(PageAsk {
            scope,
            page,
            filter: filter.trim().to_owned(),
            key: format!("{scope}:page:{page}"),
        });
        async move { Ok(completion.await?) }
    }

    /// Adds custom ids from raw user input.
    ///
    /// Tokens are normalised the way the server reports them (`" 007 "`
    /// becomes `"7"`), and the outcome covers exactly this call's tokens.
    pub fn add<I, S>(&self, tokens: I) -> impl Future<Output = Result<AddOutcome>> + Send + 'static
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens = tokens
            .into_iter()
            .map(|token| Candidate::parse(token.as_ref()).to_string())
            .collect();
        let completion = self.adds.enqueue(tokens);
        async move {
            let slice = completion.await?;
            Ok(AddOutcome {
                accepted: slice
                    .accepted
                    .iter()
                    .filter_map(|token| token.parse().ok())
                    .collect(),
                rejected: slice
                    .rejected
                    .into_iter()
                    .map(|rejected| Rejection {
                        item: rejected.item,
                        reason: rejected.reason,
                    })
                    .collect(),
            })
        }
    }

    /// Saves `ids` as the whole ordered selection.
    ///
    /// Saves within one window collapse to the last one; every caller of that
    /// window resolves with what the server stored.
    pub fn save_selection(
        &self,
        ids: Vec<u64>,
    ) -> impl Future<Output = Result<Selection>> + Send + 'static {
        let completion = self.saves.enqueue(ids);
        async move { Ok(completion.await?) }
    }

    /// Reads the whole selection, bypassing the queues.
    pub async fn full_selection(&self) -> Result<Page> {
        self.transport.full_selection().await
    }
}

impl PickerClient<HttpTransport> {
    /// Builds a client talking HTTP to `config.base_url`.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(HttpTransport::new(&config.base_url)?, config))
    }
}
