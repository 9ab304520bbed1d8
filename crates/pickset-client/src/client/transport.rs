use super::error::Result;
use core::future::Future;
use pickset_core::{AddOutcome, Page, PageQuery, Scope, Selection};

/// The calls a [`PickerClient`](crate::PickerClient) makes to the server.
///
/// [`HttpTransport`](crate::HttpTransport) is the production implementation;
/// tests substitute an in-memory one.
pub trait Transport: Send + Sync + 'static {
    fn fetch_page(
        &self,
        scope: Scope,
        query: PageQuery,
    ) -> impl Future<Output = Result<Page>> + Send;

    fn add_items(&self, ids: Vec<String>) -> impl Future<Output = Result<AddOutcome>> + Send;

    fn full_selection(&self) -> impl Future<Output = Result<Page>> + Send;

    fn save_selection(&self, ids: Vec<u64>) -> impl Future<Output = Result<Selection>> + Send;
}
