//! axum handlers for the picker API.
//!
//! Reads and writes of the directory go through the coalescing queues; the
//! handlers only decode requests, enqueue them, and shape the per-caller
//! result. Reading the full selection is a plain read under the store lock
//! since there is nothing to coalesce.

use super::{PickerService, dispatch::PageRequest};
use crate::server::{
    error::{ApiError, Result},
    telemetry::increment_http_requests,
};
use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    routing::get,
};
use pickset_core::{
    AddItems, AddOutcome, Candidate, Page, Rejection, Scope, Selection, SelectionUpdate,
};
use serde::Deserialize;
use std::path::Path;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// Query string of `GET /api/items`.
#[derive(Debug, Default, Deserialize)]
pub struct ItemsParams {
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub filter: String,
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

/// Builds the application router.
///
/// When `static_dir` is given, every path outside the API is served from it.
pub fn router(service: PickerService, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/api/items", get(list_items).post(add_items))
        .route("/api/selection", get(full_selection).put(save_selection))
        .with_state(service);

    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(TraceLayer::new_for_http()).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

async fn health() -> &'static str {
    "ok"
}

async fn list_items(
    State(service): State<PickerService>,
    params: core::result::Result<Query<ItemsParams>, QueryRejection>,
) -> Result<Json<Page>> {
    increment_http_requests("list_items");
    let Query(params) = params.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let limit = service.page_limit(params.limit);
    let request = PageRequest::new(params.scope, &params.filter, params.offset, limit);
    let page = service.pages.enqueue(request).await?;
    Ok(Json(Page::clone(&page)))
}

async fn add_items(
    State(service): State<PickerService>,
    body: core::result::Result<Json<AddItems>, JsonRejection>,
) -> Result<Json<AddOutcome>> {
    increment_http_requests("add_items");
    let Json(body) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let candidates = body.ids.iter().map(|raw| Candidate::parse(raw)).collect();
    let slice = service.adds.enqueue(candidates).await?;
    Ok(Json(AddOutcome {
        accepted: slice.accepted.iter().filter_map(Candidate::id).collect(),
        rejected: slice
            .rejected
            .into_iter()
            .map(|rejected| Rejection {
                item: rejected.item.to_string(),
                reason: rejected.reason,
            })
            .collect(),
    }))
}

async fn full_selection(State(service): State<PickerService>) -> Json<Page> {
    increment_http_requests("full_selection");
    Json(service.store.read().full_selection())
}

async fn save_selection(
    State(service): State<PickerService>,
    body: core::result::Result<Json<SelectionUpdate>, JsonRejection>,
) -> Result<Json<Selection>> {
    increment_http_requests("save_selection");
    let Json(body) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let selection = service.selection.enqueue(body.ids).await?;
    Ok(Json(selection))
}
