//! Paste HTTP handlers.
//!
//! Store calls block, so every handler hops onto the blocking pool before
//! touching the service.

use super::normalize::{normalize_optional, session_token};
use crate::{error::HttpError, AppError, AppState};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use pastebin_core::constants::DEFAULT_RECENT_LIMIT;
use pastebin_core::models::paste::{
    CreatePasteRequest, ListQuery, NewPaste, Paste, PasteSummary, SearchQuery, SearchResults,
};
use pastebin_core::search::Pagination;
use pastebin_core::views::ViewOutcome;
use serde::Serialize;
use serde_json::{json, Value};

/// Created paste plus the path a browser should open.
#[derive(Debug, Serialize)]
pub struct CreatedPaste {
    #[serde(flatten)]
    pub paste: Paste,
    pub url: String,
}

/// Newest pastes for the landing page.
#[derive(Debug, Serialize)]
pub struct RecentPastes {
    pub pastes: Vec<PasteSummary>,
}

async fn blocking<T, F>(work: F) -> Result<T, HttpError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result.map_err(HttpError::from),
        Err(err) => Err(AppError::StorageUnavailable(format!(
            "blocking task failed: {}",
            err
        ))
        .into()),
    }
}

/// Create a new paste.
///
/// # Returns
/// `201 Created` with the stored paste and its page url.
///
/// # Errors
/// Returns an error if validation or persistence fails.
pub async fn create_paste(
    State(state): State<AppState>,
    Json(req): Json<CreatePasteRequest>,
) -> Result<(StatusCode, Json<CreatedPaste>), HttpError> {
    let mut new_paste = NewPaste::from(req);
    new_paste.title = normalize_optional(new_paste.title);

    let pastebin = state.pastebin.clone();
    let paste = blocking(move || pastebin.create_paste(new_paste)).await?;
    let url = format!("/paste/{}", paste.short_id);
    Ok((StatusCode::CREATED, Json(CreatedPaste { paste, url })))
}

/// List the newest live pastes without their content.
///
/// # Errors
/// Returns an error if the store cannot be read.
pub async fn list_recent(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<RecentPastes>, HttpError> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    let pastebin = state.pastebin.clone();
    let pastes = blocking(move || pastebin.list_recent(limit)).await?;
    Ok(Json(RecentPastes { pastes }))
}

/// Search live pastes by short id or keyword.
///
/// # Errors
/// `400` for a blank query; store failures otherwise.
pub async fn search_pastes(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResults>, HttpError> {
    let pagination = Pagination::new(query.page, query.per_page);
    let pastebin = state.pastebin.clone();
    let results = blocking(move || pastebin.search_pastes(&query.q, pagination)).await?;
    Ok(Json(results))
}

/// Fetch a paste by short id.
///
/// # Errors
/// `404` when the paste is missing or expired.
pub async fn get_paste(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Paste>, HttpError> {
    let pastebin = state.pastebin.clone();
    let paste = blocking(move || pastebin.get_paste(&id)).await?;
    Ok(Json(paste))
}

/// Serve only the paste body as plain text.
///
/// # Errors
/// `404` when the paste is missing or expired.
pub async fn get_raw(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let pastebin = state.pastebin.clone();
    let content = blocking(move || pastebin.get_raw_content(&id)).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        content,
    ))
}

/// Count a view, once per session when the client sends a session token.
///
/// # Errors
/// `404` when the paste is missing or expired.
pub async fn increment_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, HttpError> {
    let token = session_token(&headers);
    let view_count = blocking(move || match token {
        Some(token) => match state.views.increment_once_per_session(&id, &token)? {
            ViewOutcome::Counted(count) => Ok(count),
            ViewOutcome::AlreadyCounted => Ok(state.pastebin.get_paste(&id)?.view_count),
        },
        None => state.pastebin.increment_view(&id),
    })
    .await?;
    Ok(Json(json!({ "success": true, "view_count": view_count })))
}
