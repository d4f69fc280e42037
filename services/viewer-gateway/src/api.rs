//! REST endpoints over the tracker handle

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use adsb_viewer::error::{FilterError, ServiceStopped};
use adsb_viewer::filter::Filter;
use adsb_viewer::geo::BoundingBox;
use adsb_viewer::metadata::AircraftRecord;
use adsb_viewer::registry::sort::SortColumn;
use adsb_viewer::snapshot::Address;

use crate::AppState;

pub enum ApiError {
    Stopped,
    NotFound(String),
    BadRequest(String),
}

impl From<ServiceStopped> for ApiError {
    fn from(_: ServiceStopped) -> Self {
        ApiError::Stopped
    }
}

impl From<FilterError> for ApiError {
    fn from(e: FilterError) -> Self {
        match e {
            FilterError::NoSuchFilter(_) => ApiError::NotFound(e.to_string()),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Stopped => (
                StatusCode::SERVICE_UNAVAILABLE,
                "tracker is not running".to_string(),
            ),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn parse_address(hex: &str) -> ApiResult<Address> {
    hex.parse::<Address>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

fn unknown(address: Address) -> ApiError {
    ApiError::NotFound(format!("aircraft {} is not tracked", address))
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Listed aircraft in table order
pub async fn get_aircraft(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.table().await?))
}

pub async fn get_aircraft_detail(
    State(state): State<Arc<AppState>>,
    Path(hex): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let address = parse_address(&hex)?;
    let aircraft = state
        .tracker
        .aircraft(address)
        .await?
        .ok_or_else(|| unknown(address))?;
    Ok(Json(aircraft))
}

/// Trail segments of one aircraft
pub async fn get_aircraft_track(
    State(state): State<Arc<AppState>>,
    Path(hex): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let address = parse_address(&hex)?;
    let track = state
        .tracker
        .track(address)
        .await?
        .ok_or_else(|| unknown(address))?;
    Ok(Json(track))
}

/// Manual registration/type edit, persisted in the metadata overrides
pub async fn put_aircraft_metadata(
    State(state): State<Arc<AppState>>,
    Path(hex): Path<String>,
    Json(record): Json<AircraftRecord>,
) -> ApiResult<impl IntoResponse> {
    let address = parse_address(&hex)?;
    if !state.tracker.edit_metadata(address, record).await? {
        return Err(unknown(address));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn post_sort(
    State(state): State<Arc<AppState>>,
    Path(column): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let column: SortColumn = column.parse().map_err(ApiError::BadRequest)?;
    let (column, ascending) = state.tracker.sort_by(column).await?;
    Ok(Json(json!({ "column": column, "ascending": ascending })))
}

pub async fn get_filters(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.filters().await?))
}

pub async fn post_filter(
    State(state): State<Arc<AppState>>,
    Json(filter): Json<Filter>,
) -> ApiResult<impl IntoResponse> {
    let index = state.tracker.add_filter(filter).await??;
    Ok((StatusCode::CREATED, Json(json!({ "index": index }))))
}

pub async fn put_filter(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
    Json(filter): Json<Filter>,
) -> ApiResult<impl IntoResponse> {
    state.tracker.replace_filter(index, filter).await??;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_filter(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> ApiResult<impl IntoResponse> {
    let removed = state.tracker.remove_filter(index).await??;
    Ok(Json(removed))
}

#[derive(Deserialize)]
pub struct Toggle {
    pub on: bool,
}

pub async fn post_highlight(
    State(state): State<Arc<AppState>>,
    Json(toggle): Json<Toggle>,
) -> ApiResult<impl IntoResponse> {
    state.tracker.set_highlight(toggle.on).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Single click on a marker or row
pub async fn post_select(
    State(state): State<Arc<AppState>>,
    Path(hex): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let address = parse_address(&hex)?;
    if !state.tracker.click(Some(address)).await? {
        return Err(unknown(address));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Click on empty map
pub async fn delete_select(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    state.tracker.click(None).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Double click: select and follow
pub async fn post_follow(
    State(state): State<Arc<AppState>>,
    Path(hex): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let address = parse_address(&hex)?;
    if !state.tracker.double_click(address).await? {
        return Err(unknown(address));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn post_select_all(
    State(state): State<Arc<AppState>>,
    Json(toggle): Json<Toggle>,
) -> ApiResult<impl IntoResponse> {
    state.tracker.select_all(toggle.on).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ViewportRequest {
    #[serde(default)]
    pub bounds: Option<BoundingBox>,
    #[serde(default)]
    pub only_in_view: Option<bool>,
}

pub async fn put_viewport(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ViewportRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .tracker
        .set_viewport(request.bounds, request.only_in_view)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Fetch health, receiver info, metadata notice and selection state
pub async fn get_status(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tracker.status().await?))
}
