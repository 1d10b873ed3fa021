//! Inventory handlers: the stock ledger over HTTP.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use till_core::{InventoryItem, NewInventoryItem, StockAdjustment, StockHistoryEntry};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// POST /inventory
// ---------------------------------------------------------------------------

pub async fn create_item(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<NewInventoryItem>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<InventoryItem>)> {
    let Json(item) = payload?;
    let created = st.db.inventory().create_item(&item).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

// ---------------------------------------------------------------------------
// GET /inventory/reorder
// ---------------------------------------------------------------------------

pub async fn reorder_list(State(st): State<Arc<AppState>>) -> ApiResult<Json<Vec<InventoryItem>>> {
    Ok(Json(st.db.inventory().list_below_reorder_point().await?))
}

// ---------------------------------------------------------------------------
// GET /inventory/{id}, DELETE /inventory/{id}
// ---------------------------------------------------------------------------

pub async fn get_item(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<InventoryItem>> {
    st.db
        .inventory()
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("InventoryItem", &id))
}

pub async fn deactivate_item(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    st.db.inventory().deactivate(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// PATCH /inventory/{id}/stock
// ---------------------------------------------------------------------------

/// Sets the absolute stock level. `{"newQuantity": 12, "reason": "recount"}`.
pub async fn adjust_stock(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<StockAdjustment>, JsonRejection>,
) -> ApiResult<Json<InventoryItem>> {
    let Json(adjustment) = payload?;
    debug!(item_id = %id, new_quantity = adjustment.new_quantity, "PATCH stock");

    let item = st
        .db
        .inventory()
        .adjust_stock(&id, adjustment.new_quantity, &adjustment.reason)
        .await?;
    Ok(Json(item))
}

// ---------------------------------------------------------------------------
// GET /inventory/{id}/history
// ---------------------------------------------------------------------------

pub async fn stock_history(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<StockHistoryEntry>>> {
    Ok(Json(st.db.inventory().stock_history(&id).await?))
}

// ---------------------------------------------------------------------------
// PUT /inventory/{id}/image, GET /inventory/{id}/image
// ---------------------------------------------------------------------------

pub async fn put_image(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    st.db.inventory().set_image(&id, &body, content_type).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_image(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let image = st
        .db
        .inventory()
        .get_image(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("ItemImage", &id))?;

    Ok(([(header::CONTENT_TYPE, image.content_type)], image.data))
}
