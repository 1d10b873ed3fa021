//! Sale handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use till_core::{Sale, SaleLineItem, SaleReceipt, SaleRequest};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// A committed sale with its lines in original order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleLineItem>,
}

// ---------------------------------------------------------------------------
// POST /sales
// ---------------------------------------------------------------------------

pub async fn commit_sale(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<SaleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SaleReceipt>)> {
    let Json(request) = payload?;
    let receipt = st.db.sales().commit_sale(&request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

// ---------------------------------------------------------------------------
// GET /sales/{id}
// ---------------------------------------------------------------------------

pub async fn get_sale(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleDetail>> {
    let sales = st.db.sales();
    let sale = sales
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", &id))?;
    let items = sales.get_line_items(&sale.id).await?;

    Ok(Json(SaleDetail { sale, items }))
}
