//! Member handlers: identifiers, points and tiers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use till_core::{Member, MembershipTier, NewMember, PointsHistoryEntry, PointsUpdate, TierChange};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextMemberId {
    pub member_id: String,
}

// ---------------------------------------------------------------------------
// POST /members
// ---------------------------------------------------------------------------

pub async fn create_member(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<NewMember>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Member>)> {
    let Json(member) = payload?;
    let created = st.db.members().create_member(&member).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

// ---------------------------------------------------------------------------
// GET /members/next-id
// ---------------------------------------------------------------------------

pub async fn next_member_id(State(st): State<Arc<AppState>>) -> ApiResult<Json<NextMemberId>> {
    let member_id = st.db.members().next_member_id().await?;
    Ok(Json(NextMemberId { member_id }))
}

// ---------------------------------------------------------------------------
// GET /members/{id}
// ---------------------------------------------------------------------------

pub async fn get_member(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Member>> {
    st.db
        .members()
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Member", &id))
}

// ---------------------------------------------------------------------------
// PATCH /members/{id}/points
// ---------------------------------------------------------------------------

pub async fn update_points(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<PointsUpdate>, JsonRejection>,
) -> ApiResult<Json<SuccessResponse>> {
    let Json(update) = payload?;
    st.db.members().update_points(&id, update.points).await?;
    Ok(Json(SuccessResponse { success: true }))
}

// ---------------------------------------------------------------------------
// PATCH /members/{id}/tier
// ---------------------------------------------------------------------------

pub async fn change_tier(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<TierChange>, JsonRejection>,
) -> ApiResult<Json<Member>> {
    let Json(change) = payload?;
    Ok(Json(st.db.members().change_tier(&id, &change.tier).await?))
}

// ---------------------------------------------------------------------------
// GET /members/{id}/points-history
// ---------------------------------------------------------------------------

pub async fn points_history(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<PointsHistoryEntry>>> {
    if st.db.members().get_by_id(&id).await?.is_none() {
        return Err(ApiError::not_found("Member", &id));
    }
    Ok(Json(st.db.sales().points_history(&id).await?))
}

// ---------------------------------------------------------------------------
// GET /tiers
// ---------------------------------------------------------------------------

pub async fn list_tiers(State(st): State<Arc<AppState>>) -> ApiResult<Json<Vec<MembershipTier>>> {
    Ok(Json(st.db.members().list_tiers().await?))
}
