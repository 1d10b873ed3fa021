//! `GET /health`

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use till_db::migrations::migration_status;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
    pub migrations_embedded: usize,
    pub migrations_applied: usize,
}

pub async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let db_ok = st.db.health_check().await;
    let migrations = migration_status(st.db.pool()).await.ok();
    let (embedded, applied) = migrations.unwrap_or((0, 0));
    let ok = db_ok && migrations.is_some_and(|(e, a)| e == a);

    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            ok,
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            migrations_embedded: embedded,
            migrations_applied: applied,
        }),
    )
}
