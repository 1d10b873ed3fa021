//! # till-api: HTTP binding for Till
//!
//! Thin JSON layer over the till-db repositories.
//!
//! ## Routes
//! ```text
//! GET    /health                      liveness + migration status
//!
//! POST   /inventory                   create item             (201)
//! GET    /inventory/reorder           items at/below reorder point
//! GET    /inventory/{id}              item
//! DELETE /inventory/{id}              deactivate              (204)
//! PATCH  /inventory/{id}/stock        adjust stock
//! GET    /inventory/{id}/history      stock history
//! PUT    /inventory/{id}/image        store image (raw body)  (204)
//! GET    /inventory/{id}/image        image bytes
//!
//! POST   /sales                       commit sale             (201)
//! GET    /sales/{id}                  sale with its lines
//!
//! POST   /members                     create member           (201)
//! GET    /members/next-id             identifier the next member would get
//! GET    /members/{id}                member
//! PATCH  /members/{id}/points         overwrite points balance
//! PATCH  /members/{id}/tier           change tier
//! GET    /members/{id}/points-history loyalty ledger
//! GET    /tiers                       membership tiers
//! ```
//!
//! `build_router` does not attach middleware, so tests drive the bare router
//! with `tower::ServiceExt::oneshot`.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;

pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::AppState;

/// Build the complete application router wired to the given shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/inventory", post(routes::inventory::create_item))
        .route("/inventory/reorder", get(routes::inventory::reorder_list))
        .route(
            "/inventory/{id}",
            get(routes::inventory::get_item).delete(routes::inventory::deactivate_item),
        )
        .route("/inventory/{id}/stock", patch(routes::inventory::adjust_stock))
        .route("/inventory/{id}/history", get(routes::inventory::stock_history))
        .route(
            "/inventory/{id}/image",
            get(routes::inventory::get_image).put(routes::inventory::put_image),
        )
        .route("/sales", post(routes::sale::commit_sale))
        .route("/sales/{id}", get(routes::sale::get_sale))
        .route("/members", post(routes::member::create_member))
        .route("/members/next-id", get(routes::member::next_member_id))
        .route("/members/{id}", get(routes::member::get_member))
        .route("/members/{id}/points", patch(routes::member::update_points))
        .route("/members/{id}/tier", patch(routes::member::change_tier))
        .route(
            "/members/{id}/points-history",
            get(routes::member::points_history),
        )
        .route("/tiers", get(routes::member::list_tiers))
        .with_state(state)
}
