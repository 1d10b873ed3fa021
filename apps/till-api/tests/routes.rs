//! In-process tests for the Till HTTP routes.
//!
//! The router is built over an in-memory database and driven with
//! `tower::ServiceExt::oneshot`; no socket is bound.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use till_api::{build_router, AppState};
use till_db::{Database, DbConfig, StockPolicy};
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn make_router() -> axum::Router {
    make_router_with(DbConfig::in_memory()).await
}

async fn make_router_with(config: DbConfig) -> axum::Router {
    let db = Database::new(config).await.unwrap();
    build_router(Arc::new(AppState::new(db)))
}

async fn call(router: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let bytes = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn send_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn send_raw(method: &str, uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn create_item(router: &axum::Router, sku: &str, stock: i64) -> String {
    let (status, json) = call(
        router,
        send_json(
            "POST",
            "/inventory",
            json!({
                "sku": sku,
                "name": format!("Item {sku}"),
                "category": "Grocery",
                "brand": "House",
                "priceCents": 250,
                "stockQuantity": stock,
                "reorderPoint": 2
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["id"].as_str().unwrap().to_string()
}

async fn create_member(router: &axum::Router, name: &str) -> Value {
    let (status, json) = call(
        router,
        send_json(
            "POST",
            "/members",
            json!({
                "name": name,
                "email": format!("{}@example.com", name.to_lowercase()),
                "phone": "0812345678",
                "tier": "Silver"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_ok() {
    let router = make_router().await;
    let (status, json) = call(&router, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "till-api");
}

// ---------------------------------------------------------------------------
// PATCH /inventory/{id}/stock
// ---------------------------------------------------------------------------

#[tokio::test]
async fn adjust_stock_returns_updated_item_and_history() {
    let router = make_router().await;
    let id = create_item(&router, "RICE-5KG", 10).await;

    let (status, json) = call(
        &router,
        send_json(
            "PATCH",
            &format!("/inventory/{id}/stock"),
            json!({"newQuantity": 4, "reason": "damaged"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stockQuantity"], 4);
    assert_eq!(json["sku"], "RICE-5KG");

    let (status, json) = call(&router, get(&format!("/inventory/{id}/history"))).await;
    assert_eq!(status, StatusCode::OK);
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1]["oldQuantity"], 10);
    assert_eq!(entries[1]["newQuantity"], 4);
}

#[tokio::test]
async fn adjust_stock_rejects_negative_and_fractional_quantities() {
    let router = make_router().await;
    let id = create_item(&router, "OIL-1L", 3).await;
    let uri = format!("/inventory/{id}/stock");

    let (status, json) = call(
        &router,
        send_json("PATCH", &uri, json!({"newQuantity": -1, "reason": "typo"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let fractional = Request::builder()
        .method("PATCH")
        .uri(&uri)
        .header("content-type", "application/json")
        .body(Body::from(r#"{"newQuantity": 2.5, "reason": "count"}"#))
        .unwrap();
    let (status, json) = call(&router, fractional).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let (_, json) = call(&router, get(&format!("/inventory/{id}"))).await;
    assert_eq!(json["stockQuantity"], 3);
}

#[tokio::test]
async fn adjust_stock_on_unknown_item_is_404() {
    let router = make_router().await;

    let (status, json) = call(
        &router,
        send_json(
            "PATCH",
            "/inventory/no-such-item/stock",
            json!({"newQuantity": 1, "reason": "recount"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn duplicate_sku_is_409() {
    let router = make_router().await;
    create_item(&router, "DUP-1", 1).await;

    let (status, json) = call(
        &router,
        send_json(
            "POST",
            "/inventory",
            json!({"sku": "DUP-1", "name": "Again", "category": "X", "brand": "Y", "priceCents": 1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn image_upload_and_download() {
    let router = make_router().await;
    let id = create_item(&router, "IMG-1", 1).await;
    let uri = format!("/inventory/{id}/image");

    let put = Request::builder()
        .method("PUT")
        .uri(&uri)
        .header("content-type", "image/png")
        .body(Body::from(vec![0x89u8, b'P', b'N', b'G']))
        .unwrap();
    let resp = router.clone().oneshot(put).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = router.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "image/png");
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], &[0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn reorder_list_and_deactivate() {
    let router = make_router().await;
    let low = create_item(&router, "LOW-1", 1).await;
    create_item(&router, "HIGH-1", 40).await;

    let (status, json) = call(&router, get("/inventory/reorder")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["id"], low.as_str());

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/inventory/{low}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = call(&router, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, json) = call(&router, get(&format!("/inventory/{low}"))).await;
    assert_eq!(json["isActive"], false);
}

// ---------------------------------------------------------------------------
// POST /sales
// ---------------------------------------------------------------------------

#[tokio::test]
async fn commit_sale_with_member_points() {
    let router = make_router().await;
    let item = create_item(&router, "MILK-1", 10).await;
    let member = create_member(&router, "Ann").await;
    let member_id = member["memberId"].as_str().unwrap().to_string();
    assert_eq!(member_id, "M001");

    let (status, _) = call(
        &router,
        send_json(
            "PATCH",
            &format!("/members/{member_id}/points"),
            json!({"points": 100}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let sale = json!({
        "transactionId": "TX-1",
        "memberId": member_id,
        "paymentMethod": "cash",
        "items": [{"itemId": item, "quantity": 4, "pricePerUnitCents": 250}],
        "subtotalCents": 1000,
        "totalCents": 1000,
        "memberDetails": {"pointsEarned": 10, "newTotalPoints": 110}
    });
    let (status, json) = call(&router, send_json("POST", "/sales", sale.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["transactionId"], "TX-1");
    let sale_id = json["saleId"].as_str().unwrap().to_string();

    let (status, json) = call(&router, get(&format!("/sales/{sale_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalCents"], 1000);
    assert_eq!(json["items"].as_array().unwrap().len(), 1);

    let (_, json) = call(&router, get(&format!("/members/{member_id}"))).await;
    assert_eq!(json["pointsBalance"], 110);
    assert_eq!(json["totalSpentCents"], 1000);

    let (_, json) = call(&router, get(&format!("/members/{member_id}/points-history"))).await;
    assert_eq!(json[0]["balanceAfter"], 110);

    // Same transaction again.
    let (status, json) = call(&router, send_json("POST", "/sales", sale)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn sale_with_unknown_item_is_404() {
    let router = make_router().await;
    let item = create_item(&router, "BREAD-1", 10).await;

    let sale = json!({
        "transactionId": "TX-9",
        "paymentMethod": "card",
        "items": [
            {"itemId": item, "quantity": 1, "pricePerUnitCents": 100},
            {"itemId": item, "quantity": 1, "pricePerUnitCents": 100},
            {"itemId": "ghost", "quantity": 1, "pricePerUnitCents": 100}
        ],
        "subtotalCents": 300,
        "totalCents": 300
    });
    let (status, json) = call(&router, send_json("POST", "/sales", sale)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert!(json["message"].as_str().unwrap().contains("ghost"));
}

#[tokio::test]
async fn sale_short_of_stock_is_rolled_back() {
    let router =
        make_router_with(DbConfig::in_memory().stock_policy(StockPolicy::DecrementInSale)).await;
    let item = create_item(&router, "SUGAR-1", 1).await;

    let sale = json!({
        "transactionId": "TX-10",
        "paymentMethod": "cash",
        "items": [{"itemId": item, "quantity": 2, "pricePerUnitCents": 100}],
        "subtotalCents": 200,
        "totalCents": 200
    });
    let (status, json) = call(&router, send_json("POST", "/sales", sale)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "ROLLED_BACK");
    assert!(json["message"].as_str().unwrap().contains("SUGAR-1"));

    let (_, json) = call(&router, get(&format!("/inventory/{item}"))).await;
    assert_eq!(json["stockQuantity"], 1);
}

#[tokio::test]
async fn sale_total_overflow_is_400() {
    let router = make_router().await;
    let item = create_item(&router, "SALT-1", 10).await;

    let (status, json) = call(
        &router,
        send_json(
            "POST",
            "/sales",
            json!({
                "transactionId": "TX-11",
                "paymentMethod": "cash",
                "items": [{"itemId": item, "quantity": 1, "pricePerUnitCents": 100}],
                "subtotalCents": i64::MAX,
                "taxCents": 1,
                "totalCents": i64::MAX
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn sale_validation_and_unknown_member() {
    let router = make_router().await;
    let item = create_item(&router, "TEA-1", 10).await;

    let (status, json) = call(
        &router,
        send_json(
            "POST",
            "/sales",
            json!({
                "transactionId": "TX-2",
                "paymentMethod": "e_wallet",
                "items": [{"itemId": item, "quantity": 1, "pricePerUnitCents": 100}],
                "subtotalCents": 100,
                "totalCents": 999
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let (status, _) = call(
        &router,
        send_json(
            "POST",
            "/sales",
            json!({
                "transactionId": "TX-3",
                "memberId": "M404",
                "paymentMethod": "card",
                "items": [{"itemId": item, "quantity": 1, "pricePerUnitCents": 100}],
                "subtotalCents": 100,
                "totalCents": 100
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = call(&router, send_raw("POST", "/sales", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

#[tokio::test]
async fn members_get_sequential_ids() {
    let router = make_router().await;

    let (_, json) = call(&router, get("/members/next-id")).await;
    assert_eq!(json["memberId"], "M001");

    create_member(&router, "Ann").await;
    let second = create_member(&router, "Bob").await;
    assert_eq!(second["memberId"], "M002");
    assert_eq!(second["pointsBalance"], 0);
    assert_eq!(second["tier"], "Silver");
}

#[tokio::test]
async fn member_validation_errors() {
    let router = make_router().await;

    let (status, json) = call(
        &router,
        send_json(
            "POST",
            "/members",
            json!({"name": "Ann", "email": "ann@example.com", "phone": "0812345678"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let (status, _) = call(
        &router,
        send_json(
            "POST",
            "/members",
            json!({"name": "Ann", "email": "ann@example.com", "phone": "0812345678", "tier": "Diamond"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_points_responses() {
    let router = make_router().await;
    let member = create_member(&router, "Cat").await;
    let member_id = member["memberId"].as_str().unwrap().to_string();

    let (status, json) = call(
        &router,
        send_json(
            "PATCH",
            &format!("/members/{member_id}/points"),
            json!({"points": 42}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"success": true}));

    let (status, _) = call(
        &router,
        send_json(
            "PATCH",
            &format!("/members/{member_id}/points"),
            json!({"points": -5}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &router,
        send_json("PATCH", "/members/M404/points", json!({"points": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn change_tier_and_list_tiers() {
    let router = make_router().await;
    let member = create_member(&router, "Dee").await;
    let member_id = member["memberId"].as_str().unwrap().to_string();

    let (status, json) = call(
        &router,
        send_json(
            "PATCH",
            &format!("/members/{member_id}/tier"),
            json!({"tier": "Platinum"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["tier"], "Platinum");

    let (status, json) = call(&router, get("/tiers")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 4);
    assert_eq!(json[0]["name"], "Bronze");
}
