use used_book_marketplace::adapter::driven::{InMemoryEventPublisher, InMemoryMarketplaceStore};
use used_book_marketplace::adapter::driver::rest_api::{
    create_router, AppState, USER_ID_HEADER, USER_ROLE_HEADER,
};
use used_book_marketplace::domain::model::StatusTransitionPolicy;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use serde_json::{json, Value};
use std::sync::Arc;

const BUYER: &str = "1";
const SELLER: &str = "100";

fn server(policy: StatusTransitionPolicy) -> TestServer {
    let store = Arc::new(InMemoryMarketplaceStore::new());
    let state = AppState::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store,
        Arc::new(InMemoryEventPublisher::new()),
        policy,
    );
    TestServer::new(create_router().with_state(state)).unwrap()
}

// 認証ゲートウェイが付与するヘッダーを設定
fn as_user(request: TestRequest, user_id: &str) -> TestRequest {
    request.add_header(
        HeaderName::from_static(USER_ID_HEADER),
        HeaderValue::from_str(user_id).unwrap(),
    )
}

async fn create_listing(server: &TestServer, price: i64, quantity: u32) -> String {
    let book = as_user(server.post("/books"), SELLER)
        .json(&json!({
            "isbn": "978-963-07-1234-5",
            "title": "Egri csillagok",
            "author": "Gárdonyi Géza",
            "categories": ["regény"]
        }))
        .await;
    book.assert_status(StatusCode::CREATED);
    let book_id = book.json::<Value>()["id"].as_str().unwrap().to_string();

    let listing = as_user(server.post("/listings"), SELLER)
        .json(&json!({
            "book_id": book_id,
            "condition": "good",
            "price": price,
            "quantity": quantity
        }))
        .await;
    listing.assert_status(StatusCode::CREATED);
    listing.json::<Value>()["id"].as_str().unwrap().to_string()
}

async fn checkout(server: &TestServer, user_id: &str) -> axum_test::TestResponse {
    as_user(server.post("/orders/checkout"), user_id)
        .json(&json!({ "shipping_address": "1053 Budapest, Kossuth Lajos utca 1." }))
        .await
}

#[tokio::test]
async fn test_health_check() {
    let server = server(StatusTransitionPolicy::Permissive);

    let response = server.get("/health").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "healthy");
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let server = server(StatusTransitionPolicy::Permissive);

    let response = server.get("/cart").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_cart_is_created_lazily() {
    let server = server(StatusTransitionPolicy::Permissive);

    let response = as_user(server.get("/cart"), BUYER).await;

    response.assert_status_ok();
    let cart = response.json::<Value>();
    assert_eq!(cart["user_id"], 1);
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_checkout_flow_over_http() {
    let server = server(StatusTransitionPolicy::Permissive);
    let listing_id = create_listing(&server, 1000, 2).await;

    let cart = as_user(server.post("/cart/items"), BUYER)
        .json(&json!({ "listing_id": listing_id, "quantity": 2 }))
        .await;
    cart.assert_status_ok();
    assert_eq!(cart.json::<Value>()["totals"][0]["amount"], "2000");

    let response = checkout(&server, BUYER).await;

    response.assert_status(StatusCode::CREATED);
    let receipt = response.json::<Value>();
    assert_eq!(receipt["total_orders"], 1);
    let order_id = receipt["order_ids"][0].as_str().unwrap().to_string();

    let order = as_user(server.get(&format!("/orders/{}", order_id)), BUYER).await;
    order.assert_status_ok();
    let order = order.json::<Value>();
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_amount"]["amount"], "2000");
    assert_eq!(order["items"][0]["price_at_purchase"]["amount"], "1000");

    let listing = server.get(&format!("/listings/{}", listing_id)).await;
    let listing = listing.json::<Value>();
    assert_eq!(listing["quantity"], 0);
    assert_eq!(listing["is_available"], false);

    let cart = as_user(server.get("/cart"), BUYER).await.json::<Value>();
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);

    // 販売者の販売一覧にも現れる
    let sales = as_user(server.get("/orders/sales"), SELLER).await.json::<Value>();
    assert_eq!(sales.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_checkout_empty_cart_returns_bad_request() {
    let server = server(StatusTransitionPolicy::Permissive);

    let response = checkout(&server, BUYER).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "EMPTY_CART");
}

#[tokio::test]
async fn test_add_more_than_stock_returns_insufficient_stock() {
    let server = server(StatusTransitionPolicy::Permissive);
    let listing_id = create_listing(&server, 1000, 1).await;

    let response = as_user(server.post("/cart/items"), BUYER)
        .json(&json!({ "listing_id": listing_id, "quantity": 2 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INSUFFICIENT_STOCK");
}

#[tokio::test]
async fn test_order_status_update_rules() {
    let server = server(StatusTransitionPolicy::Permissive);
    let listing_id = create_listing(&server, 1000, 3).await;
    as_user(server.post("/cart/items"), BUYER)
        .json(&json!({ "listing_id": listing_id, "quantity": 1 }))
        .await
        .assert_status_ok();
    let order_id = checkout(&server, BUYER).await.json::<Value>()["order_ids"][0]
        .as_str()
        .unwrap()
        .to_string();
    let path = format!("/orders/{}/status", order_id);

    // 不明なステータス
    let invalid = as_user(server.put(&path), SELLER)
        .json(&json!({ "status": "lost" }))
        .await;
    invalid.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(invalid.json::<Value>()["code"], "INVALID_STATUS");

    // 購入者はステータスを変更できない
    let forbidden = as_user(server.put(&path), BUYER)
        .json(&json!({ "status": "paid" }))
        .await;
    forbidden.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(forbidden.json::<Value>()["code"], "FORBIDDEN");

    let shipped = as_user(server.put(&path), SELLER)
        .json(&json!({ "status": "shipped" }))
        .await;
    shipped.assert_status_ok();
    assert_eq!(shipped.json::<Value>()["status"], "shipped");

    // 発送済みの注文はキャンセルできない
    let cancel = as_user(server.delete(&format!("/orders/{}", order_id)), BUYER).await;
    cancel.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(cancel.json::<Value>()["code"], "INVALID_STATE_TRANSITION");
}

#[tokio::test]
async fn test_strict_policy_over_http() {
    let server = server(StatusTransitionPolicy::Strict);
    let listing_id = create_listing(&server, 1000, 3).await;
    as_user(server.post("/cart/items"), BUYER)
        .json(&json!({ "listing_id": listing_id, "quantity": 1 }))
        .await
        .assert_status_ok();
    let order_id = checkout(&server, BUYER).await.json::<Value>()["order_ids"][0]
        .as_str()
        .unwrap()
        .to_string();

    let response = as_user(server.put(&format!("/orders/{}/status", order_id)), SELLER)
        .json(&json!({ "status": "delivered" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_STATE_TRANSITION");
}

#[tokio::test]
async fn test_cancel_restocks_listing() {
    let server = server(StatusTransitionPolicy::Permissive);
    let listing_id = create_listing(&server, 1000, 2).await;
    as_user(server.post("/cart/items"), BUYER)
        .json(&json!({ "listing_id": listing_id, "quantity": 2 }))
        .await
        .assert_status_ok();
    let order_id = checkout(&server, BUYER).await.json::<Value>()["order_ids"][0]
        .as_str()
        .unwrap()
        .to_string();

    let response = as_user(server.delete(&format!("/orders/{}", order_id)), BUYER).await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "cancelled");
    let listing = server
        .get(&format!("/listings/{}", listing_id))
        .await
        .json::<Value>();
    assert_eq!(listing["quantity"], 2);
    assert_eq!(listing["is_available"], true);
}

#[tokio::test]
async fn test_listing_management_permissions() {
    let server = server(StatusTransitionPolicy::Permissive);
    let listing_id = create_listing(&server, 1000, 2).await;
    let path = format!("/listings/{}", listing_id);

    // 他のユーザーは更新できない
    let forbidden = as_user(server.put(&path), BUYER)
        .json(&json!({ "quantity": 5 }))
        .await;
    forbidden.assert_status(StatusCode::FORBIDDEN);

    // 管理者は更新できる
    let by_admin = as_user(server.put(&path), "999")
        .add_header(
            HeaderName::from_static(USER_ROLE_HEADER),
            HeaderValue::from_static("admin"),
        )
        .json(&json!({ "quantity": 5 }))
        .await;
    by_admin.assert_status_ok();
    assert_eq!(by_admin.json::<Value>()["quantity"], 5);

    // カートから参照されている出品は削除できない
    as_user(server.post("/cart/items"), BUYER)
        .json(&json!({ "listing_id": listing_id, "quantity": 1 }))
        .await
        .assert_status_ok();
    let in_use = as_user(server.delete(&path), SELLER).await;
    in_use.assert_status(StatusCode::CONFLICT);
    assert_eq!(in_use.json::<Value>()["code"], "LISTING_IN_USE");

    let mine = as_user(server.get("/listings/mine"), SELLER)
        .await
        .json::<Value>();
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_order_returns_not_found() {
    let server = server(StatusTransitionPolicy::Permissive);

    let response = as_user(
        server.get("/orders/00000000-0000-0000-0000-000000000000"),
        BUYER,
    )
    .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_path_returns_json_error() {
    let server = server(StatusTransitionPolicy::Permissive);

    let response = as_user(server.get("/orders/not-a-uuid"), BUYER).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_PATH");
}

#[tokio::test]
async fn test_malformed_body_returns_json_error() {
    let server = server(StatusTransitionPolicy::Permissive);

    // listing_idがない
    let response = as_user(server.post("/cart/items"), BUYER)
        .json(&json!({ "quantity": 1 }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "INVALID_BODY");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_create_listing_without_quantity_defaults_to_one() {
    let server = server(StatusTransitionPolicy::Permissive);
    let book = as_user(server.post("/books"), SELLER)
        .json(&json!({
            "isbn": "978-963-07-9999-1",
            "title": "Az ember tragédiája",
            "author": "Madách Imre"
        }))
        .await
        .json::<Value>();

    let response = as_user(server.post("/listings"), SELLER)
        .json(&json!({
            "book_id": book["id"],
            "condition": "fair",
            "price": 900
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["quantity"], 1);
}
