use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request, State},
    http::{request::Parts, StatusCode},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::adapter::driver::request_dto::{
    AddToCartRequest, CheckoutRequest, CreateListingRequest, RegisterBookRequest,
    UpdateCartItemRequest, UpdateListingRequest, UpdateOrderStatusRequest,
};
use crate::adapter::driver::response_dto::{
    BookResponse, CartResponse, CheckoutResponse, ListingResponse, OrderResponse,
};
use crate::application::service::{
    CartApplicationService, CatalogApplicationService, CheckoutApplicationService,
    CheckoutCommand, ListingApplicationService, OrderApplicationService,
};
use crate::application::ApplicationError;
use crate::domain::error::DomainError;
use crate::domain::model::{
    Actor, BookId, CartItemId, ListingId, OrderId, StatusTransitionPolicy, UserId, UserRole,
};
use crate::domain::port::{
    CartRepository, CatalogRepository, CheckoutStore, EventPublisher, ListingRepository,
    OrderRepository,
};

/// 認証ゲートウェイが設定するユーザーIDヘッダー
pub const USER_ID_HEADER: &str = "x-user-id";
/// 認証ゲートウェイが設定するロールヘッダー（省略時はuser）
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

type ApiErrorResponse = (StatusCode, Json<ApiError>);
type ApiResult<T> = Result<T, ApiErrorResponse>;

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiErrorResponse {
    (
        status,
        Json(ApiError {
            error: error.into(),
            code: code.to_string(),
        }),
    )
}

// アプリケーションサービスを含む状態
#[derive(Clone)]
pub struct AppState {
    pub catalog_service: Arc<CatalogApplicationService>,
    pub listing_service: Arc<ListingApplicationService>,
    pub cart_service: Arc<CartApplicationService>,
    pub checkout_service: Arc<CheckoutApplicationService>,
    pub order_service: Arc<OrderApplicationService>,
}

impl AppState {
    /// ポートの実装からアプリケーションサービスを組み立てる
    pub fn new(
        catalog_repository: Arc<dyn CatalogRepository>,
        listing_repository: Arc<dyn ListingRepository>,
        cart_repository: Arc<dyn CartRepository>,
        order_repository: Arc<dyn OrderRepository>,
        checkout_store: Arc<dyn CheckoutStore>,
        event_publisher: Arc<dyn EventPublisher>,
        status_policy: StatusTransitionPolicy,
    ) -> Self {
        Self {
            catalog_service: Arc::new(CatalogApplicationService::new(catalog_repository.clone())),
            listing_service: Arc::new(ListingApplicationService::new(
                listing_repository.clone(),
                catalog_repository,
            )),
            cart_service: Arc::new(CartApplicationService::new(
                cart_repository.clone(),
                listing_repository.clone(),
            )),
            checkout_service: Arc::new(CheckoutApplicationService::new(
                cart_repository,
                listing_repository,
                order_repository.clone(),
                checkout_store.clone(),
                event_publisher.clone(),
            )),
            order_service: Arc::new(OrderApplicationService::new(
                order_repository,
                checkout_store,
                event_publisher,
                status_policy,
            )),
        }
    }
}

/// 認証済みのユーザー
/// X-User-IdとX-User-Roleヘッダーから取り出す
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiErrorResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let unauthenticated =
            || api_error(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", "認証が必要です");

        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .ok_or_else(unauthenticated)?;

        let role = match parts.headers.get(USER_ROLE_HEADER) {
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|role| UserRole::from_string(role.trim()).ok())
                .ok_or_else(unauthenticated)?,
            None => UserRole::User,
        };

        Ok(Self(Actor::new(UserId::new(user_id), role)))
    }
}

/// JSONボディの抽出器
/// 解析に失敗した場合も`{error, code}`の形で返す
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiErrorResponse;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|rejection| {
                api_error(rejection.status(), "INVALID_BODY", rejection.body_text())
            })
    }
}

/// パスパラメータの抽出器
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiErrorResponse;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| Self(value))
            .map_err(|rejection| {
                api_error(rejection.status(), "INVALID_PATH", rejection.body_text())
            })
    }
}

// REST APIルーターを作成
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/books", post(register_book))
        .route("/books/:book_id", get(get_book))
        .route("/listings", post(create_listing))
        .route("/listings/mine", get(list_my_listings))
        .route(
            "/listings/:listing_id",
            get(get_listing).put(update_listing).delete(delete_listing),
        )
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_to_cart))
        .route(
            "/cart/items/:item_id",
            put(update_cart_item).delete(remove_cart_item),
        )
        .route("/orders/checkout", post(checkout))
        .route("/orders", get(list_orders))
        .route("/orders/purchases", get(list_purchases))
        .route("/orders/sales", get(list_sales))
        .route("/orders/:order_id", get(get_order).delete(cancel_order))
        .route("/orders/:order_id/status", put(update_order_status))
}

// ヘルスチェックエンドポイント
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "used-book-marketplace",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// 書籍登録エンドポイント
async fn register_book(
    State(state): State<AppState>,
    AuthenticatedUser(_actor): AuthenticatedUser,
    ApiJson(request): ApiJson<RegisterBookRequest>,
) -> ApiResult<(StatusCode, Json<BookResponse>)> {
    let book = state
        .catalog_service
        .register_book(request.isbn, request.title, request.author, request.categories)
        .await
        .map_err(map_application_error)?;

    Ok((StatusCode::CREATED, Json(BookResponse::from_book(&book))))
}

// 書籍取得エンドポイント
async fn get_book(
    State(state): State<AppState>,
    ApiPath(book_id): ApiPath<Uuid>,
) -> ApiResult<Json<BookResponse>> {
    let book = state
        .catalog_service
        .get_book(BookId::from_uuid(book_id))
        .await
        .map_err(map_application_error)?;

    Ok(Json(BookResponse::from_book(&book)))
}

// 出品作成エンドポイント
async fn create_listing(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(request): ApiJson<CreateListingRequest>,
) -> ApiResult<(StatusCode, Json<ListingResponse>)> {
    let draft = request.into_draft().map_err(map_domain_error)?;
    let listing = state
        .listing_service
        .create_listing(actor, draft)
        .await
        .map_err(map_application_error)?;

    Ok((StatusCode::CREATED, Json(ListingResponse::from_listing(&listing))))
}

// 自分の出品一覧取得エンドポイント
async fn list_my_listings(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> ApiResult<Json<Vec<ListingResponse>>> {
    let listings = state
        .listing_service
        .list_seller_listings(actor.user_id)
        .await
        .map_err(map_application_error)?;

    Ok(Json(listings.iter().map(ListingResponse::from_listing).collect()))
}

// 出品取得エンドポイント（閲覧数を加算）
async fn get_listing(
    State(state): State<AppState>,
    ApiPath(listing_id): ApiPath<Uuid>,
) -> ApiResult<Json<ListingResponse>> {
    let listing = state
        .listing_service
        .get_listing(ListingId::from_uuid(listing_id))
        .await
        .map_err(map_application_error)?;

    Ok(Json(ListingResponse::from_listing(&listing)))
}

// 出品更新エンドポイント
async fn update_listing(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(listing_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateListingRequest>,
) -> ApiResult<Json<ListingResponse>> {
    let update = request.into_update().map_err(map_domain_error)?;
    let listing = state
        .listing_service
        .update_listing(actor, ListingId::from_uuid(listing_id), update)
        .await
        .map_err(map_application_error)?;

    Ok(Json(ListingResponse::from_listing(&listing)))
}

// 出品削除エンドポイント
async fn delete_listing(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(listing_id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .listing_service
        .delete_listing(actor, ListingId::from_uuid(listing_id))
        .await
        .map_err(map_application_error)?;

    Ok(StatusCode::NO_CONTENT)
}

// カート取得エンドポイント
async fn get_cart(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> ApiResult<Json<CartResponse>> {
    let cart = state
        .cart_service
        .get_cart(actor.user_id)
        .await
        .map_err(map_application_error)?;

    Ok(Json(CartResponse::from_cart(&cart)))
}

// カートを空にするエンドポイント
async fn clear_cart(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> ApiResult<Json<CartResponse>> {
    let cart = state
        .cart_service
        .clear_cart(actor.user_id)
        .await
        .map_err(map_application_error)?;

    Ok(Json(CartResponse::from_cart(&cart)))
}

// カート追加エンドポイント
async fn add_to_cart(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(request): ApiJson<AddToCartRequest>,
) -> ApiResult<Json<CartResponse>> {
    let cart = state
        .cart_service
        .add_to_cart(
            actor.user_id,
            ListingId::from_uuid(request.listing_id),
            request.quantity,
        )
        .await
        .map_err(map_application_error)?;

    Ok(Json(CartResponse::from_cart(&cart)))
}

// カート明細の数量変更エンドポイント
async fn update_cart_item(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(item_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateCartItemRequest>,
) -> ApiResult<Json<CartResponse>> {
    let cart = state
        .cart_service
        .update_cart_item(actor.user_id, CartItemId::from_uuid(item_id), request.quantity)
        .await
        .map_err(map_application_error)?;

    Ok(Json(CartResponse::from_cart(&cart)))
}

// カート明細削除エンドポイント
async fn remove_cart_item(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(item_id): ApiPath<Uuid>,
) -> ApiResult<Json<CartResponse>> {
    let cart = state
        .cart_service
        .remove_cart_item(actor.user_id, CartItemId::from_uuid(item_id))
        .await
        .map_err(map_application_error)?;

    Ok(Json(CartResponse::from_cart(&cart)))
}

// チェックアウトエンドポイント
async fn checkout(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<CheckoutResponse>)> {
    let command = CheckoutCommand {
        shipping_address: request.shipping_address,
        payment_method: request.payment_method,
    };
    let receipt = state
        .checkout_service
        .checkout(actor.user_id, command)
        .await
        .map_err(map_application_error)?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse::from_receipt(&receipt)),
    ))
}

// 注文一覧取得エンドポイント（購入・販売の両方）
async fn list_orders(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> ApiResult<Json<Vec<OrderResponse>>> {
    let orders = state
        .order_service
        .list_orders(actor.user_id)
        .await
        .map_err(map_application_error)?;

    Ok(Json(orders.iter().map(OrderResponse::from_order).collect()))
}

// 購入した注文の一覧取得エンドポイント
async fn list_purchases(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> ApiResult<Json<Vec<OrderResponse>>> {
    let orders = state
        .order_service
        .list_purchases(actor.user_id)
        .await
        .map_err(map_application_error)?;

    Ok(Json(orders.iter().map(OrderResponse::from_order).collect()))
}

// 販売した注文の一覧取得エンドポイント
async fn list_sales(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> ApiResult<Json<Vec<OrderResponse>>> {
    let orders = state
        .order_service
        .list_sales(actor.user_id)
        .await
        .map_err(map_application_error)?;

    Ok(Json(orders.iter().map(OrderResponse::from_order).collect()))
}

// 注文詳細取得エンドポイント
async fn get_order(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(order_id): ApiPath<Uuid>,
) -> ApiResult<Json<OrderResponse>> {
    let order = state
        .order_service
        .get_order(actor, OrderId::from_uuid(order_id))
        .await
        .map_err(map_application_error)?;

    Ok(Json(OrderResponse::from_order(&order)))
}

// 注文ステータス更新エンドポイント（販売者のみ）
async fn update_order_status(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(order_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateOrderStatusRequest>,
) -> ApiResult<Json<OrderResponse>> {
    let status = request.status().map_err(|_| {
        api_error(
            StatusCode::BAD_REQUEST,
            "INVALID_STATUS",
            format!("無効なステータス値: {}", request.status),
        )
    })?;

    let order = state
        .order_service
        .update_order_status(actor, OrderId::from_uuid(order_id), status)
        .await
        .map_err(map_application_error)?;

    Ok(Json(OrderResponse::from_order(&order)))
}

// 注文キャンセルエンドポイント（購入者のみ）
async fn cancel_order(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(order_id): ApiPath<Uuid>,
) -> ApiResult<Json<OrderResponse>> {
    let order = state
        .order_service
        .cancel_order(actor, OrderId::from_uuid(order_id))
        .await
        .map_err(map_application_error)?;

    Ok(Json(OrderResponse::from_order(&order)))
}

// アプリケーションエラーをHTTPエラーにマッピング
fn map_application_error(err: ApplicationError) -> ApiErrorResponse {
    match err {
        ApplicationError::DomainError(domain_err) => map_domain_error(domain_err),
        ApplicationError::RepositoryError(repo_err) => {
            tracing::error!(error = %repo_err, "repository error");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "REPOSITORY_ERROR",
                repo_err.to_string(),
            )
        }
        ApplicationError::NotFound(msg) => api_error(StatusCode::NOT_FOUND, "NOT_FOUND", msg),
    }
}

// ドメインエラーを適切なHTTPステータスコードとエラーコードにマッピング
fn map_domain_error(domain_err: DomainError) -> ApiErrorResponse {
    let message = domain_err.to_string();
    let (status, code) = match domain_err {
        DomainError::Unauthorized(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        DomainError::ListingInUse { .. } => (StatusCode::CONFLICT, "LISTING_IN_USE"),
        DomainError::EmptyCart => (StatusCode::BAD_REQUEST, "EMPTY_CART"),
        DomainError::ListingUnavailable { .. } => {
            (StatusCode::BAD_REQUEST, "LISTING_UNAVAILABLE")
        }
        DomainError::InsufficientStock { .. } => (StatusCode::BAD_REQUEST, "INSUFFICIENT_STOCK"),
        DomainError::InvalidStateTransition { .. } => {
            (StatusCode::BAD_REQUEST, "INVALID_STATE_TRANSITION")
        }
        DomainError::InvalidQuantity(_) => (StatusCode::BAD_REQUEST, "INVALID_QUANTITY"),
        DomainError::InvalidAddress(_) => (StatusCode::BAD_REQUEST, "INVALID_ADDRESS"),
        DomainError::CurrencyMismatch => (StatusCode::BAD_REQUEST, "CURRENCY_MISMATCH"),
        DomainError::InvalidValue(_) => (StatusCode::BAD_REQUEST, "INVALID_VALUE"),
    };
    api_error(status, code, message)
}
