use crate::application::service::publish_events;
use crate::application::ApplicationError;
use crate::domain::error::DomainError;
use crate::domain::model::{Cart, ListingId, OrderId, PaymentMethod, ShippingAddress, UserId};
use crate::domain::port::{
    CartRepository, CheckoutStore, CheckoutStoreError, EventPublisher, ListingRepository,
    OrderRepository, RepositoryError,
};
use crate::domain::service::CheckoutService;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// チェックアウトの入力
#[derive(Debug, Clone)]
pub struct CheckoutCommand {
    pub shipping_address: String,
    pub payment_method: Option<String>,
}

/// チェックアウトの結果
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
    /// 作成された注文のID（販売者の出現順）
    pub order_ids: Vec<OrderId>,
    pub total_orders: usize,
}

/// チェックアウトアプリケーションサービス
/// カートを販売者ごとの注文に変換し、在庫を引き当て、カートを空にする
pub struct CheckoutApplicationService {
    cart_repository: Arc<dyn CartRepository>,
    listing_repository: Arc<dyn ListingRepository>,
    order_repository: Arc<dyn OrderRepository>,
    checkout_store: Arc<dyn CheckoutStore>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl CheckoutApplicationService {
    pub fn new(
        cart_repository: Arc<dyn CartRepository>,
        listing_repository: Arc<dyn ListingRepository>,
        order_repository: Arc<dyn OrderRepository>,
        checkout_store: Arc<dyn CheckoutStore>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            cart_repository,
            listing_repository,
            order_repository,
            checkout_store,
            event_publisher,
        }
    }

    /// カートをチェックアウトする
    ///
    /// 処理の流れ:
    /// 1. 配送先住所・支払い方法を検証
    /// 2. カートの全明細を現在の出品に対して検証（失敗したら何も変更しない）
    /// 3. 販売者ごとに注文を組み立てる（単価はカートに記録された価格）
    /// 4. 在庫の引当・注文の作成・カートのクリアを1つの単位で確定
    ///
    /// # Arguments
    /// * `buyer_id` - 購入者
    /// * `command` - 配送先住所と支払い方法
    ///
    /// # Returns
    /// * `Ok(CheckoutReceipt)` - 作成された注文ID
    /// * `Err(ApplicationError)` - EmptyCart, ListingUnavailable, InsufficientStock など
    #[tracing::instrument(
        name = "checkout.checkout",
        skip(self, command),
        fields(correlation_id = tracing::field::Empty),
        err
    )]
    pub async fn checkout(
        &self,
        buyer_id: UserId,
        command: CheckoutCommand,
    ) -> Result<CheckoutReceipt, ApplicationError> {
        let shipping_address = ShippingAddress::new(command.shipping_address)?;
        let payment_method = command.payment_method.map(PaymentMethod::new).transpose()?;

        let cart = self.cart_repository.find_or_create_by_user(buyer_id).await?;
        if cart.is_empty() {
            return Err(DomainError::EmptyCart.into());
        }

        let listing_ids: Vec<ListingId> = cart.items().iter().map(|i| i.listing_id()).collect();
        let listings: HashMap<_, _> = self
            .listing_repository
            .find_by_ids(&listing_ids)
            .await?
            .into_iter()
            .map(|listing| (listing.id(), listing))
            .collect();

        let mut orders = CheckoutService::build_orders(
            &cart,
            &listings,
            shipping_address,
            payment_method,
            || self.order_repository.next_identity(),
            || self.order_repository.next_item_identity(),
        )?;

        if let Err(e) = self.checkout_store.commit_checkout(&cart, &orders).await {
            return Err(self.resolve_store_error(&cart, e).await);
        }

        let correlation_id = Uuid::new_v4();
        tracing::Span::current().record("correlation_id", tracing::field::display(correlation_id));

        let order_ids: Vec<OrderId> = orders.iter().map(|order| order.id()).collect();
        let events = orders
            .iter_mut()
            .flat_map(|order| order.take_domain_events())
            .collect();
        publish_events(self.event_publisher.as_ref(), events, correlation_id).await;

        tracing::info!(
            buyer_id = %buyer_id,
            total_orders = order_ids.len(),
            "checkout completed"
        );

        Ok(CheckoutReceipt {
            total_orders: order_ids.len(),
            order_ids,
        })
    }

    /// 確定時の競合をドメインエラーに変換する
    async fn resolve_store_error(&self, cart: &Cart, error: CheckoutStoreError) -> ApplicationError {
        match error {
            CheckoutStoreError::StockConflict { listing_id } => {
                let requested = cart
                    .items()
                    .iter()
                    .find(|item| item.listing_id() == listing_id)
                    .map(|item| item.quantity())
                    .unwrap_or_default();
                // 競合相手が確定した後の出品の状態を報告する
                let available = match self.listing_repository.find_by_id(listing_id).await {
                    Ok(Some(listing)) if listing.is_available() => listing.quantity(),
                    Ok(_) => {
                        tracing::warn!(%listing_id, "listing closed during checkout");
                        return DomainError::ListingUnavailable { listing_id }.into();
                    }
                    Err(e) => return e.into(),
                };
                tracing::warn!(%listing_id, requested, available, "stock conflict during checkout");
                DomainError::InsufficientStock {
                    listing_id,
                    requested,
                    available,
                }
                .into()
            }
            CheckoutStoreError::CartChanged { cart_id } => {
                tracing::warn!(%cart_id, "cart changed during checkout");
                DomainError::EmptyCart.into()
            }
            CheckoutStoreError::OrderNotPending { order_id } => {
                RepositoryError::OperationFailed(format!(
                    "チェックアウト中に予期しない注文状態の競合が発生しました: {}",
                    order_id
                ))
                .into()
            }
            CheckoutStoreError::Repository(e) => e.into(),
        }
    }
}
