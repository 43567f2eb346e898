use chrono::{DateTime, Utc};

use crate::domain::error::DomainError;
use crate::domain::event::{DomainEvent, OrderCancelled, OrderPlaced, OrderStatusChanged};
use crate::domain::model::{
    ListingId, Money, OrderId, OrderItemId, OrderStatus, PaymentMethod, ShippingAddress,
    StatusTransitionPolicy, UserId,
};

/// 注文明細
/// 購入時の価格を保持し、出品価格の変更の影響を受けない
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    id: OrderItemId,
    listing_id: ListingId,
    quantity: u32,
    price_at_purchase: Money,
}

impl OrderItem {
    pub fn new(
        id: OrderItemId,
        listing_id: ListingId,
        quantity: u32,
        price_at_purchase: Money,
    ) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity(quantity));
        }
        Ok(Self {
            id,
            listing_id,
            quantity,
            price_at_purchase,
        })
    }

    pub fn id(&self) -> OrderItemId {
        self.id
    }

    pub fn listing_id(&self) -> ListingId {
        self.listing_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn price_at_purchase(&self) -> Money {
        self.price_at_purchase
    }

    /// 小計を計算（購入時単価 × 数量）
    pub fn subtotal(&self) -> Money {
        self.price_at_purchase.multiply(self.quantity)
    }
}

/// Order集約
/// 1つの注文は常に1人の販売者に対応する
#[derive(Debug, Clone)]
pub struct Order {
    id: OrderId,
    buyer_id: UserId,
    seller_id: UserId,
    items: Vec<OrderItem>,
    total_amount: Money,
    status: OrderStatus,
    shipping_address: ShippingAddress,
    payment_method: Option<PaymentMethod>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    domain_events: Vec<DomainEvent>,
}

impl Order {
    /// チェックアウトで新しい注文を作成
    /// 初期ステータスはPending、合計金額は明細の小計の合計
    pub fn place(
        id: OrderId,
        buyer_id: UserId,
        seller_id: UserId,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        payment_method: Option<PaymentMethod>,
    ) -> Result<Self, DomainError> {
        let first = items.first().ok_or_else(|| {
            DomainError::InvalidValue("注文明細が空です".to_string())
        })?;

        // 全明細の小計を合算
        let mut total_amount = Money::zero(first.price_at_purchase().currency());
        for item in &items {
            total_amount = total_amount.add(&item.subtotal())?;
        }

        let now = Utc::now();
        let mut order = Self {
            id,
            buyer_id,
            seller_id,
            items,
            total_amount,
            status: OrderStatus::Pending,
            shipping_address,
            payment_method,
            created_at: now,
            updated_at: now,
            domain_events: Vec::new(),
        };

        let event = OrderPlaced::new(
            order.id,
            order.buyer_id,
            order.seller_id,
            order.items.len(),
            order.total_amount,
        );
        order.domain_events.push(DomainEvent::OrderPlaced(event));

        Ok(order)
    }

    /// データベースから取得したデータで注文を再構築
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: OrderId,
        buyer_id: UserId,
        seller_id: UserId,
        items: Vec<OrderItem>,
        total_amount: Money,
        status: OrderStatus,
        shipping_address: ShippingAddress,
        payment_method: Option<PaymentMethod>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            buyer_id,
            seller_id,
            items,
            total_amount,
            status,
            shipping_address,
            payment_method,
            created_at,
            updated_at,
            domain_events: Vec::new(),
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn buyer_id(&self) -> UserId {
        self.buyer_id
    }

    pub fn seller_id(&self) -> UserId {
        self.seller_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn payment_method(&self) -> Option<&PaymentMethod> {
        self.payment_method.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// ドメインイベントを取得してクリア
    pub fn take_domain_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.domain_events)
    }

    /// 購入者または販売者か
    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }

    /// 販売者によるステータス更新
    /// 事前条件:
    /// - 操作者が販売者であること
    /// - Strictポリシーの場合のみ遷移表に従うこと
    pub fn update_status(
        &mut self,
        actor: UserId,
        next: OrderStatus,
        policy: StatusTransitionPolicy,
    ) -> Result<(), DomainError> {
        if actor != self.seller_id {
            return Err(DomainError::Unauthorized(
                "注文のステータスを変更できるのは販売者のみです".to_string(),
            ));
        }

        if policy == StatusTransitionPolicy::Strict && !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: next,
            });
        }

        let previous = self.status;
        self.status = next;
        self.updated_at = Utc::now();

        let event = OrderStatusChanged::new(self.id, self.seller_id, previous, next);
        self.domain_events.push(DomainEvent::OrderStatusChanged(event));

        Ok(())
    }

    /// 購入者による注文キャンセル
    /// 事前条件:
    /// - 操作者が購入者であること
    /// - ステータスがPendingであること
    pub fn cancel(&mut self, actor: UserId) -> Result<(), DomainError> {
        if actor != self.buyer_id {
            return Err(DomainError::Unauthorized(
                "注文をキャンセルできるのは購入者のみです".to_string(),
            ));
        }

        if self.status != OrderStatus::Pending {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: OrderStatus::Cancelled,
            });
        }

        self.status = OrderStatus::Cancelled;
        self.updated_at = Utc::now();

        let restocked = self
            .items
            .iter()
            .map(|item| (item.listing_id(), item.quantity()))
            .collect();
        let event = OrderCancelled::new(self.id, self.buyer_id, restocked);
        self.domain_events.push(DomainEvent::OrderCancelled(event));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Currency;

    fn address() -> ShippingAddress {
        ShippingAddress::new("1051 Budapest, Váci utca 1.".to_string()).unwrap()
    }

    fn item(quantity: u32, price: i64) -> OrderItem {
        OrderItem::new(OrderItemId::new(), ListingId::new(), quantity, Money::huf(price)).unwrap()
    }

    fn pending_order() -> Order {
        Order::place(
            OrderId::new(),
            UserId::new(1),
            UserId::new(2),
            vec![item(2, 1000), item(1, 500)],
            address(),
            Some(PaymentMethod::new("card".to_string()).unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_placed_order_is_pending_with_total() {
        let mut order = pending_order();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.total_amount(), Money::huf(2500));

        let events = order.take_domain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "OrderPlaced");
        assert!(order.take_domain_events().is_empty());
    }

    #[test]
    fn test_place_without_items_fails() {
        let result = Order::place(
            OrderId::new(),
            UserId::new(1),
            UserId::new(2),
            Vec::new(),
            address(),
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_place_with_mixed_currencies_fails() {
        let eur_item =
            OrderItem::new(OrderItemId::new(), ListingId::new(), 1, Money::of(10, Currency::EUR))
                .unwrap();
        let result = Order::place(
            OrderId::new(),
            UserId::new(1),
            UserId::new(2),
            vec![item(1, 1000), eur_item],
            address(),
            None,
        );
        assert!(matches!(result, Err(DomainError::CurrencyMismatch)));
    }

    #[test]
    fn test_order_item_zero_quantity_fails() {
        let result = OrderItem::new(OrderItemId::new(), ListingId::new(), 0, Money::huf(100));
        assert!(result.is_err());
    }

    #[test]
    fn test_seller_can_set_any_status_under_permissive_policy() {
        let mut order = pending_order();
        order
            .update_status(
                UserId::new(2),
                OrderStatus::Delivered,
                StatusTransitionPolicy::Permissive,
            )
            .unwrap();
        assert_eq!(order.status(), OrderStatus::Delivered);

        // 終端状態からでも変更できる
        order
            .update_status(
                UserId::new(2),
                OrderStatus::Shipped,
                StatusTransitionPolicy::Permissive,
            )
            .unwrap();
        assert_eq!(order.status(), OrderStatus::Shipped);
    }

    #[test]
    fn test_strict_policy_rejects_skipping_states() {
        let mut order = pending_order();
        let result = order.update_status(
            UserId::new(2),
            OrderStatus::Delivered,
            StatusTransitionPolicy::Strict,
        );
        assert_eq!(
            result,
            Err(DomainError::InvalidStateTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Delivered,
            })
        );
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn test_only_seller_can_update_status() {
        let mut order = pending_order();
        let result = order.update_status(
            UserId::new(1),
            OrderStatus::Paid,
            StatusTransitionPolicy::Permissive,
        );
        assert!(matches!(result, Err(DomainError::Unauthorized(_))));
    }

    #[test]
    fn test_buyer_cancels_pending_order() {
        let mut order = pending_order();
        order.take_domain_events();

        order.cancel(UserId::new(1)).unwrap();

        assert_eq!(order.status(), OrderStatus::Cancelled);
        let events = order.take_domain_events();
        match &events[0] {
            DomainEvent::OrderCancelled(e) => assert_eq!(e.restocked.len(), 2),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_seller_cannot_cancel() {
        let mut order = pending_order();
        let result = order.cancel(UserId::new(2));
        assert!(matches!(result, Err(DomainError::Unauthorized(_))));
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn test_cancel_shipped_order_fails() {
        let mut order = pending_order();
        order
            .update_status(
                UserId::new(2),
                OrderStatus::Shipped,
                StatusTransitionPolicy::Permissive,
            )
            .unwrap();

        let result = order.cancel(UserId::new(1));
        assert_eq!(
            result,
            Err(DomainError::InvalidStateTransition {
                from: OrderStatus::Shipped,
                to: OrderStatus::Cancelled,
            })
        );
    }

    #[test]
    fn test_is_participant() {
        let order = pending_order();
        assert!(order.is_participant(UserId::new(1)));
        assert!(order.is_participant(UserId::new(2)));
        assert!(!order.is_participant(UserId::new(3)));
    }
}
