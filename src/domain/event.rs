use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::model::{ListingId, Money, OrderId, OrderStatus, UserId};

/// イベントのメタデータ
#[derive(Debug, Clone, PartialEq)]
pub struct EventMetadata {
    /// イベントID
    pub event_id: Uuid,
    /// 相関ID（同じチェックアウトから発生したイベントで共通）
    pub correlation_id: Uuid,
    /// イベント発生日時
    pub occurred_at: DateTime<Utc>,
}

impl EventMetadata {
    pub fn new() -> Self {
        let event_id = Uuid::new_v4();
        Self {
            event_id,
            correlation_id: event_id,
            occurred_at: Utc::now(),
        }
    }
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// ドメインイベント列挙型
/// ビジネス上の重要なイベントを表現する
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// チェックアウトで注文が作成された
    OrderPlaced(OrderPlaced),
    /// 販売者が注文ステータスを変更した
    OrderStatusChanged(OrderStatusChanged),
    /// 購入者が注文をキャンセルした（在庫は戻される）
    OrderCancelled(OrderCancelled),
}

impl DomainEvent {
    /// イベント種別名
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::OrderPlaced(_) => "OrderPlaced",
            DomainEvent::OrderStatusChanged(_) => "OrderStatusChanged",
            DomainEvent::OrderCancelled(_) => "OrderCancelled",
        }
    }

    pub fn metadata(&self) -> &EventMetadata {
        match self {
            DomainEvent::OrderPlaced(e) => &e.metadata,
            DomainEvent::OrderStatusChanged(e) => &e.metadata,
            DomainEvent::OrderCancelled(e) => &e.metadata,
        }
    }

    /// 相関IDを設定したイベントを返す
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        match &mut self {
            DomainEvent::OrderPlaced(e) => e.metadata.correlation_id = correlation_id,
            DomainEvent::OrderStatusChanged(e) => e.metadata.correlation_id = correlation_id,
            DomainEvent::OrderCancelled(e) => e.metadata.correlation_id = correlation_id,
        }
        self
    }
}

/// 注文作成イベント
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPlaced {
    pub metadata: EventMetadata,
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub item_count: usize,
    pub total_amount: Money,
}

impl OrderPlaced {
    pub fn new(
        order_id: OrderId,
        buyer_id: UserId,
        seller_id: UserId,
        item_count: usize,
        total_amount: Money,
    ) -> Self {
        Self {
            metadata: EventMetadata::new(),
            order_id,
            buyer_id,
            seller_id,
            item_count,
            total_amount,
        }
    }
}

/// 注文ステータス変更イベント
#[derive(Debug, Clone, PartialEq)]
pub struct OrderStatusChanged {
    pub metadata: EventMetadata,
    pub order_id: OrderId,
    pub seller_id: UserId,
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl OrderStatusChanged {
    pub fn new(order_id: OrderId, seller_id: UserId, from: OrderStatus, to: OrderStatus) -> Self {
        Self {
            metadata: EventMetadata::new(),
            order_id,
            seller_id,
            from,
            to,
        }
    }
}

/// 注文キャンセルイベント
#[derive(Debug, Clone, PartialEq)]
pub struct OrderCancelled {
    pub metadata: EventMetadata,
    pub order_id: OrderId,
    pub buyer_id: UserId,
    /// 在庫を戻した出品と数量
    pub restocked: Vec<(ListingId, u32)>,
}

impl OrderCancelled {
    pub fn new(order_id: OrderId, buyer_id: UserId, restocked: Vec<(ListingId, u32)>) -> Self {
        Self {
            metadata: EventMetadata::new(),
            order_id,
            buyer_id,
            restocked,
        }
    }
}
