use crate::domain::event::DomainEvent;
use crate::domain::port::{EventPublisher, PublisherError};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// tracingイベント発行者
/// ドメインイベントを構造化ログとして出力する
#[derive(Debug, Default)]
pub struct TracingEventPublisher;

impl TracingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublisherError> {
        let metadata = event.metadata();
        match event {
            DomainEvent::OrderPlaced(e) => tracing::info!(
                event_type = event.event_type(),
                event_id = %metadata.event_id,
                correlation_id = %metadata.correlation_id,
                order_id = %e.order_id,
                buyer_id = %e.buyer_id,
                seller_id = %e.seller_id,
                item_count = e.item_count,
                total_amount = %e.total_amount,
                "domain event"
            ),
            DomainEvent::OrderStatusChanged(e) => tracing::info!(
                event_type = event.event_type(),
                event_id = %metadata.event_id,
                correlation_id = %metadata.correlation_id,
                order_id = %e.order_id,
                seller_id = %e.seller_id,
                from = %e.from,
                to = %e.to,
                "domain event"
            ),
            DomainEvent::OrderCancelled(e) => tracing::info!(
                event_type = event.event_type(),
                event_id = %metadata.event_id,
                correlation_id = %metadata.correlation_id,
                order_id = %e.order_id,
                buyer_id = %e.buyer_id,
                restocked_listings = e.restocked.len(),
                "domain event"
            ),
        }
        Ok(())
    }
}

/// 発行されたイベントをメモリに記録する発行者
/// 開発用のメモリ構成とテストで使う
#[derive(Debug, Default)]
pub struct InMemoryEventPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// これまでに発行されたイベント
    pub async fn published(&self) -> Vec<DomainEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublisherError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{OrderCancelled, OrderPlaced};
    use crate::domain::model::{ListingId, Money, OrderId, UserId};

    #[tokio::test]
    async fn test_tracing_publisher_accepts_all_events() {
        let publisher = TracingEventPublisher::new();
        let placed = OrderPlaced::new(
            OrderId::new(),
            UserId::new(1),
            UserId::new(2),
            1,
            Money::huf(2000),
        );
        let cancelled = OrderCancelled::new(OrderId::new(), UserId::new(1), vec![(ListingId::new(), 2)]);

        assert!(publisher.publish(&DomainEvent::OrderPlaced(placed)).await.is_ok());
        assert!(publisher
            .publish(&DomainEvent::OrderCancelled(cancelled))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_in_memory_publisher_records_in_order() {
        let publisher = InMemoryEventPublisher::new();
        let first = DomainEvent::OrderPlaced(OrderPlaced::new(
            OrderId::new(),
            UserId::new(1),
            UserId::new(2),
            1,
            Money::huf(100),
        ));
        let second = DomainEvent::OrderCancelled(OrderCancelled::new(
            OrderId::new(),
            UserId::new(1),
            Vec::new(),
        ));

        publisher.publish(&first).await.unwrap();
        publisher.publish(&second).await.unwrap();

        let published = publisher.published().await;
        assert_eq!(published, vec![first, second]);
    }
}
