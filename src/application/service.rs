// アプリケーションサービス

mod cart_service;
mod catalog_service;
mod checkout_service;
mod listing_service;
mod order_service;

pub use cart_service::CartApplicationService;
pub use catalog_service::CatalogApplicationService;
pub use checkout_service::{CheckoutApplicationService, CheckoutCommand, CheckoutReceipt};
pub use listing_service::ListingApplicationService;
pub use order_service::OrderApplicationService;

use crate::domain::event::DomainEvent;
use crate::domain::port::EventPublisher;
use uuid::Uuid;

/// 確定済みのドメインイベントを発行する
/// 変更はコミット済みのため、発行の失敗は警告ログに留める
async fn publish_events(
    publisher: &dyn EventPublisher,
    events: Vec<DomainEvent>,
    correlation_id: Uuid,
) {
    for event in events {
        let event = event.with_correlation_id(correlation_id);
        if let Err(e) = publisher.publish(&event).await {
            tracing::warn!(
                event_type = event.event_type(),
                %correlation_id,
                error = %e,
                "failed to publish domain event"
            );
        }
    }
}
