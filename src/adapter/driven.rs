// 駆動される側アダプター（リポジトリ実装など）

mod cart_repository;
mod catalog_repository;
mod checkout_store;
mod event_publisher;
mod in_memory_store;
mod listing_repository;
mod mysql_row;
mod order_repository;

pub use cart_repository::MySqlCartRepository;
pub use catalog_repository::MySqlCatalogRepository;
pub use checkout_store::MySqlCheckoutStore;
pub use event_publisher::{InMemoryEventPublisher, TracingEventPublisher};
pub use in_memory_store::InMemoryMarketplaceStore;
pub use listing_repository::MySqlListingRepository;
pub use order_repository::MySqlOrderRepository;
