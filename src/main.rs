use used_book_marketplace::adapter::driven::{
    InMemoryMarketplaceStore, MySqlCartRepository, MySqlCatalogRepository, MySqlCheckoutStore,
    MySqlListingRepository, MySqlOrderRepository, TracingEventPublisher,
};
use used_book_marketplace::adapter::driver::rest_api::{create_router, AppState};
use used_book_marketplace::adapter::logging::init_subscriber;
use used_book_marketplace::adapter::{AppConfig, DatabaseConfig, DatabaseMigration, StorageBackend};

use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .envファイルから環境変数を読み込む
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_subscriber(&config)?;

    let event_publisher = Arc::new(TracingEventPublisher::new());

    let app_state = match config.storage_backend {
        StorageBackend::MySql => {
            // データベース設定を読み込む
            let database = DatabaseConfig::from_env()?;
            tracing::info!(host = %database.host, port = database.port, "connecting to database");

            // 接続プールを作成
            let pool = MySqlPoolOptions::new()
                .max_connections(database.max_connections)
                .connect(&database.connection_string())
                .await?;

            // マイグレーションを実行
            DatabaseMigration::new(pool.clone()).run().await?;

            AppState::new(
                Arc::new(MySqlCatalogRepository::new(pool.clone())),
                Arc::new(MySqlListingRepository::new(pool.clone())),
                Arc::new(MySqlCartRepository::new(pool.clone())),
                Arc::new(MySqlOrderRepository::new(pool.clone())),
                Arc::new(MySqlCheckoutStore::new(pool)),
                event_publisher,
                config.order_status_policy,
            )
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage; data is lost on shutdown");
            let store = Arc::new(InMemoryMarketplaceStore::new());
            AppState::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                store,
                event_publisher,
                config.order_status_policy,
            )
        }
    };

    // REST APIルーターを作成
    let app = create_router().with_state(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    // サーバーを起動
    let address = config.bind_address()?;
    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!(
        %address,
        storage = ?config.storage_backend,
        status_policy = ?config.order_status_policy,
        "REST API server started"
    );

    axum::serve(listener, app).await?;

    Ok(())
}
