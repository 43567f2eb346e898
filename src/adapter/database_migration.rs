use crate::adapter::database_error::DatabaseError;
use sqlx::{MySql, Pool};

/// 適用順に並べたマイグレーション（名前, SQL）
const MIGRATIONS: [(&str, &str); 7] = [
    (
        "001_create_books_table",
        include_str!("../../migrations/001_create_books_table.sql"),
    ),
    (
        "002_create_book_categories_table",
        include_str!("../../migrations/002_create_book_categories_table.sql"),
    ),
    (
        "003_create_listings_table",
        include_str!("../../migrations/003_create_listings_table.sql"),
    ),
    (
        "004_create_carts_table",
        include_str!("../../migrations/004_create_carts_table.sql"),
    ),
    (
        "005_create_cart_items_table",
        include_str!("../../migrations/005_create_cart_items_table.sql"),
    ),
    (
        "006_create_orders_table",
        include_str!("../../migrations/006_create_orders_table.sql"),
    ),
    (
        "007_create_order_items_table",
        include_str!("../../migrations/007_create_order_items_table.sql"),
    ),
];

/// データベースマイグレーションを管理する構造体
pub struct DatabaseMigration {
    pool: Pool<MySql>,
}

impl DatabaseMigration {
    /// 新しいDatabaseMigrationインスタンスを作成
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// マイグレーションを実行
    /// べき等性を保証（CREATE TABLE IF NOT EXISTS）
    #[tracing::instrument(name = "database.migrate", skip(self), err)]
    pub async fn run(&self) -> Result<(), DatabaseError> {
        for (name, migration_sql) in MIGRATIONS {
            tracing::debug!(migration = name, "running migration");
            sqlx::query(migration_sql)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::MigrationError(format!("{} failed: {}", name, e)))?;
        }

        tracing::info!(count = MIGRATIONS.len(), "all migrations completed");
        Ok(())
    }
}
