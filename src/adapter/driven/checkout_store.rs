use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{Cart, Order};
use crate::domain::port::{CheckoutStore, CheckoutStoreError, RepositoryError};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySql, Pool, Transaction};

/// MySQLチェックアウトストア
/// チェックアウトとキャンセルを1つのトランザクションで実行する
/// トランザクションはコミットせずにドロップされるとロールバックされる
pub struct MySqlCheckoutStore {
    pool: Pool<MySql>,
}

impl MySqlCheckoutStore {
    /// 新しいMySQLチェックアウトストアを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<Transaction<'static, MySql>, RepositoryError> {
        self.pool
            .begin()
            .await
            .map_err(|e| {
                DatabaseError::ConnectionError(format!("トランザクション開始に失敗しました: {}", e))
            })
            .map_err(RepositoryError::from)
    }

    /// 注文と注文明細を挿入する
    async fn insert_order(
        tx: &mut Transaction<'static, MySql>,
        order: &Order,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, buyer_id, seller_id, total_amount, currency, status,
                shipping_address, payment_method, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order.id().to_string())
        .bind(order.buyer_id().value())
        .bind(order.seller_id().value())
        .bind(order.total_amount().amount())
        .bind(order.total_amount().currency().code())
        .bind(order.status().to_string())
        .bind(order.shipping_address().as_str())
        .bind(order.payment_method().map(|p| p.as_str()))
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut **tx)
        .await
        .map_err(|e| DatabaseError::query("注文の保存に失敗しました", e))
        .map_err(RepositoryError::from)?;

        for (position, item) in order.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, listing_id, quantity, price_at_purchase, currency, position
                )
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(item.id().to_string())
            .bind(order.id().to_string())
            .bind(item.listing_id().to_string())
            .bind(item.quantity())
            .bind(item.price_at_purchase().amount())
            .bind(item.price_at_purchase().currency().code())
            .bind(position as u32)
            .execute(&mut **tx)
            .await
            .map_err(|e| DatabaseError::query("注文明細の保存に失敗しました", e))
            .map_err(RepositoryError::from)?;
        }

        Ok(())
    }

    async fn commit(tx: Transaction<'static, MySql>) -> Result<(), RepositoryError> {
        tx.commit()
            .await
            .map_err(|e| DatabaseError::query("トランザクションのコミットに失敗しました", e))
            .map_err(RepositoryError::from)
    }
}

#[async_trait]
impl CheckoutStore for MySqlCheckoutStore {
    #[tracing::instrument(skip_all, fields(cart_id = %cart.id(), orders = orders.len()))]
    async fn commit_checkout(
        &self,
        cart: &Cart,
        orders: &[Order],
    ) -> Result<(), CheckoutStoreError> {
        let mut tx = self.begin().await?;

        // 読み込んだ明細を削除する。削除できなければ別のリクエストがカートを変更している
        for item in cart.items() {
            let result = sqlx::query("DELETE FROM cart_items WHERE id = ? AND cart_id = ?")
                .bind(item.id().to_string())
                .bind(cart.id().to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::query("カート明細の削除に失敗しました", e))
                .map_err(RepositoryError::from)?;
            if result.rows_affected() == 0 {
                return Err(CheckoutStoreError::CartChanged { cart_id: cart.id() });
            }
        }

        let now = Utc::now();
        for item in orders.iter().flat_map(|order| order.items()) {
            // SETは左から評価されるため、is_availableは減算後の数量で決まる
            let result = sqlx::query(
                r#"
                UPDATE listings
                SET quantity = quantity - ?, is_available = (quantity > 0), updated_at = ?
                WHERE id = ? AND is_available = TRUE AND quantity >= ?
                "#,
            )
            .bind(item.quantity())
            .bind(now)
            .bind(item.listing_id().to_string())
            .bind(item.quantity())
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::query("在庫の引当に失敗しました", e))
            .map_err(RepositoryError::from)?;

            if result.rows_affected() == 0 {
                tracing::debug!(listing_id = %item.listing_id(), "在庫の引当条件を満たしません");
                return Err(CheckoutStoreError::StockConflict {
                    listing_id: item.listing_id(),
                });
            }
        }

        for order in orders {
            Self::insert_order(&mut tx, order).await?;
        }

        sqlx::query("UPDATE carts SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(cart.id().to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::query("カートの更新に失敗しました", e))
            .map_err(RepositoryError::from)?;

        Self::commit(tx).await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(order_id = %order.id()))]
    async fn commit_cancellation(&self, order: &Order) -> Result<(), CheckoutStoreError> {
        let mut tx = self.begin().await?;

        let result = sqlx::query(
            "UPDATE orders SET status = ?, updated_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(order.status().to_string())
        .bind(order.updated_at())
        .bind(order.id().to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| DatabaseError::query("注文のキャンセルに失敗しました", e))
        .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Err(CheckoutStoreError::OrderNotPending {
                order_id: order.id(),
            });
        }

        // 在庫を戻し、数量に関係なく公開状態にする
        let now = Utc::now();
        for item in order.items() {
            sqlx::query(
                r#"
                UPDATE listings
                SET quantity = quantity + ?, is_available = TRUE, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(item.quantity())
            .bind(now)
            .bind(item.listing_id().to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::query("在庫の戻し入れに失敗しました", e))
            .map_err(RepositoryError::from)?;
        }

        Self::commit(tx).await?;
        Ok(())
    }
}
