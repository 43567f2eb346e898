use crate::adapter::database_error::DatabaseError;
use crate::adapter::driven::mysql_row::{column, money, parse_column};
use crate::domain::model::{Cart, CartId, CartItem, CartItemId, ListingId, Quantity, UserId};
use crate::domain::port::{CartRepository, RepositoryError};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySql, Pool};

/// MySQLカートリポジトリ
/// cartsテーブルのuser_idは一意で、ユーザーごとに1つのカートだけが存在する
pub struct MySqlCartRepository {
    pool: Pool<MySql>,
}

impl MySqlCartRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                c.id, c.user_id, c.created_at, c.updated_at,
                ci.id AS item_id, ci.listing_id, ci.quantity, ci.price, ci.currency
            FROM carts c
            LEFT JOIN cart_items ci ON c.id = ci.cart_id
            WHERE c.user_id = ?
            ORDER BY ci.position
            "#,
        )
        .bind(user_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::query("カートの取得に失敗しました", e))
        .map_err(RepositoryError::from)?;

        let Some(first_row) = rows.first() else {
            return Ok(None);
        };

        let mut items = Vec::new();
        for row in &rows {
            // LEFT JOINで明細がない場合はitem_idがNULLになる
            let item_id: Option<String> = column(row, "item_id")?;
            if item_id.is_none() {
                continue;
            }
            let quantity = Quantity::new(column(row, "quantity")?).map_err(|e| {
                RepositoryError::FetchFailed(format!("カート明細の数量が不正です: {}", e))
            })?;
            items.push(CartItem::new(
                parse_column(row, "item_id", CartItemId::from_string)?,
                parse_column(row, "listing_id", ListingId::from_string)?,
                quantity,
                money(row, "price", "currency")?,
            ));
        }

        Ok(Some(Cart::reconstruct(
            parse_column(first_row, "id", CartId::from_string)?,
            UserId::new(column(first_row, "user_id")?),
            items,
            column(first_row, "created_at")?,
            column(first_row, "updated_at")?,
        )))
    }
}

#[async_trait]
impl CartRepository for MySqlCartRepository {
    async fn find_or_create_by_user(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        if let Some(cart) = self.find_by_user(user_id).await? {
            return Ok(cart);
        }

        // 同時に作成された場合は一意制約により先に作成されたカートが残る
        let now = Utc::now();
        sqlx::query(
            "INSERT IGNORE INTO carts (id, user_id, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(self.next_identity().to_string())
        .bind(user_id.value())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::query("カートの作成に失敗しました", e))
        .map_err(RepositoryError::from)?;

        self.find_by_user(user_id).await?.ok_or_else(|| {
            RepositoryError::FetchFailed(format!("作成したカートが見つかりません: {}", user_id))
        })
    }

    async fn save(&self, cart: &Cart) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| {
                DatabaseError::ConnectionError(format!("トランザクション開始に失敗しました: {}", e))
            })
            .map_err(RepositoryError::from)?;

        sqlx::query("UPDATE carts SET updated_at = ? WHERE id = ?")
            .bind(cart.updated_at())
            .bind(cart.id().to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::query("カートの保存に失敗しました", e))
            .map_err(RepositoryError::from)?;

        // 既存の明細を削除して保存内容で置き換える
        sqlx::query("DELETE FROM cart_items WHERE cart_id = ?")
            .bind(cart.id().to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::query("カート明細の削除に失敗しました", e))
            .map_err(RepositoryError::from)?;

        for (position, item) in cart.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cart_items (id, cart_id, listing_id, quantity, price, currency, position)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(item.id().to_string())
            .bind(cart.id().to_string())
            .bind(item.listing_id().to_string())
            .bind(item.quantity())
            .bind(item.price().amount())
            .bind(item.price().currency().code())
            .bind(position as u32)
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::query("カート明細の保存に失敗しました", e))
            .map_err(RepositoryError::from)?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::query("トランザクションのコミットに失敗しました", e))
            .map_err(RepositoryError::from)?;

        Ok(())
    }

    fn next_identity(&self) -> CartId {
        CartId::new()
    }

    fn next_item_identity(&self) -> CartItemId {
        CartItemId::new()
    }
}
