use crate::adapter::database_error::DatabaseError;
use crate::adapter::driven::mysql_row::{column, money, parse_column};
use crate::domain::model::{
    ListingId, Order, OrderId, OrderItem, OrderItemId, OrderStatus, PaymentMethod,
    ShippingAddress, UserId,
};
use crate::domain::port::{OrderRepository, RepositoryError};
use async_trait::async_trait;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool};

const ORDER_SELECT: &str = r#"
    SELECT
        o.id, o.buyer_id, o.seller_id, o.total_amount, o.currency, o.status,
        o.shipping_address, o.payment_method, o.created_at, o.updated_at,
        oi.id AS item_id, oi.listing_id, oi.quantity, oi.price_at_purchase,
        oi.currency AS item_currency
    FROM orders o
    LEFT JOIN order_items oi ON o.id = oi.order_id
"#;

/// MySQL注文リポジトリ
/// MySQLデータベースを使用して注文を参照・更新する
pub struct MySqlOrderRepository {
    pool: Pool<MySql>,
}

impl MySqlOrderRepository {
    /// 新しいMySQL注文リポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// 条件に一致する注文を作成日時の降順で取得する
    async fn fetch_orders(
        &self,
        condition: &str,
        user_id: UserId,
        bind_count: usize,
    ) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "{} WHERE {} ORDER BY o.created_at DESC, o.id, oi.position",
            ORDER_SELECT, condition
        );
        let mut query = sqlx::query(&sql);
        for _ in 0..bind_count {
            query = query.bind(user_id.value());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("注文一覧の取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        build_orders_from_rows(&rows)
    }
}

/// データベースの行から注文オブジェクトのリストを構築する
/// JOINされた結果を注文IDごとにまとめ、行の順序を保つ
fn build_orders_from_rows(rows: &[MySqlRow]) -> Result<Vec<Order>, RepositoryError> {
    let mut groups: Vec<(String, Vec<&MySqlRow>)> = Vec::new();
    for row in rows {
        let order_id: String = column(row, "id")?;
        match groups.last_mut() {
            Some((id, group)) if *id == order_id => group.push(row),
            _ => groups.push((order_id, vec![row])),
        }
    }

    groups
        .into_iter()
        .map(|(_, group)| build_order(&group))
        .collect()
}

fn build_order(rows: &[&MySqlRow]) -> Result<Order, RepositoryError> {
    let first_row = rows
        .first()
        .ok_or_else(|| RepositoryError::FetchFailed("注文の行がありません".to_string()))?;

    // 注文明細を再構築
    let mut items = Vec::new();
    for row in rows {
        let item_id: Option<String> = column(row, "item_id")?;
        if item_id.is_none() {
            continue;
        }
        let item = OrderItem::new(
            parse_column(row, "item_id", OrderItemId::from_string)?,
            parse_column(row, "listing_id", ListingId::from_string)?,
            column(row, "quantity")?,
            money(row, "price_at_purchase", "item_currency")?,
        )
        .map_err(|e| RepositoryError::FetchFailed(format!("注文明細の構築に失敗しました: {}", e)))?;
        items.push(item);
    }

    let shipping_address = parse_column(first_row, "shipping_address", |s| {
        ShippingAddress::new(s.to_string())
    })?;
    let payment_method: Option<String> = column(first_row, "payment_method")?;
    let payment_method = payment_method
        .map(PaymentMethod::new)
        .transpose()
        .map_err(|e| RepositoryError::FetchFailed(format!("支払い方法の解析に失敗しました: {}", e)))?;

    // 注文集約を再構築
    Ok(Order::reconstruct(
        parse_column(first_row, "id", OrderId::from_string)?,
        UserId::new(column(first_row, "buyer_id")?),
        UserId::new(column(first_row, "seller_id")?),
        items,
        money(first_row, "total_amount", "currency")?,
        parse_column(first_row, "status", OrderStatus::from_string)?,
        shipping_address,
        payment_method,
        column(first_row, "created_at")?,
        column(first_row, "updated_at")?,
    ))
}

#[async_trait]
impl OrderRepository for MySqlOrderRepository {
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let rows = sqlx::query(&format!("{} WHERE o.id = ? ORDER BY oi.position", ORDER_SELECT))
            .bind(order_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("注文の取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        if rows.is_empty() {
            return Ok(None);
        }

        let refs: Vec<&MySqlRow> = rows.iter().collect();
        build_order(&refs).map(Some)
    }

    async fn find_by_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        self.fetch_orders("o.buyer_id = ?", buyer_id, 1).await
    }

    async fn find_by_seller(&self, seller_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        self.fetch_orders("o.seller_id = ?", seller_id, 1).await
    }

    async fn find_by_participant(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        self.fetch_orders("(o.buyer_id = ? OR o.seller_id = ?)", user_id, 2)
            .await
    }

    async fn update_status(
        &self,
        order: &Order,
        expected: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
                .bind(order.status().to_string())
                .bind(order.updated_at())
                .bind(order.id().to_string())
                .bind(expected.to_string())
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::query("注文ステータスの更新に失敗しました", e))
                .map_err(RepositoryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    fn next_identity(&self) -> OrderId {
        OrderId::new()
    }

    fn next_item_identity(&self) -> OrderItemId {
        OrderItemId::new()
    }
}
