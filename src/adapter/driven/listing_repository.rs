use crate::adapter::database_error::{is_constraint_violation, DatabaseError};
use crate::adapter::driven::mysql_row::{column, money, parse_column, placeholders};
use crate::domain::model::{BookId, Listing, ListingCondition, ListingId, ListingUpdate, UserId};
use crate::domain::port::{ListingDeletion, ListingRepository, RepositoryError};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool};

const LISTING_COLUMNS: &str = r#"
    id, seller_id, book_id, listing_condition, condition_description,
    price, currency, quantity, is_available, location, images,
    views_count, created_at, updated_at
"#;

/// MySQL出品リポジトリ
/// MySQLデータベースを使用して出品を永続化する
#[derive(Clone)]
pub struct MySqlListingRepository {
    pool: Pool<MySql>,
}

impl MySqlListingRepository {
    /// 新しいMySQL出品リポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

/// データベースの行から出品を再構築する
fn listing_from_row(row: &MySqlRow) -> Result<Listing, RepositoryError> {
    let images_json: String = column(row, "images")?;
    let images: Vec<String> = serde_json::from_str(&images_json).map_err(|e| {
        RepositoryError::FetchFailed(format!("画像URLの解析に失敗しました: {}", e))
    })?;

    Ok(Listing::reconstruct(
        parse_column(row, "id", ListingId::from_string)?,
        UserId::new(column(row, "seller_id")?),
        parse_column(row, "book_id", BookId::from_string)?,
        parse_column(row, "listing_condition", ListingCondition::from_string)?,
        column(row, "condition_description")?,
        money(row, "price", "currency")?,
        column(row, "quantity")?,
        column(row, "is_available")?,
        column(row, "location")?,
        images,
        column(row, "views_count")?,
        column(row, "created_at")?,
        column(row, "updated_at")?,
    ))
}

#[async_trait]
impl ListingRepository for MySqlListingRepository {
    async fn save(&self, listing: &Listing) -> Result<(), RepositoryError> {
        let images = serde_json::to_string(listing.images()).map_err(|e| {
            RepositoryError::OperationFailed(format!("画像URLの変換に失敗しました: {}", e))
        })?;

        sqlx::query(
            r#"
            INSERT INTO listings (
                id, seller_id, book_id, listing_condition, condition_description,
                price, currency, quantity, is_available, location, images,
                views_count, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(listing.id().to_string())
        .bind(listing.seller_id().value())
        .bind(listing.book_id().to_string())
        .bind(listing.condition().to_string())
        .bind(listing.condition_description())
        .bind(listing.price().amount())
        .bind(listing.price().currency().code())
        .bind(listing.quantity())
        .bind(listing.is_available())
        .bind(listing.location())
        .bind(images)
        .bind(listing.views_count())
        .bind(listing.created_at())
        .bind(listing.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::query("出品の保存に失敗しました", e))
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn update(
        &self,
        listing_id: ListingId,
        update: &ListingUpdate,
    ) -> Result<Option<Listing>, RepositoryError> {
        let images = update
            .images
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| {
                RepositoryError::OperationFailed(format!("画像URLの変換に失敗しました: {}", e))
            })?;

        // NULLのパラメータは保存済みの値を残す
        sqlx::query(
            r#"
            UPDATE listings SET
                listing_condition = COALESCE(?, listing_condition),
                condition_description = COALESCE(?, condition_description),
                price = COALESCE(?, price),
                quantity = COALESCE(?, quantity),
                is_available = COALESCE(?, is_available),
                location = COALESCE(?, location),
                images = COALESCE(?, images),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.condition.map(|condition| condition.to_string()))
        .bind(update.condition_description.as_deref())
        .bind(update.price)
        .bind(update.quantity)
        .bind(update.is_available)
        .bind(update.location.as_deref())
        .bind(images)
        .bind(Utc::now())
        .bind(listing_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::query("出品の更新に失敗しました", e))
        .map_err(RepositoryError::from)?;

        self.find_by_id(listing_id).await
    }

    async fn find_by_id(&self, listing_id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM listings WHERE id = ?", LISTING_COLUMNS))
            .bind(listing_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("出品の取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        row.as_ref().map(listing_from_row).transpose()
    }

    async fn find_by_ids(&self, listing_ids: &[ListingId]) -> Result<Vec<Listing>, RepositoryError> {
        if listing_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {} FROM listings WHERE id IN ({})",
            LISTING_COLUMNS,
            placeholders(listing_ids.len())
        );
        let mut query = sqlx::query(&sql);
        for listing_id in listing_ids {
            query = query.bind(listing_id.to_string());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("出品一覧の取得に失敗しました", e))
            .map_err(RepositoryError::from)?;

        rows.iter().map(listing_from_row).collect()
    }

    async fn find_by_seller(&self, seller_id: UserId) -> Result<Vec<Listing>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM listings WHERE seller_id = ? ORDER BY created_at DESC",
            LISTING_COLUMNS
        ))
        .bind(seller_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::query("販売者の出品一覧の取得に失敗しました", e))
        .map_err(RepositoryError::from)?;

        rows.iter().map(listing_from_row).collect()
    }

    async fn increment_views(&self, listing_id: ListingId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE listings SET views_count = views_count + 1 WHERE id = ?")
            .bind(listing_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::query("閲覧数の更新に失敗しました", e))
            .map_err(RepositoryError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, listing_id: ListingId) -> Result<ListingDeletion, RepositoryError> {
        // cart_itemsとorder_itemsからの外部キー（ON DELETE RESTRICT）で参照中の削除を防ぐ
        let result = sqlx::query("DELETE FROM listings WHERE id = ?")
            .bind(listing_id.to_string())
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Ok(ListingDeletion::NotFound),
            Ok(_) => Ok(ListingDeletion::Deleted),
            Err(e) if is_constraint_violation(&e) => Ok(ListingDeletion::Referenced),
            Err(e) => Err(DatabaseError::query("出品の削除に失敗しました", e).into()),
        }
    }

    fn next_identity(&self) -> ListingId {
        ListingId::new()
    }
}
