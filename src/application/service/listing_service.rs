use crate::application::ApplicationError;
use crate::domain::error::DomainError;
use crate::domain::model::{Actor, Listing, ListingDraft, ListingId, ListingUpdate, UserId};
use crate::domain::port::{CatalogRepository, ListingDeletion, ListingRepository};
use std::sync::Arc;

/// 出品アプリケーションサービス
pub struct ListingApplicationService {
    listing_repository: Arc<dyn ListingRepository>,
    catalog_repository: Arc<dyn CatalogRepository>,
}

impl ListingApplicationService {
    /// 新しいアプリケーションサービスを作成
    ///
    /// # Arguments
    /// * `listing_repository` - 出品リポジトリ
    /// * `catalog_repository` - 出品が参照する書籍の存在確認に使う
    pub fn new(
        listing_repository: Arc<dyn ListingRepository>,
        catalog_repository: Arc<dyn CatalogRepository>,
    ) -> Self {
        Self {
            listing_repository,
            catalog_repository,
        }
    }

    /// 出品を作成
    ///
    /// # Arguments
    /// * `actor` - 出品者
    /// * `draft` - 出品内容
    ///
    /// # Returns
    /// * `Ok(Listing)` - 作成された出品（公開状態）
    /// * `Err(ApplicationError)` - 書籍が存在しない、入力が不正、または保存失敗
    #[tracing::instrument(
        name = "listings.create",
        skip(self, actor, draft),
        fields(seller_id = %actor.user_id, book_id = %draft.book_id),
        err
    )]
    pub async fn create_listing(
        &self,
        actor: Actor,
        draft: ListingDraft,
    ) -> Result<Listing, ApplicationError> {
        if self
            .catalog_repository
            .find_by_id(draft.book_id)
            .await?
            .is_none()
        {
            return Err(ApplicationError::not_found("書籍", draft.book_id));
        }

        let listing = Listing::create(
            self.listing_repository.next_identity(),
            actor.user_id,
            draft,
        )?;
        self.listing_repository.save(&listing).await?;

        tracing::info!(listing_id = %listing.id(), "created listing");
        Ok(listing)
    }

    /// 出品を取得し、閲覧数を1増やす
    pub async fn get_listing(&self, listing_id: ListingId) -> Result<Listing, ApplicationError> {
        if !self.listing_repository.increment_views(listing_id).await? {
            return Err(ApplicationError::not_found("出品", listing_id));
        }
        self.listing_repository
            .find_by_id(listing_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("出品", listing_id))
    }

    /// 出品を部分更新
    /// 出品者本人または管理者のみ。公開状態と在庫数の整合は取らない
    #[tracing::instrument(
        name = "listings.update",
        skip(self, actor, update),
        fields(user_id = %actor.user_id),
        err
    )]
    pub async fn update_listing(
        &self,
        actor: Actor,
        listing_id: ListingId,
        update: ListingUpdate,
    ) -> Result<Listing, ApplicationError> {
        self.find_managed_listing(actor, listing_id).await?;
        update.validate()?;

        // 在庫数と公開状態は更新で指定された場合だけ上書きする
        let listing = self
            .listing_repository
            .update(listing_id, &update)
            .await?
            .ok_or_else(|| ApplicationError::not_found("出品", listing_id))?;

        if listing.is_available() != (listing.quantity() > 0) {
            tracing::warn!(
                %listing_id,
                quantity = listing.quantity(),
                is_available = listing.is_available(),
                "listing availability does not match its stock"
            );
        }

        Ok(listing)
    }

    /// 出品を削除
    /// カートまたは注文から参照されている場合はListingInUse
    #[tracing::instrument(
        name = "listings.delete",
        skip(self, actor),
        fields(user_id = %actor.user_id),
        err
    )]
    pub async fn delete_listing(
        &self,
        actor: Actor,
        listing_id: ListingId,
    ) -> Result<(), ApplicationError> {
        self.find_managed_listing(actor, listing_id).await?;

        match self.listing_repository.delete(listing_id).await? {
            ListingDeletion::Deleted => {
                tracing::info!(%listing_id, "deleted listing");
                Ok(())
            }
            ListingDeletion::NotFound => Err(ApplicationError::not_found("出品", listing_id)),
            ListingDeletion::Referenced => {
                Err(DomainError::ListingInUse { listing_id }.into())
            }
        }
    }

    /// 販売者の出品一覧を取得
    /// 作成日時の降順で並べて返す
    pub async fn list_seller_listings(
        &self,
        seller_id: UserId,
    ) -> Result<Vec<Listing>, ApplicationError> {
        self.listing_repository
            .find_by_seller(seller_id)
            .await
            .map_err(ApplicationError::from)
    }

    async fn find_managed_listing(
        &self,
        actor: Actor,
        listing_id: ListingId,
    ) -> Result<Listing, ApplicationError> {
        let listing = self
            .listing_repository
            .find_by_id(listing_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("出品", listing_id))?;

        if !listing.can_be_managed_by(actor.user_id, actor.is_admin()) {
            return Err(DomainError::Unauthorized(
                "出品を変更できるのは出品者または管理者のみです".to_string(),
            )
            .into());
        }

        Ok(listing)
    }
}
