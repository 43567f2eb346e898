use crate::application::ApplicationError;
use crate::domain::model::{Cart, CartItemId, ListingId, Quantity, UserId};
use crate::domain::port::{CartRepository, ListingRepository};
use std::sync::Arc;

/// カートアプリケーションサービス
/// カートはユーザーの最初のアクセス時に作成される
pub struct CartApplicationService {
    cart_repository: Arc<dyn CartRepository>,
    listing_repository: Arc<dyn ListingRepository>,
}

impl CartApplicationService {
    pub fn new(
        cart_repository: Arc<dyn CartRepository>,
        listing_repository: Arc<dyn ListingRepository>,
    ) -> Self {
        Self {
            cart_repository,
            listing_repository,
        }
    }

    /// ユーザーのカートを取得（存在しなければ作成）
    pub async fn get_cart(&self, user_id: UserId) -> Result<Cart, ApplicationError> {
        self.cart_repository
            .find_or_create_by_user(user_id)
            .await
            .map_err(ApplicationError::from)
    }

    /// 出品をカートに追加
    ///
    /// # Arguments
    /// * `user_id` - カートの所有者
    /// * `listing_id` - 追加する出品
    /// * `quantity` - 追加する数量（1〜100）
    ///
    /// # Returns
    /// * `Ok(Cart)` - 更新後のカート
    /// * `Err(ApplicationError)` - 出品が存在しない、非公開、在庫不足、数量の上限超過
    #[tracing::instrument(name = "cart.add_item", skip(self), err)]
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        listing_id: ListingId,
        quantity: u32,
    ) -> Result<Cart, ApplicationError> {
        let quantity = Quantity::new(quantity)?;
        let listing = self
            .listing_repository
            .find_by_id(listing_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("出品", listing_id))?;

        let mut cart = self.cart_repository.find_or_create_by_user(user_id).await?;
        let item_id = cart.add_item(self.cart_repository.next_item_identity(), &listing, quantity)?;
        self.cart_repository.save(&cart).await?;

        tracing::debug!(cart_item_id = %item_id, "added listing to cart");
        Ok(cart)
    }

    /// カート明細の数量を変更
    /// 在庫数のみ確認し、単価は更新しない
    #[tracing::instrument(name = "cart.update_item", skip(self), err)]
    pub async fn update_cart_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<Cart, ApplicationError> {
        let quantity = Quantity::new(quantity)?;
        let mut cart = self.cart_repository.find_or_create_by_user(user_id).await?;
        let listing_id = cart
            .item(item_id)
            .map(|item| item.listing_id())
            .ok_or_else(|| ApplicationError::not_found("カート明細", item_id))?;

        let listing = self
            .listing_repository
            .find_by_id(listing_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("出品", listing_id))?;

        cart.update_item_quantity(item_id, &listing, quantity)?;
        self.cart_repository.save(&cart).await?;
        Ok(cart)
    }

    /// カート明細を削除
    pub async fn remove_cart_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<Cart, ApplicationError> {
        let mut cart = self.cart_repository.find_or_create_by_user(user_id).await?;
        if !cart.remove_item(item_id) {
            return Err(ApplicationError::not_found("カート明細", item_id));
        }
        self.cart_repository.save(&cart).await?;
        Ok(cart)
    }

    /// カートを空にする
    pub async fn clear_cart(&self, user_id: UserId) -> Result<Cart, ApplicationError> {
        let mut cart = self.cart_repository.find_or_create_by_user(user_id).await?;
        cart.clear();
        self.cart_repository.save(&cart).await?;
        Ok(cart)
    }
}
