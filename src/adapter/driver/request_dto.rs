use crate::domain::error::DomainError;
use crate::domain::model::{
    BookId, Currency, ListingCondition, ListingDraft, ListingUpdate, Money, OrderStatus,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 書籍登録用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct RegisterBookRequest {
    pub isbn: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// 出品作成用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct CreateListingRequest {
    pub book_id: Uuid,
    pub condition: String,
    pub condition_description: Option<String>,
    pub price: Decimal,
    /// 省略時はHUF
    pub currency: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub location: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl CreateListingRequest {
    /// ドメインの出品入力に変換
    pub fn into_draft(self) -> Result<ListingDraft, DomainError> {
        let currency = self
            .currency
            .unwrap_or_else(|| Currency::default().code().to_string());
        Ok(ListingDraft {
            book_id: BookId::from_uuid(self.book_id),
            condition: ListingCondition::from_string(&self.condition)?,
            condition_description: self.condition_description,
            price: Money::new(self.price, &currency)?,
            quantity: self.quantity,
            location: self.location,
            images: self.images,
        })
    }
}

/// 出品更新用のリクエストDTO
/// 指定されたフィールドだけを更新する
#[derive(Serialize, Deserialize, Default)]
pub struct UpdateListingRequest {
    pub condition: Option<String>,
    pub condition_description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<u32>,
    pub is_available: Option<bool>,
    pub location: Option<String>,
    pub images: Option<Vec<String>>,
}

impl UpdateListingRequest {
    pub fn into_update(self) -> Result<ListingUpdate, DomainError> {
        let condition = self
            .condition
            .as_deref()
            .map(ListingCondition::from_string)
            .transpose()?;
        Ok(ListingUpdate {
            condition,
            condition_description: self.condition_description,
            price: self.price,
            quantity: self.quantity,
            is_available: self.is_available,
            location: self.location,
            images: self.images,
        })
    }
}

/// カート追加用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct AddToCartRequest {
    pub listing_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// カート明細の数量変更用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: u32,
}

/// チェックアウト用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: String,
    pub payment_method: Option<String>,
}

/// 注文ステータス更新用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

impl UpdateOrderStatusRequest {
    pub fn status(&self) -> Result<OrderStatus, DomainError> {
        OrderStatus::from_string(&self.status)
    }
}
