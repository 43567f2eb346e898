use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::error::DomainError;
use crate::domain::model::{BookId, ListingCondition, ListingId, Money, Quantity, UserId};

const MIN_PRICE: i64 = 100;
const MAX_PRICE: i64 = 1_000_000;
const MAX_CONDITION_DESCRIPTION_LENGTH: usize = 1000;
const MAX_LOCATION_LENGTH: usize = 200;

/// 出品作成時の入力
#[derive(Debug, Clone)]
pub struct ListingDraft {
    pub book_id: BookId,
    pub condition: ListingCondition,
    pub condition_description: Option<String>,
    pub price: Money,
    pub quantity: u32,
    pub location: Option<String>,
    pub images: Vec<String>,
}

/// 出品の部分更新
/// Noneのフィールドは変更しない
#[derive(Debug, Clone, Default)]
pub struct ListingUpdate {
    pub condition: Option<ListingCondition>,
    pub condition_description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<u32>,
    pub is_available: Option<bool>,
    pub location: Option<String>,
    pub images: Option<Vec<String>>,
}

impl ListingUpdate {
    /// 指定されたフィールドだけを検証する
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(quantity) = self.quantity {
            Quantity::new(quantity)?;
        }
        validate_optional_text(
            self.condition_description.as_deref(),
            MAX_CONDITION_DESCRIPTION_LENGTH,
            "状態の説明",
        )?;
        validate_optional_text(self.location.as_deref(), MAX_LOCATION_LENGTH, "所在地")
    }
}

/// 出品集約
/// 販売者が特定の書籍を販売する申し出。価格・在庫・公開状態を管理する
///
/// `is_available == (quantity > 0)` はチェックアウトとキャンセルの時だけ維持される。
/// 手動更新では両者を独立に変更できる。
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    id: ListingId,
    seller_id: UserId,
    book_id: BookId,
    condition: ListingCondition,
    condition_description: Option<String>,
    price: Money,
    quantity: u32,
    is_available: bool,
    location: Option<String>,
    images: Vec<String>,
    views_count: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Listing {
    /// 新しい出品を作成
    /// 作成直後から公開状態になる
    pub fn create(id: ListingId, seller_id: UserId, draft: ListingDraft) -> Result<Self, DomainError> {
        validate_price(draft.price.amount())?;
        let quantity = Quantity::new(draft.quantity)?;
        validate_optional_text(
            draft.condition_description.as_deref(),
            MAX_CONDITION_DESCRIPTION_LENGTH,
            "状態の説明",
        )?;
        validate_optional_text(draft.location.as_deref(), MAX_LOCATION_LENGTH, "所在地")?;

        let now = Utc::now();
        Ok(Self {
            id,
            seller_id,
            book_id: draft.book_id,
            condition: draft.condition,
            condition_description: draft.condition_description,
            price: draft.price,
            quantity: quantity.value(),
            is_available: true,
            location: draft.location,
            images: draft.images,
            views_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// データベースから取得したデータで出品を再構築
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: ListingId,
        seller_id: UserId,
        book_id: BookId,
        condition: ListingCondition,
        condition_description: Option<String>,
        price: Money,
        quantity: u32,
        is_available: bool,
        location: Option<String>,
        images: Vec<String>,
        views_count: u64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            seller_id,
            book_id,
            condition,
            condition_description,
            price,
            quantity,
            is_available,
            location,
            images,
            views_count,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> ListingId {
        self.id
    }

    pub fn seller_id(&self) -> UserId {
        self.seller_id
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn condition(&self) -> ListingCondition {
        self.condition
    }

    pub fn condition_description(&self) -> Option<&str> {
        self.condition_description.as_deref()
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn is_available(&self) -> bool {
        self.is_available
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn views_count(&self) -> u64 {
        self.views_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// 指定数量を購入できるか検証する
    /// 公開状態を先に確認し、次に在庫数を確認する
    pub fn ensure_purchasable(&self, quantity: u32) -> Result<(), DomainError> {
        if !self.is_available {
            return Err(DomainError::ListingUnavailable {
                listing_id: self.id,
            });
        }
        if self.quantity < quantity {
            return Err(DomainError::InsufficientStock {
                listing_id: self.id,
                requested: quantity,
                available: self.quantity,
            });
        }
        Ok(())
    }

    /// 在庫を引き当てる
    /// 在庫が0になったら非公開にする
    pub fn decrement_stock(&mut self, quantity: u32) -> Result<(), DomainError> {
        self.ensure_purchasable(quantity)?;
        self.quantity -= quantity;
        if self.quantity == 0 {
            self.is_available = false;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 在庫を戻す（注文キャンセル時）
    /// 手動で非公開にされていた場合でも公開状態に戻す
    pub fn restock(&mut self, quantity: u32) {
        self.quantity += quantity;
        self.is_available = true;
        self.updated_at = Utc::now();
    }

    /// 部分更新を適用する
    /// 公開状態と在庫数の整合は取らない
    pub fn apply_update(&mut self, update: ListingUpdate) -> Result<(), DomainError> {
        update.validate()?;

        if let Some(condition) = update.condition {
            self.condition = condition;
        }
        if let Some(description) = update.condition_description {
            self.condition_description = Some(description);
        }
        if let Some(price) = update.price {
            self.price = Money::of(price, self.price.currency());
        }
        if let Some(quantity) = update.quantity {
            self.quantity = quantity;
        }
        if let Some(is_available) = update.is_available {
            self.is_available = is_available;
        }
        if let Some(location) = update.location {
            self.location = Some(location);
        }
        if let Some(images) = update.images {
            self.images = images;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 閲覧数を1増やす
    pub fn record_view(&mut self) {
        self.views_count += 1;
    }

    /// 出品者本人または管理者か
    pub fn can_be_managed_by(&self, user_id: UserId, is_admin: bool) -> bool {
        self.seller_id == user_id || is_admin
    }
}

fn validate_price(price: Decimal) -> Result<(), DomainError> {
    if price < Decimal::from(MIN_PRICE) || price > Decimal::from(MAX_PRICE) {
        return Err(DomainError::InvalidValue(format!(
            "価格は{}〜{}の範囲である必要があります: {}",
            MIN_PRICE, MAX_PRICE, price
        )));
    }
    Ok(())
}

fn validate_optional_text(
    value: Option<&str>,
    max_length: usize,
    field: &str,
) -> Result<(), DomainError> {
    match value {
        Some(text) if text.chars().count() > max_length => Err(DomainError::InvalidValue(format!(
            "{}は{}文字以内である必要があります",
            field, max_length
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(price: i64, quantity: u32) -> ListingDraft {
        ListingDraft {
            book_id: BookId::new(),
            condition: ListingCondition::Good,
            condition_description: None,
            price: Money::huf(price),
            quantity,
            location: Some("Budapest".to_string()),
            images: vec!["https://example.com/cover.jpg".to_string()],
        }
    }

    fn listing(quantity: u32) -> Listing {
        Listing::create(ListingId::new(), UserId::new(1), draft(1000, quantity)).unwrap()
    }

    #[test]
    fn test_new_listing_is_available() {
        let listing = listing(3);
        assert!(listing.is_available());
        assert_eq!(listing.quantity(), 3);
        assert_eq!(listing.views_count(), 0);
    }

    #[test]
    fn test_create_rejects_price_out_of_range() {
        assert!(Listing::create(ListingId::new(), UserId::new(1), draft(99, 1)).is_err());
        assert!(Listing::create(ListingId::new(), UserId::new(1), draft(1_000_001, 1)).is_err());
    }

    #[test]
    fn test_create_rejects_quantity_out_of_range() {
        assert!(Listing::create(ListingId::new(), UserId::new(1), draft(1000, 0)).is_err());
        assert!(Listing::create(ListingId::new(), UserId::new(1), draft(1000, 101)).is_err());
    }

    #[test]
    fn test_decrement_to_zero_marks_unavailable() {
        let mut listing = listing(2);
        listing.decrement_stock(2).unwrap();
        assert_eq!(listing.quantity(), 0);
        assert!(!listing.is_available());
    }

    #[test]
    fn test_partial_decrement_keeps_available() {
        let mut listing = listing(5);
        listing.decrement_stock(2).unwrap();
        assert_eq!(listing.quantity(), 3);
        assert!(listing.is_available());
    }

    #[test]
    fn test_decrement_insufficient_stock() {
        let mut listing = listing(1);
        let result = listing.decrement_stock(2);
        assert!(matches!(
            result,
            Err(DomainError::InsufficientStock {
                requested: 2,
                available: 1,
                ..
            })
        ));
        assert_eq!(listing.quantity(), 1); // 在庫数は変わらない
    }

    #[test]
    fn test_unavailable_listing_is_checked_before_stock() {
        let mut listing = listing(1);
        listing
            .apply_update(ListingUpdate {
                is_available: Some(false),
                ..ListingUpdate::default()
            })
            .unwrap();
        assert!(matches!(
            listing.ensure_purchasable(5),
            Err(DomainError::ListingUnavailable { .. })
        ));
    }

    #[test]
    fn test_restock_forces_availability() {
        let mut listing = listing(1);
        listing
            .apply_update(ListingUpdate {
                is_available: Some(false),
                ..ListingUpdate::default()
            })
            .unwrap();
        listing.restock(2);
        assert_eq!(listing.quantity(), 3);
        assert!(listing.is_available());
    }

    #[test]
    fn test_manual_update_does_not_reconcile_availability() {
        let mut listing = listing(2);
        listing.decrement_stock(2).unwrap();
        listing
            .apply_update(ListingUpdate {
                is_available: Some(true),
                ..ListingUpdate::default()
            })
            .unwrap();

        // 在庫0のまま公開状態になる
        assert_eq!(listing.quantity(), 0);
        assert!(listing.is_available());
    }

    #[test]
    fn test_update_validate_checks_only_given_fields() {
        assert!(ListingUpdate::default().validate().is_ok());
        assert!(ListingUpdate {
            quantity: Some(0),
            ..ListingUpdate::default()
        }
        .validate()
        .is_err());
        assert!(ListingUpdate {
            price: Some(Decimal::from(50)),
            ..ListingUpdate::default()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_update_keeps_currency_and_validates_price() {
        let mut listing = listing(2);
        listing
            .apply_update(ListingUpdate {
                price: Some(Decimal::from(2500)),
                ..ListingUpdate::default()
            })
            .unwrap();
        assert_eq!(listing.price(), Money::huf(2500));

        let result = listing.apply_update(ListingUpdate {
            price: Some(Decimal::from(50)),
            ..ListingUpdate::default()
        });
        assert!(result.is_err());
        assert_eq!(listing.price(), Money::huf(2500));
    }

    #[test]
    fn test_record_view() {
        let mut listing = listing(1);
        listing.record_view();
        listing.record_view();
        assert_eq!(listing.views_count(), 2);
    }

    #[test]
    fn test_can_be_managed_by_owner_or_admin() {
        let listing = listing(1);
        assert!(listing.can_be_managed_by(UserId::new(1), false));
        assert!(!listing.can_be_managed_by(UserId::new(2), false));
        assert!(listing.can_be_managed_by(UserId::new(2), true));
    }
}
