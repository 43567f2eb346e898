use chrono::{DateTime, Utc};

use crate::domain::error::DomainError;
use crate::domain::model::{CartId, CartItemId, Listing, ListingId, Money, Quantity, UserId};

/// カート明細
/// 追加時点の出品価格を保持する
#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    id: CartItemId,
    listing_id: ListingId,
    quantity: Quantity,
    price: Money,
}

impl CartItem {
    pub fn new(id: CartItemId, listing_id: ListingId, quantity: Quantity, price: Money) -> Self {
        Self {
            id,
            listing_id,
            quantity,
            price,
        }
    }

    pub fn id(&self) -> CartItemId {
        self.id
    }

    pub fn listing_id(&self) -> ListingId {
        self.listing_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity.value()
    }

    /// 追加時に記録した単価
    pub fn price(&self) -> Money {
        self.price
    }

    /// 小計を計算（単価 × 数量）
    pub fn subtotal(&self) -> Money {
        self.price.multiply(self.quantity.value())
    }
}

/// カート集約
/// ユーザーごとに1つだけ存在し、最初のアクセス時に作成される
#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    id: CartId,
    user_id: UserId,
    items: Vec<CartItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// 空のカートを作成
    pub fn new(id: CartId, user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// データベースから取得したデータでカートを再構築
    pub fn reconstruct(
        id: CartId,
        user_id: UserId,
        items: Vec<CartItem>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            items,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> CartId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn item(&self, item_id: CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 出品をカートに追加
    /// 同じ出品が既にある場合は数量を増やし、単価を現在の出品価格に更新する
    ///
    /// # Returns
    /// * 追加または更新されたカート明細のID
    pub fn add_item(
        &mut self,
        new_item_id: CartItemId,
        listing: &Listing,
        quantity: Quantity,
    ) -> Result<CartItemId, DomainError> {
        listing.ensure_purchasable(quantity.value())?;

        let item_id = if let Some(existing) = self
            .items
            .iter_mut()
            .find(|item| item.listing_id == listing.id())
        {
            existing.quantity = existing.quantity.checked_add(quantity)?;
            existing.price = listing.price();
            existing.id
        } else {
            self.items.push(CartItem::new(
                new_item_id,
                listing.id(),
                quantity,
                listing.price(),
            ));
            new_item_id
        };

        self.touch();
        Ok(item_id)
    }

    /// カート明細の数量を変更
    /// 単価は更新しない
    pub fn update_item_quantity(
        &mut self,
        item_id: CartItemId,
        listing: &Listing,
        quantity: Quantity,
    ) -> Result<(), DomainError> {
        if listing.quantity() < quantity.value() {
            return Err(DomainError::InsufficientStock {
                listing_id: listing.id(),
                requested: quantity.value(),
                available: listing.quantity(),
            });
        }

        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| {
                DomainError::InvalidValue(format!("カート明細が存在しません: {}", item_id))
            })?;
        item.quantity = quantity;

        self.touch();
        Ok(())
    }

    /// カート明細を削除
    ///
    /// # Returns
    /// * `true` - 削除した
    /// * `false` - 該当する明細がなかった
    pub fn remove_item(&mut self, item_id: CartItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != item_id);
        let removed = self.items.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// カートを空にする
    pub fn clear(&mut self) {
        self.items.clear();
        self.touch();
    }

    /// 通貨ごとの合計金額を計算
    pub fn totals_by_currency(&self) -> Vec<Money> {
        let mut totals: Vec<Money> = Vec::new();
        for subtotal in self.items.iter().map(CartItem::subtotal) {
            match totals
                .iter_mut()
                .find(|total| total.currency() == subtotal.currency())
            {
                Some(total) => *total = total.add(&subtotal).unwrap_or(*total),
                None => totals.push(subtotal),
            }
        }
        totals
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{BookId, Currency, ListingCondition, ListingDraft, ListingUpdate};
    use rust_decimal::Decimal;

    fn listing_with(price: i64, quantity: u32) -> Listing {
        Listing::create(
            ListingId::new(),
            UserId::new(10),
            ListingDraft {
                book_id: BookId::new(),
                condition: ListingCondition::Excellent,
                condition_description: None,
                price: Money::huf(price),
                quantity,
                location: None,
                images: Vec::new(),
            },
        )
        .unwrap()
    }

    fn qty(value: u32) -> Quantity {
        Quantity::new(value).unwrap()
    }

    #[test]
    fn test_new_cart_is_empty() {
        let cart = Cart::new(CartId::new(), UserId::new(1));
        assert!(cart.is_empty());
        assert!(cart.totals_by_currency().is_empty());
    }

    #[test]
    fn test_add_item_captures_price() {
        let mut cart = Cart::new(CartId::new(), UserId::new(1));
        let listing = listing_with(1000, 5);

        cart.add_item(CartItemId::new(), &listing, qty(2)).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].price(), Money::huf(1000));
        assert_eq!(cart.items()[0].quantity(), 2);
    }

    #[test]
    fn test_re_add_increases_quantity_and_refreshes_price() {
        let mut cart = Cart::new(CartId::new(), UserId::new(1));
        let mut listing = listing_with(1000, 10);
        let first_id = cart.add_item(CartItemId::new(), &listing, qty(2)).unwrap();

        listing
            .apply_update(ListingUpdate {
                price: Some(Decimal::from(1200)),
                ..ListingUpdate::default()
            })
            .unwrap();
        let second_id = cart.add_item(CartItemId::new(), &listing, qty(3)).unwrap();

        assert_eq!(first_id, second_id);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity(), 5);
        assert_eq!(cart.items()[0].price(), Money::huf(1200));
    }

    #[test]
    fn test_add_item_rejects_unavailable_listing() {
        let mut cart = Cart::new(CartId::new(), UserId::new(1));
        let mut listing = listing_with(1000, 1);
        listing.decrement_stock(1).unwrap();

        let result = cart.add_item(CartItemId::new(), &listing, qty(1));
        assert!(matches!(result, Err(DomainError::ListingUnavailable { .. })));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_item_rejects_more_than_stock() {
        let mut cart = Cart::new(CartId::new(), UserId::new(1));
        let listing = listing_with(1000, 1);

        let result = cart.add_item(CartItemId::new(), &listing, qty(2));
        assert!(matches!(result, Err(DomainError::InsufficientStock { .. })));
    }

    #[test]
    fn test_re_add_beyond_quantity_cap_fails() {
        let mut cart = Cart::new(CartId::new(), UserId::new(1));
        let listing = listing_with(1000, 100);
        cart.add_item(CartItemId::new(), &listing, qty(90)).unwrap();

        let result = cart.add_item(CartItemId::new(), &listing, qty(20));
        assert_eq!(result, Err(DomainError::InvalidQuantity(110)));
        assert_eq!(cart.items()[0].quantity(), 90);
    }

    #[test]
    fn test_update_item_quantity_keeps_price() {
        let mut cart = Cart::new(CartId::new(), UserId::new(1));
        let mut listing = listing_with(1000, 10);
        let item_id = cart.add_item(CartItemId::new(), &listing, qty(1)).unwrap();
        listing
            .apply_update(ListingUpdate {
                price: Some(Decimal::from(5000)),
                ..ListingUpdate::default()
            })
            .unwrap();

        cart.update_item_quantity(item_id, &listing, qty(4)).unwrap();

        assert_eq!(cart.items()[0].quantity(), 4);
        assert_eq!(cart.items()[0].price(), Money::huf(1000));
    }

    #[test]
    fn test_update_item_quantity_checks_stock() {
        let mut cart = Cart::new(CartId::new(), UserId::new(1));
        let listing = listing_with(1000, 3);
        let item_id = cart.add_item(CartItemId::new(), &listing, qty(1)).unwrap();

        let result = cart.update_item_quantity(item_id, &listing, qty(4));
        assert!(matches!(result, Err(DomainError::InsufficientStock { .. })));
        assert_eq!(cart.items()[0].quantity(), 1);
    }

    #[test]
    fn test_remove_item() {
        let mut cart = Cart::new(CartId::new(), UserId::new(1));
        let listing = listing_with(1000, 3);
        let item_id = cart.add_item(CartItemId::new(), &listing, qty(1)).unwrap();

        assert!(!cart.remove_item(CartItemId::new()));
        assert!(cart.remove_item(item_id));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_totals_by_currency() {
        let mut cart = Cart::new(CartId::new(), UserId::new(1));
        let a = listing_with(1000, 5);
        let b = listing_with(250, 5);
        cart.add_item(CartItemId::new(), &a, qty(2)).unwrap();
        cart.add_item(CartItemId::new(), &b, qty(4)).unwrap();

        let totals = cart.totals_by_currency();
        assert_eq!(totals, vec![Money::of(3000, Currency::HUF)]);
    }

    #[test]
    fn test_clear_refreshes_updated_at() {
        let mut cart = Cart::new(CartId::new(), UserId::new(1));
        let listing = listing_with(1000, 3);
        cart.add_item(CartItemId::new(), &listing, qty(1)).unwrap();
        let before = cart.updated_at();

        cart.clear();

        assert!(cart.is_empty());
        assert!(cart.updated_at() >= before);
    }
}
