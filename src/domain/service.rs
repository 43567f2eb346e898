// ドメインサービス
// カートと出品、注文の複数の集約にまたがるチェックアウトのルールを実装

use std::collections::HashMap;

use crate::domain::error::DomainError;
use crate::domain::model::{
    Cart, CartItem, Listing, ListingId, Order, OrderId, OrderItem, OrderItemId, PaymentMethod,
    ShippingAddress, UserId,
};

/// 同じ販売者の出品を参照するカート明細のまとまり
#[derive(Debug)]
pub struct SellerGroup<'a> {
    pub seller_id: UserId,
    pub items: Vec<&'a CartItem>,
}

/// チェックアウトサービス
/// カートの検証、販売者ごとの分割、注文の組み立てを担当する。
/// 永続化は行わない
pub struct CheckoutService;

impl CheckoutService {
    /// カートの全明細を現在の出品に対して検証する
    ///
    /// 明細の順に検査し、最初に失敗した明細のエラーを返す:
    /// - 出品が存在しない、または非公開 → ListingUnavailable
    /// - 在庫数が明細の数量より少ない → InsufficientStock
    ///
    /// # Arguments
    /// * `cart` - 検証するカート
    /// * `listings` - 明細が参照する出品（出品IDで引ける）
    pub fn validate_cart(
        cart: &Cart,
        listings: &HashMap<ListingId, Listing>,
    ) -> Result<(), DomainError> {
        if cart.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        for item in cart.items() {
            let listing = listings.get(&item.listing_id()).ok_or(
                DomainError::ListingUnavailable {
                    listing_id: item.listing_id(),
                },
            )?;
            listing.ensure_purchasable(item.quantity())?;
        }

        Ok(())
    }

    /// 明細を販売者ごとに分割する
    /// グループは各販売者が最初に現れた順に並ぶ
    ///
    /// 出品が見つからない明細は含めない（事前に`validate_cart`で検証すること）
    pub fn partition_by_seller<'a>(
        cart: &'a Cart,
        listings: &HashMap<ListingId, Listing>,
    ) -> Vec<SellerGroup<'a>> {
        let mut groups: Vec<SellerGroup<'a>> = Vec::new();

        for item in cart.items() {
            let Some(listing) = listings.get(&item.listing_id()) else {
                continue;
            };
            let seller_id = listing.seller_id();
            match groups.iter_mut().find(|group| group.seller_id == seller_id) {
                Some(group) => group.items.push(item),
                None => groups.push(SellerGroup {
                    seller_id,
                    items: vec![item],
                }),
            }
        }

        groups
    }

    /// 検証済みのカートから販売者ごとの注文を組み立てる
    ///
    /// 注文明細の単価はカートに記録された価格を使い、現在の出品価格は参照しない。
    /// 配送先住所と支払い方法は全注文で共通
    ///
    /// # Returns
    /// * `Ok(Vec<Order>)` - 販売者の出現順に並んだPendingの注文
    /// * `Err(DomainError)` - 検証失敗、または1つの販売者内で通貨が混在
    pub fn build_orders<FO, FI>(
        cart: &Cart,
        listings: &HashMap<ListingId, Listing>,
        shipping_address: ShippingAddress,
        payment_method: Option<PaymentMethod>,
        mut next_order_id: FO,
        mut next_item_id: FI,
    ) -> Result<Vec<Order>, DomainError>
    where
        FO: FnMut() -> OrderId,
        FI: FnMut() -> OrderItemId,
    {
        Self::validate_cart(cart, listings)?;

        let mut orders = Vec::new();
        for group in Self::partition_by_seller(cart, listings) {
            let items = group
                .items
                .iter()
                .map(|item| {
                    OrderItem::new(
                        next_item_id(),
                        item.listing_id(),
                        item.quantity(),
                        item.price(),
                    )
                })
                .collect::<Result<Vec<_>, _>>()?;

            let order = Order::place(
                next_order_id(),
                cart.user_id(),
                group.seller_id,
                items,
                shipping_address.clone(),
                payment_method.clone(),
            )?;
            orders.push(order);
        }

        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        BookId, CartId, CartItemId, ListingCondition, ListingDraft, ListingUpdate, Money,
        OrderStatus, Quantity,
    };
    use rust_decimal::Decimal;

    fn listing(seller: i64, price: i64, quantity: u32) -> Listing {
        Listing::create(
            ListingId::new(),
            UserId::new(seller),
            ListingDraft {
                book_id: BookId::new(),
                condition: ListingCondition::Good,
                condition_description: None,
                price: Money::huf(price),
                quantity,
                location: None,
                images: Vec::new(),
            },
        )
        .unwrap()
    }

    fn index(listings: &[Listing]) -> HashMap<ListingId, Listing> {
        listings.iter().map(|l| (l.id(), l.clone())).collect()
    }

    fn cart_with(entries: &[(&Listing, u32)]) -> Cart {
        let mut cart = Cart::new(CartId::new(), UserId::new(1));
        for (listing, quantity) in entries {
            cart.add_item(CartItemId::new(), listing, Quantity::new(*quantity).unwrap())
                .unwrap();
        }
        cart
    }

    fn address() -> ShippingAddress {
        ShippingAddress::new("1051 Budapest, Váci utca 1.".to_string()).unwrap()
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let cart = Cart::new(CartId::new(), UserId::new(1));
        let result = CheckoutService::validate_cart(&cart, &HashMap::new());
        assert_eq!(result, Err(DomainError::EmptyCart));
    }

    #[test]
    fn test_first_failing_item_wins() {
        let a = listing(10, 1000, 1);
        let b = listing(10, 1000, 5);
        let cart = cart_with(&[(&a, 1), (&b, 2)]);

        // aを非公開に、bを在庫不足にする
        let mut a_live = a.clone();
        a_live
            .apply_update(ListingUpdate {
                is_available: Some(false),
                ..ListingUpdate::default()
            })
            .unwrap();
        let mut b_live = b.clone();
        b_live
            .apply_update(ListingUpdate {
                quantity: Some(1),
                ..ListingUpdate::default()
            })
            .unwrap();

        let result = CheckoutService::validate_cart(&cart, &index(&[a_live, b_live]));
        assert_eq!(result, Err(DomainError::ListingUnavailable { listing_id: a.id() }));
    }

    #[test]
    fn test_missing_listing_is_unavailable() {
        let a = listing(10, 1000, 1);
        let cart = cart_with(&[(&a, 1)]);

        let result = CheckoutService::validate_cart(&cart, &HashMap::new());
        assert_eq!(result, Err(DomainError::ListingUnavailable { listing_id: a.id() }));
    }

    #[test]
    fn test_partition_keeps_first_occurrence_order() {
        let s2_a = listing(20, 1000, 5);
        let s1_a = listing(10, 1000, 5);
        let s2_b = listing(20, 1000, 5);
        let cart = cart_with(&[(&s2_a, 1), (&s1_a, 1), (&s2_b, 1)]);
        let listings = index(&[s2_a, s1_a, s2_b]);

        let groups = CheckoutService::partition_by_seller(&cart, &listings);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].seller_id, UserId::new(20));
        assert_eq!(groups[0].items.len(), 2);
        assert_eq!(groups[1].seller_id, UserId::new(10));
        assert_eq!(groups[1].items.len(), 1);
    }

    #[test]
    fn test_build_orders_uses_cart_captured_price() {
        let l = listing(10, 1000, 2);
        let cart = cart_with(&[(&l, 2)]);

        // カート追加後に出品価格が上がっても注文には影響しない
        let mut live = l.clone();
        live.apply_update(ListingUpdate {
            price: Some(Decimal::from(5000)),
            ..ListingUpdate::default()
        })
        .unwrap();

        let orders = CheckoutService::build_orders(
            &cart,
            &index(&[live]),
            address(),
            None,
            OrderId::new,
            OrderItemId::new,
        )
        .unwrap();

        assert_eq!(orders.len(), 1);
        let order = &orders[0];
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.total_amount(), Money::huf(2000));
        assert_eq!(order.items()[0].price_at_purchase(), Money::huf(1000));
        assert_eq!(order.items()[0].quantity(), 2);
        assert_eq!(order.buyer_id(), UserId::new(1));
        assert_eq!(order.seller_id(), UserId::new(10));
    }

    #[test]
    fn test_build_orders_one_per_seller() {
        let s1 = listing(10, 1000, 5);
        let s2 = listing(20, 300, 5);
        let cart = cart_with(&[(&s1, 2), (&s2, 3)]);

        let orders = CheckoutService::build_orders(
            &cart,
            &index(&[s1, s2]),
            address(),
            Some(PaymentMethod::new("cash".to_string()).unwrap()),
            OrderId::new,
            OrderItemId::new,
        )
        .unwrap();

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].total_amount(), Money::huf(2000));
        assert_eq!(orders[1].total_amount(), Money::huf(900));
        // 配送先は全注文で共通
        assert_eq!(orders[0].shipping_address(), orders[1].shipping_address());
        assert_eq!(
            orders[1].payment_method().map(|p| p.as_str()),
            Some("cash")
        );
    }
}
