use crate::application::service::CheckoutReceipt;
use crate::domain::model::{Book, Cart, CartItem, Listing, Money, Order, OrderItem};
use serde::Serialize;

/// 金額のレスポンスDTO
/// 金額は丸め誤差を避けるため文字列で返す
#[derive(Serialize)]
pub struct MoneyResponse {
    pub amount: String,
    pub currency: String,
}

impl MoneyResponse {
    pub fn from_money(money: Money) -> Self {
        Self {
            amount: money.amount().to_string(),
            currency: money.currency().code().to_string(),
        }
    }
}

/// 書籍用のレスポンスDTO
#[derive(Serialize)]
pub struct BookResponse {
    pub id: String,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub categories: Vec<String>,
}

impl BookResponse {
    pub fn from_book(book: &Book) -> Self {
        Self {
            id: book.id().to_string(),
            isbn: book.isbn().to_string(),
            title: book.title().to_string(),
            author: book.author().to_string(),
            categories: book.categories().to_vec(),
        }
    }
}

/// 出品用のレスポンスDTO
#[derive(Serialize)]
pub struct ListingResponse {
    pub id: String,
    pub seller_id: i64,
    pub book_id: String,
    pub condition: String,
    pub condition_description: Option<String>,
    pub price: MoneyResponse,
    pub quantity: u32,
    pub is_available: bool,
    pub location: Option<String>,
    pub images: Vec<String>,
    pub views_count: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl ListingResponse {
    /// ドメインオブジェクトからListingResponseを作成
    pub fn from_listing(listing: &Listing) -> Self {
        Self {
            id: listing.id().to_string(),
            seller_id: listing.seller_id().value(),
            book_id: listing.book_id().to_string(),
            condition: listing.condition().to_string(),
            condition_description: listing.condition_description().map(str::to_string),
            price: MoneyResponse::from_money(listing.price()),
            quantity: listing.quantity(),
            is_available: listing.is_available(),
            location: listing.location().map(str::to_string),
            images: listing.images().to_vec(),
            views_count: listing.views_count(),
            created_at: listing.created_at().to_rfc3339(),
            updated_at: listing.updated_at().to_rfc3339(),
        }
    }
}

/// カート明細用のレスポンスDTO
#[derive(Serialize)]
pub struct CartItemResponse {
    pub id: String,
    pub listing_id: String,
    pub quantity: u32,
    pub price: MoneyResponse,
    pub subtotal: MoneyResponse,
}

impl CartItemResponse {
    pub fn from_cart_item(item: &CartItem) -> Self {
        Self {
            id: item.id().to_string(),
            listing_id: item.listing_id().to_string(),
            quantity: item.quantity(),
            price: MoneyResponse::from_money(item.price()),
            subtotal: MoneyResponse::from_money(item.subtotal()),
        }
    }
}

/// カート用のレスポンスDTO
#[derive(Serialize)]
pub struct CartResponse {
    pub id: String,
    pub user_id: i64,
    pub items: Vec<CartItemResponse>,
    /// 通貨ごとの合計
    pub totals: Vec<MoneyResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl CartResponse {
    /// ドメインオブジェクトからCartResponseを作成
    pub fn from_cart(cart: &Cart) -> Self {
        Self {
            id: cart.id().to_string(),
            user_id: cart.user_id().value(),
            items: cart
                .items()
                .iter()
                .map(CartItemResponse::from_cart_item)
                .collect(),
            totals: cart
                .totals_by_currency()
                .into_iter()
                .map(MoneyResponse::from_money)
                .collect(),
            created_at: cart.created_at().to_rfc3339(),
            updated_at: cart.updated_at().to_rfc3339(),
        }
    }
}

/// チェックアウト結果用のレスポンスDTO
#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order_ids: Vec<String>,
    pub total_orders: usize,
}

impl CheckoutResponse {
    pub fn from_receipt(receipt: &CheckoutReceipt) -> Self {
        Self {
            order_ids: receipt.order_ids.iter().map(ToString::to_string).collect(),
            total_orders: receipt.total_orders,
        }
    }
}

/// 注文明細用のレスポンスDTO
#[derive(Serialize)]
pub struct OrderItemResponse {
    pub id: String,
    pub listing_id: String,
    pub quantity: u32,
    pub price_at_purchase: MoneyResponse,
    pub subtotal: MoneyResponse,
}

impl OrderItemResponse {
    pub fn from_order_item(item: &OrderItem) -> Self {
        Self {
            id: item.id().to_string(),
            listing_id: item.listing_id().to_string(),
            quantity: item.quantity(),
            price_at_purchase: MoneyResponse::from_money(item.price_at_purchase()),
            subtotal: MoneyResponse::from_money(item.subtotal()),
        }
    }
}

/// 注文用のレスポンスDTO
#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub total_amount: MoneyResponse,
    pub shipping_address: String,
    pub payment_method: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl OrderResponse {
    /// ドメインオブジェクトからOrderResponseを作成
    pub fn from_order(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            buyer_id: order.buyer_id().value(),
            seller_id: order.seller_id().value(),
            status: order.status().to_string(),
            items: order
                .items()
                .iter()
                .map(OrderItemResponse::from_order_item)
                .collect(),
            total_amount: MoneyResponse::from_money(order.total_amount()),
            shipping_address: order.shipping_address().as_str().to_string(),
            payment_method: order.payment_method().map(|p| p.as_str().to_string()),
            created_at: order.created_at().to_rfc3339(),
            updated_at: order.updated_at().to_rfc3339(),
        }
    }
}
