use crate::domain::model::{ListingId, OrderStatus};

/// ドメイン層のエラー型
/// ビジネスルール違反を表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// カートが空の状態でチェックアウトしようとした
    #[error("Cart is empty")]
    EmptyCart,
    /// 出品が購入できない（非公開、または削除済み）
    #[error("Listing {listing_id} is not available")]
    ListingUnavailable { listing_id: ListingId },
    /// 在庫不足
    #[error("Insufficient stock for listing {listing_id}: requested {requested}, available {available}")]
    InsufficientStock {
        listing_id: ListingId,
        requested: u32,
        available: u32,
    },
    /// 操作者が注文の購入者・販売者、または出品者ではない
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// 許可されていないステータス遷移
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: OrderStatus, to: OrderStatus },
    /// 無効な数量（1〜100の範囲外）
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),
    /// 無効な住所
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    /// 通貨の不一致
    #[error("Currency mismatch")]
    CurrencyMismatch,
    /// 参照されている出品を削除しようとした
    #[error("Listing {listing_id} is referenced by carts or orders")]
    ListingInUse { listing_id: ListingId },
    /// 無効な値
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
