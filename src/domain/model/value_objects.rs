use crate::domain::error::DomainError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// UUIDを内部に持つ識別子型を定義する
macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// 新しい一意の識別子を生成
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// UUIDから識別子を作成
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// 文字列から識別子を作成
            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                let uuid = Uuid::parse_str(s)?;
                Ok(Self(uuid))
            }

            /// 内部のUUIDを取得
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

uuid_identifier!(
    /// 出品の一意識別子
    ListingId
);
uuid_identifier!(
    /// 書籍（カタログ）の一意識別子
    BookId
);
uuid_identifier!(
    /// カートの一意識別子
    CartId
);
uuid_identifier!(
    /// カート明細の一意識別子
    CartItemId
);
uuid_identifier!(
    /// 注文の一意識別子
    OrderId
);
uuid_identifier!(
    /// 注文明細の一意識別子
    OrderItemId
);

/// ユーザーの識別子
/// 認証基盤から渡される整数IDをそのまま保持する
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(i64);

impl UserId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ユーザーのロール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    /// 文字列からUserRoleを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            _ => Err(DomainError::InvalidValue(format!("無効なロール: {}", s))),
        }
    }
}

/// 操作を行うユーザー（認証済み）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: UserId, role: UserRole) -> Self {
        Self { user_id, role }
    }

    /// 一般ユーザーとしてのActorを作成
    pub fn user(user_id: UserId) -> Self {
        Self::new(user_id, UserRole::User)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// 通貨
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Currency {
    /// ハンガリー・フォリント（既定）
    #[allow(clippy::upper_case_acronyms)]
    HUF,
    /// ユーロ
    #[allow(clippy::upper_case_acronyms)]
    EUR,
    /// 米ドル
    #[allow(clippy::upper_case_acronyms)]
    USD,
}

impl Currency {
    /// 通貨コードから作成
    pub fn from_code(code: &str) -> Result<Self, DomainError> {
        match code {
            "HUF" => Ok(Currency::HUF),
            "EUR" => Ok(Currency::EUR),
            "USD" => Ok(Currency::USD),
            _ => Err(DomainError::InvalidValue(format!(
                "サポートされていない通貨: {}",
                code
            ))),
        }
    }

    /// 通貨コードを取得
    pub fn code(&self) -> &'static str {
        match self {
            Currency::HUF => "HUF",
            Currency::EUR => "EUR",
            Currency::USD => "USD",
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::HUF
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// 金額を表す値オブジェクト
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// 金額と通貨コードから作成
    pub fn new(amount: Decimal, currency: &str) -> Result<Self, DomainError> {
        let currency = Currency::from_code(currency)?;
        Ok(Self { amount, currency })
    }

    /// 金額と通貨から作成
    pub fn of(amount: impl Into<Decimal>, currency: Currency) -> Self {
        Self {
            amount: amount.into(),
            currency,
        }
    }

    /// フォリントの金額を作成
    pub fn huf(amount: impl Into<Decimal>) -> Self {
        Self::of(amount, Currency::HUF)
    }

    /// 指定通貨のゼロ金額
    pub fn zero(currency: Currency) -> Self {
        Self::of(Decimal::ZERO, currency)
    }

    /// 金額を取得
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// 通貨を取得
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// 金額を加算
    pub fn add(&self, other: &Money) -> Result<Money, DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch);
        }
        Ok(Money {
            amount: self.amount + other.amount,
            currency: self.currency,
        })
    }

    /// 金額を乗算
    pub fn multiply(&self, factor: u32) -> Money {
        Money {
            amount: self.amount * Decimal::from(factor),
            currency: self.currency,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// カート明細・出品の数量
/// 1〜100の範囲のみ許可する
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 100;

    /// 数量を作成
    /// 範囲外の場合はInvalidQuantity
    pub fn new(value: u32) -> Result<Self, DomainError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(DomainError::InvalidQuantity(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// 数量を加算（上限を超える場合はエラー）
    pub fn checked_add(&self, other: Quantity) -> Result<Quantity, DomainError> {
        Quantity::new(self.0 + other.0)
    }
}

/// 出品の状態（コンディション）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingCondition {
    Mint,
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ListingCondition {
    /// 文字列からListingConditionを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "mint" => Ok(ListingCondition::Mint),
            "excellent" => Ok(ListingCondition::Excellent),
            "good" => Ok(ListingCondition::Good),
            "fair" => Ok(ListingCondition::Fair),
            "poor" => Ok(ListingCondition::Poor),
            _ => Err(DomainError::InvalidValue(format!(
                "無効なコンディション: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for ListingCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let condition_str = match self {
            ListingCondition::Mint => "mint",
            ListingCondition::Excellent => "excellent",
            ListingCondition::Good => "good",
            ListingCondition::Fair => "fair",
            ListingCondition::Poor => "poor",
        };
        write!(f, "{}", condition_str)
    }
}

/// 配送先住所を表す値オブジェクト
/// 自由書式の1行住所（最大500文字）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress(String);

impl ShippingAddress {
    const MAX_LENGTH: usize = 500;

    /// 新しい配送先住所を作成
    /// バリデーション:
    /// - 空白のみは不可
    /// - 500文字以内
    pub fn new(address: String) -> Result<Self, DomainError> {
        if address.trim().is_empty() {
            return Err(DomainError::InvalidAddress(
                "配送先住所は必須です".to_string(),
            ));
        }
        if address.chars().count() > Self::MAX_LENGTH {
            return Err(DomainError::InvalidAddress(format!(
                "配送先住所は{}文字以内である必要があります",
                Self::MAX_LENGTH
            )));
        }
        Ok(Self(address))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 支払い方法（最大50文字）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod(String);

impl PaymentMethod {
    const MAX_LENGTH: usize = 50;

    pub fn new(method: String) -> Result<Self, DomainError> {
        if method.chars().count() > Self::MAX_LENGTH {
            return Err(DomainError::InvalidValue(format!(
                "支払い方法は{}文字以内である必要があります",
                Self::MAX_LENGTH
            )));
        }
        Ok(Self(method))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 注文のステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// 保留中（チェックアウト直後）
    Pending,
    /// 支払い済み
    Paid,
    /// 発送済み
    Shipped,
    /// 配達完了
    Delivered,
    /// キャンセル済み
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status_str = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", status_str)
    }
}

impl OrderStatus {
    /// 文字列からOrderStatusを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(DomainError::InvalidValue(format!(
                "無効な注文ステータス: {}",
                s
            ))),
        }
    }

    /// 終端状態か（配達完了・キャンセル済み）
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// 厳格な遷移表で許可される遷移か
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Paid)
                | (OrderStatus::Pending, OrderStatus::Shipped)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Paid, OrderStatus::Shipped)
                | (OrderStatus::Paid, OrderStatus::Cancelled)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
        )
    }
}

/// 販売者によるステータス更新の方針
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusTransitionPolicy {
    /// 現在のステータスに関係なく任意の値を受け付ける
    #[default]
    Permissive,
    /// 遷移表に従う
    Strict,
}

impl StatusTransitionPolicy {
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "permissive" => Ok(StatusTransitionPolicy::Permissive),
            "strict" => Ok(StatusTransitionPolicy::Strict),
            _ => Err(DomainError::InvalidValue(format!(
                "無効なステータス遷移ポリシー: {}",
                s
            ))),
        }
    }
}
