// ドメインモデル（エンティティと値オブジェクト）

mod book;
mod cart;
mod listing;
mod order;
mod value_objects;

pub use value_objects::{
    Actor, BookId, CartId, CartItemId, Currency, ListingCondition, ListingId, Money, OrderId,
    OrderItemId, OrderStatus, PaymentMethod, Quantity, ShippingAddress, StatusTransitionPolicy,
    UserId, UserRole,
};

pub use book::Book;
pub use cart::{Cart, CartItem};
pub use listing::{Listing, ListingDraft, ListingUpdate};
pub use order::{Order, OrderItem};
