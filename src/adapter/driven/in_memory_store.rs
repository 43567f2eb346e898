use crate::domain::model::{
    Book, BookId, Cart, CartId, CartItemId, Listing, ListingId, ListingUpdate, Order, OrderId,
    OrderItemId, OrderStatus, UserId,
};
use crate::domain::port::{
    CartRepository, CatalogRepository, CheckoutStore, CheckoutStoreError, ListingDeletion,
    ListingRepository, OrderRepository, RepositoryError,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct StoreState {
    books: HashMap<BookId, Book>,
    /// 作成順
    listings: Vec<Listing>,
    carts: HashMap<UserId, Cart>,
    /// 作成順
    orders: Vec<Order>,
}

impl StoreState {
    fn listing_mut(&mut self, listing_id: ListingId) -> Option<&mut Listing> {
        self.listings.iter_mut().find(|l| l.id() == listing_id)
    }

    fn is_listing_referenced(&self, listing_id: ListingId) -> bool {
        let in_carts = self
            .carts
            .values()
            .flat_map(|cart| cart.items())
            .any(|item| item.listing_id() == listing_id);
        let in_orders = self
            .orders
            .iter()
            .flat_map(|order| order.items())
            .any(|item| item.listing_id() == listing_id);
        in_carts || in_orders
    }

    fn orders_newest_first<F>(&self, predicate: F) -> Vec<Order>
    where
        F: Fn(&Order) -> bool,
    {
        self.orders
            .iter()
            .rev()
            .filter(|order| predicate(order))
            .cloned()
            .collect()
    }
}

/// メモリ上のマーケットプレイスストア
/// すべてのリポジトリとチェックアウトストアを1つのロックで実装する。
/// チェックアウトとキャンセルはロックを保持したまま検証と更新を行う
#[derive(Debug, Default)]
pub struct InMemoryMarketplaceStore {
    state: Mutex<StoreState>,
}

impl InMemoryMarketplaceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryMarketplaceStore {
    async fn save(&self, book: &Book) -> Result<(), RepositoryError> {
        self.state.lock().await.books.insert(book.id(), book.clone());
        Ok(())
    }

    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>, RepositoryError> {
        Ok(self.state.lock().await.books.get(&book_id).cloned())
    }

    fn next_identity(&self) -> BookId {
        BookId::new()
    }
}

#[async_trait]
impl ListingRepository for InMemoryMarketplaceStore {
    async fn save(&self, listing: &Listing) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        if state.listing_mut(listing.id()).is_some() {
            return Err(RepositoryError::OperationFailed(format!(
                "出品はすでに存在します: {}",
                listing.id()
            )));
        }
        state.listings.push(listing.clone());
        Ok(())
    }

    async fn update(
        &self,
        listing_id: ListingId,
        update: &ListingUpdate,
    ) -> Result<Option<Listing>, RepositoryError> {
        let mut state = self.state.lock().await;
        let Some(listing) = state.listing_mut(listing_id) else {
            return Ok(None);
        };
        listing
            .apply_update(update.clone())
            .map_err(|e| RepositoryError::OperationFailed(e.to_string()))?;
        Ok(Some(listing.clone()))
    }

    async fn find_by_id(&self, listing_id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.listings.iter().find(|l| l.id() == listing_id).cloned())
    }

    async fn find_by_ids(&self, listing_ids: &[ListingId]) -> Result<Vec<Listing>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .listings
            .iter()
            .filter(|l| listing_ids.contains(&l.id()))
            .cloned()
            .collect())
    }

    async fn find_by_seller(&self, seller_id: UserId) -> Result<Vec<Listing>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .listings
            .iter()
            .rev()
            .filter(|l| l.seller_id() == seller_id)
            .cloned()
            .collect())
    }

    async fn increment_views(&self, listing_id: ListingId) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        match state.listing_mut(listing_id) {
            Some(listing) => {
                listing.record_view();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, listing_id: ListingId) -> Result<ListingDeletion, RepositoryError> {
        let mut state = self.state.lock().await;
        if !state.listings.iter().any(|l| l.id() == listing_id) {
            return Ok(ListingDeletion::NotFound);
        }
        if state.is_listing_referenced(listing_id) {
            return Ok(ListingDeletion::Referenced);
        }
        state.listings.retain(|l| l.id() != listing_id);
        Ok(ListingDeletion::Deleted)
    }

    fn next_identity(&self) -> ListingId {
        ListingId::new()
    }
}

#[async_trait]
impl CartRepository for InMemoryMarketplaceStore {
    async fn find_or_create_by_user(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let mut state = self.state.lock().await;
        let cart = state
            .carts
            .entry(user_id)
            .or_insert_with(|| Cart::new(CartId::new(), user_id));
        Ok(cart.clone())
    }

    async fn save(&self, cart: &Cart) -> Result<(), RepositoryError> {
        self.state
            .lock()
            .await
            .carts
            .insert(cart.user_id(), cart.clone());
        Ok(())
    }

    fn next_identity(&self) -> CartId {
        CartId::new()
    }

    fn next_item_identity(&self) -> CartItemId {
        CartItemId::new()
    }
}

#[async_trait]
impl OrderRepository for InMemoryMarketplaceStore {
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.orders.iter().find(|o| o.id() == order_id).cloned())
    }

    async fn find_by_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.orders_newest_first(|o| o.buyer_id() == buyer_id))
    }

    async fn find_by_seller(&self, seller_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.orders_newest_first(|o| o.seller_id() == seller_id))
    }

    async fn find_by_participant(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.orders_newest_first(|o| o.is_participant(user_id)))
    }

    async fn update_status(
        &self,
        order: &Order,
        expected: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        let stored = state
            .orders
            .iter_mut()
            .find(|o| o.id() == order.id())
            .ok_or_else(|| {
                RepositoryError::OperationFailed(format!("注文が存在しません: {}", order.id()))
            })?;
        if stored.status() != expected {
            return Ok(false);
        }
        *stored = stored_copy(order);
        Ok(true)
    }

    fn next_identity(&self) -> OrderId {
        OrderId::new()
    }

    fn next_item_identity(&self) -> OrderItemId {
        OrderItemId::new()
    }
}

#[async_trait]
impl CheckoutStore for InMemoryMarketplaceStore {
    async fn commit_checkout(
        &self,
        cart: &Cart,
        orders: &[Order],
    ) -> Result<(), CheckoutStoreError> {
        let mut state = self.state.lock().await;

        let stored_cart = state
            .carts
            .get(&cart.user_id())
            .filter(|stored| stored.id() == cart.id())
            .ok_or(CheckoutStoreError::CartChanged { cart_id: cart.id() })?;
        if cart
            .items()
            .iter()
            .any(|item| stored_cart.item(item.id()).is_none())
        {
            return Err(CheckoutStoreError::CartChanged { cart_id: cart.id() });
        }

        // 引当後の出品を作業用コピーで計算し、すべて成功した場合のみ反映する
        let mut staged: HashMap<ListingId, Listing> = HashMap::new();
        for item in orders.iter().flat_map(|order| order.items()) {
            let listing_id = item.listing_id();
            if !staged.contains_key(&listing_id) {
                let current = state
                    .listings
                    .iter()
                    .find(|l| l.id() == listing_id)
                    .cloned()
                    .ok_or(CheckoutStoreError::StockConflict { listing_id })?;
                staged.insert(listing_id, current);
            }
            staged
                .get_mut(&listing_id)
                .ok_or(CheckoutStoreError::StockConflict { listing_id })?
                .decrement_stock(item.quantity())
                .map_err(|_| CheckoutStoreError::StockConflict { listing_id })?;
        }

        for (listing_id, listing) in staged {
            if let Some(stored) = state.listing_mut(listing_id) {
                *stored = listing;
            }
        }

        if let Some(stored_cart) = state.carts.get_mut(&cart.user_id()) {
            for item in cart.items() {
                stored_cart.remove_item(item.id());
            }
        }

        state.orders.extend(orders.iter().map(stored_copy));
        Ok(())
    }

    async fn commit_cancellation(&self, order: &Order) -> Result<(), CheckoutStoreError> {
        let mut state = self.state.lock().await;

        let stored = state
            .orders
            .iter_mut()
            .find(|o| o.id() == order.id())
            .ok_or_else(|| {
                RepositoryError::OperationFailed(format!("注文が存在しません: {}", order.id()))
            })?;
        if stored.status() != OrderStatus::Pending {
            return Err(CheckoutStoreError::OrderNotPending {
                order_id: order.id(),
            });
        }
        *stored = stored_copy(order);

        for item in order.items() {
            if let Some(listing) = state.listing_mut(item.listing_id()) {
                listing.restock(item.quantity());
            }
        }
        Ok(())
    }
}

/// 未発行のドメインイベントを持たない保存用のコピー
fn stored_copy(order: &Order) -> Order {
    let mut copy = order.clone();
    copy.take_domain_events();
    copy
}
