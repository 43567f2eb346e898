// 出力ポート
// ドメイン層が外部に依存する機能をトレイトとして定義
// アダプター層でこれらのトレイトを実装する

use crate::domain::event::DomainEvent;
use crate::domain::model::{
    Book, BookId, Cart, CartId, CartItemId, Listing, ListingId, ListingUpdate, Order, OrderId,
    OrderItemId, OrderStatus, UserId,
};
use async_trait::async_trait;

/// リポジトリエラー型
/// リポジトリ操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum RepositoryError {
    /// データベース接続に失敗
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// 操作に失敗
    #[error("Operation failed: {0}")]
    OperationFailed(String),
    /// データの取得に失敗
    #[error("Fetch failed: {0}")]
    FetchFailed(String),
}

/// 出品削除の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingDeletion {
    /// 削除した
    Deleted,
    /// 出品が存在しない
    NotFound,
    /// カート明細または注文明細から参照されているため削除できない
    Referenced,
}

/// 書籍カタログリポジトリトレイト
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// 書籍を保存する
    ///
    /// # Arguments
    /// * `book` - 保存する書籍
    async fn save(&self, book: &Book) -> Result<(), RepositoryError>;

    /// 書籍IDで書籍を検索する
    ///
    /// # Returns
    /// * `Ok(Some(Book))` - 書籍が見つかった
    /// * `Ok(None)` - 書籍が見つからなかった
    /// * `Err(RepositoryError)` - 検索失敗
    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>, RepositoryError>;

    /// 新しい一意の書籍IDを生成する
    fn next_identity(&self) -> BookId;
}

/// 出品リポジトリトレイト
/// 出品集約の永続化を抽象化する
#[async_trait]
pub trait ListingRepository: Send + Sync {
    /// 新しい出品を保存する
    ///
    /// # Arguments
    /// * `listing` - 保存する出品
    ///
    /// # Returns
    /// * `Ok(())` - 保存成功
    /// * `Err(RepositoryError)` - 保存失敗（同じIDの出品がすでに存在する場合を含む）
    async fn save(&self, listing: &Listing) -> Result<(), RepositoryError>;

    /// 部分更新を適用する
    /// `update`で指定された列だけを書き込み、それ以外は保存済みの値を保つ
    ///
    /// # Returns
    /// * `Ok(Some(Listing))` - 更新後の出品
    /// * `Ok(None)` - 出品が存在しない
    /// * `Err(RepositoryError)` - 更新失敗
    async fn update(
        &self,
        listing_id: ListingId,
        update: &ListingUpdate,
    ) -> Result<Option<Listing>, RepositoryError>;

    /// 出品IDで出品を検索する
    ///
    /// # Returns
    /// * `Ok(Some(Listing))` - 出品が見つかった
    /// * `Ok(None)` - 出品が見つからなかった
    /// * `Err(RepositoryError)` - 検索失敗
    async fn find_by_id(&self, listing_id: ListingId) -> Result<Option<Listing>, RepositoryError>;

    /// 複数の出品IDで出品を一括取得する
    /// 存在しないIDは結果に含まれない
    async fn find_by_ids(&self, listing_ids: &[ListingId]) -> Result<Vec<Listing>, RepositoryError>;

    /// 販売者の出品を取得する
    /// 作成日時の降順で並べて返す
    async fn find_by_seller(&self, seller_id: UserId) -> Result<Vec<Listing>, RepositoryError>;

    /// 閲覧数を1増やす
    ///
    /// # Returns
    /// * `Ok(true)` - 更新した
    /// * `Ok(false)` - 出品が存在しない
    async fn increment_views(&self, listing_id: ListingId) -> Result<bool, RepositoryError>;

    /// 出品を削除する
    async fn delete(&self, listing_id: ListingId) -> Result<ListingDeletion, RepositoryError>;

    /// 新しい一意の出品IDを生成する
    fn next_identity(&self) -> ListingId;
}

/// カートリポジトリトレイト
/// ユーザーごとに1つのカートを管理する
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// ユーザーのカートを取得する。存在しない場合は空のカートを作成して返す
    ///
    /// # Arguments
    /// * `user_id` - カートの所有者
    ///
    /// # Returns
    /// * `Ok(Cart)` - 既存または新規のカート
    /// * `Err(RepositoryError)` - 取得失敗
    async fn find_or_create_by_user(&self, user_id: UserId) -> Result<Cart, RepositoryError>;

    /// カートとその明細を保存する
    /// 明細は保存内容で置き換える
    async fn save(&self, cart: &Cart) -> Result<(), RepositoryError>;

    /// 新しい一意のカートIDを生成する
    fn next_identity(&self) -> CartId;

    /// 新しい一意のカート明細IDを生成する
    fn next_item_identity(&self) -> CartItemId;
}

/// 注文リポジトリトレイト
/// 注文集約の参照とステータス更新を抽象化する
/// 注文の作成とキャンセルは`CheckoutStore`が原子的に行う
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 注文IDで注文を検索する
    ///
    /// # Arguments
    /// * `order_id` - 検索する注文ID
    ///
    /// # Returns
    /// * `Ok(Some(Order))` - 注文が見つかった
    /// * `Ok(None)` - 注文が見つからなかった
    /// * `Err(RepositoryError)` - 検索失敗
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// 購入者の注文を取得する
    /// 作成日時の降順で並べて返す
    async fn find_by_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// 販売者の注文を取得する
    /// 作成日時の降順で並べて返す
    async fn find_by_seller(&self, seller_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// 購入者または販売者として関わる注文を取得する
    /// 作成日時の降順で並べて返す
    async fn find_by_participant(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// 注文のステータスを保存する
    /// 保存済みのステータスが`expected`の場合だけ書き込む
    ///
    /// # Arguments
    /// * `order` - 新しいステータスを持つ注文
    /// * `expected` - 読み込んだ時点のステータス
    ///
    /// # Returns
    /// * `Ok(true)` - 更新した
    /// * `Ok(false)` - 読み込み後にステータスが変わっていた
    /// * `Err(RepositoryError)` - 更新失敗
    async fn update_status(
        &self,
        order: &Order,
        expected: OrderStatus,
    ) -> Result<bool, RepositoryError>;

    /// 新しい一意の注文IDを生成する
    fn next_identity(&self) -> OrderId;

    /// 新しい一意の注文明細IDを生成する
    fn next_item_identity(&self) -> OrderItemId;
}

/// チェックアウトストアのエラー
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CheckoutStoreError {
    /// 条件付き在庫引当が失敗した（公開停止または在庫不足）
    #[error("Stock conflict on listing {listing_id}")]
    StockConflict { listing_id: ListingId },
    /// 読み込んだ時点からカートの明細が変わっていた
    #[error("Cart {cart_id} changed during checkout")]
    CartChanged { cart_id: CartId },
    /// 注文がすでにPendingではなかった
    #[error("Order {order_id} is no longer pending")]
    OrderNotPending { order_id: OrderId },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// チェックアウトストアトレイト
/// 在庫・注文・カートにまたがる更新を1つの原子的な単位として実行する
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    /// チェックアウトを確定する
    ///
    /// 1つの単位で次を行う:
    /// - `cart`の明細を削除（明細が変わっていればCartChanged）
    /// - 各注文明細の数量だけ出品の在庫を条件付きで減らす（失敗すればStockConflict）
    /// - 在庫が0になった出品を非公開にする
    /// - 注文と注文明細を作成
    ///
    /// いずれかが失敗した場合は何も反映しない
    ///
    /// # Arguments
    /// * `cart` - チェックアウト対象のカート（読み込んだ時点の明細）
    /// * `orders` - 作成する注文
    async fn commit_checkout(&self, cart: &Cart, orders: &[Order])
        -> Result<(), CheckoutStoreError>;

    /// キャンセルを確定する
    ///
    /// 1つの単位で次を行う:
    /// - ステータスがpendingの場合のみcancelledに更新（そうでなければOrderNotPending）
    /// - 各注文明細の数量を出品の在庫に戻し、公開状態にする
    async fn commit_cancellation(&self, order: &Order) -> Result<(), CheckoutStoreError>;
}

/// イベント発行エラー
#[derive(Debug, thiserror::Error)]
pub enum PublisherError {
    #[error("Event publishing failed: {0}")]
    PublishingFailed(String),
}

/// イベント発行トレイト
/// 確定したドメインイベントを外部に通知するポート
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublisherError>;
}
