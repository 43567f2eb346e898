use crate::application::service::publish_events;
use crate::application::ApplicationError;
use crate::domain::error::DomainError;
use crate::domain::model::{Actor, Order, OrderId, OrderStatus, StatusTransitionPolicy, UserId};
use crate::domain::port::{
    CheckoutStore, CheckoutStoreError, EventPublisher, OrderRepository, RepositoryError,
};
use std::sync::Arc;
use uuid::Uuid;

/// 注文アプリケーションサービス
/// 注文の参照、販売者によるステータス更新、購入者によるキャンセルを扱う
pub struct OrderApplicationService {
    order_repository: Arc<dyn OrderRepository>,
    checkout_store: Arc<dyn CheckoutStore>,
    event_publisher: Arc<dyn EventPublisher>,
    status_policy: StatusTransitionPolicy,
}

impl OrderApplicationService {
    /// 新しいアプリケーションサービスを作成
    ///
    /// # Arguments
    /// * `order_repository` - 注文リポジトリ
    /// * `checkout_store` - キャンセル時の在庫戻しに使う
    /// * `event_publisher` - イベント発行
    /// * `status_policy` - 販売者によるステータス更新の方針
    pub fn new(
        order_repository: Arc<dyn OrderRepository>,
        checkout_store: Arc<dyn CheckoutStore>,
        event_publisher: Arc<dyn EventPublisher>,
        status_policy: StatusTransitionPolicy,
    ) -> Self {
        Self {
            order_repository,
            checkout_store,
            event_publisher,
            status_policy,
        }
    }

    /// 注文を取得
    /// 購入者または販売者のみ参照できる
    pub async fn get_order(&self, actor: Actor, order_id: OrderId) -> Result<Order, ApplicationError> {
        let order = self.find_order(order_id).await?;
        if !order.is_participant(actor.user_id) {
            return Err(DomainError::Unauthorized(
                "注文を参照できるのは購入者または販売者のみです".to_string(),
            )
            .into());
        }
        Ok(order)
    }

    /// 購入者または販売者として関わる注文を取得
    /// 作成日時の降順で並べて返す
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, ApplicationError> {
        self.order_repository
            .find_by_participant(user_id)
            .await
            .map_err(ApplicationError::from)
    }

    /// 購入した注文を取得
    pub async fn list_purchases(&self, user_id: UserId) -> Result<Vec<Order>, ApplicationError> {
        self.order_repository
            .find_by_buyer(user_id)
            .await
            .map_err(ApplicationError::from)
    }

    /// 販売した注文を取得
    pub async fn list_sales(&self, user_id: UserId) -> Result<Vec<Order>, ApplicationError> {
        self.order_repository
            .find_by_seller(user_id)
            .await
            .map_err(ApplicationError::from)
    }

    /// 販売者が注文のステータスを更新
    /// cancelledを指定しても在庫は戻さない
    ///
    /// # Arguments
    /// * `actor` - 操作者（販売者であること）
    /// * `order_id` - 注文ID
    /// * `status` - 新しいステータス
    ///
    /// # Returns
    /// * `Ok(Order)` - 更新後の注文
    /// * `Err(ApplicationError)` - 注文が存在しない、販売者ではない、遷移が許可されない
    #[tracing::instrument(
        name = "orders.update_status",
        skip(self, actor),
        fields(user_id = %actor.user_id),
        err
    )]
    pub async fn update_order_status(
        &self,
        actor: Actor,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApplicationError> {
        let mut order = self.find_order(order_id).await?;
        let previous = order.status();

        order.update_status(actor.user_id, status, self.status_policy)?;
        if !self.order_repository.update_status(&order, previous).await? {
            // 読み込み後に別のリクエストがステータスを変えた。
            // 同じステータスのままなら書き込む値が変わらなかっただけ
            let current = self.find_order(order_id).await?.status();
            if current != previous {
                return Err(DomainError::InvalidStateTransition {
                    from: current,
                    to: status,
                }
                .into());
            }
        }

        publish_events(
            self.event_publisher.as_ref(),
            order.take_domain_events(),
            Uuid::new_v4(),
        )
        .await;

        tracing::info!(%order_id, %status, "updated order status");
        Ok(order)
    }

    /// 購入者が注文をキャンセル
    /// Pendingの注文のみ。各明細の数量を在庫に戻す
    ///
    /// # Returns
    /// * `Ok(Order)` - キャンセル後の注文
    /// * `Err(ApplicationError)` - 注文が存在しない、購入者ではない、Pendingではない
    #[tracing::instrument(
        name = "orders.cancel",
        skip(self, actor),
        fields(user_id = %actor.user_id),
        err
    )]
    pub async fn cancel_order(
        &self,
        actor: Actor,
        order_id: OrderId,
    ) -> Result<Order, ApplicationError> {
        let mut order = self.find_order(order_id).await?;

        order.cancel(actor.user_id)?;

        match self.checkout_store.commit_cancellation(&order).await {
            Ok(()) => {}
            Err(CheckoutStoreError::OrderNotPending { .. }) => {
                // 読み込み後に別のリクエストがステータスを変えた
                let current = self.find_order(order_id).await?.status();
                return Err(DomainError::InvalidStateTransition {
                    from: current,
                    to: OrderStatus::Cancelled,
                }
                .into());
            }
            Err(CheckoutStoreError::Repository(e)) => return Err(e.into()),
            Err(other) => {
                return Err(RepositoryError::OperationFailed(other.to_string()).into())
            }
        }

        publish_events(
            self.event_publisher.as_ref(),
            order.take_domain_events(),
            Uuid::new_v4(),
        )
        .await;

        tracing::info!(%order_id, items = order.items().len(), "cancelled order and restocked");
        Ok(order)
    }

    async fn find_order(&self, order_id: OrderId) -> Result<Order, ApplicationError> {
        self.order_repository
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("注文", order_id))
    }
}
