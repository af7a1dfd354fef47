use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscriptions::{SubscriptionEntity, UpsertSubscriptionEntity};

#[async_trait]
#[automock]
pub trait SubscriptionRepository {
    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>>;

    async fn find_by_id_for_user(
        &self,
        subscription_row_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<SubscriptionEntity>>;

    /// Insert-or-update keyed by `user_id`.
    async fn upsert_by_user_id(
        &self,
        upsert_subscription_entity: UpsertSubscriptionEntity,
    ) -> Result<SubscriptionEntity>;

    async fn set_cancel_at_period_end(
        &self,
        user_id: Uuid,
        cancel_at_period_end: bool,
    ) -> Result<()>;

    /// Ends the subscription locally: `canceled`, no pending cancellation, no Plus.
    async fn mark_canceled(&self, subscription_row_id: Uuid, user_id: Uuid) -> Result<()>;
}
