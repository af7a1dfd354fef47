use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

#[async_trait]
#[automock]
pub trait ProfileRepository {
    async fn find_user_id_by_stripe_customer_id(&self, customer_id: String)
    -> Result<Option<Uuid>>;

    async fn find_stripe_customer_id(&self, user_id: Uuid) -> Result<Option<String>>;

    async fn set_stripe_customer_id(&self, user_id: Uuid, customer_id: String) -> Result<()>;
}
