use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::purchased_books::{PurchasedBookEntity, UpsertPurchasedBookEntity};

#[async_trait]
#[automock]
pub trait PurchasedBookRepository {
    /// All purchases of the user, expired ones included. Expiry is decided by the caller.
    async fn list_by_user_id(&self, user_id: Uuid) -> Result<Vec<PurchasedBookEntity>>;

    async fn find_by_id_for_user(
        &self,
        purchase_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<PurchasedBookEntity>>;

    /// Insert-or-update keyed by `(user_id, division_id)`.
    async fn upsert_purchase(
        &self,
        upsert_purchased_book_entity: UpsertPurchasedBookEntity,
    ) -> Result<PurchasedBookEntity>;

    /// Revokes a purchase. Returns false when no row of that user matched.
    async fn delete_for_user(&self, purchase_id: Uuid, user_id: Uuid) -> Result<bool>;
}
