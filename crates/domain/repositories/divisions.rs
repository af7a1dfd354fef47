use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::{books::BookEntity, divisions::DivisionEntity};

#[async_trait]
#[automock]
pub trait DivisionRepository {
    async fn find_published_by_id(&self, division_id: Uuid) -> Result<Option<DivisionEntity>>;

    /// Published or not. For labelling records that already reference the division.
    async fn find_by_id(&self, division_id: Uuid) -> Result<Option<DivisionEntity>>;

    async fn find_book_by_id(&self, book_id: Uuid) -> Result<Option<BookEntity>>;

    async fn count_published(&self) -> Result<i64>;
}
