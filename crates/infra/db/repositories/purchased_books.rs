use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, delete, insert_into, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::purchased_books},
};
use domain::{
    entities::purchased_books::{PurchasedBookEntity, UpsertPurchasedBookEntity},
    repositories::purchased_books::PurchasedBookRepository,
};

pub struct PurchasedBookPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PurchasedBookPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PurchasedBookRepository for PurchasedBookPostgres {
    async fn list_by_user_id(&self, user_id: Uuid) -> Result<Vec<PurchasedBookEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = purchased_books::table
            .filter(purchased_books::user_id.eq(user_id))
            .order(purchased_books::created_at.desc())
            .select(PurchasedBookEntity::as_select())
            .load::<PurchasedBookEntity>(&mut conn)?;

        Ok(results)
    }

    async fn find_by_id_for_user(
        &self,
        purchase_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<PurchasedBookEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = purchased_books::table
            .filter(purchased_books::id.eq(purchase_id))
            .filter(purchased_books::user_id.eq(user_id))
            .select(PurchasedBookEntity::as_select())
            .first::<PurchasedBookEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn upsert_purchase(
        &self,
        upsert_purchased_book_entity: UpsertPurchasedBookEntity,
    ) -> Result<PurchasedBookEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(purchased_books::table)
            .values(&upsert_purchased_book_entity)
            .on_conflict((purchased_books::user_id, purchased_books::division_id))
            .do_update()
            .set(&upsert_purchased_book_entity)
            .returning(PurchasedBookEntity::as_returning())
            .get_result::<PurchasedBookEntity>(&mut conn)?;

        Ok(result)
    }

    async fn delete_for_user(&self, purchase_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted = delete(purchased_books::table)
            .filter(purchased_books::id.eq(purchase_id))
            .filter(purchased_books::user_id.eq(user_id))
            .execute(&mut conn)?;

        Ok(deleted > 0)
    }
}
