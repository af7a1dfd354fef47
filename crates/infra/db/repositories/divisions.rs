use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{books, divisions},
    },
};
use domain::{
    entities::{books::BookEntity, divisions::DivisionEntity},
    repositories::divisions::DivisionRepository,
};

pub struct DivisionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl DivisionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl DivisionRepository for DivisionPostgres {
    async fn find_published_by_id(&self, division_id: Uuid) -> Result<Option<DivisionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = divisions::table
            .filter(divisions::id.eq(division_id))
            .filter(divisions::is_published.eq(true))
            .select(DivisionEntity::as_select())
            .first::<DivisionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_by_id(&self, division_id: Uuid) -> Result<Option<DivisionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = divisions::table
            .find(division_id)
            .select(DivisionEntity::as_select())
            .first::<DivisionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_book_by_id(&self, book_id: Uuid) -> Result<Option<BookEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = books::table
            .find(book_id)
            .select(BookEntity::as_select())
            .first::<BookEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn count_published(&self) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = divisions::table
            .filter(divisions::is_published.eq(true))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(total)
    }
}
