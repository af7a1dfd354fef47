use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{OptionalExtension, RunQueryDsl, insert_into, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::repositories::profiles::ProfileRepository,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::profiles},
};

pub struct ProfilePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ProfilePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ProfileRepository for ProfilePostgres {
    async fn find_user_id_by_stripe_customer_id(
        &self,
        customer_id: String,
    ) -> Result<Option<Uuid>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = profiles::table
            .filter(profiles::stripe_customer_id.eq(customer_id))
            .select(profiles::id)
            .first::<Uuid>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_stripe_customer_id(&self, user_id: Uuid) -> Result<Option<String>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = profiles::table
            .find(user_id)
            .select(profiles::stripe_customer_id)
            .first::<Option<String>>(&mut conn)
            .optional()?;

        Ok(result.flatten())
    }

    async fn set_stripe_customer_id(&self, user_id: Uuid, customer_id: String) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        insert_into(profiles::table)
            .values((
                profiles::id.eq(user_id),
                profiles::stripe_customer_id.eq(Some(customer_id.clone())),
                profiles::updated_at.eq(now),
            ))
            .on_conflict(profiles::id)
            .do_update()
            .set((
                profiles::stripe_customer_id.eq(Some(customer_id)),
                profiles::updated_at.eq(now),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
