use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::{
        plan_types::PlanType, subscription_statuses::SubscriptionStatus,
    },
    infra::db::postgres::schema::subscriptions,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub plan_type: String,
    pub price_id: Option<String>,
    pub subscription_id: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub explicacao_pratica: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionEntity {
    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_str(&self.status)
    }

    pub fn plan_type(&self) -> PlanType {
        PlanType::from_str(&self.plan_type).unwrap_or_default()
    }
}

/// Row written by the sync routine. Doubles as the `ON CONFLICT (user_id)` changeset,
/// so every column except `id` is last-write-wins. Callers keep `created_at` for the
/// same provider subscription and restart it for a new one.
#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name = subscriptions)]
#[diesel(treat_none_as_null = true)]
pub struct UpsertSubscriptionEntity {
    pub user_id: Uuid,
    pub status: String,
    pub plan_type: String,
    pub price_id: Option<String>,
    pub subscription_id: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub explicacao_pratica: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
