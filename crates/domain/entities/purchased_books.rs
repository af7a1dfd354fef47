use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::purchased_books;

/// One purchased division. Rows stop counting once `expires_at` passes and are
/// deleted only when the purchase is refunded.
#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = purchased_books)]
pub struct PurchasedBookEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub division_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub stripe_payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Also the `ON CONFLICT (user_id, division_id)` changeset. A repurchase restarts
/// `created_at`, which is where the refund window is measured from.
#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name = purchased_books)]
pub struct UpsertPurchasedBookEntity {
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub division_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub stripe_payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
