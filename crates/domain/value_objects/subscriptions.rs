use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::subscriptions::SubscriptionEntity;
use crate::domain::value_objects::enums::{
    plan_types::PlanType, subscription_statuses::SubscriptionStatus,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CurrentSubscriptionDto {
    pub status: SubscriptionStatus,
    pub plan_type: PlanType,
    pub price_id: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub explicacao_pratica: bool,
}

impl From<SubscriptionEntity> for CurrentSubscriptionDto {
    fn from(value: SubscriptionEntity) -> Self {
        Self {
            status: value.status(),
            plan_type: value.plan_type(),
            price_id: value.price_id,
            current_period_start: value.current_period_start,
            current_period_end: value.current_period_end,
            cancel_at_period_end: value.cancel_at_period_end,
            explicacao_pratica: value.explicacao_pratica,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionStatusDto {
    pub is_active: bool,
    pub has_plus: bool,
    pub subscription: Option<CurrentSubscriptionDto>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionCheckoutRequest {
    pub price_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateCheckoutResponse {
    pub checkout_url: String,
}

#[derive(Debug, Serialize)]
pub struct PortalSessionResponse {
    pub url: String,
}
