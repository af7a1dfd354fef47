use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::enums::refund_kinds::RefundKind;

pub const REFUND_WINDOW_DAYS: i64 = 7;

/// Refunds are honoured when the row was created within the last seven days (inclusive).
pub fn is_refund_eligible(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    created_at >= now - Duration::days(REFUND_WINDOW_DAYS)
}

/// Identifies the subscription row or purchase row a refund refers to.
/// Used for both the eligibility check and the refund itself.
#[derive(Debug, Deserialize)]
pub struct RefundEligibilityRequest {
    #[serde(rename = "type")]
    pub kind: RefundKind,
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RefundEligibilityDto {
    #[serde(rename = "type")]
    pub kind: RefundKind,
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub eligible: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RefundExecutionDto {
    #[serde(rename = "type")]
    pub kind: RefundKind,
    pub id: Uuid,
    /// Stripe refund id. `None` when the access was revoked but no charge could be refunded.
    pub refund_id: Option<String>,
    pub access_revoked: bool,
}
