use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchased division stays readable for one calendar month.
pub const PURCHASE_ACCESS_MONTHS: u32 = 1;

pub fn purchase_expiry(purchased_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    purchased_at.checked_add_months(Months::new(PURCHASE_ACCESS_MONTHS))
}

#[derive(Debug, Deserialize)]
pub struct CreateDivisionCheckoutRequest {
    pub division_id: Uuid,
}

/// Checkout metadata keys shared by session creation and webhook ingestion.
pub mod metadata_keys {
    pub const USER_ID: &str = "user_id";
    pub const BOOK_ID: &str = "book_id";
    pub const DIVISION_ID: &str = "division_id";
    pub const PLAN_TYPE: &str = "plan_type";
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DivisionPurchase {
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub division_id: Uuid,
    pub payment_intent_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn expiry_is_one_calendar_month_later() {
        let purchased_at = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
        let expires_at = purchase_expiry(purchased_at).unwrap();
        // chrono clamps to the last day of February
        assert_eq!(
            expires_at,
            Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).unwrap()
        );
    }
}
