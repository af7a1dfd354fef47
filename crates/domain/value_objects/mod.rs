pub mod entitlements;
pub mod enums;
pub mod purchases;
pub mod refunds;
pub mod subscriptions;
