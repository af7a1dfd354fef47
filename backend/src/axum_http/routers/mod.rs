pub mod access;
pub mod checkout;
pub mod refunds;
pub mod subscriptions;
pub mod webhooks;
