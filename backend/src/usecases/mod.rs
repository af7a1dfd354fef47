pub mod access;
pub mod checkout;
pub mod entitlement_resolver;
pub mod refunds;
pub mod stripe_gateway;
pub mod subscription_sync;
pub mod subscriptions;
