pub mod access_types;
pub mod plan_types;
pub mod refund_kinds;
pub mod subscription_statuses;
