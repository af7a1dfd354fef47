use serde::{Deserialize, Serialize};

/// How a user reached their entitlement. A qualifying subscription wins over purchases.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Subscription,
    Purchase,
    None,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    None,
    Basic,
    Plus,
}
