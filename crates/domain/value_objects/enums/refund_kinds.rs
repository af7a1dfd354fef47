use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefundKind {
    Subscription,
    Purchase,
}

impl Display for RefundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefundKind::Subscription => f.write_str("subscription"),
            RefundKind::Purchase => f.write_str("purchase"),
        }
    }
}
