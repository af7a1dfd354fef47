//! Entitlement decisions over records that were already loaded.
//!
//! Nothing here performs I/O and `now` is always supplied by the caller, so every
//! answer is a function of its arguments.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use crates::domain::{
    entities::{purchased_books::PurchasedBookEntity, subscriptions::SubscriptionEntity},
    value_objects::{
        entitlements::{AccessSummary, LibraryAccess},
        enums::{
            access_types::{AccessLevel, AccessType},
            subscription_statuses::SubscriptionStatus,
        },
    },
};
use uuid::Uuid;

/// Only `active` qualifies. A missing period end never expires, and
/// `cancel_at_period_end` keeps access until the period end passes.
pub fn subscription_qualifies(subscription: Option<&SubscriptionEntity>, now: DateTime<Utc>) -> bool {
    subscription.is_some_and(|subscription| {
        subscription.status() == SubscriptionStatus::Active
            && subscription
                .current_period_end
                .is_none_or(|period_end| period_end > now)
    })
}

pub fn purchase_qualifies(purchase: &PurchasedBookEntity, now: DateTime<Utc>) -> bool {
    purchase.expires_at > now
}

pub fn has_access(
    subscription: Option<&SubscriptionEntity>,
    purchases: &[PurchasedBookEntity],
    division_id: Uuid,
    now: DateTime<Utc>,
) -> bool {
    subscription_qualifies(subscription, now)
        || purchases
            .iter()
            .any(|purchase| purchase.division_id == division_id && purchase_qualifies(purchase, now))
}

pub fn can_access_book(
    subscription: Option<&SubscriptionEntity>,
    purchases: &[PurchasedBookEntity],
    book_id: Uuid,
    now: DateTime<Utc>,
) -> bool {
    subscription_qualifies(subscription, now)
        || purchases
            .iter()
            .any(|purchase| purchase.book_id == book_id && purchase_qualifies(purchase, now))
}

/// Distinct divisions covered by unexpired purchases, in id order.
pub fn purchased_divisions(purchases: &[PurchasedBookEntity], now: DateTime<Utc>) -> Vec<Uuid> {
    purchases
        .iter()
        .filter(|purchase| purchase_qualifies(purchase, now))
        .map(|purchase| purchase.division_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn library_access(
    subscription: Option<&SubscriptionEntity>,
    purchases: &[PurchasedBookEntity],
    total_divisions: u64,
    now: DateTime<Utc>,
) -> LibraryAccess {
    let subscribed = subscription_qualifies(subscription, now);

    // Purchases of since-unpublished divisions must not push the count past the total.
    let accessible_divisions = if subscribed {
        total_divisions
    } else {
        (purchased_divisions(purchases, now).len() as u64).min(total_divisions)
    };

    LibraryAccess {
        accessible_divisions,
        total_divisions,
        has_all_access: subscribed || accessible_divisions == total_divisions,
    }
}

pub fn has_plus_access(subscription: Option<&SubscriptionEntity>, now: DateTime<Utc>) -> bool {
    subscription_qualifies(subscription, now)
        && subscription.is_some_and(|subscription| subscription.explicacao_pratica)
}

pub fn access_summary(
    subscription: Option<&SubscriptionEntity>,
    purchases: &[PurchasedBookEntity],
    now: DateTime<Utc>,
) -> AccessSummary {
    let subscribed = subscription_qualifies(subscription, now);
    let purchased_divisions = purchased_divisions(purchases, now);

    let access_type = if subscribed {
        AccessType::Subscription
    } else if !purchased_divisions.is_empty() {
        AccessType::Purchase
    } else {
        AccessType::None
    };

    let access_level = if has_plus_access(subscription, now) {
        AccessLevel::Plus
    } else if subscribed {
        AccessLevel::Basic
    } else {
        AccessLevel::None
    };

    AccessSummary {
        has_access: access_type != AccessType::None,
        access_type,
        access_level,
        purchased_divisions,
    }
}
