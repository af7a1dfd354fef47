use std::{collections::HashMap, sync::Arc};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use crates::{
    domain::{
        entities::{
            purchased_books::{PurchasedBookEntity, UpsertPurchasedBookEntity},
            subscriptions::{SubscriptionEntity, UpsertSubscriptionEntity},
        },
        repositories::{
            profiles::ProfileRepository, purchased_books::PurchasedBookRepository,
            subscriptions::SubscriptionRepository,
        },
        value_objects::{
            enums::{plan_types::PlanType, subscription_statuses::SubscriptionStatus},
            purchases::{DivisionPurchase, metadata_keys, purchase_expiry},
        },
    },
    payments::stripe_client::{
        StripeClient, StripeEvent, StripePrice, StripeProductRef, StripeSubscription,
    },
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::stripe_gateway::StripeGateway;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid webhook payload: {0}")]
    InvalidWebhook(String),
    #[error("no subscription to sync")]
    SubscriptionNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SyncError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            SyncError::InvalidWebhook(_) => StatusCode::BAD_REQUEST,
            SyncError::SubscriptionNotFound => StatusCode::NOT_FOUND,
            SyncError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SyncError>;

/// What a webhook or manual sync ended up doing. Ignored outcomes are still acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    SubscriptionUpserted(SubscriptionEntity),
    PurchaseRecorded(PurchasedBookEntity),
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownCustomer,
    MissingPrice,
    /// A non-terminal event for a subscription already stored as terminal.
    StaleEvent,
    NothingToApply,
    UnhandledEvent,
}

pub struct SubscriptionSyncUseCase<S, P, Prof, Stripe>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PurchasedBookRepository + Send + Sync + 'static,
    Prof: ProfileRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    purchase_repo: Arc<P>,
    profile_repo: Arc<Prof>,
    stripe_client: Arc<Stripe>,
}

impl<S, P, Prof, Stripe> SubscriptionSyncUseCase<S, P, Prof, Stripe>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PurchasedBookRepository + Send + Sync + 'static,
    Prof: ProfileRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    pub fn new(
        subscription_repo: Arc<S>,
        purchase_repo: Arc<P>,
        profile_repo: Arc<Prof>,
        stripe_client: Arc<Stripe>,
    ) -> Self {
        Self {
            subscription_repo,
            purchase_repo,
            profile_repo,
            stripe_client,
        }
    }

    pub async fn handle_stripe_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> UseCaseResult<SyncOutcome> {
        let event = self
            .stripe_client
            .verify_webhook_signature(payload, signature)
            .map_err(|err| {
                warn!(
                    error = %err,
                    payload_bytes = payload.len(),
                    "subscription_sync: stripe webhook verification failed"
                );
                SyncError::InvalidWebhook("signature verification failed".into())
            })?;

        info!(
            event_id = ?event.id,
            event_type = %event.type_,
            "subscription_sync: stripe webhook verified"
        );

        let outcome = match event.type_.as_str() {
            "customer.subscription.created" | "customer.subscription.updated" => {
                let subscription = Self::subscription_from_event(&event)?;
                self.apply_provider_subscription(&subscription, false).await?
            }
            "customer.subscription.deleted" => {
                let subscription = Self::subscription_from_event(&event)?;
                self.apply_provider_subscription(&subscription, true).await?
            }
            "checkout.session.completed" => self.handle_checkout_completed(&event).await?,
            "invoice.payment_succeeded" | "invoice.payment_failed" => {
                self.handle_invoice_event(&event).await?
            }
            _ => {
                debug!(event_type = %event.type_, "subscription_sync: unhandled stripe event type");
                SyncOutcome::Ignored(IgnoreReason::UnhandledEvent)
            }
        };

        Ok(outcome)
    }

    /// Retrieves the subscription from Stripe and mirrors it locally.
    pub async fn sync_from_provider(&self, subscription_id: &str) -> UseCaseResult<SyncOutcome> {
        info!(%subscription_id, "subscription_sync: retrieving subscription from stripe");

        let subscription = self
            .stripe_client
            .retrieve_subscription(subscription_id)
            .await
            .map_err(|err| {
                error!(
                    %subscription_id,
                    error = ?err,
                    "subscription_sync: failed to retrieve subscription from stripe"
                );
                SyncError::Internal(err)
            })?;

        self.apply_provider_subscription(&subscription, false).await
    }

    /// Manual resync of the subscription stored for `user_id`.
    pub async fn sync_user(&self, user_id: Uuid) -> UseCaseResult<SyncOutcome> {
        let subscription = self
            .subscription_repo
            .find_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    db_error = ?err,
                    "subscription_sync: failed to load subscription for manual sync"
                );
                SyncError::Internal(err)
            })?;

        let provider_subscription_id = subscription
            .and_then(|subscription| subscription.subscription_id)
            .ok_or_else(|| {
                let err = SyncError::SubscriptionNotFound;
                warn!(
                    %user_id,
                    status = err.status_code().as_u16(),
                    "subscription_sync: nothing to sync for user"
                );
                err
            })?;

        self.sync_from_provider(&provider_subscription_id).await
    }

    /// Mirrors one provider subscription onto the user's single subscription row.
    ///
    /// The upsert is the only write and runs last, so any earlier failure leaves
    /// the stored row as it was.
    pub async fn apply_provider_subscription(
        &self,
        subscription: &StripeSubscription,
        deleted: bool,
    ) -> UseCaseResult<SyncOutcome> {
        let provider_subscription_id = subscription.id.as_str();

        let Some(customer_id) = subscription.customer.clone() else {
            warn!(
                %provider_subscription_id,
                "subscription_sync: subscription without customer"
            );
            return Ok(SyncOutcome::Ignored(IgnoreReason::UnknownCustomer));
        };

        let user_id = match self
            .profile_repo
            .find_user_id_by_stripe_customer_id(customer_id.clone())
            .await
            .map_err(|err| {
                error!(
                    %provider_subscription_id,
                    %customer_id,
                    db_error = ?err,
                    "subscription_sync: failed to resolve user by stripe customer"
                );
                SyncError::Internal(err)
            })? {
            Some(user_id) => user_id,
            None => {
                warn!(
                    %provider_subscription_id,
                    %customer_id,
                    "subscription_sync: no profile for stripe customer"
                );
                return Ok(SyncOutcome::Ignored(IgnoreReason::UnknownCustomer));
            }
        };

        let Some(price) = subscription.first_price() else {
            warn!(
                %user_id,
                %provider_subscription_id,
                "subscription_sync: subscription has no priced item"
            );
            return Ok(SyncOutcome::Ignored(IgnoreReason::MissingPrice));
        };

        let previous = self
            .subscription_repo
            .find_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    db_error = ?err,
                    "subscription_sync: failed to load stored subscription"
                );
                SyncError::Internal(err)
            })?;

        let status = if deleted {
            SubscriptionStatus::Canceled
        } else {
            SubscriptionStatus::from_str(&subscription.status)
        };

        // Only rows for this very subscription carry over state.
        let same_subscription = previous
            .as_ref()
            .filter(|row| row.subscription_id.as_deref() == Some(provider_subscription_id));

        if let Some(row) = same_subscription {
            if row.status().is_terminal() && !status.is_terminal() {
                info!(
                    %user_id,
                    %provider_subscription_id,
                    stored_status = %row.status,
                    incoming_status = %status,
                    "subscription_sync: ignoring late event for terminal subscription"
                );
                return Ok(SyncOutcome::Ignored(IgnoreReason::StaleEvent));
            }
        }

        let had_plus = previous.as_ref().is_some_and(|row| row.explicacao_pratica);
        let explicacao_pratica = status != SubscriptionStatus::Canceled
            && (had_plus || self.price_grants_plus(price).await);

        let now = Utc::now();
        let upsert_subscription_entity = UpsertSubscriptionEntity {
            user_id,
            status: status.to_string(),
            plan_type: PlanType::from_interval(
                price
                    .recurring
                    .as_ref()
                    .and_then(|recurring| recurring.interval.as_deref()),
            )
            .to_string(),
            price_id: Some(price.id.clone()),
            subscription_id: Some(provider_subscription_id.to_string()),
            current_period_start: subscription
                .period_start()
                .and_then(ts_to_datetime)
                .or_else(|| same_subscription.and_then(|row| row.current_period_start)),
            current_period_end: subscription
                .period_end()
                .and_then(ts_to_datetime)
                .or_else(|| same_subscription.and_then(|row| row.current_period_end)),
            cancel_at_period_end: subscription.cancel_at_period_end,
            explicacao_pratica,
            created_at: same_subscription.map_or(now, |row| row.created_at),
            updated_at: now,
        };

        let stored = self
            .subscription_repo
            .upsert_by_user_id(upsert_subscription_entity)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %provider_subscription_id,
                    db_error = ?err,
                    "subscription_sync: failed to upsert subscription"
                );
                SyncError::Internal(err)
            })?;

        info!(
            %user_id,
            %provider_subscription_id,
            status = %stored.status,
            plan_type = %stored.plan_type,
            explicacao_pratica = stored.explicacao_pratica,
            "subscription_sync: subscription mirrored"
        );

        Ok(SyncOutcome::SubscriptionUpserted(stored))
    }

    pub async fn record_division_purchase(
        &self,
        purchase: DivisionPurchase,
        purchased_at: DateTime<Utc>,
    ) -> UseCaseResult<SyncOutcome> {
        let expires_at = purchase_expiry(purchased_at)
            .ok_or_else(|| anyhow!("purchase expiry out of range"))?;

        let stored = self
            .purchase_repo
            .upsert_purchase(UpsertPurchasedBookEntity {
                user_id: purchase.user_id,
                book_id: purchase.book_id,
                division_id: purchase.division_id,
                expires_at,
                stripe_payment_intent_id: purchase.payment_intent_id.clone(),
                created_at: purchased_at,
                updated_at: purchased_at,
            })
            .await
            .map_err(|err| {
                error!(
                    user_id = %purchase.user_id,
                    division_id = %purchase.division_id,
                    db_error = ?err,
                    "subscription_sync: failed to record division purchase"
                );
                SyncError::Internal(err)
            })?;

        info!(
            user_id = %stored.user_id,
            division_id = %stored.division_id,
            expires_at = %stored.expires_at,
            "subscription_sync: division purchase recorded"
        );

        Ok(SyncOutcome::PurchaseRecorded(stored))
    }

    async fn handle_checkout_completed(&self, event: &StripeEvent) -> UseCaseResult<SyncOutcome> {
        let session = StripeClient::extract_checkout_session(event).ok_or_else(|| {
            warn!("subscription_sync: checkout session missing in webhook");
            SyncError::InvalidWebhook("missing checkout session".to_string())
        })?;
        let metadata = session.metadata.clone().unwrap_or_default();

        let mut outcome = SyncOutcome::Ignored(IgnoreReason::NothingToApply);

        if let Some(purchase) =
            division_purchase_from_metadata(&metadata, session.payment_intent.clone())
        {
            outcome = self.record_division_purchase(purchase, Utc::now()).await?;
        }

        if session.mode.as_deref() == Some("subscription") {
            if let (Some(user_id), Some(customer_id)) =
                (metadata_uuid(&metadata, metadata_keys::USER_ID), session.customer.clone())
            {
                self.profile_repo
                    .set_stripe_customer_id(user_id, customer_id.clone())
                    .await
                    .map_err(|err| {
                        error!(
                            %user_id,
                            %customer_id,
                            db_error = ?err,
                            "subscription_sync: failed to link stripe customer"
                        );
                        SyncError::Internal(err)
                    })?;
            }

            let subscription_id = session.subscription.clone().ok_or_else(|| {
                warn!(
                    session_id = ?session.id,
                    "subscription_sync: subscription checkout without subscription id"
                );
                SyncError::InvalidWebhook("subscription id missing on session".to_string())
            })?;

            outcome = self.sync_from_provider(&subscription_id).await?;
        }

        if outcome == SyncOutcome::Ignored(IgnoreReason::NothingToApply) {
            debug!(
                session_id = ?session.id,
                mode = ?session.mode,
                "subscription_sync: checkout session carried nothing to apply"
            );
        }

        Ok(outcome)
    }

    async fn handle_invoice_event(&self, event: &StripeEvent) -> UseCaseResult<SyncOutcome> {
        let invoice = StripeClient::extract_invoice(event).ok_or_else(|| {
            warn!(event_type = %event.type_, "subscription_sync: invalid invoice payload");
            SyncError::InvalidWebhook("invalid invoice payload".to_string())
        })?;

        match invoice.subscription_id() {
            Some(subscription_id) => self.sync_from_provider(subscription_id).await,
            None => {
                debug!(
                    invoice_id = ?invoice.id,
                    "subscription_sync: invoice not tied to a subscription"
                );
                Ok(SyncOutcome::Ignored(IgnoreReason::NothingToApply))
            }
        }
    }

    async fn price_grants_plus(&self, price: &StripePrice) -> bool {
        if price_mentions_plus(price) {
            return true;
        }

        let Some(StripeProductRef::Id(product_id)) = price.product.as_ref() else {
            return false;
        };

        match self.stripe_client.retrieve_product(product_id).await {
            Ok(product) => mentions_plus(&product.name),
            Err(err) => {
                warn!(
                    %product_id,
                    error = ?err,
                    "subscription_sync: product lookup failed, assuming no plus"
                );
                false
            }
        }
    }

    fn subscription_from_event(event: &StripeEvent) -> UseCaseResult<StripeSubscription> {
        StripeClient::extract_subscription(event).ok_or_else(|| {
            warn!(event_type = %event.type_, "subscription_sync: invalid subscription payload");
            SyncError::InvalidWebhook("invalid subscription payload".to_string())
        })
    }
}

fn mentions_plus(value: &str) -> bool {
    value.to_ascii_lowercase().contains("plus")
}

fn price_mentions_plus(price: &StripePrice) -> bool {
    mentions_plus(&price.id)
        || price.nickname.as_deref().is_some_and(mentions_plus)
        || price
            .product
            .as_ref()
            .and_then(|product| product.name())
            .is_some_and(mentions_plus)
}

fn metadata_uuid(metadata: &HashMap<String, String>, key: &str) -> Option<Uuid> {
    metadata.get(key).and_then(|value| Uuid::parse_str(value).ok())
}

fn division_purchase_from_metadata(
    metadata: &HashMap<String, String>,
    payment_intent_id: Option<String>,
) -> Option<DivisionPurchase> {
    Some(DivisionPurchase {
        user_id: metadata_uuid(metadata, metadata_keys::USER_ID)?,
        book_id: metadata_uuid(metadata, metadata_keys::BOOK_ID)?,
        division_id: metadata_uuid(metadata, metadata_keys::DIVISION_ID)?,
        payment_intent_id,
    })
}

fn ts_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}
