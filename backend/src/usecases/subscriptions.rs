use std::sync::Arc;

use chrono::Utc;
use crates::domain::{
    entities::subscriptions::SubscriptionEntity,
    repositories::subscriptions::SubscriptionRepository,
    value_objects::subscriptions::{CurrentSubscriptionDto, SubscriptionStatusDto},
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{entitlement_resolver, stripe_gateway::StripeGateway};

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("no subscription found")]
    SubscriptionNotFound,
    #[error("subscription is {0} and cannot be changed")]
    InvalidState(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SubscriptionError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            SubscriptionError::SubscriptionNotFound => StatusCode::NOT_FOUND,
            SubscriptionError::InvalidState(_) => StatusCode::CONFLICT,
            SubscriptionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;

pub struct SubscriptionUseCase<S, Stripe>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    stripe_client: Arc<Stripe>,
}

impl<S, Stripe> SubscriptionUseCase<S, Stripe>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<S>, stripe_client: Arc<Stripe>) -> Self {
        Self {
            subscription_repo,
            stripe_client,
        }
    }

    pub async fn get_status(&self, user_id: Uuid) -> UseCaseResult<SubscriptionStatusDto> {
        let subscription = self.load(user_id).await?;
        Ok(status_dto(subscription))
    }

    /// Schedules cancellation at period end. Access continues until then.
    pub async fn cancel(&self, user_id: Uuid) -> UseCaseResult<SubscriptionStatusDto> {
        self.set_cancel_at_period_end(user_id, true).await
    }

    pub async fn reactivate(&self, user_id: Uuid) -> UseCaseResult<SubscriptionStatusDto> {
        self.set_cancel_at_period_end(user_id, false).await
    }

    async fn set_cancel_at_period_end(
        &self,
        user_id: Uuid,
        cancel_at_period_end: bool,
    ) -> UseCaseResult<SubscriptionStatusDto> {
        let mut subscription = self.load(user_id).await?.ok_or_else(|| {
            let err = SubscriptionError::SubscriptionNotFound;
            warn!(
                %user_id,
                status = err.status_code().as_u16(),
                "subscriptions: no subscription to update"
            );
            err
        })?;

        let provider_subscription_id = subscription.subscription_id.clone().ok_or_else(|| {
            let err = SubscriptionError::SubscriptionNotFound;
            warn!(
                %user_id,
                status = err.status_code().as_u16(),
                "subscriptions: subscription missing provider id"
            );
            err
        })?;

        if subscription.status().is_terminal() {
            let err = SubscriptionError::InvalidState(subscription.status.clone());
            warn!(
                %user_id,
                %provider_subscription_id,
                status = err.status_code().as_u16(),
                "subscriptions: subscription already ended"
            );
            return Err(err);
        }

        info!(
            %user_id,
            %provider_subscription_id,
            cancel_at_period_end,
            "subscriptions: updating cancel_at_period_end at stripe"
        );

        self.stripe_client
            .set_cancel_at_period_end(&provider_subscription_id, cancel_at_period_end)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %provider_subscription_id,
                    error = ?err,
                    "subscriptions: stripe cancel_at_period_end update failed"
                );
                SubscriptionError::Internal(err)
            })?;

        self.subscription_repo
            .set_cancel_at_period_end(user_id, cancel_at_period_end)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %provider_subscription_id,
                    db_error = ?err,
                    "subscriptions: failed to store cancel_at_period_end"
                );
                SubscriptionError::Internal(err)
            })?;

        subscription.cancel_at_period_end = cancel_at_period_end;
        Ok(status_dto(Some(subscription)))
    }

    async fn load(&self, user_id: Uuid) -> UseCaseResult<Option<SubscriptionEntity>> {
        self.subscription_repo
            .find_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    db_error = ?err,
                    "subscriptions: failed to load subscription"
                );
                SubscriptionError::Internal(err)
            })
    }
}

fn status_dto(subscription: Option<SubscriptionEntity>) -> SubscriptionStatusDto {
    let now = Utc::now();
    SubscriptionStatusDto {
        is_active: entitlement_resolver::subscription_qualifies(subscription.as_ref(), now),
        has_plus: entitlement_resolver::has_plus_access(subscription.as_ref(), now),
        subscription: subscription.map(CurrentSubscriptionDto::from),
    }
}
