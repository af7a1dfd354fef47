use std::{collections::HashMap, sync::Arc};

use crates::{
    domain::{
        repositories::{divisions::DivisionRepository, profiles::ProfileRepository},
        value_objects::{enums::plan_types::PlanType, purchases::metadata_keys},
    },
    payments::stripe_client::CheckoutMode,
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::stripe_gateway::StripeGateway;
use crate::config::config_model::StripePrices;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("price is not offered: {0}")]
    InvalidPrice(String),
    #[error("division not found")]
    DivisionNotFound,
    #[error("user email is required for checkout")]
    MissingEmail,
    #[error("no billing customer for user")]
    CustomerNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CheckoutError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            CheckoutError::InvalidPrice(_) | CheckoutError::MissingEmail => StatusCode::BAD_REQUEST,
            CheckoutError::DivisionNotFound | CheckoutError::CustomerNotFound => {
                StatusCode::NOT_FOUND
            }
            CheckoutError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, CheckoutError>;

pub struct CheckoutUseCase<Prof, D, Stripe>
where
    Prof: ProfileRepository + Send + Sync + 'static,
    D: DivisionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    profile_repo: Arc<Prof>,
    division_repo: Arc<D>,
    stripe_client: Arc<Stripe>,
    prices: StripePrices,
}

impl<Prof, D, Stripe> CheckoutUseCase<Prof, D, Stripe>
where
    Prof: ProfileRepository + Send + Sync + 'static,
    D: DivisionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    pub fn new(
        profile_repo: Arc<Prof>,
        division_repo: Arc<D>,
        stripe_client: Arc<Stripe>,
        prices: StripePrices,
    ) -> Self {
        Self {
            profile_repo,
            division_repo,
            stripe_client,
            prices,
        }
    }

    pub async fn create_subscription_checkout(
        &self,
        user_id: Uuid,
        user_email: Option<String>,
        price_id: String,
    ) -> UseCaseResult<String> {
        info!(%user_id, %price_id, "checkout: subscription checkout requested");

        if !self.prices.is_subscription_price(&price_id) {
            let err = CheckoutError::InvalidPrice(price_id);
            warn!(
                %user_id,
                status = err.status_code().as_u16(),
                "checkout: price is not a subscription price"
            );
            return Err(err);
        }

        let customer_id = self.ensure_customer(user_id, user_email).await?;

        let metadata = HashMap::from([
            (metadata_keys::USER_ID.to_string(), user_id.to_string()),
            (
                metadata_keys::PLAN_TYPE.to_string(),
                self.plan_type_for(&price_id).to_string(),
            ),
        ]);

        self.open_session(user_id, &price_id, CheckoutMode::Subscription, &customer_id, metadata)
            .await
    }

    pub async fn create_division_checkout(
        &self,
        user_id: Uuid,
        user_email: Option<String>,
        division_id: Uuid,
    ) -> UseCaseResult<String> {
        info!(%user_id, %division_id, "checkout: division checkout requested");

        let division = self
            .division_repo
            .find_published_by_id(division_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %division_id,
                    db_error = ?err,
                    "checkout: failed to load division"
                );
                CheckoutError::Internal(err)
            })?
            .ok_or_else(|| {
                let err = CheckoutError::DivisionNotFound;
                warn!(
                    %user_id,
                    %division_id,
                    status = err.status_code().as_u16(),
                    "checkout: division not found or unpublished"
                );
                err
            })?;

        let customer_id = self.ensure_customer(user_id, user_email).await?;

        let metadata = HashMap::from([
            (metadata_keys::USER_ID.to_string(), user_id.to_string()),
            (metadata_keys::BOOK_ID.to_string(), division.book_id.to_string()),
            (metadata_keys::DIVISION_ID.to_string(), division.id.to_string()),
        ]);

        let price_id = self.prices.division.clone();
        self.open_session(user_id, &price_id, CheckoutMode::Payment, &customer_id, metadata)
            .await
    }

    /// Opens the Stripe customer portal. Only users who already went through
    /// checkout have a customer to manage.
    pub async fn create_portal_session(&self, user_id: Uuid) -> UseCaseResult<String> {
        let customer_id = self
            .profile_repo
            .find_stripe_customer_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "checkout: failed to load stripe customer");
                CheckoutError::Internal(err)
            })?
            .ok_or_else(|| {
                let err = CheckoutError::CustomerNotFound;
                warn!(
                    %user_id,
                    status = err.status_code().as_u16(),
                    "checkout: portal requested without stripe customer"
                );
                err
            })?;

        let portal_url = self
            .stripe_client
            .create_portal_session(&customer_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %customer_id,
                    error = ?err,
                    "checkout: stripe portal session creation failed"
                );
                CheckoutError::Internal(err)
            })?;

        info!(%user_id, "checkout: portal session created");
        Ok(portal_url)
    }

    fn plan_type_for(&self, price_id: &str) -> PlanType {
        if price_id == self.prices.yearly || price_id == self.prices.yearly_plus {
            PlanType::Yearly
        } else {
            PlanType::Monthly
        }
    }

    /// Returns the stored Stripe customer, creating and storing one on first checkout.
    async fn ensure_customer(&self, user_id: Uuid, user_email: Option<String>) -> UseCaseResult<String> {
        let existing = self
            .profile_repo
            .find_stripe_customer_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "checkout: failed to load stripe customer");
                CheckoutError::Internal(err)
            })?;

        if let Some(customer_id) = existing {
            return Ok(customer_id);
        }

        let Some(email) = user_email.filter(|email| !email.trim().is_empty()) else {
            let err = CheckoutError::MissingEmail;
            warn!(
                %user_id,
                status = err.status_code().as_u16(),
                "checkout: missing email for new stripe customer"
            );
            return Err(err);
        };

        let customer_id = self
            .stripe_client
            .create_customer(&email, user_id)
            .await
            .map_err(|err| {
                error!(%user_id, error = ?err, "checkout: stripe customer creation failed");
                CheckoutError::Internal(err)
            })?;

        self.profile_repo
            .set_stripe_customer_id(user_id, customer_id.clone())
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %customer_id,
                    db_error = ?err,
                    "checkout: failed to store stripe customer"
                );
                CheckoutError::Internal(err)
            })?;

        info!(%user_id, %customer_id, "checkout: stripe customer created");
        Ok(customer_id)
    }

    async fn open_session(
        &self,
        user_id: Uuid,
        price_id: &str,
        mode: CheckoutMode,
        customer_id: &str,
        metadata: HashMap<String, String>,
    ) -> UseCaseResult<String> {
        let checkout_url = self
            .stripe_client
            .create_checkout_session(price_id, mode, customer_id, metadata)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %price_id,
                    mode = mode.as_str(),
                    %customer_id,
                    error = ?err,
                    "checkout: stripe checkout session creation failed"
                );
                CheckoutError::Internal(err)
            })?;

        info!(
            %user_id,
            mode = mode.as_str(),
            "checkout: checkout session created"
        );

        Ok(checkout_url)
    }
}
