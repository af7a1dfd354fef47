use std::collections::HashMap;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use crates::payments::stripe_client::{
    CheckoutMode, StripeClient, StripeEvent, StripeProduct, StripeSubscription,
};
use uuid::Uuid;

/// The slice of Stripe the use cases talk to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StripeGateway: Send + Sync {
    async fn create_customer(&self, email: &str, user_id: Uuid) -> AnyResult<String>;

    async fn create_checkout_session(
        &self,
        price_id: &str,
        mode: CheckoutMode,
        customer_id: &str,
        metadata: HashMap<String, String>,
    ) -> AnyResult<String>;

    async fn set_cancel_at_period_end(
        &self,
        provider_subscription_id: &str,
        cancel_at_period_end: bool,
    ) -> AnyResult<()>;

    async fn cancel_subscription_now(&self, provider_subscription_id: &str) -> AnyResult<()>;

    async fn latest_subscription_payment_intent(
        &self,
        provider_subscription_id: &str,
    ) -> AnyResult<Option<String>>;

    async fn refund_payment(&self, payment_intent_id: &str) -> AnyResult<String>;

    async fn create_portal_session(&self, customer_id: &str) -> AnyResult<String>;

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<StripeEvent>;

    async fn retrieve_subscription(&self, subscription_id: &str) -> AnyResult<StripeSubscription>;

    async fn retrieve_product(&self, product_id: &str) -> AnyResult<StripeProduct>;
}

#[async_trait]
impl StripeGateway for StripeClient {
    async fn create_customer(&self, email: &str, user_id: Uuid) -> AnyResult<String> {
        self.create_customer(email, user_id).await
    }

    async fn create_checkout_session(
        &self,
        price_id: &str,
        mode: CheckoutMode,
        customer_id: &str,
        metadata: HashMap<String, String>,
    ) -> AnyResult<String> {
        self.create_checkout_session(price_id, mode, customer_id, metadata)
            .await
    }

    async fn set_cancel_at_period_end(
        &self,
        provider_subscription_id: &str,
        cancel_at_period_end: bool,
    ) -> AnyResult<()> {
        self.set_cancel_at_period_end(provider_subscription_id, cancel_at_period_end)
            .await
    }

    async fn cancel_subscription_now(&self, provider_subscription_id: &str) -> AnyResult<()> {
        self.cancel_subscription_now(provider_subscription_id).await
    }

    async fn latest_subscription_payment_intent(
        &self,
        provider_subscription_id: &str,
    ) -> AnyResult<Option<String>> {
        self.latest_subscription_payment_intent(provider_subscription_id)
            .await
    }

    async fn refund_payment(&self, payment_intent_id: &str) -> AnyResult<String> {
        self.refund_payment(payment_intent_id).await
    }

    async fn create_portal_session(&self, customer_id: &str) -> AnyResult<String> {
        self.create_portal_session(customer_id).await
    }

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<StripeEvent> {
        self.verify_webhook_signature(payload, signature)
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> AnyResult<StripeSubscription> {
        self.retrieve_subscription(subscription_id).await
    }

    async fn retrieve_product(&self, product_id: &str) -> AnyResult<StripeProduct> {
        self.retrieve_product(product_id).await
    }
}
