use crate::{
    axum_http::error_responses::AppError,
    usecases::{stripe_gateway::StripeGateway, subscription_sync::SubscriptionSyncUseCase},
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use crates::{
    domain::repositories::{
        profiles::ProfileRepository, purchased_books::PurchasedBookRepository,
        subscriptions::SubscriptionRepository,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            profiles::ProfilePostgres, purchased_books::PurchasedBookPostgres,
            subscriptions::SubscriptionPostgres,
        },
    },
    payments::stripe_client::StripeClient,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

pub fn routes(db_pool: Arc<PgPoolSquad>, stripe_client: Arc<StripeClient>) -> Router {
    let usecase = SubscriptionSyncUseCase::new(
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(PurchasedBookPostgres::new(Arc::clone(&db_pool))),
        Arc::new(ProfilePostgres::new(Arc::clone(&db_pool))),
        stripe_client,
    );

    Router::new()
        .route(
            "/stripe",
            post(
                stripe_webhook::<
                    SubscriptionPostgres,
                    PurchasedBookPostgres,
                    ProfilePostgres,
                    StripeClient,
                >,
            ),
        )
        .with_state(Arc::new(usecase))
}

pub async fn stripe_webhook<S, P, Prof, Stripe>(
    State(usecase): State<Arc<SubscriptionSyncUseCase<S, P, Prof, Stripe>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PurchasedBookRepository + Send + Sync + 'static,
    Prof: ProfileRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            warn!(
                payload_bytes = body.len(),
                "webhooks router: missing stripe-signature header"
            );
            AppError::BadRequest("missing stripe-signature header".to_string())
        })?;

    let outcome = usecase.handle_stripe_webhook(&body, signature).await?;
    info!(outcome = ?outcome, "webhooks router: stripe event processed");

    Ok(Json(json!({ "received": true })))
}
