use crate::{
    auth::AuthUser,
    axum_http::error_responses::AppError,
    usecases::{refunds::RefundUseCase, stripe_gateway::StripeGateway},
};
use axum::{Json, Router, extract::State, routing::post};
use crates::{
    domain::{
        repositories::{
            divisions::DivisionRepository, purchased_books::PurchasedBookRepository,
            subscriptions::SubscriptionRepository,
        },
        value_objects::refunds::{
            RefundEligibilityDto, RefundEligibilityRequest, RefundExecutionDto,
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            divisions::DivisionPostgres, purchased_books::PurchasedBookPostgres,
            subscriptions::SubscriptionPostgres,
        },
    },
    payments::stripe_client::StripeClient,
};
use std::sync::Arc;

pub fn routes(db_pool: Arc<PgPoolSquad>, stripe_client: Arc<StripeClient>) -> Router {
    let usecase = RefundUseCase::new(
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(PurchasedBookPostgres::new(Arc::clone(&db_pool))),
        Arc::new(DivisionPostgres::new(Arc::clone(&db_pool))),
        stripe_client,
    );

    Router::new()
        .route(
            "/eligibility",
            post(
                check_eligibility::<
                    SubscriptionPostgres,
                    PurchasedBookPostgres,
                    DivisionPostgres,
                    StripeClient,
                >,
            ),
        )
        .route(
            "/execute",
            post(
                execute_refund::<
                    SubscriptionPostgres,
                    PurchasedBookPostgres,
                    DivisionPostgres,
                    StripeClient,
                >,
            ),
        )
        .with_state(Arc::new(usecase))
}

pub async fn check_eligibility<S, P, D, Stripe>(
    State(usecase): State<Arc<RefundUseCase<S, P, D, Stripe>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(request): Json<RefundEligibilityRequest>,
) -> Result<Json<RefundEligibilityDto>, AppError>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PurchasedBookRepository + Send + Sync + 'static,
    D: DivisionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    Ok(Json(usecase.check_eligibility(user_id, request).await?))
}

pub async fn execute_refund<S, P, D, Stripe>(
    State(usecase): State<Arc<RefundUseCase<S, P, D, Stripe>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(request): Json<RefundEligibilityRequest>,
) -> Result<Json<RefundExecutionDto>, AppError>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PurchasedBookRepository + Send + Sync + 'static,
    D: DivisionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    Ok(Json(usecase.execute(user_id, request).await?))
}
