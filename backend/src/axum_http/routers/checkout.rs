use crate::{
    auth::AuthUser,
    axum_http::error_responses::AppError,
    config::config_model::StripePrices,
    usecases::{checkout::CheckoutUseCase, stripe_gateway::StripeGateway},
};
use axum::{Json, Router, extract::State, routing::post};
use crates::{
    domain::{
        repositories::{divisions::DivisionRepository, profiles::ProfileRepository},
        value_objects::{
            purchases::CreateDivisionCheckoutRequest,
            subscriptions::{
                CreateCheckoutResponse, CreateSubscriptionCheckoutRequest, PortalSessionResponse,
            },
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{divisions::DivisionPostgres, profiles::ProfilePostgres},
    },
    payments::stripe_client::StripeClient,
};
use std::sync::Arc;

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    prices: StripePrices,
    stripe_client: Arc<StripeClient>,
) -> Router {
    let profile_repository = ProfilePostgres::new(Arc::clone(&db_pool));
    let division_repository = DivisionPostgres::new(Arc::clone(&db_pool));
    let usecase = CheckoutUseCase::new(
        Arc::new(profile_repository),
        Arc::new(division_repository),
        stripe_client,
        prices,
    );

    Router::new()
        .route(
            "/subscription",
            post(create_subscription_checkout::<ProfilePostgres, DivisionPostgres, StripeClient>),
        )
        .route(
            "/division",
            post(create_division_checkout::<ProfilePostgres, DivisionPostgres, StripeClient>),
        )
        .route(
            "/portal",
            post(create_portal_session::<ProfilePostgres, DivisionPostgres, StripeClient>),
        )
        .with_state(Arc::new(usecase))
}

pub async fn create_subscription_checkout<Prof, D, Stripe>(
    State(usecase): State<Arc<CheckoutUseCase<Prof, D, Stripe>>>,
    AuthUser { user_id, email, .. }: AuthUser,
    Json(request): Json<CreateSubscriptionCheckoutRequest>,
) -> Result<Json<CreateCheckoutResponse>, AppError>
where
    Prof: ProfileRepository + Send + Sync + 'static,
    D: DivisionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    let checkout_url = usecase
        .create_subscription_checkout(user_id, email, request.price_id)
        .await?;
    Ok(Json(CreateCheckoutResponse { checkout_url }))
}

pub async fn create_division_checkout<Prof, D, Stripe>(
    State(usecase): State<Arc<CheckoutUseCase<Prof, D, Stripe>>>,
    AuthUser { user_id, email, .. }: AuthUser,
    Json(request): Json<CreateDivisionCheckoutRequest>,
) -> Result<Json<CreateCheckoutResponse>, AppError>
where
    Prof: ProfileRepository + Send + Sync + 'static,
    D: DivisionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    let checkout_url = usecase
        .create_division_checkout(user_id, email, request.division_id)
        .await?;
    Ok(Json(CreateCheckoutResponse { checkout_url }))
}

pub async fn create_portal_session<Prof, D, Stripe>(
    State(usecase): State<Arc<CheckoutUseCase<Prof, D, Stripe>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> Result<Json<PortalSessionResponse>, AppError>
where
    Prof: ProfileRepository + Send + Sync + 'static,
    D: DivisionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    let url = usecase.create_portal_session(user_id).await?;
    Ok(Json(PortalSessionResponse { url }))
}
