use crate::{
    auth::AuthUser,
    axum_http::error_responses::AppError,
    usecases::{
        stripe_gateway::StripeGateway,
        subscription_sync::{SubscriptionSyncUseCase, SyncOutcome},
        subscriptions::SubscriptionUseCase,
    },
};
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use crates::{
    domain::{
        repositories::{
            profiles::ProfileRepository, purchased_books::PurchasedBookRepository,
            subscriptions::SubscriptionRepository,
        },
        value_objects::subscriptions::SubscriptionStatusDto,
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
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub synced: bool,
    pub subscription: SubscriptionStatusDto,
}

pub fn routes(db_pool: Arc<PgPoolSquad>, stripe_client: Arc<StripeClient>) -> Router {
    let subscription_repository = Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool)));
    let purchase_repository = PurchasedBookPostgres::new(Arc::clone(&db_pool));
    let profile_repository = ProfilePostgres::new(Arc::clone(&db_pool));

    let subscription_usecase =
        SubscriptionUseCase::new(Arc::clone(&subscription_repository), Arc::clone(&stripe_client));
    let sync_usecase = SubscriptionSyncUseCase::new(
        Arc::clone(&subscription_repository),
        Arc::new(purchase_repository),
        Arc::new(profile_repository),
        Arc::clone(&stripe_client),
    );

    let management = Router::new()
        .route(
            "/status",
            get(get_status::<SubscriptionPostgres, StripeClient>),
        )
        .route("/cancel", post(cancel::<SubscriptionPostgres, StripeClient>))
        .route(
            "/reactivate",
            post(reactivate::<SubscriptionPostgres, StripeClient>),
        )
        .with_state(Arc::new(subscription_usecase));

    let sync_router = Router::new()
        .route(
            "/sync",
            post(
                sync_subscription::<SubscriptionPostgres, PurchasedBookPostgres, ProfilePostgres, StripeClient>,
            ),
        )
        .with_state(Arc::new(SyncState {
            sync: sync_usecase,
            status: SubscriptionUseCase::new(subscription_repository, stripe_client),
        }));

    management.merge(sync_router)
}

pub struct SyncState<S, P, Prof, Stripe>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PurchasedBookRepository + Send + Sync + 'static,
    Prof: ProfileRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    sync: SubscriptionSyncUseCase<S, P, Prof, Stripe>,
    status: SubscriptionUseCase<S, Stripe>,
}

pub async fn get_status<S, Stripe>(
    State(usecase): State<Arc<SubscriptionUseCase<S, Stripe>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> Result<Json<SubscriptionStatusDto>, AppError>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    Ok(Json(usecase.get_status(user_id).await?))
}

pub async fn cancel<S, Stripe>(
    State(usecase): State<Arc<SubscriptionUseCase<S, Stripe>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> Result<Json<SubscriptionStatusDto>, AppError>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    Ok(Json(usecase.cancel(user_id).await?))
}

pub async fn reactivate<S, Stripe>(
    State(usecase): State<Arc<SubscriptionUseCase<S, Stripe>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> Result<Json<SubscriptionStatusDto>, AppError>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    Ok(Json(usecase.reactivate(user_id).await?))
}

pub async fn sync_subscription<S, P, Prof, Stripe>(
    State(state): State<Arc<SyncState<S, P, Prof, Stripe>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> Result<Json<SyncResponse>, AppError>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PurchasedBookRepository + Send + Sync + 'static,
    Prof: ProfileRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    let outcome = state.sync.sync_user(user_id).await?;
    let synced = matches!(outcome, SyncOutcome::SubscriptionUpserted(_));
    info!(%user_id, synced, "subscriptions router: manual sync finished");

    Ok(Json(SyncResponse {
        synced,
        subscription: state.status.get_status(user_id).await?,
    }))
}
