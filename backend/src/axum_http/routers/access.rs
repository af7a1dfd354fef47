use crate::{auth::AuthUser, usecases::access::AccessUseCase};
use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::{
        repositories::{
            divisions::DivisionRepository, purchased_books::PurchasedBookRepository,
            subscriptions::SubscriptionRepository,
        },
        value_objects::entitlements::{CheckBookAccessRequest, CheckDivisionAccessRequest},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            divisions::DivisionPostgres, purchased_books::PurchasedBookPostgres,
            subscriptions::SubscriptionPostgres,
        },
    },
};
use std::sync::Arc;
use tracing::info;

type PgAccessUseCase = AccessUseCase<SubscriptionPostgres, PurchasedBookPostgres, DivisionPostgres>;

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let usecase: PgAccessUseCase = AccessUseCase::new(
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(PurchasedBookPostgres::new(Arc::clone(&db_pool))),
        Arc::new(DivisionPostgres::new(Arc::clone(&db_pool))),
    );

    Router::new()
        .route(
            "/division",
            post(check_division::<SubscriptionPostgres, PurchasedBookPostgres, DivisionPostgres>),
        )
        .route(
            "/book",
            post(check_book::<SubscriptionPostgres, PurchasedBookPostgres, DivisionPostgres>),
        )
        .route(
            "/library",
            get(library::<SubscriptionPostgres, PurchasedBookPostgres, DivisionPostgres>),
        )
        .route(
            "/info",
            get(access_info::<SubscriptionPostgres, PurchasedBookPostgres, DivisionPostgres>),
        )
        .with_state(Arc::new(usecase))
}

pub async fn check_division<S, P, D>(
    State(usecase): State<Arc<AccessUseCase<S, P, D>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(request): Json<CheckDivisionAccessRequest>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PurchasedBookRepository + Send + Sync + 'static,
    D: DivisionRepository + Send + Sync + 'static,
{
    let access = usecase
        .check_division_access(user_id, &request.division_id)
        .await;
    info!(
        %user_id,
        division_id = %request.division_id,
        has_access = access.has_access,
        "access: division check answered"
    );
    Json(access)
}

pub async fn check_book<S, P, D>(
    State(usecase): State<Arc<AccessUseCase<S, P, D>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(request): Json<CheckBookAccessRequest>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PurchasedBookRepository + Send + Sync + 'static,
    D: DivisionRepository + Send + Sync + 'static,
{
    Json(usecase.check_book_access(user_id, &request.book_id).await)
}

pub async fn library<S, P, D>(
    State(usecase): State<Arc<AccessUseCase<S, P, D>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PurchasedBookRepository + Send + Sync + 'static,
    D: DivisionRepository + Send + Sync + 'static,
{
    Json(usecase.library_access(user_id).await)
}

pub async fn access_info<S, P, D>(
    State(usecase): State<Arc<AccessUseCase<S, P, D>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PurchasedBookRepository + Send + Sync + 'static,
    D: DivisionRepository + Send + Sync + 'static,
{
    Json(usecase.access_info(user_id).await)
}
