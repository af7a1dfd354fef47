use std::sync::Arc;

use chrono::Utc;
use crates::domain::{
    entities::{purchased_books::PurchasedBookEntity, subscriptions::SubscriptionEntity},
    repositories::{
        divisions::DivisionRepository, purchased_books::PurchasedBookRepository,
        subscriptions::SubscriptionRepository,
    },
    value_objects::{
        enums::{plan_types::PlanType, refund_kinds::RefundKind},
        refunds::{
            REFUND_WINDOW_DAYS, RefundEligibilityDto, RefundEligibilityRequest,
            RefundExecutionDto, is_refund_eligible,
        },
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::stripe_gateway::StripeGateway;

#[derive(Debug, Error)]
pub enum RefundError {
    #[error("{0} not found")]
    NotFound(RefundKind),
    #[error("refund window of {} days has passed", REFUND_WINDOW_DAYS)]
    WindowExpired,
    #[error("{0}")]
    NotRefundable(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RefundError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            RefundError::NotFound(_) => StatusCode::NOT_FOUND,
            RefundError::WindowExpired => StatusCode::BAD_REQUEST,
            RefundError::NotRefundable(_) => StatusCode::CONFLICT,
            RefundError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, RefundError>;

/// Refund window checks and refunds of subscriptions and division purchases.
/// A refund always revokes the access it paid for.
pub struct RefundUseCase<S, P, D, Stripe>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PurchasedBookRepository + Send + Sync + 'static,
    D: DivisionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    purchase_repo: Arc<P>,
    division_repo: Arc<D>,
    stripe_client: Arc<Stripe>,
}

impl<S, P, D, Stripe> RefundUseCase<S, P, D, Stripe>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PurchasedBookRepository + Send + Sync + 'static,
    D: DivisionRepository + Send + Sync + 'static,
    Stripe: StripeGateway + Send + Sync + 'static,
{
    pub fn new(
        subscription_repo: Arc<S>,
        purchase_repo: Arc<P>,
        division_repo: Arc<D>,
        stripe_client: Arc<Stripe>,
    ) -> Self {
        Self {
            subscription_repo,
            purchase_repo,
            division_repo,
            stripe_client,
        }
    }

    pub async fn check_eligibility(
        &self,
        user_id: Uuid,
        request: RefundEligibilityRequest,
    ) -> UseCaseResult<RefundEligibilityDto> {
        let RefundEligibilityRequest { kind, id } = request;

        let eligibility = match kind {
            RefundKind::Subscription => {
                let subscription = self.load_subscription(user_id, id).await?;
                subscription_eligibility(&subscription)
            }
            RefundKind::Purchase => {
                let purchase = self.load_purchase(user_id, id).await?;
                let title = self.purchase_title(&purchase).await;
                purchase_eligibility(&purchase, title)
            }
        };

        info!(
            %user_id,
            kind = %kind,
            %id,
            eligible = eligibility.eligible,
            "refunds: eligibility checked"
        );

        Ok(eligibility)
    }

    pub async fn execute(
        &self,
        user_id: Uuid,
        request: RefundEligibilityRequest,
    ) -> UseCaseResult<RefundExecutionDto> {
        let RefundEligibilityRequest { kind, id } = request;
        info!(%user_id, kind = %kind, %id, "refunds: refund requested");

        match kind {
            RefundKind::Subscription => self.refund_subscription(user_id, id).await,
            RefundKind::Purchase => self.refund_purchase(user_id, id).await,
        }
    }

    /// Cancels at Stripe immediately, ends the local row, then refunds the latest
    /// charge. A failed charge refund is logged and does not restore access.
    async fn refund_subscription(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> UseCaseResult<RefundExecutionDto> {
        let kind = RefundKind::Subscription;
        let subscription = self.load_subscription(user_id, id).await?;
        self.ensure_inside_window(user_id, kind, id, &subscription.created_at)?;

        if subscription.status().is_terminal() {
            return Err(self.not_refundable(user_id, kind, id, "subscription already ended"));
        }

        let provider_subscription_id = subscription.subscription_id.clone().ok_or_else(|| {
            self.not_refundable(user_id, kind, id, "subscription has no billing record")
        })?;

        self.stripe_client
            .cancel_subscription_now(&provider_subscription_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %provider_subscription_id,
                    error = ?err,
                    "refunds: stripe immediate cancel failed"
                );
                RefundError::Internal(err)
            })?;

        self.subscription_repo
            .mark_canceled(subscription.id, user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %provider_subscription_id,
                    db_error = ?err,
                    "refunds: subscription canceled at stripe but not locally"
                );
                RefundError::Internal(err)
            })?;

        let refund_id = self
            .refund_latest_subscription_charge(user_id, &provider_subscription_id)
            .await;

        info!(
            %user_id,
            %provider_subscription_id,
            refund_id = ?refund_id,
            "refunds: subscription refunded"
        );

        Ok(RefundExecutionDto {
            kind,
            id,
            refund_id,
            access_revoked: true,
        })
    }

    async fn refund_latest_subscription_charge(
        &self,
        user_id: Uuid,
        provider_subscription_id: &str,
    ) -> Option<String> {
        let payment_intent_id = match self
            .stripe_client
            .latest_subscription_payment_intent(provider_subscription_id)
            .await
        {
            Ok(Some(payment_intent_id)) => payment_intent_id,
            Ok(None) => {
                warn!(
                    %user_id,
                    %provider_subscription_id,
                    "refunds: no charge found for subscription"
                );
                return None;
            }
            Err(err) => {
                warn!(
                    %user_id,
                    %provider_subscription_id,
                    error = ?err,
                    "refunds: failed to look up subscription charge"
                );
                return None;
            }
        };

        match self.stripe_client.refund_payment(&payment_intent_id).await {
            Ok(refund_id) => Some(refund_id),
            Err(err) => {
                warn!(
                    %user_id,
                    %provider_subscription_id,
                    %payment_intent_id,
                    error = ?err,
                    "refunds: subscription charge refund failed"
                );
                None
            }
        }
    }

    /// Refunds the charge first and only then revokes the purchase, so a failed
    /// refund leaves the user with what they paid for.
    async fn refund_purchase(&self, user_id: Uuid, id: Uuid) -> UseCaseResult<RefundExecutionDto> {
        let kind = RefundKind::Purchase;
        let purchase = self.load_purchase(user_id, id).await?;
        self.ensure_inside_window(user_id, kind, id, &purchase.created_at)?;

        let payment_intent_id = purchase.stripe_payment_intent_id.clone().ok_or_else(|| {
            self.not_refundable(user_id, kind, id, "purchase has no recorded payment")
        })?;

        let refund_id = self
            .stripe_client
            .refund_payment(&payment_intent_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %payment_intent_id,
                    error = ?err,
                    "refunds: stripe purchase refund failed"
                );
                RefundError::Internal(err)
            })?;

        let revoked = self
            .purchase_repo
            .delete_for_user(purchase.id, user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    purchase_id = %purchase.id,
                    %refund_id,
                    db_error = ?err,
                    "refunds: purchase refunded but not revoked"
                );
                RefundError::Internal(err)
            })?;

        if !revoked {
            warn!(
                %user_id,
                purchase_id = %purchase.id,
                "refunds: purchase row was already gone"
            );
        }

        info!(
            %user_id,
            purchase_id = %purchase.id,
            division_id = %purchase.division_id,
            %refund_id,
            "refunds: purchase refunded"
        );

        Ok(RefundExecutionDto {
            kind,
            id,
            refund_id: Some(refund_id),
            access_revoked: true,
        })
    }

    async fn load_subscription(&self, user_id: Uuid, id: Uuid) -> UseCaseResult<SubscriptionEntity> {
        let kind = RefundKind::Subscription;
        self.subscription_repo
            .find_by_id_for_user(id, user_id)
            .await
            .map_err(|err| self.internal(user_id, kind, err))?
            .ok_or_else(|| self.not_found(user_id, kind, id))
    }

    async fn load_purchase(&self, user_id: Uuid, id: Uuid) -> UseCaseResult<PurchasedBookEntity> {
        let kind = RefundKind::Purchase;
        self.purchase_repo
            .find_by_id_for_user(id, user_id)
            .await
            .map_err(|err| self.internal(user_id, kind, err))?
            .ok_or_else(|| self.not_found(user_id, kind, id))
    }

    fn ensure_inside_window(
        &self,
        user_id: Uuid,
        kind: RefundKind,
        id: Uuid,
        created_at: &chrono::DateTime<Utc>,
    ) -> UseCaseResult<()> {
        if is_refund_eligible(*created_at, Utc::now()) {
            return Ok(());
        }

        let err = RefundError::WindowExpired;
        warn!(
            %user_id,
            kind = %kind,
            %id,
            %created_at,
            status = err.status_code().as_u16(),
            "refunds: refund window has passed"
        );
        Err(err)
    }

    async fn purchase_title(&self, purchase: &PurchasedBookEntity) -> String {
        let book_title = match self.division_repo.find_book_by_id(purchase.book_id).await {
            Ok(Some(book)) => book.title,
            Ok(None) => "Livro".to_string(),
            Err(err) => {
                warn!(book_id = %purchase.book_id, db_error = ?err, "refunds: book lookup failed");
                "Livro".to_string()
            }
        };

        let division_title = match self.division_repo.find_by_id(purchase.division_id).await {
            Ok(Some(division)) => division.title,
            Ok(None) => "Divisão".to_string(),
            Err(err) => {
                warn!(
                    division_id = %purchase.division_id,
                    db_error = ?err,
                    "refunds: division lookup failed"
                );
                "Divisão".to_string()
            }
        };

        format!("{book_title} - {division_title}")
    }

    fn not_found(&self, user_id: Uuid, kind: RefundKind, id: Uuid) -> RefundError {
        let err = RefundError::NotFound(kind);
        warn!(
            %user_id,
            kind = %kind,
            %id,
            status = err.status_code().as_u16(),
            "refunds: record not found for user"
        );
        err
    }

    fn not_refundable(
        &self,
        user_id: Uuid,
        kind: RefundKind,
        id: Uuid,
        reason: &str,
    ) -> RefundError {
        let err = RefundError::NotRefundable(reason.to_string());
        warn!(
            %user_id,
            kind = %kind,
            %id,
            reason,
            status = err.status_code().as_u16(),
            "refunds: refund refused"
        );
        err
    }

    fn internal(&self, user_id: Uuid, kind: RefundKind, err: anyhow::Error) -> RefundError {
        error!(%user_id, kind = %kind, db_error = ?err, "refunds: failed to load record");
        RefundError::Internal(err)
    }
}

fn subscription_title(subscription: &SubscriptionEntity) -> &'static str {
    match (subscription.plan_type(), subscription.explicacao_pratica) {
        (PlanType::Monthly, true) => "Mensal Plus",
        (PlanType::Monthly, false) => "Mensal Básico",
        (PlanType::Yearly, true) => "Anual Plus",
        (PlanType::Yearly, false) => "Anual Básico",
    }
}

fn subscription_eligibility(subscription: &SubscriptionEntity) -> RefundEligibilityDto {
    RefundEligibilityDto {
        kind: RefundKind::Subscription,
        id: subscription.id,
        title: subscription_title(subscription).to_string(),
        created_at: subscription.created_at,
        eligible: is_refund_eligible(subscription.created_at, Utc::now()),
    }
}

fn purchase_eligibility(purchase: &PurchasedBookEntity, title: String) -> RefundEligibilityDto {
    RefundEligibilityDto {
        kind: RefundKind::Purchase,
        id: purchase.id,
        title,
        created_at: purchase.created_at,
        eligible: is_refund_eligible(purchase.created_at, Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::stripe_gateway::MockStripeGateway;
    use anyhow::anyhow;
    use chrono::{DateTime, Duration};
    use crates::domain::{
        entities::{books::BookEntity, divisions::DivisionEntity},
        repositories::{
            divisions::MockDivisionRepository, purchased_books::MockPurchasedBookRepository,
            subscriptions::MockSubscriptionRepository,
        },
    };
    use mockall::predicate::eq;

    type TestUseCase = RefundUseCase<
        MockSubscriptionRepository,
        MockPurchasedBookRepository,
        MockDivisionRepository,
        MockStripeGateway,
    >;

    fn subscription(id: Uuid, user_id: Uuid, created_at: DateTime<Utc>) -> SubscriptionEntity {
        SubscriptionEntity {
            id,
            user_id,
            status: "active".to_string(),
            plan_type: "monthly".to_string(),
            price_id: Some("price_monthly_plus".to_string()),
            subscription_id: Some("sub_1".to_string()),
            current_period_start: Some(created_at),
            current_period_end: None,
            cancel_at_period_end: false,
            explicacao_pratica: true,
            created_at,
            updated_at: created_at,
        }
    }

    fn purchase(
        id: Uuid,
        user_id: Uuid,
        created_at: DateTime<Utc>,
        payment_intent_id: Option<&str>,
    ) -> PurchasedBookEntity {
        PurchasedBookEntity {
            id,
            user_id,
            book_id: Uuid::new_v4(),
            division_id: Uuid::new_v4(),
            expires_at: created_at + Duration::days(30),
            stripe_payment_intent_id: payment_intent_id.map(str::to_string),
            created_at,
            updated_at: created_at,
        }
    }

    fn subscription_repo_with(row: Option<SubscriptionEntity>) -> MockSubscriptionRepository {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_by_id_for_user().returning(move |_, _| {
            let row = row.clone();
            Box::pin(async move { Ok(row) })
        });
        repo
    }

    fn purchase_repo_with(row: Option<PurchasedBookEntity>) -> MockPurchasedBookRepository {
        let mut repo = MockPurchasedBookRepository::new();
        repo.expect_find_by_id_for_user().returning(move |_, _| {
            let row = row.clone();
            Box::pin(async move { Ok(row) })
        });
        repo
    }

    fn usecase(
        subscription_repo: MockSubscriptionRepository,
        purchase_repo: MockPurchasedBookRepository,
        division_repo: MockDivisionRepository,
        stripe: MockStripeGateway,
    ) -> TestUseCase {
        RefundUseCase::new(
            Arc::new(subscription_repo),
            Arc::new(purchase_repo),
            Arc::new(division_repo),
            Arc::new(stripe),
        )
    }

    fn request(kind: RefundKind, id: Uuid) -> RefundEligibilityRequest {
        RefundEligibilityRequest { kind, id }
    }

    #[tokio::test]
    async fn recent_subscription_is_eligible() {
        let user_id = Uuid::new_v4();
        let id = Uuid::new_v4();
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_id_for_user()
            .with(eq(id), eq(user_id))
            .returning(move |id, user_id| {
                let row = subscription(id, user_id, Utc::now() - Duration::days(3));
                Box::pin(async move { Ok(Some(row)) })
            });

        let dto = usecase(
            subscription_repo,
            MockPurchasedBookRepository::new(),
            MockDivisionRepository::new(),
            MockStripeGateway::new(),
        )
        .check_eligibility(user_id, request(RefundKind::Subscription, id))
        .await
        .unwrap();

        assert!(dto.eligible);
        assert_eq!(dto.title, "Mensal Plus");
    }

    #[tokio::test]
    async fn old_subscription_is_not_eligible() {
        let user_id = Uuid::new_v4();
        let id = Uuid::new_v4();

        let dto = usecase(
            subscription_repo_with(Some(subscription(
                id,
                user_id,
                Utc::now() - Duration::days(8),
            ))),
            MockPurchasedBookRepository::new(),
            MockDivisionRepository::new(),
            MockStripeGateway::new(),
        )
        .check_eligibility(user_id, request(RefundKind::Subscription, id))
        .await
        .unwrap();

        assert!(!dto.eligible);
    }

    #[tokio::test]
    async fn purchase_of_another_user_is_not_found() {
        let err = usecase(
            MockSubscriptionRepository::new(),
            purchase_repo_with(None),
            MockDivisionRepository::new(),
            MockStripeGateway::new(),
        )
        .check_eligibility(Uuid::new_v4(), request(RefundKind::Purchase, Uuid::new_v4()))
        .await
        .unwrap_err();

        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn purchase_title_names_unpublished_division() {
        let user_id = Uuid::new_v4();
        let id = Uuid::new_v4();
        let now = Utc::now();
        let row = purchase(id, user_id, now - Duration::days(1), Some("pi_1"));
        let book_id = row.book_id;

        let mut division_repo = MockDivisionRepository::new();
        division_repo.expect_find_book_by_id().returning(move |id| {
            let book = BookEntity {
                id,
                title: "Mishna Berura".to_string(),
                slug: "mishna-berura".to_string(),
                is_published: true,
                created_at: now,
                updated_at: now,
            };
            Box::pin(async move { Ok(Some(book)) })
        });
        division_repo.expect_find_published_by_id().never();
        division_repo.expect_find_by_id().returning(move |id| {
            let division = DivisionEntity {
                id,
                book_id,
                title: "Shabat".to_string(),
                slug: "shabat".to_string(),
                position: 3,
                is_published: false,
                created_at: now,
                updated_at: now,
            };
            Box::pin(async move { Ok(Some(division)) })
        });

        let dto = usecase(
            MockSubscriptionRepository::new(),
            purchase_repo_with(Some(row)),
            division_repo,
            MockStripeGateway::new(),
        )
        .check_eligibility(user_id, request(RefundKind::Purchase, id))
        .await
        .unwrap();

        assert_eq!(dto.title, "Mishna Berura - Shabat");
        assert!(dto.eligible);
    }

    #[tokio::test]
    async fn subscription_refund_cancels_now_and_refunds_latest_charge() {
        let user_id = Uuid::new_v4();
        let id = Uuid::new_v4();

        let mut subscription_repo = subscription_repo_with(Some(subscription(
            id,
            user_id,
            Utc::now() - Duration::days(2),
        )));
        subscription_repo
            .expect_mark_canceled()
            .with(eq(id), eq(user_id))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_cancel_subscription_now()
            .times(1)
            .returning(|provider_subscription_id| {
                assert_eq!(provider_subscription_id, "sub_1");
                Ok(())
            });
        stripe
            .expect_latest_subscription_payment_intent()
            .times(1)
            .returning(|_| Ok(Some("pi_sub".to_string())));
        stripe
            .expect_refund_payment()
            .times(1)
            .returning(|payment_intent_id| {
                assert_eq!(payment_intent_id, "pi_sub");
                Ok("re_1".to_string())
            });

        let dto = usecase(
            subscription_repo,
            MockPurchasedBookRepository::new(),
            MockDivisionRepository::new(),
            stripe,
        )
        .execute(user_id, request(RefundKind::Subscription, id))
        .await
        .unwrap();

        assert_eq!(dto.refund_id.as_deref(), Some("re_1"));
        assert!(dto.access_revoked);
    }

    #[tokio::test]
    async fn subscription_stays_canceled_when_charge_refund_fails() {
        let user_id = Uuid::new_v4();
        let id = Uuid::new_v4();

        let mut subscription_repo = subscription_repo_with(Some(subscription(
            id,
            user_id,
            Utc::now() - Duration::days(1),
        )));
        subscription_repo
            .expect_mark_canceled()
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_cancel_subscription_now()
            .returning(|_| Ok(()));
        stripe
            .expect_latest_subscription_payment_intent()
            .returning(|_| Ok(Some("pi_sub".to_string())));
        stripe
            .expect_refund_payment()
            .returning(|_| Err(anyhow!("charge already refunded")));

        let dto = usecase(
            subscription_repo,
            MockPurchasedBookRepository::new(),
            MockDivisionRepository::new(),
            stripe,
        )
        .execute(user_id, request(RefundKind::Subscription, id))
        .await
        .unwrap();

        assert_eq!(dto.refund_id, None);
        assert!(dto.access_revoked);
    }

    #[tokio::test]
    async fn subscription_refund_outside_window_touches_nothing() {
        let user_id = Uuid::new_v4();
        let id = Uuid::new_v4();

        let mut subscription_repo = subscription_repo_with(Some(subscription(
            id,
            user_id,
            Utc::now() - Duration::days(10),
        )));
        subscription_repo.expect_mark_canceled().never();

        let mut stripe = MockStripeGateway::new();
        stripe.expect_cancel_subscription_now().never();

        let err = usecase(
            subscription_repo,
            MockPurchasedBookRepository::new(),
            MockDivisionRepository::new(),
            stripe,
        )
        .execute(user_id, request(RefundKind::Subscription, id))
        .await
        .unwrap_err();

        assert!(matches!(err, RefundError::WindowExpired));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ended_subscription_is_not_refundable() {
        let user_id = Uuid::new_v4();
        let id = Uuid::new_v4();
        let mut row = subscription(id, user_id, Utc::now() - Duration::days(1));
        row.status = "canceled".to_string();

        let mut stripe = MockStripeGateway::new();
        stripe.expect_cancel_subscription_now().never();

        let err = usecase(
            subscription_repo_with(Some(row)),
            MockPurchasedBookRepository::new(),
            MockDivisionRepository::new(),
            stripe,
        )
        .execute(user_id, request(RefundKind::Subscription, id))
        .await
        .unwrap_err();

        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn purchase_refund_refunds_charge_then_revokes_row() {
        let user_id = Uuid::new_v4();
        let id = Uuid::new_v4();

        let mut purchase_repo = purchase_repo_with(Some(purchase(
            id,
            user_id,
            Utc::now() - Duration::days(2),
            Some("pi_division"),
        )));
        purchase_repo
            .expect_delete_for_user()
            .with(eq(id), eq(user_id))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(true) }));

        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_refund_payment()
            .times(1)
            .returning(|payment_intent_id| {
                assert_eq!(payment_intent_id, "pi_division");
                Ok("re_2".to_string())
            });

        let dto = usecase(
            MockSubscriptionRepository::new(),
            purchase_repo,
            MockDivisionRepository::new(),
            stripe,
        )
        .execute(user_id, request(RefundKind::Purchase, id))
        .await
        .unwrap();

        assert_eq!(dto.kind, RefundKind::Purchase);
        assert_eq!(dto.refund_id.as_deref(), Some("re_2"));
        assert!(dto.access_revoked);
    }

    #[tokio::test]
    async fn failed_purchase_refund_keeps_access() {
        let user_id = Uuid::new_v4();
        let id = Uuid::new_v4();

        let mut purchase_repo = purchase_repo_with(Some(purchase(
            id,
            user_id,
            Utc::now() - Duration::days(2),
            Some("pi_division"),
        )));
        purchase_repo.expect_delete_for_user().never();

        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_refund_payment()
            .returning(|_| Err(anyhow!("stripe unavailable")));

        let err = usecase(
            MockSubscriptionRepository::new(),
            purchase_repo,
            MockDivisionRepository::new(),
            stripe,
        )
        .execute(user_id, request(RefundKind::Purchase, id))
        .await
        .unwrap_err();

        assert!(matches!(err, RefundError::Internal(_)));
    }

    #[tokio::test]
    async fn purchase_without_recorded_payment_is_not_refundable() {
        let user_id = Uuid::new_v4();
        let id = Uuid::new_v4();

        let mut purchase_repo = purchase_repo_with(Some(purchase(
            id,
            user_id,
            Utc::now() - Duration::days(2),
            None,
        )));
        purchase_repo.expect_delete_for_user().never();

        let err = usecase(
            MockSubscriptionRepository::new(),
            purchase_repo,
            MockDivisionRepository::new(),
            MockStripeGateway::new(),
        )
        .execute(user_id, request(RefundKind::Purchase, id))
        .await
        .unwrap_err();

        assert!(matches!(err, RefundError::NotRefundable(_)));
    }
}
