use std::sync::Arc;

use anyhow::Result as AnyResult;
use chrono::{DateTime, Utc};
use crates::domain::{
    entities::{purchased_books::PurchasedBookEntity, subscriptions::SubscriptionEntity},
    repositories::{
        divisions::DivisionRepository, purchased_books::PurchasedBookRepository,
        subscriptions::SubscriptionRepository,
    },
    value_objects::{
        entitlements::{AccessSummary, LibraryAccess, ResourceAccessDto},
        enums::access_types::AccessType,
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::entitlement_resolver;

/// Loads a user's records and runs the entitlement resolver over them.
///
/// Every failure path answers "no access"; nothing here returns an error.
pub struct AccessUseCase<S, P, D>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PurchasedBookRepository + Send + Sync + 'static,
    D: DivisionRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    purchase_repo: Arc<P>,
    division_repo: Arc<D>,
}

impl<S, P, D> AccessUseCase<S, P, D>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PurchasedBookRepository + Send + Sync + 'static,
    D: DivisionRepository + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<S>, purchase_repo: Arc<P>, division_repo: Arc<D>) -> Self {
        Self {
            subscription_repo,
            purchase_repo,
            division_repo,
        }
    }

    pub async fn check_division_access(&self, user_id: Uuid, division_id: &str) -> ResourceAccessDto {
        let Some(parsed_division_id) = parse_resource_id(division_id) else {
            warn!(%user_id, division_id, "access: malformed division id");
            return ResourceAccessDto::denied(division_id);
        };

        match self
            .resolve_division_access(user_id, parsed_division_id, Utc::now())
            .await
        {
            Ok(access) => access,
            Err(err) => {
                error!(
                    %user_id,
                    division_id = %parsed_division_id,
                    db_error = ?err,
                    "access: division check failed, denying"
                );
                ResourceAccessDto::denied(parsed_division_id.to_string())
            }
        }
    }

    pub async fn check_book_access(&self, user_id: Uuid, book_id: &str) -> ResourceAccessDto {
        let Some(parsed_book_id) = parse_resource_id(book_id) else {
            warn!(%user_id, book_id, "access: malformed book id");
            return ResourceAccessDto::denied(book_id);
        };

        match self
            .resolve_book_access(user_id, parsed_book_id, Utc::now())
            .await
        {
            Ok(access) => access,
            Err(err) => {
                error!(
                    %user_id,
                    book_id = %parsed_book_id,
                    db_error = ?err,
                    "access: book check failed, denying"
                );
                ResourceAccessDto::denied(parsed_book_id.to_string())
            }
        }
    }

    pub async fn library_access(&self, user_id: Uuid) -> LibraryAccess {
        match self.resolve_library_access(user_id, Utc::now()).await {
            Ok(access) => {
                info!(
                    %user_id,
                    accessible_divisions = access.accessible_divisions,
                    total_divisions = access.total_divisions,
                    "access: library access resolved"
                );
                access
            }
            Err(err) => {
                error!(%user_id, db_error = ?err, "access: library access failed, denying");
                LibraryAccess {
                    accessible_divisions: 0,
                    total_divisions: 0,
                    has_all_access: false,
                }
            }
        }
    }

    pub async fn access_info(&self, user_id: Uuid) -> AccessSummary {
        match self.load_records(user_id).await {
            Ok((subscription, purchases)) => {
                entitlement_resolver::access_summary(subscription.as_ref(), &purchases, Utc::now())
            }
            Err(err) => {
                error!(%user_id, db_error = ?err, "access: access info failed, denying");
                AccessSummary::none()
            }
        }
    }

    async fn resolve_library_access(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AnyResult<LibraryAccess> {
        let total_divisions = self.division_repo.count_published().await?;
        let (subscription, purchases) = self.load_records(user_id).await?;

        Ok(entitlement_resolver::library_access(
            subscription.as_ref(),
            &purchases,
            u64::try_from(total_divisions).unwrap_or_default(),
            now,
        ))
    }

    async fn resolve_division_access(
        &self,
        user_id: Uuid,
        division_id: Uuid,
        now: DateTime<Utc>,
    ) -> AnyResult<ResourceAccessDto> {
        if self
            .division_repo
            .find_published_by_id(division_id)
            .await?
            .is_none()
        {
            info!(%user_id, %division_id, "access: division not found or unpublished");
            return Ok(ResourceAccessDto::denied(division_id.to_string()));
        }

        let (subscription, purchases) = self.load_records(user_id).await?;
        let has_access =
            entitlement_resolver::has_access(subscription.as_ref(), &purchases, division_id, now);

        Ok(ResourceAccessDto {
            resource_id: division_id.to_string(),
            has_access,
            access_type: access_type(has_access, subscription.as_ref(), now),
        })
    }

    async fn resolve_book_access(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        now: DateTime<Utc>,
    ) -> AnyResult<ResourceAccessDto> {
        let published = self
            .division_repo
            .find_book_by_id(book_id)
            .await?
            .is_some_and(|book| book.is_published);
        if !published {
            info!(%user_id, %book_id, "access: book not found or unpublished");
            return Ok(ResourceAccessDto::denied(book_id.to_string()));
        }

        let (subscription, purchases) = self.load_records(user_id).await?;
        let has_access =
            entitlement_resolver::can_access_book(subscription.as_ref(), &purchases, book_id, now);

        Ok(ResourceAccessDto {
            resource_id: book_id.to_string(),
            has_access,
            access_type: access_type(has_access, subscription.as_ref(), now),
        })
    }

    async fn load_records(
        &self,
        user_id: Uuid,
    ) -> AnyResult<(Option<SubscriptionEntity>, Vec<PurchasedBookEntity>)> {
        let subscription = self.subscription_repo.find_by_user_id(user_id).await?;
        let purchases = self.purchase_repo.list_by_user_id(user_id).await?;
        Ok((subscription, purchases))
    }
}

fn parse_resource_id(raw: &str) -> Option<Uuid> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Uuid::parse_str(trimmed).ok()
}

fn access_type(
    has_access: bool,
    subscription: Option<&SubscriptionEntity>,
    now: DateTime<Utc>,
) -> AccessType {
    if !has_access {
        AccessType::None
    } else if entitlement_resolver::subscription_qualifies(subscription, now) {
        AccessType::Subscription
    } else {
        AccessType::Purchase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::Duration;
    use crates::domain::{
        entities::{books::BookEntity, divisions::DivisionEntity},
        repositories::{
            divisions::MockDivisionRepository, purchased_books::MockPurchasedBookRepository,
            subscriptions::MockSubscriptionRepository,
        },
        value_objects::enums::{access_types::AccessLevel, subscription_statuses::SubscriptionStatus},
    };
    use mockall::predicate::eq;

    fn division(id: Uuid, book_id: Uuid) -> DivisionEntity {
        let now = Utc::now();
        DivisionEntity {
            id,
            book_id,
            title: "Berakhot".to_string(),
            slug: "berakhot".to_string(),
            position: 1,
            is_published: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn book(id: Uuid, is_published: bool) -> BookEntity {
        let now = Utc::now();
        BookEntity {
            id,
            title: "Shulchan Aruch".to_string(),
            slug: "shulchan-aruch".to_string(),
            is_published,
            created_at: now,
            updated_at: now,
        }
    }

    fn active_subscription(user_id: Uuid) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id,
            status: SubscriptionStatus::Active.to_string(),
            plan_type: "monthly".to_string(),
            price_id: Some("price_monthly".to_string()),
            subscription_id: Some("sub_1".to_string()),
            current_period_start: Some(now - Duration::days(3)),
            current_period_end: Some(now + Duration::days(27)),
            cancel_at_period_end: false,
            explicacao_pratica: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn purchase(user_id: Uuid, book_id: Uuid, division_id: Uuid, expires_in: Duration) -> PurchasedBookEntity {
        let now = Utc::now();
        PurchasedBookEntity {
            id: Uuid::new_v4(),
            user_id,
            book_id,
            division_id,
            expires_at: now + expires_in,
            stripe_payment_intent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn subscription_repo(subscription: Option<SubscriptionEntity>) -> MockSubscriptionRepository {
        let mut repo = MockSubscriptionRepository::new();
        repo.expect_find_by_user_id().returning(move |_| {
            let subscription = subscription.clone();
            Box::pin(async move { Ok(subscription) })
        });
        repo
    }

    fn purchase_repo(purchases: Vec<PurchasedBookEntity>) -> MockPurchasedBookRepository {
        let mut repo = MockPurchasedBookRepository::new();
        repo.expect_list_by_user_id().returning(move |_| {
            let purchases = purchases.clone();
            Box::pin(async move { Ok(purchases) })
        });
        repo
    }

    fn known_division(division_id: Uuid) -> MockDivisionRepository {
        let mut repo = MockDivisionRepository::new();
        repo.expect_find_published_by_id()
            .with(eq(division_id))
            .returning(move |id| {
                let division = division(id, Uuid::new_v4());
                Box::pin(async move { Ok(Some(division)) })
            });
        repo
    }

    #[tokio::test]
    async fn subscriber_reads_any_division() {
        let user_id = Uuid::new_v4();
        let division_id = Uuid::new_v4();

        let usecase = AccessUseCase::new(
            Arc::new(subscription_repo(Some(active_subscription(user_id)))),
            Arc::new(purchase_repo(vec![])),
            Arc::new(known_division(division_id)),
        );

        let access = usecase
            .check_division_access(user_id, &division_id.to_string())
            .await;

        assert!(access.has_access);
        assert_eq!(access.access_type, AccessType::Subscription);
        assert_eq!(access.resource_id, division_id.to_string());
    }

    #[tokio::test]
    async fn purchaser_reads_only_purchased_division() {
        let user_id = Uuid::new_v4();
        let division_id = Uuid::new_v4();
        let purchases = vec![purchase(user_id, Uuid::new_v4(), division_id, Duration::days(1))];

        let usecase = AccessUseCase::new(
            Arc::new(subscription_repo(None)),
            Arc::new(purchase_repo(purchases)),
            Arc::new(known_division(division_id)),
        );

        let access = usecase
            .check_division_access(user_id, &division_id.to_string())
            .await;

        assert!(access.has_access);
        assert_eq!(access.access_type, AccessType::Purchase);
    }

    #[tokio::test]
    async fn malformed_or_empty_id_is_denied_without_lookups() {
        let usecase = AccessUseCase::new(
            Arc::new(MockSubscriptionRepository::new()),
            Arc::new(MockPurchasedBookRepository::new()),
            Arc::new(MockDivisionRepository::new()),
        );

        for raw in ["", "   ", "not-a-uuid"] {
            let access = usecase.check_division_access(Uuid::new_v4(), raw).await;
            assert_eq!(access, ResourceAccessDto::denied(raw));
        }
    }

    #[tokio::test]
    async fn unknown_division_is_denied() {
        let division_id = Uuid::new_v4();
        let mut division_repo = MockDivisionRepository::new();
        division_repo
            .expect_find_published_by_id()
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = AccessUseCase::new(
            Arc::new(MockSubscriptionRepository::new()),
            Arc::new(MockPurchasedBookRepository::new()),
            Arc::new(division_repo),
        );

        let access = usecase
            .check_division_access(Uuid::new_v4(), &division_id.to_string())
            .await;

        assert!(!access.has_access);
        assert_eq!(access.access_type, AccessType::None);
    }

    #[tokio::test]
    async fn repository_failure_fails_closed() {
        let division_id = Uuid::new_v4();
        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_find_by_user_id()
            .returning(|_| Box::pin(async { Err(anyhow!("connection refused")) }));

        let usecase = AccessUseCase::new(
            Arc::new(subscriptions),
            Arc::new(MockPurchasedBookRepository::new()),
            Arc::new(known_division(division_id)),
        );

        let access = usecase
            .check_division_access(Uuid::new_v4(), &division_id.to_string())
            .await;

        assert!(!access.has_access);
    }

    #[tokio::test]
    async fn book_access_requires_published_book() {
        let user_id = Uuid::new_v4();
        let book_id = Uuid::new_v4();
        let mut division_repo = MockDivisionRepository::new();
        division_repo
            .expect_find_book_by_id()
            .returning(|id| Box::pin(async move { Ok(Some(book(id, false))) }));

        let usecase = AccessUseCase::new(
            Arc::new(MockSubscriptionRepository::new()),
            Arc::new(MockPurchasedBookRepository::new()),
            Arc::new(division_repo),
        );

        let access = usecase.check_book_access(user_id, &book_id.to_string()).await;

        assert!(!access.has_access);
    }

    #[tokio::test]
    async fn book_access_through_division_purchase() {
        let user_id = Uuid::new_v4();
        let book_id = Uuid::new_v4();
        let mut division_repo = MockDivisionRepository::new();
        division_repo
            .expect_find_book_by_id()
            .returning(|id| Box::pin(async move { Ok(Some(book(id, true))) }));
        let purchases = vec![purchase(user_id, book_id, Uuid::new_v4(), Duration::days(3))];

        let usecase = AccessUseCase::new(
            Arc::new(subscription_repo(None)),
            Arc::new(purchase_repo(purchases)),
            Arc::new(division_repo),
        );

        let access = usecase.check_book_access(user_id, &book_id.to_string()).await;

        assert!(access.has_access);
        assert_eq!(access.access_type, AccessType::Purchase);
    }

    #[tokio::test]
    async fn library_access_counts_published_divisions() {
        let user_id = Uuid::new_v4();
        let mut division_repo = MockDivisionRepository::new();
        division_repo
            .expect_count_published()
            .returning(|| Box::pin(async { Ok(12) }));
        let purchases = vec![
            purchase(user_id, Uuid::new_v4(), Uuid::new_v4(), Duration::days(3)),
            purchase(user_id, Uuid::new_v4(), Uuid::new_v4(), -Duration::days(3)),
        ];

        let usecase = AccessUseCase::new(
            Arc::new(subscription_repo(None)),
            Arc::new(purchase_repo(purchases)),
            Arc::new(division_repo),
        );

        let access = usecase.library_access(user_id).await;

        assert_eq!(
            access,
            LibraryAccess {
                accessible_divisions: 1,
                total_divisions: 12,
                has_all_access: false,
            }
        );
    }

    #[tokio::test]
    async fn access_info_reports_subscription_level() {
        let user_id = Uuid::new_v4();
        let mut subscription = active_subscription(user_id);
        subscription.explicacao_pratica = true;

        let usecase = AccessUseCase::new(
            Arc::new(subscription_repo(Some(subscription))),
            Arc::new(purchase_repo(vec![])),
            Arc::new(MockDivisionRepository::new()),
        );

        let summary = usecase.access_info(user_id).await;

        assert!(summary.has_access);
        assert_eq!(summary.access_type, AccessType::Subscription);
        assert_eq!(summary.access_level, AccessLevel::Plus);
    }

    #[tokio::test]
    async fn access_info_fails_closed() {
        let mut purchases = MockPurchasedBookRepository::new();
        purchases
            .expect_list_by_user_id()
            .returning(|_| Box::pin(async { Err(anyhow!("timeout")) }));

        let usecase = AccessUseCase::new(
            Arc::new(subscription_repo(None)),
            Arc::new(purchases),
            Arc::new(MockDivisionRepository::new()),
        );

        assert_eq!(usecase.access_info(Uuid::new_v4()).await, AccessSummary::none());
    }
}
