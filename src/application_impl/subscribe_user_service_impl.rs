use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::collections::BTreeMap;
use std::sync::Arc;

const MIN_DISTINCT_EMAILS: usize = 2;

#[derive(Debug, Default)]
struct SubscribeSummary {
    created: usize,
    updated: usize,
    unchanged: usize,
}

pub struct RealSubscribeUserService {
    user_repo: Arc<dyn UserRepo>,
    friendship_repo: Arc<dyn FriendshipRepo>,
    subscription_repo: Arc<dyn SubscriptionRepo>,
    tx_manager: Arc<dyn TxManager>,
}

impl RealSubscribeUserService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        friendship_repo: Arc<dyn FriendshipRepo>,
        subscription_repo: Arc<dyn SubscriptionRepo>,
        tx_manager: Arc<dyn TxManager>,
    ) -> Self {
        Self {
            user_repo,
            friendship_repo,
            subscription_repo,
            tx_manager,
        }
    }

    async fn subscribe_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        pairs: &[SubscriptionKey],
    ) -> Result<SubscribeSummary, RelationError> {
        let existing = self
            .subscription_repo
            .get_by_pairs_in_tx(tx, pairs)
            .await
            .map_err(|e| {
                tracing::error!("subscription_repo.get_by_pairs_in_tx: {e}");
                RelationError::cannot_get(Entity::Subscription)(e)
            })?;

        // current state per requested pair; None means no row yet
        let mut batch: BTreeMap<SubscriptionKey, Option<Subscription>> =
            pairs.iter().map(|key| (*key, None)).collect();
        for subscription in existing {
            if let Some(slot) = batch.get_mut(&subscription.key()) {
                *slot = Some(subscription);
            }
        }

        let mut summary = SubscribeSummary::default();
        for (key, current) in batch {
            let friendship = self
                .friendship_repo
                .get_by_user_ids_in_tx(tx, key.user_id, key.subscriber_id)
                .await
                .map_err(|e| {
                    tracing::error!("friendship_repo.get_by_user_ids_in_tx: {e}");
                    RelationError::cannot_get(Entity::Friendship)(e)
                })?;
            if FriendshipStatus::of(friendship.as_ref()).can_not_subscribe() {
                tracing::debug!(%key, "subscription refused, friendship is blocked");
                return Err(RelationError::FriendshipIsUnavailable);
            }

            let status = SubscriptionStatus::of(current.as_ref());
            if !status.allow_subscribe() {
                summary.unchanged += 1;
                continue;
            }

            match current {
                Some(subscription) if !status.is_none_existed() => {
                    self.subscription_repo
                        .update_status_in_tx(tx, subscription.id, SubscriptionStatus::Subscribed)
                        .await
                        .map_err(|e| {
                            tracing::error!("subscription_repo.update_status_in_tx: {e}");
                            RelationError::cannot_update(Entity::Subscription)(e)
                        })?;
                    summary.updated += 1;
                }
                _ => {
                    let new = NewSubscription::with_status(key, SubscriptionStatus::Subscribed);
                    self.subscription_repo
                        .create_in_tx(tx, &new)
                        .await
                        .map_err(|e| {
                            tracing::error!("subscription_repo.create_in_tx: {e}");
                            RelationError::cannot_create(Entity::Subscription)(e)
                        })?;
                    summary.created += 1;
                }
            }
        }

        Ok(summary)
    }
}

#[async_trait::async_trait]
impl SubscribeUserService for RealSubscribeUserService {
    async fn subscribe_user(&self, payloads: &[SubscribeUserPayload]) -> Result<(), RelationError> {
        let emails = SubscribeUserPayload::emails(payloads);
        if emails.len() < MIN_DISTINCT_EMAILS {
            return Err(RelationError::invalid(
                "payload",
                InvalidReason::NeedAtLeastTwoEmails,
            ));
        }
        if payloads.iter().any(|p| p.requestor == p.target) {
            return Err(RelationError::invalid(
                "payload",
                InvalidReason::EmailIsNotValid,
            ));
        }

        let user_ids = self
            .user_repo
            .get_user_ids_by_emails(&emails)
            .await
            .map_err(|e| {
                tracing::warn!("user_repo.get_user_ids_by_emails: {e}");
                RelationError::from_user_lookup(e)
            })?;

        let pairs = payloads
            .iter()
            .map(|p| match (user_ids.get(&p.target), user_ids.get(&p.requestor)) {
                (Some(&user_id), Some(&subscriber_id)) => {
                    Ok(SubscriptionKey::new(user_id, subscriber_id))
                }
                _ => Err(RelationError::from_user_lookup(RepoError::UnresolvedEmails(
                    vec![p.requestor.clone(), p.target.clone()],
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.subscribe_pairs(&pairs).await
    }

    async fn subscribe_pairs(&self, pairs: &[SubscriptionKey]) -> Result<(), RelationError> {
        if pairs.is_empty() {
            return Ok(());
        }
        if pairs.iter().any(SubscriptionKey::is_self_reference) {
            return Err(RelationError::invalid(
                "payload",
                InvalidReason::EmailIsNotValid,
            ));
        }

        let mut tx = self.tx_manager.begin().await.map_err(TxError::Begin)?;
        let result = self.subscribe_in_tx(&mut *tx, pairs).await;
        let summary = settle(tx, result).await?;

        tracing::debug!(
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            "subscriptions applied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::fixture::*;

    #[tokio::test]
    async fn subscribing_twice_keeps_one_subscribed_row() {
        let fx = Fixture::new();
        let alice = fx.user(ALICE).await;
        let bob = fx.user(BOB).await;
        let service = fx.subscribe_user();
        let payload = [SubscribeUserPayload::new(BOB, ALICE)];

        service.subscribe_user(&payload).await.unwrap();
        service.subscribe_user(&payload).await.unwrap();

        let rows = fx.store.subscriptions().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key(), SubscriptionKey::new(alice, bob));
        assert_eq!(rows[0].status, SubscriptionStatus::Subscribed);
    }

    #[tokio::test]
    async fn unsubscribed_row_is_updated_in_place() {
        let fx = Fixture::new();
        let alice = fx.user(ALICE).await;
        let bob = fx.user(BOB).await;
        let key = SubscriptionKey::new(alice, bob);
        let id = fx
            .seed_subscription(key, SubscriptionStatus::Unsubscribed)
            .await;

        fx.subscribe_user().subscribe_pairs(&[key]).await.unwrap();

        let row = fx.store.subscription(key).await.unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.status, SubscriptionStatus::Subscribed);
        assert_eq!(fx.store.subscriptions().await.len(), 1);
    }

    #[tokio::test]
    async fn already_subscribed_pair_does_not_fail_the_batch() {
        let fx = Fixture::new();
        let alice = fx.user(ALICE).await;
        let bob = fx.user(BOB).await;
        let carol = fx.user(CAROL).await;
        let existing = SubscriptionKey::new(alice, bob);
        fx.seed_subscription(existing, SubscriptionStatus::Subscribed)
            .await;

        fx.subscribe_user()
            .subscribe_user(&[
                SubscribeUserPayload::new(BOB, ALICE),
                SubscribeUserPayload::new(CAROL, ALICE),
            ])
            .await
            .unwrap();

        let added = fx
            .store
            .subscription(SubscriptionKey::new(alice, carol))
            .await
            .unwrap();
        assert_eq!(added.status, SubscriptionStatus::Subscribed);
        assert_eq!(fx.store.subscriptions().await.len(), 2);
    }

    #[tokio::test]
    async fn blocked_friendship_aborts_whole_batch() {
        let fx = Fixture::new();
        let alice = fx.user(ALICE).await;
        let bob = fx.user(BOB).await;
        fx.user(CAROL).await;
        fx.seed_friendship(alice, bob, FriendshipStatus::Blocked)
            .await;

        let err = fx
            .subscribe_user()
            .subscribe_user(&[
                SubscribeUserPayload::new(CAROL, ALICE),
                SubscribeUserPayload::new(BOB, ALICE),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, RelationError::FriendshipIsUnavailable));
        assert!(fx.store.subscriptions().await.is_empty());
    }

    #[tokio::test]
    async fn needs_two_distinct_emails() {
        let fx = Fixture::new();
        fx.user(ALICE).await;

        let err = fx
            .subscribe_user()
            .subscribe_user(&[SubscribeUserPayload::new(ALICE, ALICE)])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RelationError::InvalidRequest {
                reason: InvalidReason::NeedAtLeastTwoEmails,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn self_pair_inside_batch_is_rejected() {
        let fx = Fixture::new();
        fx.user(ALICE).await;
        fx.user(BOB).await;

        let err = fx
            .subscribe_user()
            .subscribe_user(&[
                SubscribeUserPayload::new(ALICE, BOB),
                SubscribeUserPayload::new(BOB, BOB),
            ])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RelationError::InvalidRequest {
                reason: InvalidReason::EmailIsNotValid,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unknown_email_is_invalid_request() {
        let fx = Fixture::new();
        fx.user(ALICE).await;

        let err = fx
            .subscribe_user()
            .subscribe_user(&[SubscribeUserPayload::new(ALICE, "ghost@example.com")])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RelationError::InvalidRequest {
                reason: InvalidReason::UnknownEmails(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn failed_create_rolls_back_earlier_writes() {
        let fx = Fixture::new();
        let alice = fx.user(ALICE).await;
        let bob = fx.user(BOB).await;
        let carol = fx.user(CAROL).await;
        let key = SubscriptionKey::new(alice, bob);
        fx.seed_subscription(key, SubscriptionStatus::Unsubscribed)
            .await;
        fx.store.fail_on(FailPoint::SubscriptionCreate);

        let err = fx
            .subscribe_user()
            .subscribe_pairs(&[key, SubscriptionKey::new(alice, carol)])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RelationError::CannotCreateEntity {
                entity: Entity::Subscription,
                ..
            }
        ));
        let row = fx.store.subscription(key).await.unwrap();
        assert_eq!(row.status, SubscriptionStatus::Unsubscribed);
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let fx = Fixture::new();

        fx.subscribe_user().subscribe_pairs(&[]).await.unwrap();

        assert!(fx.store.subscriptions().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_identical_batches_leave_one_row() {
        let fx = Fixture::new();
        let alice = fx.user(ALICE).await;
        let bob = fx.user(BOB).await;
        let service = Arc::new(fx.subscribe_user());
        let key = SubscriptionKey::new(alice, bob);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.subscribe_pairs(&[key]).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let rows = fx.store.subscriptions().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, SubscriptionStatus::Subscribed);
    }
}
