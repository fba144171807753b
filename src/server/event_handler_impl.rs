use crate::application_impl::with_deadline;
use crate::application_port::*;
use crate::domain_model::*;
use crate::server::{EventHandler, HandleOutcome};
use std::sync::Arc;
use std::time::Duration;

/// Applies a `subscription.created` message: the listed pairs become subscribed.
pub struct SubscriptionCreatedHandler {
    subscribe_user: Arc<dyn SubscribeUserService>,
    timeout: Duration,
}

impl SubscriptionCreatedHandler {
    pub fn new(subscribe_user: Arc<dyn SubscribeUserService>, timeout: Duration) -> Self {
        Self {
            subscribe_user,
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl EventHandler for SubscriptionCreatedHandler {
    async fn handle(&self, payload: &[u8]) -> anyhow::Result<HandleOutcome> {
        let pairs = match serde_json::from_slice::<Vec<SubscriptionKey>>(payload) {
            Ok(pairs) => pairs,
            Err(e) => {
                tracing::warn!("undecodable subscription payload: {e}");
                return Ok(HandleOutcome::SkipCommit);
            }
        };

        match with_deadline(self.timeout, self.subscribe_user.subscribe_pairs(&pairs)).await {
            Ok(()) => {
                tracing::debug!(pairs = pairs.len(), "subscription pairs applied");
                Ok(HandleOutcome::Commit)
            }
            Err(e) if e.is_client_error() => {
                tracing::warn!(pairs = pairs.len(), "subscription pairs rejected: {e}");
                Ok(HandleOutcome::SkipCommit)
            }
            Err(e) => {
                tracing::error!(pairs = pairs.len(), "subscription pairs failed: {e}");
                Ok(HandleOutcome::Retry)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::fixture::*;

    fn encode(pairs: &[SubscriptionKey]) -> Vec<u8> {
        serde_json::to_vec(pairs).unwrap()
    }

    #[tokio::test]
    async fn applied_pairs_are_committed() {
        let fx = Fixture::new();
        let alice = fx.user(ALICE).await;
        let bob = fx.user(BOB).await;
        let handler =
            SubscriptionCreatedHandler::new(Arc::new(fx.subscribe_user()), Duration::from_secs(1));
        let key = SubscriptionKey::new(alice, bob);

        let outcome = handler.handle(&encode(&[key])).await.unwrap();

        assert_eq!(outcome, HandleOutcome::Commit);
        assert_eq!(
            fx.store.subscription(key).await.unwrap().status,
            SubscriptionStatus::Subscribed
        );
    }

    #[tokio::test]
    async fn garbage_is_skipped() {
        let fx = Fixture::new();
        let handler =
            SubscriptionCreatedHandler::new(Arc::new(fx.subscribe_user()), Duration::from_secs(1));

        let outcome = handler.handle(b"{not json").await.unwrap();

        assert_eq!(outcome, HandleOutcome::SkipCommit);
    }

    #[tokio::test]
    async fn blocked_pair_is_skipped_not_retried() {
        let fx = Fixture::new();
        let alice = fx.user(ALICE).await;
        let bob = fx.user(BOB).await;
        fx.seed_friendship(alice, bob, FriendshipStatus::Blocked)
            .await;
        let handler =
            SubscriptionCreatedHandler::new(Arc::new(fx.subscribe_user()), Duration::from_secs(1));

        let outcome = handler
            .handle(&encode(&[SubscriptionKey::new(alice, bob)]))
            .await
            .unwrap();

        assert_eq!(outcome, HandleOutcome::SkipCommit);
        assert!(fx.store.subscriptions().await.is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_retried() {
        let fx = Fixture::new();
        let alice = fx.user(ALICE).await;
        let bob = fx.user(BOB).await;
        fx.store.fail_on(FailPoint::Commit);
        let handler =
            SubscriptionCreatedHandler::new(Arc::new(fx.subscribe_user()), Duration::from_secs(1));
        let payload = encode(&[SubscriptionKey::new(alice, bob)]);

        assert_eq!(handler.handle(&payload).await.unwrap(), HandleOutcome::Retry);

        fx.store.clear_faults();
        assert_eq!(handler.handle(&payload).await.unwrap(), HandleOutcome::Commit);
        assert_eq!(fx.store.subscriptions().await.len(), 1);
    }
}
