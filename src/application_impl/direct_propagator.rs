use crate::application_port::*;
use crate::domain_model::SubscriptionKey;
use std::sync::Arc;

/// Applies the subscription pairs in-process, right after the friendship commit.
pub struct DirectSubscriptionPropagator {
    subscribe_user: Arc<dyn SubscribeUserService>,
}

impl DirectSubscriptionPropagator {
    pub fn new(subscribe_user: Arc<dyn SubscribeUserService>) -> Self {
        DirectSubscriptionPropagator { subscribe_user }
    }
}

#[async_trait::async_trait]
impl SubscriptionPropagator for DirectSubscriptionPropagator {
    async fn propagate(&self, pairs: Vec<SubscriptionKey>) -> Result<(), RelationError> {
        self.subscribe_user
            .subscribe_pairs(&pairs)
            .await
            .map_err(|e| RelationError::PropagationFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::fixture::*;
    use crate::domain_model::*;

    #[tokio::test]
    async fn subscribe_failure_surfaces_as_propagation_failure() {
        let fx = Fixture::new();
        let alice = fx.user(ALICE).await;
        let bob = fx.user(BOB).await;
        fx.store.fail_on(FailPoint::SubscriptionGet);
        let propagator = DirectSubscriptionPropagator::new(Arc::new(fx.subscribe_user()));

        let err = propagator
            .propagate(vec![SubscriptionKey::new(alice, bob)])
            .await
            .unwrap_err();

        assert!(matches!(err, RelationError::PropagationFailed(_)));
    }
}
