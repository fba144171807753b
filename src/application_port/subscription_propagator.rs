use crate::application_port::RelationError;
use crate::domain_model::SubscriptionKey;

/// Delivers "these pairs should be subscribed" after a friendship change.
#[async_trait::async_trait]
pub trait SubscriptionPropagator: Send + Sync {
    async fn propagate(&self, pairs: Vec<SubscriptionKey>) -> Result<(), RelationError>;
}
