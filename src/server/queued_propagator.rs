use crate::application_port::*;
use crate::domain_model::SubscriptionKey;
use crate::server::EventPublisher;
use std::sync::Arc;

pub const SUBSCRIPTION_CREATED_TOPIC: &str = "subscription.created";

/// Hands the pairs to the broker; a consumer applies them later.
pub struct QueuedSubscriptionPropagator {
    publisher: Arc<dyn EventPublisher>,
    topic: String,
}

impl QueuedSubscriptionPropagator {
    pub fn new(publisher: Arc<dyn EventPublisher>, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
        }
    }
}

#[async_trait::async_trait]
impl SubscriptionPropagator for QueuedSubscriptionPropagator {
    async fn propagate(&self, pairs: Vec<SubscriptionKey>) -> Result<(), RelationError> {
        let Some(first) = pairs.first() else {
            return Ok(());
        };
        // pairs of one friendship land on the same partition
        let key = first.to_string();
        let payload = serde_json::to_vec(&pairs)
            .map_err(|e| RelationError::PropagationFailed(format!("encode pairs: {e}")))?;

        self.publisher
            .publish(&self.topic, key.as_bytes(), &payload)
            .await
            .map_err(|e| RelationError::PropagationFailed(format!("{e:#}")))?;

        tracing::debug!(topic = %self.topic, pairs = pairs.len(), "subscription pairs queued");
        Ok(())
    }
}
