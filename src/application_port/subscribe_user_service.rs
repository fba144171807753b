use crate::application_port::RelationError;
use crate::domain_model::*;

/// `requestor` wants to receive the updates of `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeUserPayload {
    pub requestor: String,
    pub target: String,
}

impl SubscribeUserPayload {
    pub fn new(requestor: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            requestor: requestor.into(),
            target: target.into(),
        }
    }

    /// Distinct emails across the batch, in order of first appearance.
    pub fn emails(payloads: &[SubscribeUserPayload]) -> Vec<String> {
        dedup_preserving_order(
            payloads
                .iter()
                .flat_map(|p| [p.requestor.clone(), p.target.clone()]),
        )
    }
}

#[async_trait::async_trait]
pub trait SubscribeUserService: Send + Sync {
    async fn subscribe_user(&self, payloads: &[SubscribeUserPayload]) -> Result<(), RelationError>;

    /// Entry point for already resolved ids. Safe to call repeatedly with the same pairs.
    async fn subscribe_pairs(&self, pairs: &[SubscriptionKey]) -> Result<(), RelationError>;
}
