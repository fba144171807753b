use crate::application_port::RelationError;

/// `requestor` no longer wants the updates of `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockUpdatesPayload {
    pub requestor: String,
    pub target: String,
}

impl BlockUpdatesPayload {
    pub fn new(requestor: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            requestor: requestor.into(),
            target: target.into(),
        }
    }
}

#[async_trait::async_trait]
pub trait BlockUpdatesService: Send + Sync {
    async fn block_updates(&self, payload: &BlockUpdatesPayload) -> Result<(), RelationError>;
}
