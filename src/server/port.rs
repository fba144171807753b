use std::sync::Arc;

#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &[u8], payload: &[u8]) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
pub trait EventConsumer: Send + Sync {
    async fn run(
        &self,
        consumer_group_id: &str,
        topics: &[&str],
        handler: Arc<dyn EventHandler>,
    ) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Processed; advance past the message.
    Commit,
    /// Transient failure; deliver the same message again after a back-off.
    Retry,
    /// Poison message; advance past it without processing.
    SkipCommit,
}

#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, payload: &[u8]) -> anyhow::Result<HandleOutcome>;
}
