use crate::server::delivery::deliver;
use crate::server::{EventConsumer, EventHandler, EventPublisher, HandleOutcome};
use anyhow::anyhow;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct Envelope {
    topic: String,
    key: Vec<u8>,
    payload: Vec<u8>,
}

/// Single-process stand-in for the broker: an unbounded queue with one consumer.
///
/// Publishing never waits for processing. Messages still queued at shutdown
/// are lost, so this transport is at-most-once across restarts.
pub struct ChannelBus {
    sender: mpsc::UnboundedSender<Envelope>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Envelope>>>,
    cancellation_token: CancellationToken,
}

impl ChannelBus {
    pub fn new(cancellation_token: CancellationToken) -> Arc<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();
        Arc::new(Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
            cancellation_token,
        })
    }
}

#[async_trait::async_trait]
impl EventPublisher for ChannelBus {
    async fn publish(&self, topic: &str, key: &[u8], payload: &[u8]) -> anyhow::Result<()> {
        self.sender
            .send(Envelope {
                topic: topic.to_owned(),
                key: key.to_vec(),
                payload: payload.to_vec(),
            })
            .map_err(|_| anyhow!("channel bus closed"))
    }
}

#[async_trait::async_trait]
impl EventConsumer for ChannelBus {
    async fn run(
        &self,
        consumer_group_id: &str,
        topics: &[&str],
        handler: Arc<dyn EventHandler>,
    ) -> anyhow::Result<()> {
        let mut receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or_else(|| anyhow!("channel bus already has a consumer"))?;
        tracing::info!(group = consumer_group_id, ?topics, "channel consumer started");

        loop {
            let envelope = tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("channel consumer shutting down...");
                    break;
                }
                envelope = receiver.recv() => envelope,
            };
            let Some(envelope) = envelope else {
                break;
            };

            if !topics.contains(&envelope.topic.as_str()) {
                tracing::debug!(topic = %envelope.topic, "no subscription for topic, dropped");
                continue;
            }

            match deliver(handler.as_ref(), &envelope.payload, &self.cancellation_token).await {
                Some(HandleOutcome::SkipCommit) => {
                    tracing::warn!(
                        key = %String::from_utf8_lossy(&envelope.key),
                        "skipping poison message"
                    );
                }
                Some(_) => {}
                None => break,
            }
        }

        Ok(())
    }
}
