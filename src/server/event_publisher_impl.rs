use crate::server::EventPublisher;
use crate::settings::PropagationSettings;
use rdkafka::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use std::time::Duration;

/// How long a send may sit in the producer queue before it counts as failed.
const ENQUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Idempotent producer for propagation events. A publish resolves only once
/// every in-sync replica has the record.
pub struct KafkaPublisher {
    producer: FutureProducer,
}

impl KafkaPublisher {
    pub fn new(settings: &PropagationSettings, client_id: &str) -> anyhow::Result<Self> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", &settings.bootstrap_server)
            .set("client.id", client_id)
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .create()?;
        Ok(KafkaPublisher { producer })
    }
}

#[async_trait::async_trait]
impl EventPublisher for KafkaPublisher {
    async fn publish(&self, topic: &str, key: &[u8], payload: &[u8]) -> anyhow::Result<()> {
        let record = FutureRecord::to(topic).key(key).payload(payload);
        let (partition, offset) = self
            .producer
            .send(record, ENQUEUE_TIMEOUT)
            .await
            .map_err(|(e, _)| anyhow::anyhow!("publish to {topic}: {e}"))?;
        tracing::trace!(topic, partition, offset, "event published");
        Ok(())
    }
}
