use crate::server::delivery::deliver;
use crate::server::{EventConsumer, EventHandler, HandleOutcome};
use crate::settings::PropagationSettings;
use futures_util::StreamExt;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::BorrowedMessage;
use rdkafka::{ClientConfig, Message};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const POLL_ERROR_PAUSE: Duration = Duration::from_millis(200);

/// Group consumer with manual offset commits: an offset only moves once the
/// handler has committed or skipped the record.
pub struct KafkaConsumer {
    bootstrap_server: String,
    client_id: String,
    cancel: CancellationToken,
}

impl KafkaConsumer {
    pub fn new(settings: &PropagationSettings, client_id: &str, cancel: CancellationToken) -> Self {
        KafkaConsumer {
            bootstrap_server: settings.bootstrap_server.clone(),
            client_id: client_id.to_owned(),
            cancel,
        }
    }

    fn connect(&self, group: &str) -> anyhow::Result<StreamConsumer> {
        let consumer = ClientConfig::new()
            .set("bootstrap.servers", &self.bootstrap_server)
            .set("client.id", &self.client_id)
            .set("group.id", group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()?;
        Ok(consumer)
    }

    /// Creates missing topics; existing ones come back as per-topic errors and are ignored.
    async fn ensure_topics(&self, topics: &[&str]) -> anyhow::Result<()> {
        let admin: AdminClient<_> = ClientConfig::new()
            .set("bootstrap.servers", &self.bootstrap_server)
            .create()?;
        let new_topics: Vec<_> = topics
            .iter()
            .map(|t| NewTopic::new(t, 1, TopicReplication::Fixed(1)))
            .collect();
        admin
            .create_topics(&new_topics, &AdminOptions::new())
            .await?;
        Ok(())
    }

    /// `false` once shutdown interrupted the delivery; the record stays uncommitted.
    async fn process(
        &self,
        consumer: &StreamConsumer,
        record: &BorrowedMessage<'_>,
        handler: &dyn EventHandler,
    ) -> bool {
        let payload = record.payload().unwrap_or_default();
        let Some(outcome) = deliver(handler, payload, &self.cancel).await else {
            return false;
        };

        if outcome == HandleOutcome::SkipCommit {
            tracing::warn!(
                topic = record.topic(),
                partition = record.partition(),
                offset = record.offset(),
                "subscription event skipped"
            );
        }
        if let Err(e) = consumer.commit_message(record, CommitMode::Async) {
            // the next commit on this partition covers it
            tracing::warn!(offset = record.offset(), "commit offset: {e}");
        }
        true
    }
}

#[async_trait::async_trait]
impl EventConsumer for KafkaConsumer {
    async fn run(
        &self,
        consumer_group_id: &str,
        topics: &[&str],
        handler: Arc<dyn EventHandler>,
    ) -> anyhow::Result<()> {
        let consumer = self.connect(consumer_group_id)?;
        self.ensure_topics(topics).await?;
        consumer.subscribe(topics)?;
        tracing::info!(group = consumer_group_id, ?topics, "subscription consumer started");

        let mut stream = consumer.stream();
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                next = stream.next() => next,
            };

            match next {
                None => {
                    tracing::error!("kafka stream ended");
                    break;
                }
                Some(Err(e)) => {
                    tracing::warn!("kafka poll: {e}");
                    tokio::time::sleep(POLL_ERROR_PAUSE).await;
                }
                Some(Ok(record)) => {
                    if !self.process(&consumer, &record, handler.as_ref()).await {
                        break;
                    }
                }
            }
        }

        drop(stream);
        consumer.unsubscribe();
        tracing::info!(group = consumer_group_id, "subscription consumer stopped");
        Ok(())
    }
}
