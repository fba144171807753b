use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::normalize_email;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::logger::*;
use crate::server::*;
use crate::settings::Settings;
use nanoid::nanoid;
use sqlx::MySqlPool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Repos {
    user_repo: Arc<dyn UserRepo>,
    friendship_repo: Arc<dyn FriendshipRepo>,
    subscription_repo: Arc<dyn SubscriptionRepo>,
    tx_manager: Arc<dyn TxManager>,
}

pub struct Server {
    pub connect_friendship_service: Arc<dyn ConnectFriendshipService>,
    pub subscribe_user_service: Arc<dyn SubscribeUserService>,
    pub block_updates_service: Arc<dyn BlockUpdatesService>,
    pub relationship_service: Arc<dyn RelationshipService>,
    pub command_timeout: Duration,
    pub expose_internal_errors: bool,
    consumer_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    pool: Option<MySqlPool>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let alphabet: [char; 16] = [
            '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', 'a', 'b', 'c', 'd', 'e', 'f',
        ];
        let run_id = nanoid!(10, &alphabet);
        let command_timeout = settings.command.timeout();

        let (repos, pool) = match settings.storage.backend.as_str() {
            "fake" => {
                let store = MemoryStore::new();
                for email in &settings.storage.seed_users {
                    store.insert_user(&normalize_email(email)).await;
                }
                info!(users = settings.storage.seed_users.len(), "memory store seeded");
                let repos = Repos {
                    user_repo: Arc::new(MemoryUserRepo::new(store.clone())),
                    friendship_repo: Arc::new(MemoryFriendshipRepo::new(store.clone())),
                    subscription_repo: Arc::new(MemorySubscriptionRepo::new(store.clone())),
                    tx_manager: Arc::new(MemoryTxManager::new(store)),
                };
                (repos, None)
            }
            "real" => {
                let pool = connect_pool(&settings.storage).await?;
                let repos = Repos {
                    user_repo: Arc::new(MySqlUserRepo::new(pool.clone())),
                    friendship_repo: Arc::new(MySqlFriendshipRepo::new(pool.clone())),
                    subscription_repo: Arc::new(MySqlSubscriptionRepo::new(pool.clone())),
                    tx_manager: Arc::new(MySqlTxManager::new(pool.clone())),
                };
                (repos, Some(pool))
            }
            other => return Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
        };

        let subscribe_user_service: Arc<dyn SubscribeUserService> =
            Arc::new(RealSubscribeUserService::new(
                repos.user_repo.clone(),
                repos.friendship_repo.clone(),
                repos.subscription_repo.clone(),
                repos.tx_manager.clone(),
            ));

        // region propagation
        let cancel = CancellationToken::new();
        let propagation = &settings.propagation;

        let (propagator, consumer) = match propagation.transport.as_str() {
            "direct" => {
                let propagator: Arc<dyn SubscriptionPropagator> = Arc::new(
                    DirectSubscriptionPropagator::new(subscribe_user_service.clone()),
                );
                (propagator, None)
            }
            "channel" => {
                let bus = ChannelBus::new(cancel.clone());
                let propagator: Arc<dyn SubscriptionPropagator> = Arc::new(
                    QueuedSubscriptionPropagator::new(bus.clone(), &propagation.topic),
                );
                let consumer: Arc<dyn EventConsumer> = bus;
                (propagator, Some(consumer))
            }
            "kafka" => {
                let publisher = Arc::new(KafkaPublisher::new(
                    propagation,
                    &format!("rapport-pub-{}", run_id),
                )?);
                let propagator: Arc<dyn SubscriptionPropagator> = Arc::new(
                    QueuedSubscriptionPropagator::new(publisher, &propagation.topic),
                );
                let consumer: Arc<dyn EventConsumer> = Arc::new(KafkaConsumer::new(
                    propagation,
                    &format!("rapport-sub-{}", run_id),
                    cancel.clone(),
                ));
                (propagator, Some(consumer))
            }
            other => return Err(anyhow::anyhow!("Unknown propagation transport: {}", other)),
        };

        let consumer_handle = consumer.map(|consumer| {
            let handler: Arc<dyn EventHandler> = Arc::new(SubscriptionCreatedHandler::new(
                subscribe_user_service.clone(),
                command_timeout,
            ));
            let group = propagation.consumer_group.clone();
            let topic = propagation.topic.clone();
            tokio::spawn(async move {
                if let Err(e) = consumer.run(&group, &[topic.as_str()], handler).await {
                    error!("subscription consumer stopped: {e:#}");
                }
            })
        });
        // endregion

        let connect_friendship_service: Arc<dyn ConnectFriendshipService> =
            Arc::new(RealConnectFriendshipService::new(
                repos.user_repo.clone(),
                repos.friendship_repo.clone(),
                repos.tx_manager.clone(),
                propagator,
            ));
        let block_updates_service: Arc<dyn BlockUpdatesService> =
            Arc::new(RealBlockUpdatesService::new(
                repos.user_repo.clone(),
                repos.friendship_repo.clone(),
                repos.subscription_repo.clone(),
                repos.tx_manager.clone(),
            ));
        let relationship_service: Arc<dyn RelationshipService> =
            Arc::new(RealRelationshipService::new(
                repos.user_repo,
                repos.friendship_repo,
                repos.subscription_repo,
            ));

        info!(
            %run_id,
            storage = %settings.storage.backend,
            transport = %propagation.transport,
            "server started"
        );

        Ok(Self {
            connect_friendship_service,
            subscribe_user_service,
            block_updates_service,
            relationship_service,
            command_timeout,
            expose_internal_errors: !settings.is_prod(),
            consumer_handle: Mutex::new(consumer_handle),
            cancel,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let handle = self
            .consumer_handle
            .lock()
            .ok()
            .and_then(|mut lock| lock.take());
        if let Some(handle) = handle {
            let r = handle.await;
            info!("consumer handle dropped: {:?}", r);
        }

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
