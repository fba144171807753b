//! Shared wiring for the handler tests: memory adapters, seeded users and a
//! propagator that records instead of delivering.

use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
pub use crate::infra_memory::{FailPoint, MemoryStore};
use crate::infra_memory::{MemoryFriendshipRepo, MemorySubscriptionRepo, MemoryTxManager, MemoryUserRepo};
use std::sync::Arc;
use tokio::sync::RwLock;

pub const ALICE: &str = "alice@example.com";
pub const BOB: &str = "bob@example.com";
pub const CAROL: &str = "carol@example.com";
pub const DAVE: &str = "dave@example.com";
pub const ERIN: &str = "erin@example.com";

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    user_repo: Arc<dyn UserRepo>,
    friendship_repo: Arc<dyn FriendshipRepo>,
    subscription_repo: Arc<dyn SubscriptionRepo>,
    tx_manager: Arc<dyn TxManager>,
}

impl Fixture {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        Fixture {
            user_repo: Arc::new(MemoryUserRepo::new(store.clone())),
            friendship_repo: Arc::new(MemoryFriendshipRepo::new(store.clone())),
            subscription_repo: Arc::new(MemorySubscriptionRepo::new(store.clone())),
            tx_manager: Arc::new(MemoryTxManager::new(store.clone())),
            store,
        }
    }

    pub async fn user(&self, email: &str) -> UserId {
        self.store.insert_user(email).await
    }

    pub async fn seed_friendship(
        &self,
        a: UserId,
        b: UserId,
        status: FriendshipStatus,
    ) -> FriendshipId {
        let mut tx = self.tx_manager.begin().await.unwrap();
        let id = self
            .friendship_repo
            .create_in_tx(
                &mut *tx,
                &NewFriendship {
                    user_a: a,
                    user_b: b,
                    status,
                },
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();
        id
    }

    pub async fn seed_subscription(
        &self,
        key: SubscriptionKey,
        status: SubscriptionStatus,
    ) -> SubscriptionId {
        let mut tx = self.tx_manager.begin().await.unwrap();
        let id = self
            .subscription_repo
            .create_in_tx(&mut *tx, &NewSubscription::with_status(key, status))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        id
    }

    pub fn subscribe_user(&self) -> RealSubscribeUserService {
        RealSubscribeUserService::new(
            self.user_repo.clone(),
            self.friendship_repo.clone(),
            self.subscription_repo.clone(),
            self.tx_manager.clone(),
        )
    }

    /// Connect wired with in-process propagation.
    pub fn connect_friendship(&self) -> RealConnectFriendshipService {
        let propagator = DirectSubscriptionPropagator::new(Arc::new(self.subscribe_user()));
        self.connect_friendship_with(Arc::new(propagator))
    }

    pub fn connect_friendship_with(
        &self,
        propagator: Arc<dyn SubscriptionPropagator>,
    ) -> RealConnectFriendshipService {
        RealConnectFriendshipService::new(
            self.user_repo.clone(),
            self.friendship_repo.clone(),
            self.tx_manager.clone(),
            propagator,
        )
    }

    pub fn block_updates(&self) -> RealBlockUpdatesService {
        RealBlockUpdatesService::new(
            self.user_repo.clone(),
            self.friendship_repo.clone(),
            self.subscription_repo.clone(),
            self.tx_manager.clone(),
        )
    }

    pub fn relationship(&self) -> RealRelationshipService {
        RealRelationshipService::new(
            self.user_repo.clone(),
            self.friendship_repo.clone(),
            self.subscription_repo.clone(),
        )
    }
}

#[derive(Default)]
pub struct RecordingPropagator {
    published: RwLock<Vec<Vec<SubscriptionKey>>>,
    fail: RwLock<bool>,
}

impl RecordingPropagator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    pub async fn published(&self) -> Vec<Vec<SubscriptionKey>> {
        self.published.read().await.clone()
    }
}

#[async_trait::async_trait]
impl SubscriptionPropagator for RecordingPropagator {
    async fn propagate(&self, pairs: Vec<SubscriptionKey>) -> Result<(), RelationError> {
        if *self.fail.read().await {
            return Err(RelationError::PropagationFailed("broker unavailable".to_owned()));
        }
        self.published.write().await.push(pairs);
        Ok(())
    }
}
