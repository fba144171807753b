use crate::domain_model::*;
use crate::domain_port::RepoError;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Repository operations that tests can force to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    UserLookup,
    FriendshipGet,
    FriendshipCreate,
    FriendshipUpdate,
    FriendshipList,
    SubscriptionGet,
    SubscriptionCreate,
    SubscriptionUpdate,
    SubscriptionUpsert,
    SubscriptionList,
    Commit,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub(super) user_ids: HashMap<String, UserId>,
    pub(super) emails: HashMap<UserId, String>,
    pub(super) friendships: HashMap<FriendshipId, Friendship>,
    pub(super) subscriptions: HashMap<SubscriptionId, Subscription>,
    // insertion order, so listings are stable when timestamps collide
    pub(super) friendship_seq: HashMap<FriendshipId, u64>,
    pub(super) subscription_seq: HashMap<SubscriptionId, u64>,
    next_seq: u64,
}

impl MemoryState {
    pub(super) fn friendship_by_pair(&self, pair: UserPair) -> Option<&Friendship> {
        self.friendships.values().find(|f| f.pair() == pair)
    }

    pub(super) fn subscription_by_key(&self, key: SubscriptionKey) -> Option<&Subscription> {
        self.subscriptions.values().find(|s| s.key() == key)
    }

    pub(super) fn insert_friendship(&mut self, friendship: Friendship) {
        self.next_seq += 1;
        self.friendship_seq.insert(friendship.id, self.next_seq);
        self.friendships.insert(friendship.id, friendship);
    }

    pub(super) fn insert_subscription(&mut self, subscription: Subscription) {
        self.next_seq += 1;
        self.subscription_seq.insert(subscription.id, self.next_seq);
        self.subscriptions.insert(subscription.id, subscription);
    }

    pub(super) fn sort_friendships(&self, rows: &mut [Friendship]) {
        rows.sort_by_key(|f| self.friendship_seq.get(&f.id).copied());
    }

    pub(super) fn sort_subscriptions<S: std::borrow::Borrow<Subscription>>(&self, rows: &mut [S]) {
        rows.sort_by_key(|s| self.subscription_seq.get(&s.borrow().id).copied());
    }
}

/// Process-local storage shared by every memory repository.
///
/// A transaction holds the state lock for its whole lifetime, so transactions
/// are executed one after another.
#[derive(Default)]
pub struct MemoryStore {
    pub(super) state: Arc<tokio::sync::Mutex<MemoryState>>,
    faults: Mutex<HashSet<FailPoint>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a user, returning the existing id if the email is taken.
    pub async fn insert_user(&self, email: &str) -> UserId {
        let mut state = self.state.lock().await;
        if let Some(id) = state.user_ids.get(email) {
            return *id;
        }
        let id = UserId::new_v4();
        state.user_ids.insert(email.to_owned(), id);
        state.emails.insert(id, email.to_owned());
        id
    }

    pub fn fail_on(&self, point: FailPoint) {
        self.faults
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(point);
    }

    pub fn clear_faults(&self) {
        self.faults
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub(super) fn check(&self, point: FailPoint) -> Result<(), RepoError> {
        let faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        if faults.contains(&point) {
            return Err(RepoError::Store(format!("injected failure: {point:?}")));
        }
        Ok(())
    }

    pub async fn friendships(&self) -> Vec<Friendship> {
        let state = self.state.lock().await;
        let mut rows: Vec<_> = state.friendships.values().cloned().collect();
        state.sort_friendships(&mut rows);
        rows
    }

    pub async fn friendship_between(&self, a: UserId, b: UserId) -> Option<Friendship> {
        let state = self.state.lock().await;
        state.friendship_by_pair(UserPair::new(a, b)).cloned()
    }

    pub async fn subscriptions(&self) -> Vec<Subscription> {
        let state = self.state.lock().await;
        let mut rows: Vec<_> = state.subscriptions.values().cloned().collect();
        state.sort_subscriptions(&mut rows);
        rows
    }

    pub async fn subscription(&self, key: SubscriptionKey) -> Option<Subscription> {
        let state = self.state.lock().await;
        state.subscription_by_key(key).cloned()
    }
}
