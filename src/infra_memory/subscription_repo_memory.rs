use super::repo_tx_memory::downcast;
use super::store::{FailPoint, MemoryState, MemoryStore};
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use std::sync::Arc;

pub struct MemorySubscriptionRepo {
    store: Arc<MemoryStore>,
}

impl MemorySubscriptionRepo {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        MemorySubscriptionRepo { store }
    }

    fn insert(
        state: &mut MemoryState,
        subscription: &NewSubscription,
    ) -> Result<SubscriptionId, RepoError> {
        if subscription.status == SubscriptionStatus::Invalid {
            return Err(RepoError::Store("refusing to persist invalid status".to_owned()));
        }
        if state.subscription_by_key(subscription.key()).is_some() {
            return Err(RepoError::Store(format!(
                "duplicate subscription {}",
                subscription.key()
            )));
        }

        let now = Utc::now();
        let id = SubscriptionId::new_v4();
        state.insert_subscription(Subscription {
            id,
            user_id: subscription.user_id,
            subscriber_id: subscription.subscriber_id,
            status: subscription.status,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }
}

#[async_trait::async_trait]
impl SubscriptionRepo for MemorySubscriptionRepo {
    async fn create_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        subscription: &NewSubscription,
    ) -> Result<SubscriptionId, RepoError> {
        self.store.check(FailPoint::SubscriptionCreate)?;
        Self::insert(downcast(tx)?.state(), subscription)
    }

    async fn update_status_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        id: SubscriptionId,
        status: SubscriptionStatus,
    ) -> Result<(), RepoError> {
        self.store.check(FailPoint::SubscriptionUpdate)?;
        if status == SubscriptionStatus::Invalid {
            return Err(RepoError::Store("refusing to persist invalid status".to_owned()));
        }
        let state = downcast(tx)?.state();

        let row = state.subscriptions.get_mut(&id).ok_or(RepoError::NotFound)?;
        row.status = status;
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn upsert_by_pair_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        subscription: &NewSubscription,
    ) -> Result<SubscriptionId, RepoError> {
        self.store.check(FailPoint::SubscriptionUpsert)?;
        if subscription.status == SubscriptionStatus::Invalid {
            return Err(RepoError::Store("refusing to persist invalid status".to_owned()));
        }
        let state = downcast(tx)?.state();

        let existing = state.subscription_by_key(subscription.key()).map(|s| s.id);
        if let Some(id) = existing {
            if let Some(row) = state.subscriptions.get_mut(&id) {
                row.status = subscription.status;
                row.updated_at = Utc::now();
                return Ok(id);
            }
        }
        Self::insert(state, subscription)
    }

    async fn get_by_pairs_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        keys: &[SubscriptionKey],
    ) -> Result<Vec<Subscription>, RepoError> {
        self.store.check(FailPoint::SubscriptionGet)?;
        let state = downcast(tx)?.state();

        Ok(state
            .subscriptions
            .values()
            .filter(|s| keys.contains(&s.key()))
            .cloned()
            .collect())
    }

    async fn list_subscriber_emails_by_status(
        &self,
        user_id: UserId,
        status: SubscriptionStatus,
    ) -> Result<Vec<String>, RepoError> {
        self.store.check(FailPoint::SubscriptionList)?;
        let state = self.store.state.lock().await;

        let mut rows: Vec<_> = state
            .subscriptions
            .values()
            .filter(|s| s.user_id == user_id && s.status == status)
            .collect();
        state.sort_subscriptions(&mut rows);

        Ok(rows
            .into_iter()
            .filter_map(|s| state.emails.get(&s.subscriber_id).cloned())
            .collect())
    }
}
