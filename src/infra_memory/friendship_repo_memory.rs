use super::repo_tx_memory::downcast;
use super::store::{FailPoint, MemoryStore};
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use std::sync::Arc;

pub struct MemoryFriendshipRepo {
    store: Arc<MemoryStore>,
}

impl MemoryFriendshipRepo {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        MemoryFriendshipRepo { store }
    }
}

#[async_trait::async_trait]
impl FriendshipRepo for MemoryFriendshipRepo {
    async fn create_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        friendship: &NewFriendship,
    ) -> Result<FriendshipId, RepoError> {
        self.store.check(FailPoint::FriendshipCreate)?;
        if friendship.status == FriendshipStatus::Invalid {
            return Err(RepoError::Store("refusing to persist invalid status".to_owned()));
        }
        let state = downcast(tx)?.state();

        let pair = UserPair::new(friendship.user_a, friendship.user_b);
        if state.friendship_by_pair(pair).is_some() {
            return Err(RepoError::Store(format!(
                "duplicate friendship for ({}, {})",
                UserPair::min(&pair),
                UserPair::max(&pair)
            )));
        }

        let now = Utc::now();
        let id = FriendshipId::new_v4();
        state.insert_friendship(Friendship {
            id,
            user_a: friendship.user_a,
            user_b: friendship.user_b,
            status: friendship.status,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn update_status_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        id: FriendshipId,
        status: FriendshipStatus,
    ) -> Result<(), RepoError> {
        self.store.check(FailPoint::FriendshipUpdate)?;
        if status == FriendshipStatus::Invalid {
            return Err(RepoError::Store("refusing to persist invalid status".to_owned()));
        }
        let state = downcast(tx)?.state();

        let row = state.friendships.get_mut(&id).ok_or(RepoError::NotFound)?;
        row.status = status;
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn get_by_user_ids_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        a: UserId,
        b: UserId,
    ) -> Result<Option<Friendship>, RepoError> {
        self.store.check(FailPoint::FriendshipGet)?;
        let state = downcast(tx)?.state();

        Ok(state.friendship_by_pair(UserPair::new(a, b)).cloned())
    }

    async fn list_by_user_and_status(
        &self,
        user_id: UserId,
        statuses: &[FriendshipStatus],
    ) -> Result<Vec<Friendship>, RepoError> {
        self.store.check(FailPoint::FriendshipList)?;
        let state = self.store.state.lock().await;

        let mut rows: Vec<_> = state
            .friendships
            .values()
            .filter(|f| f.pair().contains(user_id) && statuses.contains(&f.status))
            .cloned()
            .collect();
        state.sort_friendships(&mut rows);
        Ok(rows)
    }
}
