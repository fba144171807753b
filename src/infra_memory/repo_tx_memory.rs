use super::store::{FailPoint, MemoryState, MemoryStore};
use crate::domain_port::{RepoError, StorageTx, TxBackend, TxManager};
use anyhow::anyhow;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

pub struct MemoryTxManager {
    store: Arc<MemoryStore>,
}

impl MemoryTxManager {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        MemoryTxManager { store }
    }
}

#[async_trait::async_trait]
impl TxManager for MemoryTxManager {
    async fn begin<'t>(&'t self) -> anyhow::Result<Box<dyn StorageTx<'t> + 't>> {
        let guard = self.store.state.clone().lock_owned().await;
        Ok(Box::new(MemoryTx::new(self.store.clone(), guard)))
    }
}

/// Works on a private copy of the state; commit publishes the copy.
pub struct MemoryTx {
    store: Arc<MemoryStore>,
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl MemoryTx {
    fn new(store: Arc<MemoryStore>, guard: OwnedMutexGuard<MemoryState>) -> Self {
        let working = guard.clone();
        MemoryTx {
            store,
            guard,
            working,
        }
    }

    pub(super) fn state(&mut self) -> &mut MemoryState {
        &mut self.working
    }
}

#[async_trait::async_trait]
impl<'t> StorageTx<'t> for MemoryTx {
    fn backend(&self) -> TxBackend {
        TxBackend::Memory
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        let MemoryTx {
            store,
            mut guard,
            working,
        } = *self;
        store.check(FailPoint::Commit).map_err(|e| anyhow!(e))?;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}

pub(super) fn downcast<'a, 't>(
    tx: &'a mut dyn StorageTx<'t>,
) -> Result<&'a mut MemoryTx, RepoError> {
    if tx.backend() != TxBackend::Memory {
        return Err(RepoError::Store(format!(
            "foreign transaction handle: {:?}",
            tx.backend()
        )));
    }
    // SAFETY: only `MemoryTx` reports `TxBackend::Memory`.
    unsafe {
        let p = tx as *mut dyn StorageTx<'t>;
        let p = p as *mut MemoryTx;
        Ok(&mut *p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::*;
    use crate::domain_port::*;
    use crate::infra_memory::MemoryFriendshipRepo;
    use std::time::Duration;

    async fn two_users(store: &MemoryStore) -> (UserId, UserId) {
        (
            store.insert_user("alice@example.com").await,
            store.insert_user("bob@example.com").await,
        )
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let store = MemoryStore::new();
        let (alice, bob) = two_users(&store).await;
        let manager = MemoryTxManager::new(store.clone());
        let repo = MemoryFriendshipRepo::new(store.clone());

        {
            let mut tx = manager.begin().await.unwrap();
            repo.create_in_tx(&mut *tx, &NewFriendship::friended(alice, bob))
                .await
                .unwrap();
        }

        assert!(store.friendships().await.is_empty());
    }

    #[tokio::test]
    async fn failed_commit_publishes_nothing() {
        let store = MemoryStore::new();
        let (alice, bob) = two_users(&store).await;
        let manager = MemoryTxManager::new(store.clone());
        let repo = MemoryFriendshipRepo::new(store.clone());
        store.fail_on(FailPoint::Commit);

        let mut tx = manager.begin().await.unwrap();
        repo.create_in_tx(&mut *tx, &NewFriendship::friended(alice, bob))
            .await
            .unwrap();
        let err = settle(tx, Ok::<_, TxError>(())).await.unwrap_err();

        assert!(matches!(err, TxError::Commit(_)));
        assert!(store.friendships().await.is_empty());
    }

    #[tokio::test]
    async fn transactions_run_one_at_a_time() {
        let store = MemoryStore::new();
        let (alice, bob) = two_users(&store).await;
        let manager = Arc::new(MemoryTxManager::new(store.clone()));
        let repo = MemoryFriendshipRepo::new(store.clone());

        let mut first = manager.begin().await.unwrap();
        repo.create_in_tx(&mut *first, &NewFriendship::friended(alice, bob))
            .await
            .unwrap();

        let second = tokio::spawn({
            let manager = manager.clone();
            let store = store.clone();
            async move {
                let mut tx = manager.begin().await.unwrap();
                let seen = MemoryFriendshipRepo::new(store)
                    .get_by_user_ids_in_tx(&mut *tx, bob, alice)
                    .await
                    .unwrap();
                tx.rollback().await.unwrap();
                seen
            }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!second.is_finished());

        first.commit().await.unwrap();
        let seen = second.await.unwrap();

        assert_eq!(seen.map(|f| f.status), Some(FriendshipStatus::Friended));
    }
}
