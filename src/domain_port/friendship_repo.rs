use crate::domain_model::*;
use crate::domain_port::RepoError;
use crate::domain_port::repo_tx::StorageTx;

#[async_trait::async_trait]
pub trait FriendshipRepo: Send + Sync {
    async fn create_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        friendship: &NewFriendship,
    ) -> Result<FriendshipId, RepoError>;

    /// `RepoError::NotFound` when no row has this id.
    async fn update_status_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        id: FriendshipId,
        status: FriendshipStatus,
    ) -> Result<(), RepoError>;

    /// Matches the pair in either order.
    async fn get_by_user_ids_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        a: UserId,
        b: UserId,
    ) -> Result<Option<Friendship>, RepoError>;

    async fn list_by_user_and_status(
        &self,
        user_id: UserId,
        statuses: &[FriendshipStatus],
    ) -> Result<Vec<Friendship>, RepoError>;
}
