use crate::domain_model::*;
use crate::domain_port::RepoError;
use crate::domain_port::repo_tx::StorageTx;

#[async_trait::async_trait]
pub trait SubscriptionRepo: Send + Sync {
    async fn create_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        subscription: &NewSubscription,
    ) -> Result<SubscriptionId, RepoError>;

    /// `RepoError::NotFound` when no row has this id.
    async fn update_status_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        id: SubscriptionId,
        status: SubscriptionStatus,
    ) -> Result<(), RepoError>;

    /// Creates the row for the ordered pair, or updates its status if present.
    async fn upsert_by_pair_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        subscription: &NewSubscription,
    ) -> Result<SubscriptionId, RepoError>;

    /// Rows matching any of the ordered pairs.
    async fn get_by_pairs_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        keys: &[SubscriptionKey],
    ) -> Result<Vec<Subscription>, RepoError>;

    /// Emails of the subscribers of `user_id` whose subscription has `status`.
    async fn list_subscriber_emails_by_status(
        &self,
        user_id: UserId,
        status: SubscriptionStatus,
    ) -> Result<Vec<String>, RepoError>;
}
