use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::Arc;

pub struct RealBlockUpdatesService {
    user_repo: Arc<dyn UserRepo>,
    friendship_repo: Arc<dyn FriendshipRepo>,
    subscription_repo: Arc<dyn SubscriptionRepo>,
    tx_manager: Arc<dyn TxManager>,
}

impl RealBlockUpdatesService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        friendship_repo: Arc<dyn FriendshipRepo>,
        subscription_repo: Arc<dyn SubscriptionRepo>,
        tx_manager: Arc<dyn TxManager>,
    ) -> Self {
        Self {
            user_repo,
            friendship_repo,
            subscription_repo,
            tx_manager,
        }
    }

    async fn block_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        requestor: UserId,
        target: UserId,
    ) -> Result<(), RelationError> {
        let friendship = self
            .friendship_repo
            .get_by_user_ids_in_tx(tx, requestor, target)
            .await
            .map_err(|e| {
                tracing::error!("friendship_repo.get_by_user_ids_in_tx: {e}");
                RelationError::cannot_get(Entity::Friendship)(e)
            })?;

        // requestor stops following target
        let inverse = SubscriptionKey::new(target, requestor);

        match friendship {
            None => {
                self.friendship_repo
                    .create_in_tx(tx, &NewFriendship::blocked(requestor, target))
                    .await
                    .map_err(|e| {
                        tracing::error!("friendship_repo.create_in_tx: {e}");
                        RelationError::cannot_create(Entity::Friendship)(e)
                    })?;
            }
            Some(friendship) if friendship.status.can_block_user() => {
                self.friendship_repo
                    .update_status_in_tx(tx, friendship.id, FriendshipStatus::Blocked)
                    .await
                    .map_err(|e| {
                        tracing::error!("friendship_repo.update_status_in_tx: {e}");
                        RelationError::cannot_update(Entity::Friendship)(e)
                    })?;
            }
            Some(friendship) if friendship.status == FriendshipStatus::Blocked => {
                return Err(RelationError::CannotBlockUpdatesFromBlockedUser);
            }
            Some(_) => {
                let existing = self
                    .subscription_repo
                    .get_by_pairs_in_tx(tx, &[inverse])
                    .await
                    .map_err(|e| {
                        tracing::error!("subscription_repo.get_by_pairs_in_tx: {e}");
                        RelationError::cannot_get(Entity::Subscription)(e)
                    })?;
                if !SubscriptionStatus::of(existing.first()).allow_unsubscribe() {
                    return Err(RelationError::AlreadyExists);
                }
            }
        }

        self.subscription_repo
            .upsert_by_pair_in_tx(
                tx,
                &NewSubscription::with_status(inverse, SubscriptionStatus::Unsubscribed),
            )
            .await
            .map_err(|e| {
                tracing::error!("subscription_repo.upsert_by_pair_in_tx: {e}");
                RelationError::cannot_update(Entity::Subscription)(e)
            })?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl BlockUpdatesService for RealBlockUpdatesService {
    async fn block_updates(&self, payload: &BlockUpdatesPayload) -> Result<(), RelationError> {
        if payload.requestor == payload.target {
            return Err(RelationError::invalid(
                "payload",
                InvalidReason::EmailIsNotValid,
            ));
        }

        let emails = [payload.requestor.clone(), payload.target.clone()];
        let user_ids = self
            .user_repo
            .get_user_ids_by_emails(&emails)
            .await
            .map_err(|e| {
                tracing::warn!("user_repo.get_user_ids_by_emails: {e}");
                RelationError::from_user_lookup(e)
            })?;
        let (Some(&requestor), Some(&target)) = (
            user_ids.get(&payload.requestor),
            user_ids.get(&payload.target),
        ) else {
            return Err(RelationError::from_user_lookup(RepoError::UnresolvedEmails(
                emails.to_vec(),
            )));
        };

        let mut tx = self.tx_manager.begin().await.map_err(TxError::Begin)?;
        let result = self.block_in_tx(&mut *tx, requestor, target).await;
        settle(tx, result).await?;

        tracing::info!(%requestor, %target, "updates blocked");
        Ok(())
    }
}
