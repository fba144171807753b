use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::Arc;

pub struct RealConnectFriendshipService {
    user_repo: Arc<dyn UserRepo>,
    friendship_repo: Arc<dyn FriendshipRepo>,
    tx_manager: Arc<dyn TxManager>,
    propagator: Arc<dyn SubscriptionPropagator>,
}

impl RealConnectFriendshipService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        friendship_repo: Arc<dyn FriendshipRepo>,
        tx_manager: Arc<dyn TxManager>,
        propagator: Arc<dyn SubscriptionPropagator>,
    ) -> Self {
        Self {
            user_repo,
            friendship_repo,
            tx_manager,
            propagator,
        }
    }

    async fn connect_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        requestor: UserId,
        target: UserId,
    ) -> Result<Friendship, RelationError> {
        let existing = self
            .friendship_repo
            .get_by_user_ids_in_tx(tx, requestor, target)
            .await
            .map_err(|e| {
                tracing::error!("friendship_repo.get_by_user_ids_in_tx: {e}");
                RelationError::cannot_get(Entity::Friendship)(e)
            })?;

        match existing {
            None => {
                self.friendship_repo
                    .create_in_tx(tx, &NewFriendship::friended(requestor, target))
                    .await
                    .map_err(|e| {
                        tracing::error!("friendship_repo.create_in_tx: {e}");
                        RelationError::cannot_create(Entity::Friendship)(e)
                    })?;
            }
            Some(friendship) if friendship.status.can_connect() => {
                self.friendship_repo
                    .update_status_in_tx(tx, friendship.id, FriendshipStatus::Friended)
                    .await
                    .map_err(|e| {
                        tracing::error!("friendship_repo.update_status_in_tx: {e}");
                        RelationError::cannot_update(Entity::Friendship)(e)
                    })?;
            }
            Some(friendship) => {
                tracing::debug!(
                    friendship_id = %friendship.id,
                    status = ?friendship.status,
                    "friendship cannot be connected"
                );
                return Err(RelationError::FriendshipIsUnavailable);
            }
        }

        self.friendship_repo
            .get_by_user_ids_in_tx(tx, requestor, target)
            .await
            .map_err(RelationError::cannot_get(Entity::Friendship))?
            .ok_or(RelationError::RecordNotFound)
    }
}

#[async_trait::async_trait]
impl ConnectFriendshipService for RealConnectFriendshipService {
    async fn connect_friendship(
        &self,
        requestor_email: &str,
        target_email: &str,
    ) -> Result<Friendship, RelationError> {
        if requestor_email == target_email {
            return Err(RelationError::invalid(
                "friends",
                InvalidReason::EmailIsNotValid,
            ));
        }

        let emails = [requestor_email.to_owned(), target_email.to_owned()];
        let user_ids = self
            .user_repo
            .get_user_ids_by_emails(&emails)
            .await
            .map_err(|e| {
                tracing::warn!("user_repo.get_user_ids_by_emails: {e}");
                RelationError::from_user_lookup(e)
            })?;
        let (Some(&requestor), Some(&target)) =
            (user_ids.get(requestor_email), user_ids.get(target_email))
        else {
            return Err(RelationError::from_user_lookup(RepoError::UnresolvedEmails(
                emails.to_vec(),
            )));
        };

        let mut tx = self.tx_manager.begin().await.map_err(TxError::Begin)?;
        let result = self.connect_in_tx(&mut *tx, requestor, target).await;
        let friendship = settle(tx, result).await?;

        tracing::info!(
            friendship_id = %friendship.id,
            %requestor,
            %target,
            "friendship connected"
        );

        // not part of the friendship transaction; both transports are idempotent
        let pairs = vec![
            SubscriptionKey::new(requestor, target),
            SubscriptionKey::new(target, requestor),
        ];
        if let Err(e) = self.propagator.propagate(pairs).await {
            tracing::error!(friendship_id = %friendship.id, "propagate mutual subscription: {e}");
            return Err(e);
        }

        Ok(friendship)
    }
}
