use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::collections::HashSet;
use std::sync::Arc;

const COMMON_FRIENDS_EMAILS: usize = 2;

pub struct RealRelationshipService {
    user_repo: Arc<dyn UserRepo>,
    friendship_repo: Arc<dyn FriendshipRepo>,
    subscription_repo: Arc<dyn SubscriptionRepo>,
}

impl RealRelationshipService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        friendship_repo: Arc<dyn FriendshipRepo>,
        subscription_repo: Arc<dyn SubscriptionRepo>,
    ) -> Self {
        Self {
            user_repo,
            friendship_repo,
            subscription_repo,
        }
    }

    async fn resolve_one(&self, email: &str) -> Result<UserId, RelationError> {
        let emails = [email.to_owned()];
        let user_ids = self
            .user_repo
            .get_user_ids_by_emails(&emails)
            .await
            .map_err(|e| {
                tracing::warn!("user_repo.get_user_ids_by_emails: {e}");
                RelationError::from_user_lookup(e)
            })?;
        user_ids.get(email).copied().ok_or_else(|| {
            RelationError::from_user_lookup(RepoError::UnresolvedEmails(emails.to_vec()))
        })
    }

    /// Ids of everyone in a `Friended` relation with `user_id`, in creation order.
    async fn friend_ids(&self, user_id: UserId) -> Result<Vec<UserId>, RelationError> {
        let friendships = self
            .friendship_repo
            .list_by_user_and_status(user_id, &[FriendshipStatus::Friended])
            .await
            .map_err(|e| {
                tracing::error!("friendship_repo.list_by_user_and_status: {e}");
                RelationError::cannot_list(Entity::Friendship)(e)
            })?;
        Ok(friendships
            .iter()
            .filter_map(|f| f.counterpart(user_id))
            .collect())
    }

    async fn emails_of(&self, ids: &[UserId]) -> Result<Vec<String>, RelationError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut emails = self
            .user_repo
            .get_emails_by_user_ids(ids)
            .await
            .map_err(|e| {
                tracing::error!("user_repo.get_emails_by_user_ids: {e}");
                RelationError::cannot_get(Entity::User)(e)
            })?;
        Ok(ids.iter().filter_map(|id| emails.remove(id)).collect())
    }

    async fn subscriber_emails(
        &self,
        user_id: UserId,
        status: SubscriptionStatus,
    ) -> Result<Vec<String>, RelationError> {
        self.subscription_repo
            .list_subscriber_emails_by_status(user_id, status)
            .await
            .map_err(|e| {
                tracing::error!("subscription_repo.list_subscriber_emails_by_status: {e}");
                RelationError::cannot_list(Entity::Subscription)(e)
            })
    }
}

#[async_trait::async_trait]
impl RelationshipService for RealRelationshipService {
    async fn list_friends(&self, email: &str) -> Result<Vec<String>, RelationError> {
        let user_id = self.resolve_one(email).await?;
        let friend_ids = self.friend_ids(user_id).await?;
        self.emails_of(&friend_ids).await
    }

    async fn list_common_friends(&self, emails: &[String]) -> Result<Vec<String>, RelationError> {
        let distinct = dedup_preserving_order(emails.iter().cloned());
        if emails.len() != COMMON_FRIENDS_EMAILS || distinct.len() != COMMON_FRIENDS_EMAILS {
            return Err(RelationError::invalid(
                "friends",
                InvalidReason::NeedExactlyTwoEmails,
            ));
        }

        let user_ids = self
            .user_repo
            .get_user_ids_by_emails(&distinct)
            .await
            .map_err(|e| {
                tracing::warn!("user_repo.get_user_ids_by_emails: {e}");
                RelationError::from_user_lookup(e)
            })?;
        let (Some(&first), Some(&second)) = (user_ids.get(&distinct[0]), user_ids.get(&distinct[1]))
        else {
            return Err(RelationError::from_user_lookup(RepoError::UnresolvedEmails(
                distinct,
            )));
        };

        let first_friends: HashSet<UserId> = self.friend_ids(first).await?.into_iter().collect();
        let mut seen = HashSet::new();
        let mutual: Vec<UserId> = self
            .friend_ids(second)
            .await?
            .into_iter()
            .filter(|id| first_friends.contains(id) && seen.insert(*id))
            .collect();

        let mut emails = self.emails_of(&mutual).await?;
        emails.sort();
        Ok(emails)
    }

    async fn list_updates(&self, sender: &str, text: &str) -> Result<Vec<String>, RelationError> {
        let sender_id = self.resolve_one(sender).await?;

        let mentions: Vec<String> = extract_mentions(text)
            .into_iter()
            .filter(|email| email != sender)
            .collect();
        if !mentions.is_empty() {
            // every mentioned address has to be a registered user
            self.user_repo
                .get_user_ids_by_emails(&mentions)
                .await
                .map_err(|e| {
                    tracing::warn!("user_repo.get_user_ids_by_emails: {e}");
                    RelationError::from_user_lookup(e)
                })?;
        }

        let followers = self
            .subscriber_emails(sender_id, SubscriptionStatus::Subscribed)
            .await?;
        let opted_out: HashSet<String> = self
            .subscriber_emails(sender_id, SubscriptionStatus::Unsubscribed)
            .await?
            .into_iter()
            .collect();

        let recipients: Vec<String> = dedup_preserving_order(followers.into_iter().chain(mentions))
            .into_iter()
            .filter(|email| email != sender && !opted_out.contains(email))
            .collect();

        tracing::debug!(%sender_id, recipients = recipients.len(), "broadcast recipients listed");
        Ok(recipients)
    }
}
