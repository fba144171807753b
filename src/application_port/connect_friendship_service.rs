use crate::application_port::RelationError;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait ConnectFriendshipService: Send + Sync {
    /// Creates or restores the friendship, then subscribes both users to each other.
    async fn connect_friendship(
        &self,
        requestor_email: &str,
        target_email: &str,
    ) -> Result<Friendship, RelationError>;
}
