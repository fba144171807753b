use crate::domain_model::*;
use crate::domain_port::RepoError;
use std::collections::HashMap;

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with `RepoError::UnresolvedEmails` unless every email belongs to a user.
    async fn get_user_ids_by_emails(
        &self,
        emails: &[String],
    ) -> Result<HashMap<String, UserId>, RepoError>;

    /// Ids without a user are left out of the result.
    async fn get_emails_by_user_ids(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, String>, RepoError>;
}
