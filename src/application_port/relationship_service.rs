use crate::application_port::RelationError;

#[async_trait::async_trait]
pub trait RelationshipService: Send + Sync {
    async fn list_friends(&self, email: &str) -> Result<Vec<String>, RelationError>;

    async fn list_common_friends(&self, emails: &[String]) -> Result<Vec<String>, RelationError>;

    /// Recipients of a broadcast by `sender`: followers plus mentioned users,
    /// minus everyone who unsubscribed from `sender`.
    async fn list_updates(&self, sender: &str, text: &str) -> Result<Vec<String>, RelationError>;
}
