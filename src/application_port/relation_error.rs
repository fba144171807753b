use crate::domain_port::{RepoError, TxError};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Friendship,
    Subscription,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Entity::User => "User",
            Entity::Friendship => "Friendship",
            Entity::Subscription => "Subscription",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidReason {
    #[error("email is not valid")]
    EmailIsNotValid,
    #[error("need at least two emails")]
    NeedAtLeastTwoEmails,
    #[error("need exactly two emails")]
    NeedExactlyTwoEmails,
    #[error("no user registered for: {}", .0.join(", "))]
    UnknownEmails(Vec<String>),
}

#[derive(Debug, thiserror::Error)]
pub enum RelationError {
    #[error("invalid request ({field}): {reason}")]
    InvalidRequest {
        field: &'static str,
        reason: InvalidReason,
    },
    #[error("record not found")]
    RecordNotFound,
    #[error("friendship is unavailable")]
    FriendshipIsUnavailable,
    #[error("cannot block updates from a blocked user")]
    CannotBlockUpdatesFromBlockedUser,
    #[error("already exists")]
    AlreadyExists,
    #[error("cannot get {entity}: {source}")]
    CannotGetEntity { entity: Entity, source: RepoError },
    #[error("cannot create {entity}: {source}")]
    CannotCreateEntity { entity: Entity, source: RepoError },
    #[error("cannot update {entity}: {source}")]
    CannotUpdateEntity { entity: Entity, source: RepoError },
    #[error("cannot list {entity}: {source}")]
    CannotListEntity { entity: Entity, source: RepoError },
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("subscription propagation failed: {0}")]
    PropagationFailed(String),
    #[error("store error: {0}")]
    Store(String),
}

impl RelationError {
    pub fn invalid(field: &'static str, reason: InvalidReason) -> Self {
        RelationError::InvalidRequest { field, reason }
    }

    /// Unknown emails are the caller's fault; anything else is a lookup failure.
    pub fn from_user_lookup(err: RepoError) -> Self {
        match err {
            RepoError::UnresolvedEmails(emails) => {
                RelationError::invalid("emails", InvalidReason::UnknownEmails(emails))
            }
            other => RelationError::CannotGetEntity {
                entity: Entity::User,
                source: other,
            },
        }
    }

    pub fn cannot_get(entity: Entity) -> impl FnOnce(RepoError) -> Self {
        move |source| RelationError::CannotGetEntity { entity, source }
    }

    pub fn cannot_create(entity: Entity) -> impl FnOnce(RepoError) -> Self {
        move |source| RelationError::CannotCreateEntity { entity, source }
    }

    pub fn cannot_update(entity: Entity) -> impl FnOnce(RepoError) -> Self {
        move |source| RelationError::CannotUpdateEntity { entity, source }
    }

    pub fn cannot_list(entity: Entity) -> impl FnOnce(RepoError) -> Self {
        move |source| RelationError::CannotListEntity { entity, source }
    }

    /// Validation and business-rule violations; retrying cannot change the outcome.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RelationError::InvalidRequest { .. }
                | RelationError::RecordNotFound
                | RelationError::FriendshipIsUnavailable
                | RelationError::CannotBlockUpdatesFromBlockedUser
                | RelationError::AlreadyExists
        )
    }

    pub fn is_retryable(&self) -> bool {
        !self.is_client_error()
    }
}

impl From<TxError> for RelationError {
    fn from(err: TxError) -> Self {
        RelationError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_emails_become_invalid_request() {
        let err = RelationError::from_user_lookup(RepoError::UnresolvedEmails(vec![
            "ghost@example.com".to_owned(),
        ]));

        assert!(matches!(
            err,
            RelationError::InvalidRequest {
                field: "emails",
                reason: InvalidReason::UnknownEmails(_)
            }
        ));
        assert!(err.is_client_error());
    }

    #[test]
    fn store_failures_are_retryable_and_name_the_entity() {
        let err = RelationError::cannot_update(Entity::Subscription)(RepoError::Store(
            "connection reset".to_owned(),
        ));

        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "cannot update Subscription: store error: connection reset"
        );
    }
}
