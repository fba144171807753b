#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,
    #[error("no user registered for: {}", .0.join(", "))]
    UnresolvedEmails(Vec<String>),
    #[error("store error: {0}")]
    Store(String),
}
