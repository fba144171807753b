use crate::application_port::RelationError;
use std::future::Future;
use std::time::Duration;

/// Runs `fut` to completion or drops it once `timeout` elapses. Dropping an
/// in-flight unit of work drops its transaction handle, which rolls it back.
pub async fn with_deadline<T, F>(timeout: Duration, fut: F) -> Result<T, RelationError>
where
    F: Future<Output = Result<T, RelationError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "deadline exceeded");
            Err(RelationError::DeadlineExceeded)
        }
    }
}
