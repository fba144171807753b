use crate::server::{EventHandler, HandleOutcome};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(5);

pub(crate) fn retry_backoff(attempt: u32) -> Duration {
    INITIAL_BACKOFF
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_BACKOFF)
}

/// Hands one message to `handler` until it is committed or skipped.
///
/// Returns `None` when cancelled before the message was settled; the caller
/// must not advance past it.
pub(crate) async fn deliver(
    handler: &dyn EventHandler,
    payload: &[u8],
    cancel: &CancellationToken,
) -> Option<HandleOutcome> {
    let mut attempt = 0;
    loop {
        match handler.handle(payload).await {
            Ok(outcome @ (HandleOutcome::Commit | HandleOutcome::SkipCommit)) => {
                return Some(outcome);
            }
            Ok(HandleOutcome::Retry) => {
                tracing::warn!(attempt, "handler asked for retry");
            }
            Err(e) => {
                tracing::error!(attempt, error = ?e, "handler error; retrying");
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(retry_backoff(attempt)) => {}
        }
        attempt = attempt.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyHandler {
        calls: AtomicU32,
        failures: u32,
    }

    #[async_trait::async_trait]
    impl EventHandler for FlakyHandler {
        async fn handle(&self, _payload: &[u8]) -> anyhow::Result<HandleOutcome> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Ok(HandleOutcome::Retry);
            }
            Ok(HandleOutcome::Commit)
        }
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        assert_eq!(retry_backoff(0), Duration::from_millis(100));
        assert_eq!(retry_backoff(1), Duration::from_millis(200));
        assert_eq!(retry_backoff(3), Duration::from_millis(800));
        assert_eq!(retry_backoff(40), MAX_BACKOFF);
    }

    #[tokio::test]
    async fn retries_until_handler_commits() {
        let handler = FlakyHandler {
            calls: AtomicU32::new(0),
            failures: 2,
        };

        let outcome = deliver(&handler, b"[]", &CancellationToken::new()).await;

        assert_eq!(outcome, Some(HandleOutcome::Commit));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_stops_retrying() {
        let handler = FlakyHandler {
            calls: AtomicU32::new(0),
            failures: u32::MAX,
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = deliver(&handler, b"[]", &cancel).await;

        assert_eq!(outcome, None);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }
}
