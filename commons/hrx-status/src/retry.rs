use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::poll::{TimedOut, poll};

/// Runs `action` on a fixed cadence until it succeeds or `deadline` elapses.
///
/// A failed attempt is logged and absorbed, never returned: the wrapped
/// action's error can never become `retry`'s error, and there is no attempt
/// cap. The only failure mode is the wall-clock deadline racing ahead of the
/// iterations, which yields [`TimedOut`].
pub async fn retry<A, Fut, E>(
    deadline: Instant,
    interval: Duration,
    action: A,
) -> Result<(), TimedOut>
where
    A: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let action = Arc::new(action);
    poll(deadline, interval, move |done| {
        let action = Arc::clone(&action);
        async move {
            match action().await {
                Ok(()) => {
                    debug!("retryable action completed");
                    let _ = done.send(()).await;
                }
                Err(err) => {
                    warn!(%err, "retryable action failed; retrying on the next tick");
                }
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn failing_action_is_retried_until_the_deadline() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&attempts);
        let interval = Duration::from_secs(1);
        let res = retry(Instant::now() + 3 * interval, interval, move || {
            let counted = Arc::clone(&counted);
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                Err::<(), &str>("write conflict")
            }
        })
        .await;
        // The action's own error is never surfaced; only the deadline fails.
        assert_eq!(res, Err(TimedOut));
        assert!(attempts.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn eventual_success_completes_the_retry() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&attempts);
        let res = retry(
            Instant::now() + Duration::from_secs(30),
            Duration::from_secs(1),
            move || {
                let counted = Arc::clone(&counted);
                async move {
                    if counted.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("not yet")
                    } else {
                        Ok(())
                    }
                }
            },
        )
        .await;
        assert_eq!(res, Ok(()));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_success_attempts_once() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&attempts);
        let res = retry(
            Instant::now() + Duration::from_secs(30),
            Duration::from_secs(1),
            move || {
                let counted = Arc::clone(&counted);
                async move {
                    counted.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), &str>(())
                }
            },
        )
        .await;
        assert_eq!(res, Ok(()));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
