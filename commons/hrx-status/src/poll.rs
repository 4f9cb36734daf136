use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info};

/// Completion signal handed to every probe invocation. A probe reports
/// success by sending on it; returning without sending means "not yet".
pub type Done = mpsc::Sender<()>;

/// The deadline elapsed before the polled operation completed.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("deadline elapsed before the operation completed")]
pub struct TimedOut;

/// Repeatedly invokes `probe` until it signals completion or `deadline`
/// elapses, sleeping `interval` between iterations.
///
/// Each invocation runs on its own task so a slow or hung probe cannot delay
/// deadline detection: the loop returns [`TimedOut`] the moment the deadline
/// fires even with a probe in flight. In-flight invocations are not
/// force-cancelled; they run to completion in the background and their late
/// results are discarded. Invocations are strictly sequential — a new probe
/// starts only once the previous one has finished.
///
/// A `deadline` that is already past returns [`TimedOut`] without invoking
/// the probe at all, and a zero `interval` still re-checks the deadline on
/// every iteration.
pub async fn poll<P, Fut>(
    deadline: Instant,
    interval: Duration,
    mut probe: P,
) -> Result<(), TimedOut>
where
    P: FnMut(Done) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<()>(1);
    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        if Instant::now() >= deadline {
            return Err(TimedOut);
        }
        let idle = in_flight
            .as_ref()
            .map(JoinHandle::is_finished)
            .unwrap_or(true);
        if idle {
            in_flight = Some(tokio::spawn(probe(tx.clone())));
        }
        tokio::select! {
            biased;
            _ = rx.recv() => {
                info!("polling completed");
                return Ok(());
            }
            _ = time::sleep_until(deadline) => {
                return Err(TimedOut);
            }
            _ = time::sleep(interval) => {
                debug!("probe has not signalled completion; polling again");
            }
        }
    }
}
