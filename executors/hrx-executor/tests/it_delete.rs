mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::time::Instant;

use hrx_executor::actions::{Deleter, Outcome};
use hrx_executor::cluster::TargetRef;
use hrx_executor::crd::HELM_RELEASE_FINALIZER;

const INTERVAL: Duration = Duration::from_secs(1);
const REMOVAL_INTERVAL: Duration = Duration::from_secs(1);
const REMOVAL_WINDOW: Duration = Duration::from_secs(5);

fn target() -> TargetRef {
    TargetRef {
        name: "podinfo".into(),
        namespace: "apps".into(),
    }
}

fn deleter(
    cluster: &Arc<common::FakeCluster>,
    driver: &Arc<common::FakeDriver>,
) -> Deleter<common::FakeCluster, common::FakeDriver> {
    Deleter::new(
        Arc::clone(cluster),
        Arc::clone(driver),
        REMOVAL_INTERVAL,
        REMOVAL_WINDOW,
    )
}

#[tokio::test(start_paused = true)]
async fn absent_release_converges_without_delete_calls() {
    let cluster = Arc::new(common::FakeCluster::default());
    let driver = Arc::new(common::FakeDriver::default());

    let outcome = deleter(&cluster, &driver)
        .run(&target(), INTERVAL, Instant::now() + Duration::from_secs(300))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Converged);
    assert_eq!(cluster.release_deletes.load(Ordering::SeqCst), 0);
    assert_eq!(driver.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn deletion_that_converges_never_escalates() {
    let cluster = Arc::new(common::FakeCluster::with_release(
        common::release("podinfo", "apps"),
    ));
    let driver = Arc::new(common::FakeDriver::default());

    let outcome = deleter(&cluster, &driver)
        .run(&target(), INTERVAL, Instant::now() + Duration::from_secs(300))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Converged);
    assert_eq!(cluster.release_deletes.load(Ordering::SeqCst), 1);
    assert!(cluster.patches.lock().await.is_empty());
    assert_eq!(driver.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn stuck_release_escalates_through_finalizer_then_uninstall() {
    let cluster = Arc::new(common::FakeCluster::with_blocked_release(
        common::release_with_finalizers(
            "podinfo",
            "apps",
            &[HELM_RELEASE_FINALIZER, "protect.io/keep"],
        ),
    ));
    let driver = Arc::new(common::FakeDriver::default());

    let start = Instant::now();
    let outcome = deleter(&cluster, &driver)
        .run(&target(), INTERVAL, start + Duration::from_secs(300))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::EscalatedAndCleaned);
    assert_eq!(driver.calls.load(Ordering::SeqCst), 1);

    // Only the blocking token was stripped; foreign finalizers survive.
    let patches = cluster.patches.lock().await;
    assert_eq!(patches.len(), 1);
    assert_eq!(
        patches[0]["metadata"]["finalizers"],
        serde_json::json!(["protect.io/keep"])
    );

    // Both removal windows ran to exhaustion, then the fallback fired; the
    // invocation stays bounded by them rather than the overall timeout.
    let elapsed = start.elapsed();
    assert!(elapsed >= 2 * REMOVAL_WINDOW);
    assert!(elapsed < 2 * REMOVAL_WINDOW + Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn failed_fallback_is_swallowed() {
    let cluster = Arc::new(common::FakeCluster::with_blocked_release(
        common::release_with_finalizers(
            "podinfo",
            "apps",
            &[HELM_RELEASE_FINALIZER],
        ),
    ));
    let driver = Arc::new(common::FakeDriver::failing());

    let outcome = deleter(&cluster, &driver)
        .run(&target(), INTERVAL, Instant::now() + Duration::from_secs(300))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::EscalatedAndFailed);
    assert_eq!(driver.calls.load(Ordering::SeqCst), 1);
}
