//! Shared utilities for lifecycle integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use graceful_shutdown::lifecycle::{BoxError, ShutdownCoordinator, ShutdownState, Signal};
use tokio::sync::watch;

/// Wait until the coordinator publishes `wanted`.
pub async fn wait_for_state(rx: &mut watch::Receiver<ShutdownState>, wanted: ShutdownState) {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == wanted))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {:?}", wanted))
        .expect("state channel closed");
}

/// Poll `check` until it holds or a few seconds pass.
#[allow(dead_code)]
pub async fn eventually<F: Fn() -> bool>(check: F) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

/// Deliver `signal` to this process.
#[allow(dead_code)]
pub fn raise(signal: Signal) {
    signal_hook::low_level::raise(signal.as_raw()).expect("failed to raise signal");
}

/// A coordinator whose forced exit never terminates the test process.
pub fn coordinator<I: IntoIterator<Item = Signal>>(terminate: I) -> ShutdownCoordinator {
    ShutdownCoordinator::new(terminate)
        .expect("valid terminate signals")
        .with_exit_action(|code| panic!("unexpected forced exit with code {}", code))
}

/// Register a cleanup task that counts its invocations.
#[allow(dead_code)]
pub fn counting_cleanup(coordinator: &mut ShutdownCoordinator, name: &str, counter: Arc<AtomicUsize>) {
    coordinator.register_cleanup(name, move |_| async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<(), BoxError>(())
    });
}
