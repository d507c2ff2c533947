//! Forced-exit deadline.
//!
//! # Responsibilities
//! - Run an expiry action once, a fixed duration after arming
//! - Let the owner disarm it before it fires
//!
//! # Design Decisions
//! - The timer lives on its own OS thread, so it still fires when cleanup
//!   code blocks every runtime worker
//! - Firing and disarming race for the same slot; exactly one of them wins
//!   and the loser observes it

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

type ExpiryAction = Box<dyn FnOnce() + Send>;

const ARMED: u8 = 0;
const DISARMED: u8 = 1;
const FIRED: u8 = 2;

/// Shared between the owner and the watchdog. `state` moves once, from
/// `ARMED` to either `DISARMED` or `FIRED`.
struct Slot {
    state: AtomicU8,
    action: Mutex<Option<ExpiryAction>>,
}

impl Slot {
    fn settle(&self, to: u8) -> bool {
        self.state
            .compare_exchange(ARMED, to, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn take(&self) -> Option<ExpiryAction> {
        self.action
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn fire(&self) {
        if self.settle(FIRED) {
            if let Some(action) = self.take() {
                action();
            }
        }
    }
}

/// One-shot timer that runs its expiry action unless disarmed first.
pub struct ForceDeadline {
    slot: Arc<Slot>,
    wake: Option<mpsc::Sender<()>>,
}

impl ForceDeadline {
    /// Schedule `on_expire` to run once, `duration` from now.
    pub fn arm<F>(duration: Duration, on_expire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let slot = Arc::new(Slot {
            state: AtomicU8::new(ARMED),
            action: Mutex::new(Some(Box::new(on_expire))),
        });
        let (wake, sleeper) = mpsc::channel::<()>();

        let watchdog = slot.clone();
        let spawned = thread::Builder::new()
            .name("shutdown-deadline".into())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = sleeper.recv_timeout(duration) {
                    watchdog.fire();
                }
            });

        if let Err(e) = spawned {
            tracing::warn!(error = %e, "Failed to spawn deadline thread, using runtime timer");
            Self::arm_on_runtime(slot.clone(), duration);
        }

        tracing::debug!(deadline_ms = duration.as_millis() as u64, "Shutdown deadline armed");

        Self {
            slot,
            wake: Some(wake),
        }
    }

    fn arm_on_runtime(slot: Arc<Slot>, duration: Duration) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(duration).await;
                    slot.fire();
                });
            }
            Err(_) => {
                tracing::error!("No timer available, shutdown deadline will not be enforced");
            }
        }
    }

    /// Cancel the pending expiry.
    ///
    /// Returns `true` if this call stopped the action from running, `false`
    /// if it already fired or was disarmed earlier.
    pub fn disarm(&mut self) -> bool {
        let won = self.slot.settle(DISARMED);
        if won {
            drop(self.slot.take());
            tracing::debug!("Shutdown deadline disarmed");
        }
        // Dropping the sender wakes the watchdog thread.
        self.wake.take();
        won
    }

    /// Whether the deadline won the race (the action has run or is running).
    pub fn has_fired(&self) -> bool {
        self.slot.state.load(Ordering::SeqCst) == FIRED
    }
}

impl Drop for ForceDeadline {
    fn drop(&mut self) {
        self.disarm();
    }
}
