//! Forced-exit tests.
//!
//! A forced exit terminates the whole process, so each scenario re-runs this
//! test binary as a child filtered down to the one test, and the parent
//! inspects the child's exit status and output.

use std::process::{Command, Output};
use std::time::Duration;

use graceful_shutdown::lifecycle::{BoxError, ShutdownCoordinator, ShutdownState, Signal};

const SCENARIO_ENV: &str = "GRACEFUL_SHUTDOWN_SCENARIO";
const FORCED_EXIT_CODE: i32 = 42;

enum Trigger {
    Cancel,
    Interrupt,
}

fn scenario() -> Option<String> {
    std::env::var(SCENARIO_ENV).ok()
}

fn run_child(test_name: &str) -> Output {
    Command::new(std::env::current_exe().unwrap())
        .args([test_name, "--exact", "--nocapture", "--test-threads=1"])
        .env(SCENARIO_ENV, test_name)
        .output()
        .unwrap()
}

/// Drain a fast task `A` and a task `B` taking `slow`, printing progress
/// markers on stdout. Uses the real `std::process::exit` action.
fn run_scenario(deadline: Duration, slow: Duration, trigger: Trigger) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async move {
        let mut coordinator = ShutdownCoordinator::new([Signal::INT])
            .unwrap()
            .with_exit_code(FORCED_EXIT_CODE);
        coordinator.register_cleanup("A", |_| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            println!("cleanup A done");
            Ok::<(), BoxError>(())
        });
        coordinator.register_cleanup("B", move |_| async move {
            tokio::time::sleep(slow).await;
            println!("cleanup B done");
            Ok::<(), BoxError>(())
        });

        let token = coordinator.context();
        let mut state = coordinator.subscribe();
        let waiter = tokio::spawn(coordinator.wait(deadline));
        state
            .wait_for(|s| *s == ShutdownState::Listening)
            .await
            .unwrap();

        match trigger {
            Trigger::Cancel => token.cancel(),
            Trigger::Interrupt => {
                signal_hook::low_level::raise(Signal::INT.as_raw()).unwrap();
            }
        }

        waiter.await.unwrap();
        println!("drained");
    });
}

#[test]
fn test_interrupt_drains_within_deadline() {
    if scenario().is_some() {
        run_scenario(
            Duration::from_secs(5),
            Duration::from_millis(50),
            Trigger::Interrupt,
        );
        return;
    }

    let output = run_child("test_interrupt_drains_within_deadline");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0), "stdout: {}", stdout);
    assert!(stdout.contains("cleanup A done"));
    assert!(stdout.contains("cleanup B done"));
    assert!(stdout.contains("drained"));
}

#[test]
fn test_deadline_forces_exit() {
    if scenario().is_some() {
        run_scenario(
            Duration::from_millis(500),
            Duration::from_secs(10),
            Trigger::Cancel,
        );
        return;
    }

    let output = run_child("test_deadline_forces_exit");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        output.status.code(),
        Some(FORCED_EXIT_CODE),
        "stdout: {}",
        stdout
    );
    assert!(stdout.contains("cleanup A done"));
    assert!(!stdout.contains("cleanup B done"));
    assert!(!stdout.contains("drained"));
}

#[test]
fn test_deadline_forces_exit_after_signal() {
    if scenario().is_some() {
        run_scenario(
            Duration::from_millis(500),
            Duration::from_secs(10),
            Trigger::Interrupt,
        );
        return;
    }

    let output = run_child("test_deadline_forces_exit_after_signal");
    assert_eq!(output.status.code(), Some(FORCED_EXIT_CODE));
    assert!(!String::from_utf8_lossy(&output.stdout).contains("drained"));
}
