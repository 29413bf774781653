//! Parent-process liveness.
//!
//! No process-inspection crate is pulled in for this: on unix a zero-signal
//! `kill(pid, 0)` is enough to tell whether a pid is still alive, and that
//! syscall is declared directly via `extern "C"` rather than depending on
//! `libc` for one function. Non-unix targets get a no-op stub; the polling
//! interval itself is a tuning knob, not load-bearing to correctness.

use std::time::Duration;

use tracing::info;

/// Polling interval; not load-bearing to correctness, chosen short enough that a dead editor is noticed quickly.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[cfg(unix)]
mod unix {
    extern "C" {
        fn kill(pid: i32, sig: i32) -> i32;
    }

    /// `kill(pid, 0)` sends no signal and only checks whether the process
    /// could be signaled — the standard zero-signal liveness probe.
    pub fn is_alive(pid: i32) -> bool {
        unsafe { kill(pid, 0) == 0 }
    }
}

#[cfg(not(unix))]
mod unix {
    pub fn is_alive(_pid: i32) -> bool {
        true
    }
}

/// Polls `pid` until it disappears, then calls `on_dead`. Spawned once per
/// session from `initialize`'s `process_id`, if one was given.
pub async fn watch(pid: i32, on_dead: impl Fn() + Send + 'static) {
    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        if !unix::is_alive(pid) {
            info!(pid, "controlling process is gone, exiting");
            on_dead();
            return;
        }
    }
}
