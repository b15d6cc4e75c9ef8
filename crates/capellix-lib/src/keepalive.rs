//! Keepalive loop that keeps the controller in software lighting mode.
//!
//! The Commander Core falls back to its onboard lighting after a period of
//! host silence. [`KeepaliveGuard`] runs a background thread that wakes on a
//! fixed interval and calls a tick function; the session decides in that
//! tick whether anything needs to be resent.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::protocol::{KEEPALIVE_INTERVAL_MS, KEEPALIVE_THRESHOLD_MS};

/// Keepalive timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepaliveConfig {
    /// How often the loop wakes up.
    pub interval: Duration,
    /// Silence after which the last frame is resent.
    pub threshold: Duration,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(KEEPALIVE_INTERVAL_MS),
            threshold: Duration::from_millis(KEEPALIVE_THRESHOLD_MS),
        }
    }
}

/// Handle to a running keepalive thread.
///
/// [`stop`](Self::stop) signals the thread and joins it. Stopping twice, or
/// stopping a guard that never started, does nothing. Dropping the guard
/// stops it.
#[derive(Debug, Default)]
pub struct KeepaliveGuard {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl KeepaliveGuard {
    /// A guard with no thread behind it.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Spawn the loop. `tick` runs once per `interval` until stopped.
    pub fn start<F>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let spawned = thread::Builder::new()
            .name("capellix-keepalive".into())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => tick(),
                        // Stop requested or guard dropped.
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::debug!("keepalive stopped");
            });

        match spawned {
            Ok(handle) => Self {
                stop_tx: Some(stop_tx),
                handle: Some(handle),
            },
            Err(e) => {
                log::warn!("could not spawn keepalive thread: {e}");
                Self::idle()
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Signal the loop to stop and wait for it to exit.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("keepalive thread panicked");
            }
        }
    }
}

impl Drop for KeepaliveGuard {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn default_timing() {
        let cfg = KeepaliveConfig::default();
        assert_eq!(cfg.interval, Duration::from_secs(1));
        assert_eq!(cfg.threshold, Duration::from_secs(10));
    }

    #[test]
    fn ticks_until_stopped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let mut guard = KeepaliveGuard::start(Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(guard.is_running());

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while ticks.load(Ordering::SeqCst) < 3 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        guard.stop();
        assert!(!guard.is_running());

        let after_stop = ticks.load(Ordering::SeqCst);
        assert!(after_stop >= 3);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(ticks.load(Ordering::SeqCst), after_stop, "no ticks after stop");
    }

    #[test]
    fn stop_is_idempotent() {
        let mut guard = KeepaliveGuard::start(Duration::from_millis(5), || {});
        guard.stop();
        guard.stop();
        assert!(!guard.is_running());
    }

    #[test]
    fn stop_before_start_is_noop() {
        let mut guard = KeepaliveGuard::idle();
        assert!(!guard.is_running());
        guard.stop();
    }

    #[test]
    fn stop_does_not_wait_for_interval() {
        let mut guard = KeepaliveGuard::start(Duration::from_secs(60), || {});
        let started = std::time::Instant::now();
        guard.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
