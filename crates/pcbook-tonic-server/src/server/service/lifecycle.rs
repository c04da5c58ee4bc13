//! Admission control and graceful shutdown for in-flight calls.
//!
//! Every handler opens a [`CallGuard`] through [`Lifecycle::begin_call`]
//! before doing any work and keeps it alive until the call has fully finished,
//! including any response stream it spawned. Shutdown runs in three phases:
//!
//! 1. refuse new calls with `UNAVAILABLE`;
//! 2. wait (bounded by the configured timeout) for open guards to drop;
//! 3. cancel the shared token, which every call observes at its next
//!    cancellation checkpoint.

use crate::server::telemetry::{
    decrement_calls_inflight, increment_call_errors, increment_calls, increment_calls_inflight,
    record_call_duration,
};
use core::time::Duration;
use pcbook_tonic_core::{Error, Result};
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct Lifecycle {
    shutdown_token: CancellationToken,
    shutting_down: AtomicBool,
    inflight: AtomicUsize,
    shutdown_timeout: Duration,
}

impl Lifecycle {
    pub fn new(shutdown_timeout: Duration) -> Self {
        Self {
            shutdown_token: CancellationToken::new(),
            shutting_down: AtomicBool::new(false),
            inflight: AtomicUsize::new(0),
            shutdown_timeout,
        }
    }

    /// Admits a new call, or refuses it with [`Error::ServiceShutdown`] once
    /// shutdown has begun.
    pub fn begin_call(self: &Arc<Self>, method: &'static str) -> Result<CallGuard> {
        // Count first so a concurrent shutdown either sees this call or we see
        // its flag.
        self.inflight.fetch_add(1, Ordering::SeqCst);
        if self.is_shutting_down() {
            self.inflight.fetch_sub(1, Ordering::SeqCst);
            increment_call_errors(method);
            return Err(Error::ServiceShutdown);
        }

        increment_calls(method);
        increment_calls_inflight(method);

        Ok(CallGuard {
            lifecycle: Arc::clone(self),
            method,
            start: Instant::now(),
        })
    }

    /// A token for one call. It is cancelled when the service shuts down and
    /// can be cancelled on its own without affecting other calls.
    pub fn call_token(&self) -> CancellationToken {
        self.shutdown_token.child_token()
    }

    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::SeqCst)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    pub async fn shutdown(&self) {
        // === Phase 0: Stop accepting new calls ===
        #[cfg(feature = "tracing")]
        tracing::info!("Refusing new calls");
        self.shutting_down.store(true, Ordering::SeqCst);

        // === Phase 1: Wait for in-flight calls to drain ===
        #[cfg(feature = "tracing")]
        tracing::info!("Draining in-flight calls ({} active)", self.inflight());
        let drained = timeout(self.shutdown_timeout, async {
            while self.inflight() > 0 {
                sleep(Duration::from_millis(100)).await;
            }
        })
        .await;

        match drained {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("All in-flight calls drained");
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "Graceful drain timed out ({} calls still active)",
                    self.inflight()
                );
            }
        }

        // === Phase 2: Cancel whatever is left ===
        #[cfg(feature = "tracing")]
        tracing::debug!("Cancelling remaining calls via shutdown token");
        self.shutdown_token.cancel();
    }
}

/// Keeps one call counted as in flight until dropped.
#[derive(Debug)]
pub struct CallGuard {
    lifecycle: Arc<Lifecycle>,
    method: &'static str,
    start: Instant,
}

impl CallGuard {
    /// Records the call's outcome.
    pub fn observe<T>(&self, result: &Result<T>) {
        if let Err(_e) = result {
            increment_call_errors(self.method);
            #[cfg(feature = "tracing")]
            tracing::warn!(method = self.method, "Call failed: {}", _e);
        }
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.lifecycle.inflight.fetch_sub(1, Ordering::SeqCst);
        decrement_calls_inflight(self.method);
        record_call_duration(self.method, self.start.elapsed().as_secs_f64() * 1000.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guards_track_inflight_calls() {
        let lifecycle = Arc::new(Lifecycle::new(Duration::from_secs(1)));

        let first = lifecycle.begin_call("CreateLaptop").unwrap();
        let second = lifecycle.begin_call("SearchLaptop").unwrap();
        assert_eq!(lifecycle.inflight(), 2);

        drop(first);
        assert_eq!(lifecycle.inflight(), 1);
        drop(second);
        assert_eq!(lifecycle.inflight(), 0);
    }

    #[test]
    fn refused_call_leaves_no_inflight_slot() {
        let lifecycle = Arc::new(Lifecycle::new(Duration::from_secs(1)));
        lifecycle.shutting_down.store(true, Ordering::SeqCst);

        assert!(matches!(
            lifecycle.begin_call("SearchLaptop"),
            Err(Error::ServiceShutdown)
        ));
        assert_eq!(lifecycle.inflight(), 0);
    }

    #[tokio::test]
    async fn shutdown_refuses_new_calls_and_cancels_tokens() {
        let lifecycle = Arc::new(Lifecycle::new(Duration::from_secs(1)));
        let token = lifecycle.call_token();

        lifecycle.shutdown().await;

        assert!(lifecycle.is_shutting_down());
        assert!(token.is_cancelled());
        assert!(matches!(
            lifecycle.begin_call("CreateLaptop"),
            Err(Error::ServiceShutdown)
        ));
        assert_eq!(lifecycle.inflight(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_waits_for_open_calls() {
        let lifecycle = Arc::new(Lifecycle::new(Duration::from_secs(5)));
        let guard = lifecycle.begin_call("RateLaptop").unwrap();
        let token = lifecycle.call_token();

        let release = tokio::spawn(async move {
            sleep(Duration::from_millis(150)).await;
            drop(guard);
        });

        lifecycle.shutdown().await;
        release.await.unwrap();

        assert_eq!(lifecycle.inflight(), 0);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn shutdown_cancels_stragglers_after_timeout() {
        let lifecycle = Arc::new(Lifecycle::new(Duration::from_millis(50)));
        let _stuck = lifecycle.begin_call("UploadImage").unwrap();
        let token = lifecycle.call_token();

        lifecycle.shutdown().await;

        assert_eq!(lifecycle.inflight(), 1);
        assert!(token.is_cancelled());
    }
}
