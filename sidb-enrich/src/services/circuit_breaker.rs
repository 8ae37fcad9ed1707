//! Circuit breaker guarding one upstream source
//!
//! # States
//! - Closed: calls pass through, consecutive failures are counted
//! - Open: calls are short-circuited and the fallback is returned
//! - Half-Open: a single probe call is admitted after the cooldown
//!
//! # Transitions
//! ```text
//! Closed    -> Open:      consecutive_failures >= failure_threshold
//! Open      -> Half-Open: now - opened_at >= reset_timeout (next call probes)
//! Half-Open -> Closed:    probe succeeds (failures reset to 0)
//! Half-Open -> Open:      probe fails (opened_at = now, cooldown restarts)
//! ```
//!
//! The breaker models the health of the upstream, not of any one caller, so
//! concurrent runs of the same source share one instance.

use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }
}

impl Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breaker tuning, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive failures that open the breaker (0 is treated as 1)
    pub failure_threshold: u32,
    /// Cooldown before a half-open probe is allowed
    pub reset_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            reset_timeout: Duration::from_millis(300_000),
        }
    }
}

/// Point-in-time view of a breaker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub opened_at: Option<Instant>,
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_started: Option<Instant>,
}

/// How a call was admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Normal,
    Probe,
    Rejected,
}

/// Failure-tracking state machine around a fallible async operation
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config: BreakerConfig {
                failure_threshold: config.failure_threshold.max(1),
                ..config
            },
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_started: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> BreakerConfig {
        self.config
    }

    pub async fn state(&self) -> BreakerState {
        self.inner.lock().await.state
    }

    pub async fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock().await;
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            opened_at: inner.opened_at,
        }
    }

    /// Run `operation` through the breaker
    ///
    /// While open, `operation` is never invoked and `Ok(fallback)` is returned
    /// immediately; callers must read the fallback as "try again later", not
    /// as "does not exist". In closed and half-open attempts an operation
    /// error is recorded and then returned unchanged.
    pub async fn execute<T, E, F, Fut>(&self, operation: F, fallback: T) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let admission = self.admit().await;
        if admission == Admission::Rejected {
            debug!(breaker = %self.name, "Circuit open, returning fallback");
            return Ok(fallback);
        }
        let probe = admission == Admission::Probe;

        // Lock is released while the operation runs
        match operation().await {
            Ok(value) => {
                self.record_success(probe).await;
                Ok(value)
            }
            Err(err) => {
                self.record_failure(probe, err.to_string()).await;
                Err(err)
            }
        }
    }

    async fn admit(&self) -> Admission {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();

        match inner.state {
            BreakerState::Closed => Admission::Normal,
            BreakerState::Open => {
                let opened_at = inner.opened_at.unwrap_or(now);
                if now.duration_since(opened_at) >= self.config.reset_timeout {
                    inner.state = BreakerState::HalfOpen;
                    inner.probe_started = Some(now);
                    info!(
                        breaker = %self.name,
                        from = "open",
                        to = "half_open",
                        "Circuit breaker admitting probe"
                    );
                    Admission::Probe
                } else {
                    Admission::Rejected
                }
            }
            BreakerState::HalfOpen => {
                // A probe abandoned by its caller must not wedge the breaker
                let stale = inner
                    .probe_started
                    .map(|started| now.duration_since(started) >= self.config.reset_timeout)
                    .unwrap_or(true);
                if stale {
                    inner.probe_started = Some(now);
                    Admission::Probe
                } else {
                    Admission::Rejected
                }
            }
        }
    }

    async fn record_success(&self, probe: bool) {
        let mut inner = self.inner.lock().await;

        match inner.state {
            BreakerState::HalfOpen if probe => {
                inner.state = BreakerState::Closed;
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                inner.probe_started = None;
                info!(
                    breaker = %self.name,
                    from = "half_open",
                    to = "closed",
                    "Circuit breaker closed after successful probe"
                );
            }
            BreakerState::Closed => inner.consecutive_failures = 0,
            // Late result of a call admitted before the breaker opened
            BreakerState::Open | BreakerState::HalfOpen => {}
        }
    }

    async fn record_failure(&self, probe: bool, err: String) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        match inner.state {
            BreakerState::HalfOpen if probe => {
                inner.state = BreakerState::Open;
                inner.opened_at = Some(Instant::now());
                inner.probe_started = None;
                warn!(
                    breaker = %self.name,
                    from = "half_open",
                    to = "open",
                    failures = inner.consecutive_failures,
                    error = %err,
                    "Circuit breaker probe failed, reopening"
                );
            }
            BreakerState::Closed if inner.consecutive_failures >= self.config.failure_threshold => {
                inner.state = BreakerState::Open;
                inner.opened_at = Some(Instant::now());
                warn!(
                    breaker = %self.name,
                    from = "closed",
                    to = "open",
                    failures = inner.consecutive_failures,
                    error = %err,
                    "Circuit breaker opened"
                );
            }
            _ => {
                debug!(
                    breaker = %self.name,
                    failures = inner.consecutive_failures,
                    error = %err,
                    "Circuit breaker recorded failure"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn breaker(threshold: u32, reset_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            BreakerConfig {
                failure_threshold: threshold,
                reset_timeout: Duration::from_millis(reset_ms),
            },
        )
    }

    async fn fail(cb: &CircuitBreaker, calls: &AtomicUsize) -> Result<Option<u32>, String> {
        cb.execute(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<Option<u32>, _>("boom".to_string())
            },
            None,
        )
        .await
    }

    async fn succeed(cb: &CircuitBreaker, calls: &AtomicUsize) -> Result<Option<u32>, String> {
        cb.execute(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(Some(7))
            },
            None,
        )
        .await
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_on_threshold_and_short_circuits() {
        let cb = breaker(3, 1000);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            assert!(fail(&cb, &calls).await.is_err());
        }
        assert_eq!(cb.state().await, BreakerState::Open);

        // Fourth call before the cooldown: not invoked, fallback returned
        let result = cb
            .execute(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(Some(1))
                },
                Some(99),
            )
            .await;
        assert_eq!(result, Ok(Some(99)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_failure_count() {
        let cb = breaker(3, 1000);
        let calls = AtomicUsize::new(0);

        fail(&cb, &calls).await.ok();
        fail(&cb, &calls).await.ok();
        succeed(&cb, &calls).await.ok();
        fail(&cb, &calls).await.ok();
        fail(&cb, &calls).await.ok();

        let snapshot = cb.snapshot().await;
        assert_eq!(snapshot.state, BreakerState::Closed);
        assert_eq!(snapshot.consecutive_failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_probe_success_closes() {
        let cb = breaker(3, 1000);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            fail(&cb, &calls).await.ok();
        }
        tokio::time::advance(Duration::from_millis(1000)).await;

        assert_eq!(succeed(&cb, &calls).await, Ok(Some(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(cb.state().await, BreakerState::Closed);

        // Counter was reset: two more failures keep it closed, the third opens
        fail(&cb, &calls).await.ok();
        fail(&cb, &calls).await.ok();
        assert_eq!(cb.state().await, BreakerState::Closed);
        fail(&cb, &calls).await.ok();
        assert_eq!(cb.state().await, BreakerState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_restarts_cooldown() {
        let cb = breaker(3, 1000);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            fail(&cb, &calls).await.ok();
        }
        let first_open = cb.snapshot().await.opened_at.unwrap();

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(fail(&cb, &calls).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        let snapshot = cb.snapshot().await;
        assert_eq!(snapshot.state, BreakerState::Open);
        assert!(snapshot.opened_at.unwrap() > first_open);

        // Not yet a full cooldown after the failed probe
        tokio::time::advance(Duration::from_millis(999)).await;
        assert_eq!(succeed(&cb, &calls).await, Ok(None));
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(succeed(&cb, &calls).await, Ok(Some(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_one_probe_while_half_open() {
        let cb = breaker(1, 1000);
        let calls = AtomicUsize::new(0);

        fail(&cb, &calls).await.ok();
        tokio::time::advance(Duration::from_millis(1000)).await;

        // Admit the probe but keep it in flight
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let probe = cb.execute(
            || async {
                release_rx.await.ok();
                Ok::<_, String>(Some(1))
            },
            None,
        );
        tokio::pin!(probe);
        assert!(futures::poll!(probe.as_mut()).is_pending());
        assert_eq!(cb.state().await, BreakerState::HalfOpen);

        assert_eq!(succeed(&cb, &calls).await, Ok(None));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        release_tx.send(()).ok();
        assert_eq!(probe.await, Ok(Some(1)));
        assert_eq!(cb.state().await, BreakerState::Closed);
    }

    #[test]
    fn test_zero_threshold_treated_as_one() {
        let cb = breaker(0, 10);
        assert_eq!(cb.config().failure_threshold, 1);
    }
}
