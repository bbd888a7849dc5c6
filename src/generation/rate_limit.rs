//! Outbound Rate Budget
//!
//! Fixed-ceiling window counter shared by every request in the process.
//! Consulted before each outbound attempt, retries and fallbacks included.
//!
//! ```text
//! no window / now >= start + window  --> new window, count = 1, Allowed
//! count < limit                      --> count += 1, Allowed
//! otherwise                          --> Denied
//! ```

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

/// Time source, injectable for deterministic tests
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Result of an acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    Allowed,
    Denied,
}

impl Acquire {
    pub fn is_allowed(self) -> bool {
        self == Self::Allowed
    }
}

#[derive(Debug)]
struct WindowState {
    window_start: Option<Instant>,
    count: u32,
}

/// Snapshot for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBudgetStats {
    pub count: u32,
    pub limit: u32,
    pub window: Duration,
}

/// Shared rate budget handle
pub type SharedRateBudget = Arc<RateBudget>;

/// Thread-safe rate budget.
///
/// The check and the increment happen under one lock, so two concurrent
/// requests can never both observe `count < limit` and overshoot.
pub struct RateBudget {
    limit: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<WindowState>,
}

impl std::fmt::Debug for RateBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateBudget")
            .field("limit", &self.limit)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl RateBudget {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::with_clock(limit, window, Arc::new(SystemClock))
    }

    pub fn with_clock(limit: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            limit,
            window,
            clock,
            state: Mutex::new(WindowState {
                window_start: None,
                count: 0,
            }),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.limit, Duration::from_secs(config.window_secs))
    }

    /// Try to take one slot from the budget
    pub fn try_acquire(&self) -> Acquire {
        let now = self.clock.now();
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let expired = match state.window_start {
            None => true,
            Some(start) => now.saturating_duration_since(start) >= self.window,
        };

        if expired {
            state.window_start = Some(now);
            state.count = 1;
            return Acquire::Allowed;
        }

        if state.count < self.limit {
            state.count += 1;
            Acquire::Allowed
        } else {
            tracing::debug!(
                count = state.count,
                limit = self.limit,
                "Rate budget exhausted for current window"
            );
            Acquire::Denied
        }
    }

    pub fn stats(&self) -> RateBudgetStats {
        let state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        RateBudgetStats {
            count: state.count,
            limit: self.limit,
            window: self.window,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ManualClock;
    use super::*;

    fn budget(clock: &Arc<ManualClock>) -> RateBudget {
        RateBudget::with_clock(5, Duration::from_secs(60), clock.clone())
    }

    #[test]
    fn test_sixth_acquisition_denied() {
        let clock = ManualClock::new();
        let budget = budget(&clock);

        for _ in 0..5 {
            assert_eq!(budget.try_acquire(), Acquire::Allowed);
        }
        assert_eq!(budget.try_acquire(), Acquire::Denied);
        assert_eq!(budget.stats().count, 5);
    }

    #[test]
    fn test_window_resets_after_elapsed() {
        let clock = ManualClock::new();
        let budget = budget(&clock);

        for _ in 0..5 {
            budget.try_acquire();
        }
        clock.advance(Duration::from_secs(59));
        assert_eq!(budget.try_acquire(), Acquire::Denied);

        clock.advance(Duration::from_secs(1));
        assert_eq!(budget.try_acquire(), Acquire::Allowed);
        assert_eq!(budget.stats().count, 1);
    }

    #[test]
    fn test_window_anchored_at_first_acquisition() {
        let clock = ManualClock::new();
        let budget = budget(&clock);

        budget.try_acquire();
        clock.advance(Duration::from_secs(30));
        for _ in 0..4 {
            assert!(budget.try_acquire().is_allowed());
        }
        // 30s after the later calls, but 60s after the window opened
        clock.advance(Duration::from_secs(30));
        assert!(budget.try_acquire().is_allowed());
        assert_eq!(budget.stats().count, 1);
    }

    #[test]
    fn test_denied_does_not_consume() {
        let clock = ManualClock::new();
        let budget = RateBudget::with_clock(1, Duration::from_secs(60), clock.clone());

        assert!(budget.try_acquire().is_allowed());
        for _ in 0..10 {
            assert_eq!(budget.try_acquire(), Acquire::Denied);
        }
        assert_eq!(budget.stats().count, 1);
    }

    #[test]
    fn test_concurrent_acquisitions_never_overshoot() {
        let budget = Arc::new(RateBudget::new(5, Duration::from_secs(3600)));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let budget = Arc::clone(&budget);
                std::thread::spawn(move || budget.try_acquire().is_allowed())
            })
            .collect();

        let allowed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(allowed, 5);
        assert_eq!(budget.stats().count, 5);
    }
}
