//! Shared reconnect/backoff policy for push-consuming clients.
//!
//! Every client that holds a live delivery session reconnects with the same
//! exponential backoff schedule, and after the final attempt switches to
//! poll-only mode instead of retrying forever. The server serves this policy
//! document (`GET /reconnect-policy`) so clients cannot drift.

use std::time::Duration;

use serde::Serialize;

/// Exponential backoff schedule with a hard attempt limit.
#[derive(Debug, Clone, Serialize)]
pub struct ReconnectPolicy {
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Multiplier applied per attempt.
    pub multiplier: u32,
    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Attempts before the client must fall back to polling.
    pub max_attempts: u32,
}

/// What the client should do after a failed connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectStep {
    /// Wait this long, then try to reconnect.
    RetryAfter(Duration),
    /// Attempts exhausted; stop reconnecting and rely on polling.
    FallBackToPolling,
}

impl ReconnectPolicy {
    /// Decide the next step after `attempt` failed connection attempts
    /// (1-based: pass 1 after the first failure).
    pub fn next_step(&self, attempt: u32) -> ReconnectStep {
        if attempt > self.max_attempts {
            return ReconnectStep::FallBackToPolling;
        }
        let exp = attempt.saturating_sub(1);
        let factor = (self.multiplier as u64).saturating_pow(exp.min(32));
        let delay = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        ReconnectStep::RetryAfter(Duration::from_millis(delay))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 500,
            multiplier: 2,
            max_delay_ms: 30_000,
            max_attempts: 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_exponentially_from_base() {
        let policy = ReconnectPolicy::default();
        assert_eq!(
            policy.next_step(1),
            ReconnectStep::RetryAfter(Duration::from_millis(500))
        );
        assert_eq!(
            policy.next_step(2),
            ReconnectStep::RetryAfter(Duration::from_millis(1000))
        );
        assert_eq!(
            policy.next_step(3),
            ReconnectStep::RetryAfter(Duration::from_millis(2000))
        );
    }

    #[test]
    fn delay_is_capped() {
        let policy = ReconnectPolicy {
            base_delay_ms: 500,
            multiplier: 10,
            max_delay_ms: 4_000,
            max_attempts: 10,
        };
        assert_eq!(
            policy.next_step(5),
            ReconnectStep::RetryAfter(Duration::from_millis(4_000))
        );
    }

    #[test]
    fn exhausted_attempts_fall_back_to_polling() {
        let policy = ReconnectPolicy::default();
        assert!(matches!(
            policy.next_step(policy.max_attempts),
            ReconnectStep::RetryAfter(_)
        ));
        assert_eq!(
            policy.next_step(policy.max_attempts + 1),
            ReconnectStep::FallBackToPolling
        );
    }

    #[test]
    fn huge_attempt_counts_do_not_overflow() {
        let policy = ReconnectPolicy {
            base_delay_ms: u64::MAX / 2,
            multiplier: u32::MAX,
            max_delay_ms: 1_000,
            max_attempts: u32::MAX,
        };
        assert_eq!(
            policy.next_step(u32::MAX),
            ReconnectStep::RetryAfter(Duration::from_millis(1_000))
        );
    }
}
