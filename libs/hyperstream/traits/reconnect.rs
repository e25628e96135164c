use std::time::Duration;

/// Trait for defining reconnection strategies
///
/// Implement this trait to control how long a faulted client waits
/// before its next connection attempt.
pub trait ReconnectionStrategy: Send + Sync {
    /// Get the delay before the next reconnection attempt
    ///
    /// # Arguments
    /// * `attempt` - The reconnection attempt number (0-indexed, reset on success)
    ///
    /// # Returns
    /// * `Some(duration)` - Wait this long before reconnecting
    /// * `None` - Stop reconnecting
    fn next_delay(&self, attempt: usize) -> Option<Duration>;

    /// Check if we should continue reconnecting
    fn should_reconnect(&self, attempt: usize) -> bool;
}

/// Linear backoff reconnection strategy
///
/// Every consecutive failure adds a fixed increment to the wait:
/// `min(min_delay + attempt * increment, max_delay)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearBackoff {
    min_delay: Duration,
    max_delay: Duration,
    increment: Duration,
    max_attempts: Option<usize>,
}

impl LinearBackoff {
    /// Create a new linear backoff strategy
    ///
    /// # Arguments
    /// * `min_delay` - The delay before the first reconnect
    /// * `max_delay` - The upper bound for any delay
    /// * `increment` - Added to the delay after every failed attempt
    /// * `max_attempts` - Maximum number of attempts (None = unlimited)
    pub fn new(
        min_delay: Duration,
        max_delay: Duration,
        increment: Duration,
        max_attempts: Option<usize>,
    ) -> Self {
        Self {
            min_delay,
            max_delay,
            increment,
            max_attempts,
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn increment(&self) -> Duration {
        self.increment
    }

    /// Delay after `failures` consecutive failed attempts, ignoring `max_attempts`
    pub fn delay_after(&self, failures: usize) -> Duration {
        let failures = u32::try_from(failures).unwrap_or(u32::MAX);
        self.increment
            .checked_mul(failures)
            .and_then(|step| self.min_delay.checked_add(step))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Next interval after `current`, capped at the maximum
    pub fn advance(&self, current: Duration) -> Duration {
        current
            .checked_add(self.increment)
            .map_or(self.max_delay, |next| next.min(self.max_delay))
    }
}

impl ReconnectionStrategy for LinearBackoff {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }
        Some(self.delay_after(attempt))
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// The single current backoff interval owned by a stream client
///
/// Starts at the strategy minimum, grows by one increment per failed
/// attempt and snaps back to the minimum on any successful connection.
#[derive(Debug, Clone)]
pub struct BackoffState {
    policy: LinearBackoff,
    current: Duration,
    failures: usize,
}

impl BackoffState {
    pub fn new(policy: LinearBackoff) -> Self {
        let current = policy.min_delay();
        Self {
            policy,
            current,
            failures: 0,
        }
    }

    /// Interval the next retry will wait
    #[inline]
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Number of consecutive failed attempts since the last reset
    #[inline]
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Whether the policy still allows another attempt
    pub fn can_retry(&self) -> bool {
        self.policy.should_reconnect(self.failures)
    }

    /// Record a failed attempt and grow the interval
    pub fn advance(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.current = self.policy.advance(self.current);
        self.current
    }

    /// Back to the minimum interval
    pub fn reset(&mut self) {
        self.failures = 0;
        self.current = self.policy.min_delay();
    }

    pub fn policy(&self) -> &LinearBackoff {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> LinearBackoff {
        LinearBackoff::new(
            Duration::from_secs(5),
            Duration::from_secs(20),
            Duration::from_secs(5),
            None,
        )
    }

    #[test]
    fn test_delay_grows_by_increment() {
        let p = policy();
        assert_eq!(p.next_delay(0), Some(Duration::from_secs(5)));
        assert_eq!(p.next_delay(1), Some(Duration::from_secs(10)));
        assert_eq!(p.next_delay(2), Some(Duration::from_secs(15)));
        assert_eq!(p.next_delay(3), Some(Duration::from_secs(20)));
        assert_eq!(p.next_delay(50), Some(Duration::from_secs(20)));
    }

    #[test]
    fn test_delay_does_not_overflow() {
        let p = LinearBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(60),
            Duration::from_secs(u64::MAX / 2),
            None,
        );
        assert_eq!(p.delay_after(usize::MAX), Duration::from_secs(60));
        assert_eq!(p.advance(Duration::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_max_attempts() {
        let p = LinearBackoff::new(
            Duration::from_millis(10),
            Duration::from_millis(100),
            Duration::from_millis(10),
            Some(2),
        );
        assert!(p.next_delay(1).is_some());
        assert!(p.next_delay(2).is_none());
    }

    #[test]
    fn test_state_advance_and_reset() {
        let mut state = BackoffState::new(policy());
        assert_eq!(state.current(), Duration::from_secs(5));

        state.advance();
        state.advance();
        assert_eq!(state.current(), Duration::from_secs(15));
        assert_eq!(state.failures(), 2);

        state.advance();
        state.advance();
        assert_eq!(state.current(), Duration::from_secs(20));

        state.reset();
        assert_eq!(state.current(), Duration::from_secs(5));
        assert_eq!(state.failures(), 0);
    }

    #[test]
    fn test_state_matches_closed_form() {
        let p = policy();
        let mut state = BackoffState::new(p.clone());
        for n in 0..10 {
            assert_eq!(state.current(), p.delay_after(n), "after {} failures", n);
            state.advance();
        }
    }
}
