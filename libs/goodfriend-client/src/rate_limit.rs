use parking_lot::RwLock;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Header carrying seconds until the rate limit window resets
pub const RATELIMIT_RESET_HEADER: &str = "ratelimit-reset";

/// Wait applied when a 429 carries neither reset header
pub const FALLBACK_RATE_LIMIT_DELAY: Duration = Duration::from_secs(60);

/// Longest hold a server can impose through the reset headers
pub const MAX_RATE_LIMIT_DELAY: Duration = Duration::from_secs(60 * 60);

/// Shared record of when the API will accept requests again
///
/// One clock is shared (behind an `Arc`) by every one-shot request and
/// every stream connection made through the same
/// [`ApiClient`](crate::rest::ApiClient).
#[derive(Debug, Default)]
pub struct RateLimitClock {
    reset_at: RwLock<Option<Instant>>,
}

impl RateLimitClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time left until requests are allowed again, `None` when not limited
    pub fn remaining(&self) -> Option<Duration> {
        let reset_at = (*self.reset_at.read())?;
        let now = Instant::now();
        if reset_at <= now {
            *self.reset_at.write() = None;
            return None;
        }
        Some(reset_at - now)
    }

    #[inline]
    pub fn is_limited(&self) -> bool {
        self.remaining().is_some()
    }

    /// Hold requests for `delay` from now, at most [`MAX_RATE_LIMIT_DELAY`]
    ///
    /// Never shortens an existing, later reset.
    pub fn limit_for(&self, delay: Duration) {
        let now = Instant::now();
        let candidate = now
            .checked_add(delay.min(MAX_RATE_LIMIT_DELAY))
            .unwrap_or(now);
        let mut reset_at = self.reset_at.write();
        if reset_at.map_or(true, |current| candidate > current) {
            *reset_at = Some(candidate);
        }
    }

    pub fn clear(&self) {
        *self.reset_at.write() = None;
    }

    /// Inspect a response and start a hold if it was a 429
    ///
    /// Returns the hold length when one was applied.
    pub fn observe(&self, status: StatusCode, headers: &HeaderMap) -> Option<Duration> {
        if status != StatusCode::TOO_MANY_REQUESTS {
            return None;
        }

        warn!("Rate limited by the API, holding further requests");
        let delay = reset_delay(headers);
        self.limit_for(delay);
        info!("Requests held for {:?}", delay);
        Some(delay)
    }
}

fn header_seconds(headers: &HeaderMap, name: &str) -> Option<Duration> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// `ratelimit-reset`, else `retry-after`, else the fallback, capped at
/// [`MAX_RATE_LIMIT_DELAY`]
pub fn reset_delay(headers: &HeaderMap) -> Duration {
    header_seconds(headers, RATELIMIT_RESET_HEADER)
        .or_else(|| header_seconds(headers, reqwest::header::RETRY_AFTER.as_str()))
        .unwrap_or(FALLBACK_RATE_LIMIT_DELAY)
        .min(MAX_RATE_LIMIT_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_reset_header_preferred() {
        let mut headers = HeaderMap::new();
        headers.insert(RATELIMIT_RESET_HEADER, HeaderValue::from_static("12"));
        headers.insert("retry-after", HeaderValue::from_static("30"));
        assert_eq!(reset_delay(&headers), Duration::from_secs(12));
    }

    #[test]
    fn test_retry_after_then_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("30"));
        assert_eq!(reset_delay(&headers), Duration::from_secs(30));

        let mut headers = HeaderMap::new();
        headers.insert(RATELIMIT_RESET_HEADER, HeaderValue::from_static("soon"));
        assert_eq!(reset_delay(&headers), FALLBACK_RATE_LIMIT_DELAY);
    }

    #[test]
    fn test_observe_only_limits_on_429() {
        let clock = RateLimitClock::new();
        assert_eq!(clock.observe(StatusCode::OK, &HeaderMap::new()), None);
        assert!(!clock.is_limited());

        let delay = clock.observe(StatusCode::TOO_MANY_REQUESTS, &HeaderMap::new());
        assert_eq!(delay, Some(FALLBACK_RATE_LIMIT_DELAY));
        assert!(clock.is_limited());
        assert!(clock.remaining().unwrap() <= FALLBACK_RATE_LIMIT_DELAY);
    }

    #[test]
    fn test_limit_never_shortened() {
        let clock = RateLimitClock::new();
        clock.limit_for(Duration::from_secs(120));
        clock.limit_for(Duration::from_secs(5));
        assert!(clock.remaining().unwrap() > Duration::from_secs(60));
    }

    #[test]
    fn test_huge_reset_header_is_capped() {
        let mut headers = HeaderMap::new();
        headers.insert(
            RATELIMIT_RESET_HEADER,
            HeaderValue::from_static("18446744073709551615"),
        );
        assert_eq!(reset_delay(&headers), MAX_RATE_LIMIT_DELAY);

        let clock = RateLimitClock::new();
        let delay = clock.observe(StatusCode::TOO_MANY_REQUESTS, &headers);
        assert_eq!(delay, Some(MAX_RATE_LIMIT_DELAY));
        assert!(clock.remaining().unwrap() <= MAX_RATE_LIMIT_DELAY);

        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("9999999999"));
        assert_eq!(reset_delay(&headers), MAX_RATE_LIMIT_DELAY);
    }

    #[test]
    fn test_limit_for_max_duration_does_not_panic() {
        let clock = RateLimitClock::new();
        clock.limit_for(Duration::MAX);
        let remaining = clock.remaining().unwrap();
        assert!(remaining > MAX_RATE_LIMIT_DELAY - Duration::from_secs(5));
        assert!(remaining <= MAX_RATE_LIMIT_DELAY);
    }

    #[test]
    fn test_expired_limit_clears() {
        let clock = RateLimitClock::new();
        clock.limit_for(Duration::ZERO);
        assert!(!clock.is_limited());
        assert!(clock.remaining().is_none());
    }
}
