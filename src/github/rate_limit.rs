//! Outbound quota tracking for the GitHub API.
//!
//! Calls are strictly sequential, so plain atomics are enough: the client
//! reads the quota before a call and records response headers after it.

use chrono::Utc;
use reqwest::header::HeaderMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

const UNKNOWN: i64 = -1;

/// Wait used when the host never told us when the window resets
const DEFAULT_WAIT: Duration = Duration::from_secs(60);

/// Longest single wait; GitHub windows are one hour
const MAX_WAIT: Duration = Duration::from_secs(3600);

#[derive(Debug)]
pub struct RateLimiter {
    floor: u32,
    remaining: AtomicI64,
    reset_epoch: AtomicI64,
    calls: AtomicU64,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(1)
    }
}

impl RateLimiter {
    /// `floor`: wait for the reset once remaining calls are at or below this
    pub fn new(floor: u32) -> Self {
        Self {
            floor,
            remaining: AtomicI64::new(UNKNOWN),
            reset_epoch: AtomicI64::new(UNKNOWN),
            calls: AtomicU64::new(0),
        }
    }

    pub fn remaining(&self) -> Option<u32> {
        let value = self.remaining.load(Ordering::Relaxed);
        (value >= 0).then(|| value.min(u32::MAX as i64) as u32)
    }

    pub fn reset_epoch(&self) -> Option<i64> {
        let value = self.reset_epoch.load(Ordering::Relaxed);
        (value >= 0).then_some(value)
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// How long to wait before the next call, if at all
    pub fn wait_duration(&self, now_epoch: i64) -> Option<Duration> {
        let remaining = self.remaining()?;
        if remaining > self.floor {
            return None;
        }
        let wait = match self.reset_epoch() {
            Some(reset) if reset > now_epoch => {
                // one extra second so we land after the window flips
                Duration::from_secs((reset - now_epoch) as u64 + 1)
            }
            Some(_) => Duration::from_secs(1),
            None => DEFAULT_WAIT,
        };
        Some(wait.min(MAX_WAIT))
    }

    /// Suspend until quota is available. Counts the upcoming call.
    pub async fn wait_if_needed(&self) {
        if let Some(wait) = self.wait_duration(Utc::now().timestamp()) {
            warn!(
                "Rate limit reached ({} remaining), waiting {}s",
                self.remaining().unwrap_or(0),
                wait.as_secs()
            );
            tokio::time::sleep(wait).await;
            // quota is unknown until the next response reports it
            self.remaining.store(UNKNOWN, Ordering::Relaxed);
        }
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Update quota from `x-ratelimit-*` response headers.
    /// Without headers the known remaining count is decremented instead.
    pub fn record(&self, headers: &HeaderMap) {
        let remaining = header_i64(headers, "x-ratelimit-remaining");
        let reset = header_i64(headers, "x-ratelimit-reset");

        match remaining {
            Some(value) => self.remaining.store(value.max(0), Ordering::Relaxed),
            None => {
                let current = self.remaining.load(Ordering::Relaxed);
                if current > 0 {
                    self.remaining.store(current - 1, Ordering::Relaxed);
                }
            }
        }
        if let Some(value) = reset {
            self.reset_epoch.store(value.max(0), Ordering::Relaxed);
        }

        debug!(
            "rate limit: remaining={:?} reset={:?}",
            self.remaining(),
            self.reset_epoch()
        );
    }
}

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(remaining: &str, reset: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert("x-ratelimit-remaining", HeaderValue::from_str(remaining).unwrap());
        map.insert("x-ratelimit-reset", HeaderValue::from_str(reset).unwrap());
        map
    }

    #[test]
    fn test_unknown_quota_never_waits() {
        let limiter = RateLimiter::new(1);
        assert_eq!(limiter.remaining(), None);
        assert_eq!(limiter.wait_duration(1_000), None);
    }

    #[test]
    fn test_record_reads_headers() {
        let limiter = RateLimiter::new(1);
        limiter.record(&headers("4999", "1700000000"));
        assert_eq!(limiter.remaining(), Some(4999));
        assert_eq!(limiter.reset_epoch(), Some(1_700_000_000));
        assert_eq!(limiter.wait_duration(1_600_000_000), None);
    }

    #[test]
    fn test_record_without_headers_decrements() {
        let limiter = RateLimiter::new(1);
        limiter.record(&headers("10", "0"));
        limiter.record(&HeaderMap::new());
        assert_eq!(limiter.remaining(), Some(9));
    }

    #[test]
    fn test_waits_until_reset_when_exhausted() {
        let limiter = RateLimiter::new(1);
        limiter.record(&headers("1", "1030"));
        assert_eq!(limiter.wait_duration(1000), Some(Duration::from_secs(31)));
    }

    #[test]
    fn test_wait_is_capped() {
        let limiter = RateLimiter::new(5);
        limiter.record(&headers("0", "999999"));
        assert_eq!(limiter.wait_duration(0), Some(MAX_WAIT));
    }

    #[test]
    fn test_past_reset_waits_briefly() {
        let limiter = RateLimiter::new(1);
        limiter.record(&headers("0", "500"));
        assert_eq!(limiter.wait_duration(1000), Some(Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_wait_if_needed_counts_calls() {
        let limiter = RateLimiter::new(1);
        limiter.wait_if_needed().await;
        limiter.wait_if_needed().await;
        assert_eq!(limiter.calls(), 2);
    }
}
