use std::collections::HashMap;

use web_time::{Duration, Instant};

use crate::types::ConnectionId;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started_at: Instant,
}

/// Fixed-window message quota per connection.
#[derive(Debug)]
pub struct RateLimiter {
    max: u32,
    window: Duration,
    ledger: HashMap<ConnectionId, Window>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            ledger: HashMap::new(),
        }
    }

    /// Records one inbound message at `now` and reports whether it fits the quota.
    /// Rejected messages do not count against the window.
    pub fn check(&mut self, id: &str, now: Instant) -> bool {
        match self.ledger.get_mut(id) {
            Some(entry) if now.saturating_duration_since(entry.started_at) <= self.window => {
                if entry.count >= self.max {
                    return false;
                }
                entry.count += 1;
                true
            }
            _ => {
                self.ledger.insert(
                    id.to_string(),
                    Window {
                        count: 1,
                        started_at: now,
                    },
                );
                true
            }
        }
    }

    pub fn forget(&mut self, id: &str) {
        self.ledger.remove(id);
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.ledger.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_quota_then_drops() {
        let mut limiter = RateLimiter::new(20, Duration::from_secs(10));
        let start = Instant::now();

        for _ in 0..20 {
            assert!(limiter.check("a", start));
        }
        assert!(!limiter.check("a", start + Duration::from_secs(5)));
        assert!(!limiter.check("a", start + Duration::from_secs(10)));
    }

    #[test]
    fn window_resets_after_it_elapses() {
        let mut limiter = RateLimiter::new(2, Duration::from_secs(10));
        let start = Instant::now();

        assert!(limiter.check("a", start));
        assert!(limiter.check("a", start));
        assert!(!limiter.check("a", start));
        assert!(limiter.check("a", start + Duration::from_millis(10_001)));
    }

    #[test]
    fn connections_are_tracked_independently() {
        let mut limiter = RateLimiter::new(1, Duration::from_secs(10));
        let start = Instant::now();

        assert!(limiter.check("a", start));
        assert!(!limiter.check("a", start));
        assert!(limiter.check("b", start));
        assert_eq!(limiter.tracked(), 2);

        limiter.forget("a");
        assert_eq!(limiter.tracked(), 1);
        assert!(limiter.check("a", start));
    }
}
