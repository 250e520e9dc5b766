use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_calls: usize,
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self { max_calls, window }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(60))
    }
}

/// Read-only view of one (session, tool) window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateWindow {
    pub session_id: String,
    pub tool_name: String,
    pub window_start: Instant,
    pub count: usize,
}

struct FixedWindow {
    window_start: Instant,
    count: usize,
}

impl FixedWindow {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            count: 0,
        }
    }

    fn try_consume(&mut self, now: Instant, config: &RateLimitConfig) -> bool {
        if now.saturating_duration_since(self.window_start) >= config.window {
            self.window_start = now;
            self.count = 0;
        }

        if self.count < config.max_calls {
            self.count += 1;
            true
        } else {
            false
        }
    }

    fn expired(&self, now: Instant, config: &RateLimitConfig) -> bool {
        now.saturating_duration_since(self.window_start) >= config.window
    }
}

type WindowKey = (String, String);

/// Fixed-window limiter keyed by (session, tool).
///
/// A window opens on the first call and lasts `config.window`. The first call
/// observed at or after the window end opens a fresh one. Denied calls do not
/// consume capacity.
pub struct RateLimiter {
    windows: Mutex<HashMap<WindowKey, FixedWindow>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn check_and_increment(&self, session_id: &str, tool_name: &str) -> bool {
        self.check_and_increment_at(session_id, tool_name, Instant::now())
    }

    /// Same as [`check_and_increment`](Self::check_and_increment) against an
    /// explicit clock reading.
    pub fn check_and_increment_at(&self, session_id: &str, tool_name: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock();
        let window = windows
            .entry((session_id.to_string(), tool_name.to_string()))
            .or_insert_with(|| FixedWindow::new(now));

        let allowed = window.try_consume(now, &self.config);
        if !allowed {
            debug!(session_id, tool = tool_name, count = window.count, "Rate window exhausted");
        }
        allowed
    }

    pub fn window(&self, session_id: &str, tool_name: &str) -> Option<RateWindow> {
        let windows = self.windows.lock();
        windows
            .get(&(session_id.to_string(), tool_name.to_string()))
            .map(|w| RateWindow {
                session_id: session_id.to_string(),
                tool_name: tool_name.to_string(),
                window_start: w.window_start,
                count: w.count,
            })
    }

    /// Drop windows whose period has elapsed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, w| !w.expired(now, &self.config));
        before - windows.len()
    }

    pub fn tracked_windows(&self) -> usize {
        self.windows.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_eleventh_call_denied() {
        let limiter = RateLimiter::new(RateLimitConfig::new(10, Duration::from_secs(60)));

        for _ in 0..10 {
            assert!(limiter.check_and_increment("session1", "db_query"));
        }
        assert!(!limiter.check_and_increment("session1", "db_query"));
    }

    #[test]
    fn test_window_reset() {
        let limiter = RateLimiter::new(RateLimitConfig::new(2, Duration::from_secs(10)));
        let start = Instant::now();

        assert!(limiter.check_and_increment_at("s", "t", start));
        assert!(limiter.check_and_increment_at("s", "t", start));
        assert!(!limiter.check_and_increment_at("s", "t", start + Duration::from_secs(9)));

        // Exactly at the boundary a new window opens.
        assert!(limiter.check_and_increment_at("s", "t", start + Duration::from_secs(10)));
        let window = limiter.window("s", "t").unwrap();
        assert_eq!(window.count, 1);
        assert_eq!(window.window_start, start + Duration::from_secs(10));
    }

    #[test]
    fn test_window_reset_with_real_clock() {
        let limiter = RateLimiter::new(RateLimitConfig::new(2, Duration::from_millis(100)));

        assert!(limiter.check_and_increment("session1", "tool"));
        assert!(limiter.check_and_increment("session1", "tool"));
        assert!(!limiter.check_and_increment("session1", "tool"));

        thread::sleep(Duration::from_millis(150));

        assert!(limiter.check_and_increment("session1", "tool"));
    }

    #[test]
    fn test_denied_calls_do_not_extend_count() {
        let limiter = RateLimiter::new(RateLimitConfig::new(1, Duration::from_secs(60)));
        assert!(limiter.check_and_increment("s", "t"));
        assert!(!limiter.check_and_increment("s", "t"));
        assert!(!limiter.check_and_increment("s", "t"));
        assert_eq!(limiter.window("s", "t").unwrap().count, 1);
    }

    #[test]
    fn test_per_tool_isolation() {
        let limiter = RateLimiter::new(RateLimitConfig::new(2, Duration::from_secs(60)));

        assert!(limiter.check_and_increment("s1", "read_file"));
        assert!(limiter.check_and_increment("s1", "read_file"));
        assert!(!limiter.check_and_increment("s1", "read_file"));

        // Different tool should have its own window
        assert!(limiter.check_and_increment("s1", "write_file"));
        // Different session as well
        assert!(limiter.check_and_increment("s2", "read_file"));
    }

    #[test]
    fn test_concurrent_burst_counts_exactly() {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::new(10, Duration::from_secs(60))));

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                thread::spawn(move || limiter.check_and_increment("burst", "db_query"))
            })
            .collect();

        let allowed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|allowed| *allowed)
            .count();

        assert_eq!(allowed, 10);
    }

    #[test]
    fn test_purge_expired() {
        let limiter = RateLimiter::new(RateLimitConfig::new(5, Duration::from_secs(1)));
        let start = Instant::now();
        limiter.check_and_increment_at("s", "a", start);
        limiter.check_and_increment_at("s", "b", start + Duration::from_millis(800));

        assert_eq!(limiter.purge_expired_at(start + Duration::from_millis(1200)), 1);
        assert_eq!(limiter.tracked_windows(), 1);
        assert!(limiter.window("s", "b").is_some());
    }
}
