/// Minimum gap between honored leave requests.
pub const MIN_TRACK_INTERVAL_MS: i64 = 100;
/// Cooldown after an honored request during which all leaves are suppressed.
pub const REFRESH_DEBOUNCE_MS: i64 = 500;

/// Collapses overlapping page-leave signals into one finalize-and-flush.
///
/// A real navigation commonly fires several signals (a router's own
/// transition plus a generic history listener); honoring a request starts a
/// cooldown that swallows the echoes. Applied uniformly to every leave
/// source, hash-routing included.
#[derive(Debug, Clone)]
pub struct LeaveGuard {
    last_track_ms: i64,
    refreshing_until_ms: i64,
}

impl LeaveGuard {
    pub fn new() -> Self {
        // Far-past sentinels so the first request is always honored,
        // whatever epoch the host clock starts at.
        Self {
            last_track_ms: i64::MIN / 2,
            refreshing_until_ms: i64::MIN / 2,
        }
    }

    /// Returns true when the leave request should be honored, and arms the
    /// cooldown if so.
    pub fn should_track(&mut self, now_ms: i64) -> bool {
        if now_ms < self.refreshing_until_ms {
            return false;
        }
        if now_ms - self.last_track_ms < MIN_TRACK_INTERVAL_MS {
            return false;
        }
        self.last_track_ms = now_ms;
        self.refreshing_until_ms = now_ms + REFRESH_DEBOUNCE_MS;
        true
    }
}

impl Default for LeaveGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_request_is_honored() {
        let mut guard = LeaveGuard::new();
        assert!(guard.should_track(0));
    }

    #[test]
    fn duplicate_within_min_interval_is_suppressed() {
        let mut guard = LeaveGuard::new();
        assert!(guard.should_track(1_000));
        assert!(!guard.should_track(1_050));
    }

    #[test]
    fn requests_during_cooldown_are_suppressed() {
        let mut guard = LeaveGuard::new();
        assert!(guard.should_track(1_000));
        assert!(!guard.should_track(1_200));
        assert!(!guard.should_track(1_499));
    }

    #[test]
    fn both_fire_when_separated_by_more_than_cooldown() {
        let mut guard = LeaveGuard::new();
        assert!(guard.should_track(1_000));
        assert!(guard.should_track(1_600));
    }

    #[test]
    fn cooldown_boundary_is_inclusive_of_expiry() {
        let mut guard = LeaveGuard::new();
        assert!(guard.should_track(1_000));
        assert!(guard.should_track(1_500));
    }

    #[test]
    fn suppressed_requests_do_not_extend_the_cooldown() {
        let mut guard = LeaveGuard::new();
        assert!(guard.should_track(1_000));
        assert!(!guard.should_track(1_400));
        assert!(guard.should_track(1_501));
    }
}
