/// Upper bound on a reported dwell duration: 24 hours in milliseconds.
/// Anything beyond this is clock skew or a stuck timer, not a real visit.
pub const MAX_DWELL_MS: u64 = 24 * 60 * 60 * 1000;

/// Interaction timestamps are written at most once per this window.
const INTERACTION_THROTTLE_MS: i64 = 1_000;

/// Visible-time accounting for one page lifetime.
///
/// Two states: visible (`visible_since_ms` set) and hidden. Time only
/// accumulates while visible, so a backgrounded tab contributes nothing —
/// dwell time is the metric of record, not wall-clock elapsed time.
#[derive(Debug, Clone)]
pub struct DwellTracker {
    total_visible_ms: u64,
    visible_since_ms: Option<i64>,
    last_interaction_ms: Option<i64>,
    next_interaction_write_ms: i64,
}

impl DwellTracker {
    pub fn new(now_ms: i64, visible: bool) -> Self {
        Self {
            total_visible_ms: 0,
            visible_since_ms: visible.then_some(now_ms),
            last_interaction_ms: Some(now_ms),
            next_interaction_write_ms: now_ms,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible_since_ms.is_some()
    }

    /// Visibility transition. Hiding banks the current visible segment;
    /// showing stamps a new segment start. Repeated signals in the same
    /// state are no-ops.
    pub fn on_visibility_change(&mut self, hidden: bool, now_ms: i64) {
        if hidden {
            if let Some(start) = self.visible_since_ms.take() {
                let segment = (now_ms - start).max(0) as u64;
                self.total_visible_ms = self.total_visible_ms.saturating_add(segment);
            }
        } else if self.visible_since_ms.is_none() {
            self.visible_since_ms = Some(now_ms);
        }
    }

    /// Record a user interaction. Returns false when dropped by the
    /// once-per-second throttle. Freshness metadata only — the visibility
    /// state machine is untouched.
    pub fn record_interaction(&mut self, now_ms: i64) -> bool {
        if now_ms < self.next_interaction_write_ms {
            return false;
        }
        self.last_interaction_ms = Some(now_ms);
        self.next_interaction_write_ms = now_ms + INTERACTION_THROTTLE_MS;
        true
    }

    pub fn last_interaction_ms(&self) -> Option<i64> {
        self.last_interaction_ms
    }

    /// Accumulated visible time plus the in-progress segment if currently
    /// visible, clamped to `[0, MAX_DWELL_MS]`.
    pub fn dwell_ms(&self, now_ms: i64) -> u64 {
        let mut total = self.total_visible_ms;
        if let Some(start) = self.visible_since_ms {
            total = total.saturating_add((now_ms - start).max(0) as u64);
        }
        total.min(MAX_DWELL_MS)
    }

    /// Zero the accumulator for the next page. If currently visible, the
    /// in-progress segment restarts at `now_ms`.
    pub fn reset(&mut self, now_ms: i64) {
        self.total_visible_ms = 0;
        if self.visible_since_ms.is_some() {
            self.visible_since_ms = Some(now_ms);
        }
    }
}
