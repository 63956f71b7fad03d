//! Vertical retrace pacing.
//!
//! The device raises `PCRTC_INTR` once per retrace and uses the same edge to retry channels that
//! stalled on a semaphore acquire. Hosts drive it with a monotonic nanosecond clock.

/// Upper bound on retraces delivered by one `tick`, so a long host stall does not turn into an
/// unbounded burst of interrupts.
pub const MAX_CATCH_UP_TICKS: u32 = 1024;

/// Convert a vblank refresh rate (Hz) into a vblank period in nanoseconds.
///
/// Returns `None` when vblank is disabled (`None` or `Some(0)`).
pub fn period_ns_from_hz(vblank_hz: Option<u32>) -> Option<u64> {
    vblank_hz.and_then(|hz| {
        if hz == 0 {
            return None;
        }
        // Ceil division keeps 60 Hz at 16_666_667 ns.
        Some(1_000_000_000u64.div_ceil(hz as u64))
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VblankSchedule {
    interval_ns: Option<u64>,
    next_ns: Option<u64>,
}

impl VblankSchedule {
    pub fn new(vblank_hz: Option<u32>) -> Self {
        Self {
            interval_ns: period_ns_from_hz(vblank_hz),
            next_ns: None,
        }
    }

    pub fn interval_ns(&self) -> Option<u64> {
        self.interval_ns
    }

    /// Forgets the next deadline; the first `advance` afterwards re-arms one period out.
    pub fn rearm(&mut self) {
        self.next_ns = None;
    }

    /// Number of retraces that elapsed up to `now_ns`.
    pub fn advance(&mut self, now_ns: u64) -> u32 {
        let Some(interval) = self.interval_ns else {
            return 0;
        };
        let mut next = self.next_ns.unwrap_or(now_ns.saturating_add(interval));
        let mut ticks = 0u32;
        while now_ns >= next {
            next = next.saturating_add(interval);
            ticks += 1;
            if ticks >= MAX_CATCH_UP_TICKS {
                next = now_ns.saturating_add(interval);
                break;
            }
        }
        self.next_ns = Some(next);
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_ns_from_hz_uses_ceil_division() {
        assert_eq!(period_ns_from_hz(None), None);
        assert_eq!(period_ns_from_hz(Some(0)), None);
        assert_eq!(period_ns_from_hz(Some(1)), Some(1_000_000_000));
        assert_eq!(period_ns_from_hz(Some(60)), Some(16_666_667));
    }

    #[test]
    fn schedule_counts_elapsed_periods() {
        let mut s = VblankSchedule::new(Some(1000));
        assert_eq!(s.advance(0), 0);
        assert_eq!(s.advance(999_999), 0);
        assert_eq!(s.advance(1_000_000), 1);
        assert_eq!(s.advance(3_500_000), 2);
    }

    #[test]
    fn catch_up_is_capped() {
        let mut s = VblankSchedule::new(Some(1000));
        s.advance(0);
        assert_eq!(s.advance(10_000_000_000), MAX_CATCH_UP_TICKS);
        assert_eq!(s.advance(10_000_000_000), 0);
    }

    #[test]
    fn disabled_schedule_never_fires() {
        let mut s = VblankSchedule::new(Some(0));
        assert_eq!(s.advance(u64::MAX), 0);
    }
}
