//! PTIMER: the free-running nanosecond counter used for notifier timestamps.

/// Low bits of `PTIMER_TIME_0` that always read as zero.
const TIME_GRANULARITY_MASK: u64 = 0x1F;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ptimer {
    pub intr: u32,
    pub intr_en: u32,
    pub numerator: u32,
    pub denominator: u32,
    pub alarm: u32,
    /// Guest-programmed time at `base_now`.
    base: u64,
    /// Host clock reading the base was anchored at.
    base_now: u64,
}

impl Ptimer {
    pub fn time(&self, now_ns: u64) -> u64 {
        self.base.wrapping_add(now_ns.wrapping_sub(self.base_now)) & !TIME_GRANULARITY_MASK
    }

    /// `PTIMER_TIME_0` write: replaces the low half of the counter.
    pub fn write_time_low(&mut self, now_ns: u64, value: u32) {
        self.base = (self.base & 0xFFFF_FFFF_0000_0000) | u64::from(value);
        self.base_now = now_ns;
    }

    /// `PTIMER_TIME_1` write: replaces the high half of the counter.
    pub fn write_time_high(&mut self, now_ns: u64, value: u32) {
        self.base = (self.base & 0x0000_0000_FFFF_FFFF) | (u64::from(value) << 32);
        self.base_now = now_ns;
    }
}
