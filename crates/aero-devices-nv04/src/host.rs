//! Host-side collaborators: display refresh, legacy VGA ports and the time source.
//!
//! The device only ever talks to these through the traits below, so a host can plug in its VGA
//! core and scanout without this crate knowing about either.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// A rectangle of VRAM the raster engines just modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRegion {
    /// Absolute VRAM byte offset of the top-left pixel.
    pub offset: u64,
    pub width: u32,
    pub height: u32,
}

impl DirtyRegion {
    /// Screen position of the region's top-left pixel for a scanout starting at VRAM offset
    /// `start`. Returns `None` when the region begins before the scanout or the geometry is
    /// degenerate.
    pub fn to_xy(&self, start: u64, pitch: u32, bytes_per_pixel: u32) -> Option<(u32, u32)> {
        if pitch == 0 || bytes_per_pixel == 0 {
            return None;
        }
        let rel = self.offset.checked_sub(start)?;
        let y = rel / u64::from(pitch);
        let x = (rel % u64::from(pitch)) / u64::from(bytes_per_pixel);
        Some((u32::try_from(x).ok()?, u32::try_from(y).ok()?))
    }
}

pub trait DisplaySink {
    fn redraw(&mut self, region: DirtyRegion);

    /// Bytes per pixel of the current scanout mode.
    fn bytes_per_pixel(&self) -> u32 {
        4
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplaySink;

impl DisplaySink for NullDisplaySink {
    fn redraw(&mut self, _region: DirtyRegion) {}
}

#[derive(Debug, Default)]
struct Recorded {
    regions: Vec<DirtyRegion>,
}

/// Collects every redraw request. Clones share the same log, so a host (or test) can keep one
/// handle while the device owns another.
#[derive(Debug, Clone)]
pub struct RecordingDisplaySink {
    inner: Arc<Mutex<Recorded>>,
    bytes_per_pixel: u32,
}

impl Default for RecordingDisplaySink {
    fn default() -> Self {
        Self::new(4)
    }
}

impl RecordingDisplaySink {
    pub fn new(bytes_per_pixel: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Recorded::default())),
            bytes_per_pixel,
        }
    }

    pub fn regions(&self) -> Vec<DirtyRegion> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .regions
            .clone()
    }

    pub fn take(&self) -> Vec<DirtyRegion> {
        std::mem::take(
            &mut self
                .inner
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .regions,
        )
    }
}

impl DisplaySink for RecordingDisplaySink {
    fn redraw(&mut self, region: DirtyRegion) {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .regions
            .push(region);
    }

    fn bytes_per_pixel(&self) -> u32 {
        self.bytes_per_pixel
    }
}

/// Port-level access to the VGA core behind the byte-wide register windows.
pub trait LegacyVga {
    fn read_port(&mut self, port: u16) -> u8;
    fn write_port(&mut self, port: u16, value: u8);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullLegacyVga;

impl LegacyVga for NullLegacyVga {
    fn read_port(&mut self, _port: u16) -> u8 {
        0xFF
    }

    fn write_port(&mut self, _port: u16, _value: u8) {}
}

/// Monotonic nanosecond time source for PTIMER and notifier timestamps.
pub trait Clock {
    fn now_ns(&self) -> u64;
}

#[derive(Debug, Clone, Copy)]
pub struct InstantClock {
    start: Instant,
}

impl Default for InstantClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for InstantClock {
    fn now_ns(&self) -> u64 {
        self.start.elapsed().as_nanos().min(u128::from(u64::MAX)) as u64
    }
}

/// Externally driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ns: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ns)),
        }
    }

    pub fn set(&self, now_ns: u64) {
        self.now.store(now_ns, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ns: u64) {
        self.now.fetch_add(delta_ns, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dirty_region_maps_to_screen_coordinates() {
        let region = DirtyRegion {
            offset: 0x1000 + 3 * 0x100 + 2 * 4,
            width: 4,
            height: 2,
        };
        assert_eq!(region.to_xy(0x1000, 0x100, 4), Some((2, 3)));
        assert_eq!(region.to_xy(0x2000, 0x100, 4), None);
        assert_eq!(region.to_xy(0, 0, 4), None);
    }

    #[test]
    fn recording_sink_clones_share_log() {
        let sink = RecordingDisplaySink::default();
        let mut device_side = sink.clone();
        device_side.redraw(DirtyRegion {
            offset: 8,
            width: 1,
            height: 1,
        });
        assert_eq!(sink.regions().len(), 1);
        assert_eq!(sink.take().len(), 1);
        assert!(sink.regions().is_empty());
    }

    #[test]
    fn manual_clock_is_shared() {
        let clock = ManualClock::new(5);
        let other = clock.clone();
        other.advance(10);
        assert_eq!(clock.now_ns(), 15);
        clock.set(1);
        assert_eq!(other.now_ns(), 1);
    }
}
