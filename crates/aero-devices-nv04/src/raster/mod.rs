//! Pixel-level contract shared by the 2D engines: fetch, combine, store, and report what changed.

pub mod color;
pub mod rop;

use crate::dma::{DmaObject, DmaSpace, DmaTarget};
use crate::engines::pattern::PatternState;
use crate::engines::surface::{Surface2d, SwizzledSurface};
use crate::host::{DirtyRegion, DisplaySink};

/// Pixel-combine operation selectors used by the `operation` methods of the image classes.
pub mod op {
    pub const ROP_AND: u32 = 1;
    pub const BLEND_AND: u32 = 5;
}

/// Channel state consulted by the pixel-combine step.
#[derive(Debug, Clone, Default)]
pub struct RasterOps {
    pub rop: u8,
    /// Blend factors, one byte per B/G/R/A channel.
    pub beta: u32,
    pub pattern: PatternState,
}

/// Everything a raster primitive may touch while it runs.
pub struct RasterCtx<'a> {
    pub dma: DmaSpace<'a>,
    pub display: &'a mut dyn DisplaySink,
    /// PTIMER value used for notifier timestamps.
    pub now_ns: u64,
}

impl<'a> RasterCtx<'a> {
    pub fn get_pixel(&mut self, object: u32, offset: u32, x: u32, bytes: u32) -> u32 {
        match bytes {
            1 => u32::from(self.dma.read_u8(object, offset.wrapping_add(x))),
            2 => u32::from(self.dma.read_u16(object, offset.wrapping_add(x.wrapping_mul(2)))),
            _ => self.dma.read_u32(object, offset.wrapping_add(x.wrapping_mul(4))),
        }
    }

    /// Stores a pixel into the 2D destination surface.
    pub fn put_pixel(&mut self, surf: &Surface2d, offset: u32, x: u32, value: u32) {
        let dst = surf.dst;
        match surf.color_bytes {
            1 => self.dma.write_u8(dst, offset.wrapping_add(x), value as u8),
            2 => self
                .dma
                .write_u16(dst, offset.wrapping_add(x.wrapping_mul(2)), value as u16),
            _ => {
                let value = if surf.format == 6 { value & 0x00FF_FFFF } else { value };
                self.dma.write_u32(dst, offset.wrapping_add(x.wrapping_mul(4)), value);
            }
        }
    }

    /// Read-combine-write of one destination pixel. `at` is the surface position used for the
    /// pattern.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_pixel(
        &mut self,
        ops: &RasterOps,
        surf: &Surface2d,
        operation: u32,
        row: u32,
        x: u32,
        src: u32,
        at: (u32, u32),
    ) {
        self.draw_converted(ops, surf, operation, row, x, src, surf.color_bytes, at);
    }

    /// Like [`RasterCtx::draw_pixel`] for a source of `src_bytes` width. A 32-bit source over a
    /// 16-bit surface is combined in X8R8G8B8 and stored back as R5G6B5.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_converted(
        &mut self,
        ops: &RasterOps,
        surf: &Surface2d,
        operation: u32,
        row: u32,
        x: u32,
        src: u32,
        src_bytes: u32,
        at: (u32, u32),
    ) {
        let widen = src_bytes == 4 && surf.color_bytes == 2;
        let mut dst = if needs_destination(ops, operation) {
            self.get_pixel(surf.dst, row, x, surf.color_bytes)
        } else {
            0
        };
        if widen {
            dst = color::rgb565_to_888(dst);
        }
        let mut value = combine(ops, operation, dst, src, src_bytes, at.0, at.1);
        if widen {
            value = color::rgb888_to_565(value);
        }
        self.put_pixel(surf, row, x, value);
    }

    /// Stores a texel at byte offset `offset` of the swizzled surface.
    pub fn put_texel(&mut self, surf: &SwizzledSurface, offset: u32, value: u32) {
        match surf.color_bytes {
            1 => self.dma.write_u8(surf.object, offset, value as u8),
            2 => self.dma.write_u16(surf.object, offset, value as u16),
            _ => self.dma.write_u32(surf.object, offset, value),
        }
    }

    /// Reports a finished rectangle whose top-left pixel is at `offset` within `object`.
    /// Rectangles outside VRAM are not visible and are not reported.
    pub fn redraw(&mut self, object: u32, offset: u32, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let at = DmaObject::load(self.dma.vram, object)
            .and_then(|obj| obj.translate(self.dma.vram, offset, 1));
        match at {
            Ok(at) if at.target == DmaTarget::Vram => {
                tracing::debug!(offset = at.address, width, height, "redraw");
                self.display.redraw(DirtyRegion {
                    offset: at.address,
                    width,
                    height,
                });
            }
            Ok(_) => {}
            Err(err) => tracing::debug!(error = %err, "redraw skipped"),
        }
    }

    /// Writes a completion record (timestamp, then two zero status words) at `base` inside the
    /// notifier object, unless the notifier is the null object.
    pub fn write_notifier(&mut self, notifier: u32, base: u32) -> bool {
        if self.dma.class_of(notifier) == crate::dma::NULL_OBJECT_CLASS {
            tracing::debug!(notifier = format_args!("0x{notifier:x}"), "notify skipped");
            return false;
        }
        tracing::debug!(notifier = format_args!("0x{notifier:x}"), "notify");
        self.dma.write_u64(notifier, base, self.now_ns);
        self.dma.write_u32(notifier, base + 0x8, 0);
        self.dma.write_u32(notifier, base + 0xC, 0);
        true
    }
}

/// Whether `combine` with this operation reads the destination pixel.
pub fn needs_destination(ops: &RasterOps, operation: u32) -> bool {
    match operation {
        op::ROP_AND => rop::uses_destination(ops.rop),
        op::BLEND_AND => true,
        _ => false,
    }
}

/// Combines a source pixel into a destination pixel. `(px, py)` are surface coordinates used to
/// index the 8x8 pattern.
pub fn combine(ops: &RasterOps, operation: u32, dst: u32, src: u32, bytes: u32, px: u32, py: u32) -> u32 {
    match operation {
        op::ROP_AND => {
            let pat = if rop::uses_pattern(ops.rop) {
                ops.pattern.color_at(px, py)
            } else {
                0
            };
            rop::rop3(ops.rop, dst, src, pat, bytes)
        }
        op::BLEND_AND if bytes == 4 => blend_argb8888(ops.beta, dst, src),
        op::BLEND_AND => blend_rgb565(ops.beta, dst, src),
        _ => src,
    }
}

fn channel(value: u32, shift: u32) -> u32 {
    (value >> shift) & 0xFF
}

fn blend_argb8888(beta: u32, dst: u32, src: u32) -> u32 {
    if src == 0 {
        return dst;
    }
    let mut s = [0u32; 4];
    for (i, c) in s.iter_mut().enumerate() {
        *c = channel(src, i as u32 * 8);
        if beta != u32::MAX {
            *c = *c * channel(beta, i as u32 * 8) / 0xFF;
        }
    }
    let inv_alpha = 0xFF - s[3];
    let mut out = 0u32;
    for (i, sc) in s.iter().enumerate() {
        let d = channel(dst, i as u32 * 8);
        let v = d * inv_alpha / 0xFF + sc;
        // A carry out of the channel inverts it instead of saturating.
        let v = (0u32.wrapping_sub(v >> 8) ^ v) & 0xFF;
        out |= v << (i * 8);
    }
    out
}

fn blend_rgb565(beta: u32, dst: u32, src: u32) -> u32 {
    let inv_beta = 0xFF - channel(beta, 24);
    let field = |shift: u32, mask: u32, weight: u32| {
        let s = (src >> shift) & mask;
        let d = (dst >> shift) & mask;
        (((d * inv_beta + s * weight) / 0xFF) & mask) << shift
    };
    field(0, 0x1F, channel(beta, 0)) | field(5, 0x3F, channel(beta, 8)) | field(11, 0x1F, channel(beta, 16))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rop_uses_mono_pattern() {
        let mut ops = RasterOps::default();
        ops.rop = rop::PATCOPY;
        ops.pattern.kind = 1;
        ops.pattern.fg = 0xAA;
        ops.pattern.bg = 0x55;
        ops.pattern.mono[9] = true;
        assert_eq!(combine(&ops, op::ROP_AND, 0, 0, 1, 1, 1), 0xAA);
        assert_eq!(combine(&ops, op::ROP_AND, 0, 0, 1, 0, 1), 0x55);
        // The pattern repeats every 8 pixels.
        assert_eq!(combine(&ops, op::ROP_AND, 0, 0, 1, 9, 17), 0xAA);
    }

    #[test]
    fn blend_argb_respects_alpha_and_beta() {
        let mut ops = RasterOps::default();
        ops.beta = u32::MAX;
        assert_eq!(combine(&ops, op::BLEND_AND, 0x1122_3344, 0, 4, 0, 0), 0x1122_3344);
        assert_eq!(combine(&ops, op::BLEND_AND, 0x0000_0000, 0xFF10_2030, 4, 0, 0), 0xFF10_2030);
        assert_eq!(combine(&ops, op::BLEND_AND, 0x00FF_FFFF, 0xFF00_0000, 4, 0, 0), 0xFF00_0000);
        ops.beta = 0x8080_8080;
        // Half-weighted opaque white over black.
        assert_eq!(combine(&ops, op::BLEND_AND, 0, 0xFFFF_FFFF, 4, 0, 0), 0x8080_8080);
    }

    #[test]
    fn blend_argb_folds_channel_overflow() {
        let mut ops = RasterOps::default();
        ops.beta = u32::MAX;
        // Transparent source with a non-zero blue channel over full blue: 0xFF + 0x2D = 300.
        assert_eq!(combine(&ops, op::BLEND_AND, 0x0000_00FF, 0x0000_002D, 4, 0, 0), 211);
        assert_eq!(combine(&ops, op::BLEND_AND, 0x0000_00FF, 0x0000_0001, 4, 0, 0), 0xFF);
    }

    #[test]
    fn blend_565_weights_by_beta() {
        let mut ops = RasterOps::default();
        ops.beta = 0xFFFF_FFFF;
        assert_eq!(combine(&ops, op::BLEND_AND, 0x0000, 0xFFFF, 2, 0, 0), 0xFFFF);
        ops.beta = 0;
        assert_eq!(combine(&ops, op::BLEND_AND, 0x1234, 0xFFFF, 2, 0, 0), 0x1234);
    }

    #[test]
    fn other_operations_copy_source() {
        let ops = RasterOps::default();
        assert_eq!(combine(&ops, 3, 0x1234, 0x5678, 2, 0, 0), 0x5678);
        assert!(!needs_destination(&ops, 3));
        assert!(needs_destination(&ops, op::BLEND_AND));
    }
}
