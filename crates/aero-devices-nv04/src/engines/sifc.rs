//! Stretched image-from-CPU classes (0x66/0x76): an inline source image resampled onto a
//! destination rectangle with 12.20 fixed-point steps.

use super::{split, MethodCall};
use crate::channel::GraphState;
use crate::raster::color::image_color_bytes;
use crate::raster::RasterCtx;
use crate::transfer::{pixel_at, WordCollector};

#[derive(Debug, Clone, Default)]
pub struct SifcState {
    pub operation: u32,
    pub format: u32,
    pub color_bytes: u32,
    pub src_size: u32,
    /// Destination-per-source scale factors in 12.20 fixed point.
    pub dx_ds: u32,
    pub dy_dt: u32,
    pub clip_point: u32,
    pub clip_size: u32,
    /// Source origin in 12.4 fixed point, x in the low half.
    pub src_point: u32,
    pub words: WordCollector,
}

impl SifcState {
    pub fn update_color_bytes(&mut self, surface_format: u32) {
        match image_color_bytes(surface_format, self.format) {
            Some(bytes) => self.color_bytes = bytes,
            None => tracing::warn!(format = self.format, "unknown SIFC color format"),
        }
    }
}

/// Inverts a 12.20 scale factor into a 12.20 step. A zero factor yields a zero step.
fn inverse_step(factor: u32) -> u32 {
    if factor == 0 {
        return 0;
    }
    ((1u64 << 40) / u64::from(factor)) as u32
}

/// Start of the source accumulator for destination origin `d`, clamped at zero.
fn accumulator_origin(src_fixed: u32, d: u32) -> u32 {
    let v = src_fixed.wrapping_sub(d << 20).wrapping_sub(0x80000) as i32;
    v.max(0) as u32
}

pub fn method(g: &mut GraphState, ctx: &mut RasterCtx<'_>, call: MethodCall) {
    let s = &mut g.sifc;
    let param = call.param;
    match call.method {
        0x0bf => s.operation = param,
        0x0c0 => {
            s.format = param;
            s.update_color_bytes(g.surf2d.format);
        }
        0x0c1 => s.src_size = param,
        0x0c2 => s.dx_ds = param,
        0x0c3 => s.dy_dt = param,
        0x0c4 => s.clip_point = param,
        0x0c5 => s.clip_size = param,
        0x0c6 => {
            s.src_point = param;
            let (width, height) = split(s.src_size);
            let bytes = u64::from(width) * u64::from(height) * u64::from(s.color_bytes);
            s.words.start(bytes.div_ceil(4));
        }
        0x100..=0x7ff => {
            if s.words.push(param) {
                let words = s.words.take();
                draw(g, ctx, &words);
                g.sifc.words.restore(words);
            }
        }
        _ => {}
    }
}

fn draw(g: &GraphState, ctx: &mut RasterCtx<'_>, words: &[u32]) {
    let s = &g.sifc;
    let surf = &g.surf2d;
    let (dx, dy) = split(s.clip_point);
    let (dwidth, height) = split(s.clip_size);
    let swidth = s.src_size & 0xFFFF;
    let step_x = inverse_step(s.dx_ds);
    let step_y = inverse_step(s.dy_dt);
    let sx0 = accumulator_origin((s.src_point & 0xFFFF) << 16, dx);
    let mut sy = accumulator_origin(s.src_point & 0xFFFF_0000, dy);
    let start = surf.dst_offset(dx, dy);
    let mut row = start;
    let mut line = (sy >> 20).wrapping_mul(swidth);
    for y in 0..height {
        let mut sx = sx0;
        for x in 0..dwidth {
            let src = pixel_at(words, line.wrapping_add(sx >> 20), s.color_bytes);
            ctx.draw_converted(&g.ops, surf, s.operation, row, x, src, s.color_bytes, (dx + x, dy + y));
            sx = sx.wrapping_add(step_x);
        }
        sy = sy.wrapping_add(step_y);
        line = (sy >> 20).wrapping_mul(swidth);
        row = row.wrapping_add(surf.pitch_dst);
    }
    ctx.redraw(surf.dst, start, dwidth, height);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_scale_steps_one_pixel() {
        assert_eq!(inverse_step(1 << 20), 1 << 20);
        assert_eq!(inverse_step(2 << 20), 1 << 19);
        assert_eq!(inverse_step(0), 0);
    }

    #[test]
    fn accumulator_clamps_at_zero() {
        // Source x = 4.0 in 12.4, destination x = 0: centre sample at 4.0 - 0.5.
        assert_eq!(accumulator_origin(0x40 << 16, 0), (4 << 20) - 0x80000);
        assert_eq!(accumulator_origin(0, 3), 0);
    }
}
