//! Scaled-image-from-memory class (0x89): resamples a rectangle of a DMA-addressed source onto
//! the 2D or swizzled destination surface.

use super::{split, tfc::is_swizzled_class, MethodCall};
use crate::channel::GraphState;
use crate::raster::color::sifm_color_bytes;
use crate::raster::RasterCtx;

/// 1.0 in the 12.20 step format.
const UNIT_STEP: u32 = 1 << 20;

/// X8R8G8B8 source format, whose alpha byte is forced opaque.
const FORMAT_X8R8G8B8: u32 = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SifmState {
    pub src: u32,
    pub swizzled: bool,
    pub format: u32,
    pub color_bytes: u32,
    pub operation: u32,
    pub dst_point: u32,
    pub dst_size: u32,
    pub du_dx: u32,
    pub dv_dy: u32,
    pub src_size: u32,
    /// Source pitch in the low half.
    pub src_format: u32,
    pub src_offset: u32,
    /// Source origin in 12.4 fixed point, x in the low half.
    pub src_point: u32,
}

pub fn method(g: &mut GraphState, ctx: &mut RasterCtx<'_>, call: MethodCall) {
    let s = &mut g.sifm;
    let param = call.param;
    match call.method {
        0x061 => s.src = param,
        0x066 => s.swizzled = is_swizzled_class(ctx.dma.class_of(param)),
        0x0c0 => {
            s.format = param;
            match sifm_color_bytes(param) {
                Some(bytes) => s.color_bytes = bytes,
                None => tracing::warn!(format = param, "unknown SIFM color format"),
            }
        }
        0x0c1 => s.operation = param,
        0x0c4 => s.dst_point = param,
        0x0c5 => s.dst_size = param,
        0x0c6 => s.du_dx = param,
        0x0c7 => s.dv_dy = param,
        0x100 => s.src_size = param,
        0x101 => s.src_format = param,
        0x102 => s.src_offset = param,
        0x103 => {
            s.src_point = param;
            draw(g, ctx);
        }
        _ => {}
    }
}

/// Source sampling position for one destination row: byte offset of the source row plus the
/// pixel index of each destination column.
enum Sampler {
    Unit { x: u32, y: u32 },
    Scaled { x0: u32, y: u32 },
}

impl Sampler {
    fn new(s: &SifmState, dx: u32, dy: u32) -> Self {
        if s.du_dx == UNIT_STEP && s.dv_dy == UNIT_STEP {
            let (x, y) = split(s.src_point);
            return Sampler::Unit { x: x >> 4, y: y >> 4 };
        }
        let origin = |src_fixed: u32, d: u32| {
            (src_fixed.wrapping_sub(d << 20).wrapping_sub(0x80000) as i32).max(0) as u32
        };
        Sampler::Scaled {
            x0: origin((s.src_point & 0xFFFF) << 16, dx),
            y: origin(s.src_point & 0xFFFF_0000, dy),
        }
    }

    fn row_offset(&self, s: &SifmState, y: u32) -> u32 {
        let pitch = s.src_format & 0xFFFF;
        match *self {
            Sampler::Unit { x, y: y0 } => s
                .src_offset
                .wrapping_add((y0 + y).wrapping_mul(pitch))
                .wrapping_add(x.wrapping_mul(s.color_bytes)),
            Sampler::Scaled { y: acc, .. } => s.src_offset.wrapping_add((acc >> 20).wrapping_mul(pitch)),
        }
    }

    fn column(&self, s: &SifmState, x: u32) -> u32 {
        match *self {
            Sampler::Unit { .. } => x,
            Sampler::Scaled { x0, .. } => x0.wrapping_add(x.wrapping_mul(s.du_dx)) >> 20,
        }
    }

    fn next_row(&mut self, s: &SifmState) {
        if let Sampler::Scaled { y, .. } = self {
            *y = y.wrapping_add(s.dv_dy);
        }
    }
}

fn draw(g: &GraphState, ctx: &mut RasterCtx<'_>) {
    let s = &g.sifm;
    let surf = &g.surf2d;
    let (dx, dy) = split(s.dst_point);
    let (width, height) = split(s.dst_size);
    let mut sampler = Sampler::new(s, dx, dy);
    let start = surf.dst_offset(dx, dy);
    let mut row = start;
    for y in 0..height {
        let src_row = sampler.row_offset(s, y);
        for x in 0..width {
            let mut src = ctx.get_pixel(s.src, src_row, sampler.column(s, x), s.color_bytes);
            if s.swizzled {
                let offset = g.swizzled.texel_offset(x + dx, y + dy);
                ctx.put_texel(&g.swizzled, offset, src);
            } else {
                if s.format == FORMAT_X8R8G8B8 {
                    src |= 0xFF00_0000;
                }
                ctx.draw_pixel(&g.ops, surf, s.operation, row, x, src, (dx + x, dy + y));
            }
        }
        sampler.next_row(s);
        row = row.wrapping_add(surf.pitch_dst);
    }
    if !s.swizzled {
        ctx.redraw(surf.dst, start, width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_sampler_walks_source_rows() {
        let s = SifmState {
            du_dx: UNIT_STEP,
            dv_dy: UNIT_STEP,
            src_point: (2 << 4 << 16) | (3 << 4),
            src_format: 0x100,
            src_offset: 0x1000,
            color_bytes: 4,
            ..SifmState::default()
        };
        let sampler = Sampler::new(&s, 0, 0);
        assert_eq!(sampler.row_offset(&s, 1), 0x1000 + 3 * 0x100 + 3 * 4);
        assert_eq!(sampler.column(&s, 5), 5);
    }

    #[test]
    fn scaled_sampler_halves_source() {
        let s = SifmState {
            du_dx: UNIT_STEP / 2,
            dv_dy: UNIT_STEP / 2,
            src_point: (1 << 4 << 16) | (1 << 4),
            src_format: 0x40,
            color_bytes: 2,
            ..SifmState::default()
        };
        let mut sampler = Sampler::new(&s, 0, 0);
        // Accumulators start at 0.5: columns 0..4 sample 0, 1, 1, 2.
        let cols: Vec<u32> = (0..4).map(|x| sampler.column(&s, x)).collect();
        assert_eq!(cols, vec![0, 1, 1, 2]);
        assert_eq!(sampler.row_offset(&s, 0), 0);
        sampler.next_row(&s);
        assert_eq!(sampler.row_offset(&s, 1), 0x40);
    }
}
