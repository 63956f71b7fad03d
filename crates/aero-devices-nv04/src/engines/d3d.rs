//! Fixed-function 3D class (0x55).
//!
//! Only the surface clear is executed. It waits on the class's own semaphore object: a clear is
//! skipped while the semaphore word is non-zero and signals completion by writing 1. All other
//! state is latched in a sparse register bank so guests can program the pipeline freely.

use std::collections::BTreeMap;

use super::{split, MethodCall};
use crate::raster::RasterCtx;

/// First DMA object slot method (`0x060..=0x06a`).
const OBJECT_SLOT_BASE: u32 = 0x060;
const OBJECT_SLOT_COUNT: usize = 11;
const SLOT_COLOR: usize = 5;
const SLOT_ZETA: usize = 6;
const SLOT_SEMAPHORE: usize = 9;

pub mod mthd {
    pub const DMA_NOTIFY: u32 = 0x180;
    pub const DMA_COLOR: u32 = 0x184;
    pub const DMA_ZETA: u32 = 0x188;
    pub const CLIP_HORIZONTAL: u32 = 0x2f8;
    pub const CLIP_VERTICAL: u32 = 0x2fc;
    pub const FORMAT: u32 = 0x300;
    pub const PITCH: u32 = 0x308;
    pub const OFFSET_COLOR: u32 = 0x30c;
    pub const OFFSET_ZETA: u32 = 0x310;
    pub const PITCH_ZETA: u32 = 0x084;
    pub const SCISSOR_X: u32 = 0x0be;
    pub const SCISSOR_WIDTH: u32 = 0x0bf;
    pub const SCISSOR_Y: u32 = 0x0c0;
    pub const SCISSOR_HEIGHT: u32 = 0x0c1;
    pub const SEMAPHORE_OFFSET: u32 = 0x75b;
    pub const SEMAPHORE_RELEASE: u32 = 0x75c;
    pub const CLEAR_ZETA_VALUE: u32 = 0x763;
    pub const CLEAR_COLOR_VALUE: u32 = 0x764;
    pub const CLEAR: u32 = 0x765;
}

/// Clear-flag bits selecting the colour buffer.
const CLEAR_COLOR_MASK: u32 = 0xF0;
const CLEAR_ZETA: u32 = 0x01;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct D3dState {
    pub objects: [u32; OBJECT_SLOT_COUNT],
    pub clip_horizontal: u32,
    pub clip_vertical: u32,
    pub surface_format: u32,
    pub color_bytes: u32,
    pub depth_bytes: u32,
    pub pitch: u32,
    pub pitch_zeta: u32,
    pub color_offset: u32,
    pub zeta_offset: u32,
    pub scissor_x: u32,
    pub scissor_width: u32,
    pub scissor_y: u32,
    pub scissor_height: u32,
    pub semaphore_offset: u32,
    pub clear_zeta: u32,
    pub clear_color: u32,
    pub clear_flags: u32,
    /// Every method without dedicated state, by method index.
    pub registers: BTreeMap<u32, u32>,
}

impl Default for D3dState {
    fn default() -> Self {
        Self {
            objects: [0; OBJECT_SLOT_COUNT],
            clip_horizontal: 0,
            clip_vertical: 0,
            surface_format: 0,
            color_bytes: 1,
            depth_bytes: 1,
            pitch: 0,
            pitch_zeta: 0,
            color_offset: 0,
            zeta_offset: 0,
            scissor_x: 0,
            scissor_width: 0,
            scissor_y: 0,
            scissor_height: 0,
            semaphore_offset: 0,
            clear_zeta: 0,
            clear_color: 0,
            clear_flags: 0,
            registers: BTreeMap::new(),
        }
    }
}

impl D3dState {
    pub fn semaphore(&self) -> u32 {
        self.objects[SLOT_SEMAPHORE]
    }

    fn set_format(&mut self, param: u32) {
        self.surface_format = param;
        self.color_bytes = match param & 0xFF {
            0x01..=0x03 => 2,
            _ => 4,
        };
        self.depth_bytes = match (param >> 8) & 0xFF {
            0x01 => 2,
            _ => 4,
        };
    }

    /// Intersects the surface clip rectangle with the scissor. `None` when nothing is left.
    fn scissored_rect(&self) -> Option<(u32, u32, u32, u32)> {
        let (x, width) = split(self.clip_horizontal);
        let (y, height) = split(self.clip_vertical);
        let (x, y) = (x as i32, y as i32);
        let (x2, y2) = (x + width as i32, y + height as i32);
        let sx1 = self.scissor_x as i32;
        let sy1 = self.scissor_y as i32;
        let sx2 = sx1.wrapping_add(self.scissor_width as i32);
        let sy2 = sy1.wrapping_add(self.scissor_height as i32);
        if sx1 >= x2 || sx2 <= x || sy1 >= y2 || sy2 <= y {
            return None;
        }
        let nx = x.max(sx1);
        let ny = y.max(sy1);
        Some((
            nx as u32,
            ny as u32,
            (x2.min(sx2) - nx) as u32,
            (y2.min(sy2) - ny) as u32,
        ))
    }
}

pub fn method(s: &mut D3dState, ctx: &mut RasterCtx<'_>, call: MethodCall) {
    let param = call.param;
    match call.method {
        m @ 0x060..=0x06a => s.objects[(m - OBJECT_SLOT_BASE) as usize] = param,
        mthd::DMA_NOTIFY => s.objects[SLOT_SEMAPHORE] = param,
        mthd::DMA_COLOR => s.objects[SLOT_COLOR] = param,
        mthd::DMA_ZETA => s.objects[SLOT_ZETA] = param,
        mthd::CLIP_HORIZONTAL => s.clip_horizontal = param,
        mthd::CLIP_VERTICAL => s.clip_vertical = param,
        mthd::FORMAT => s.set_format(param),
        mthd::PITCH => s.pitch = param,
        mthd::PITCH_ZETA => s.pitch_zeta = param,
        mthd::OFFSET_COLOR => s.color_offset = param,
        mthd::OFFSET_ZETA => s.zeta_offset = param,
        mthd::SCISSOR_X => s.scissor_x = param,
        mthd::SCISSOR_WIDTH => s.scissor_width = param,
        mthd::SCISSOR_Y => s.scissor_y = param,
        mthd::SCISSOR_HEIGHT => s.scissor_height = param,
        mthd::SEMAPHORE_OFFSET => s.semaphore_offset = param,
        mthd::SEMAPHORE_RELEASE => {
            if s.semaphore() != 0 {
                ctx.dma.write_u32(s.semaphore(), s.semaphore_offset, param);
            }
        }
        mthd::CLEAR_ZETA_VALUE => s.clear_zeta = param,
        mthd::CLEAR_COLOR_VALUE => s.clear_color = param,
        mthd::CLEAR => {
            s.clear_flags = param;
            clear(s, ctx);
        }
        m => {
            s.registers.insert(m, param);
        }
    }
}

/// Target of a clear pass: DMA object, first byte, pitch, and bytes per pixel.
struct ClearTarget {
    object: u32,
    start: u32,
    pitch: u32,
    bytes: u32,
}

fn fill(ctx: &mut RasterCtx<'_>, t: &ClearTarget, width: u32, height: u32, value: u32) {
    let ClearTarget {
        object,
        start,
        pitch,
        bytes,
    } = *t;
    let mut row = start;
    for _ in 0..height {
        for x in 0..width {
            if bytes == 2 {
                ctx.dma.write_u16(object, row.wrapping_add(x * 2), value as u16);
            } else {
                ctx.dma.write_u32(object, row.wrapping_add(x * 4), value);
            }
        }
        row = row.wrapping_add(pitch);
    }
}

fn clear(s: &D3dState, ctx: &mut RasterCtx<'_>) {
    let Some((x, y, width, height)) = s.scissored_rect() else {
        return;
    };
    let semaphore = s.semaphore();
    if semaphore != 0 && ctx.dma.read_u32(semaphore, 0) != 0 {
        tracing::debug!(semaphore = format_args!("0x{semaphore:x}"), "3D clear waiting on semaphore");
        return;
    }
    let target = |object: u32, offset: u32, pitch: u32, bytes: u32| {
        let pitch = pitch & 0xFFFF;
        ClearTarget {
            object,
            start: offset
                .wrapping_add(y.wrapping_mul(pitch))
                .wrapping_add(x.wrapping_mul(bytes)),
            pitch,
            bytes,
        }
    };
    if s.clear_flags & CLEAR_COLOR_MASK != 0 {
        let t = target(s.objects[SLOT_COLOR], s.color_offset, s.pitch, s.color_bytes);
        fill(ctx, &t, width, height, s.clear_color);
        ctx.redraw(t.object, t.start, width, height);
    }
    if s.clear_flags & CLEAR_ZETA != 0 {
        let t = target(s.objects[SLOT_ZETA], s.zeta_offset, s.pitch_zeta, s.depth_bytes);
        fill(ctx, &t, width, height, s.clear_zeta);
    }
    if semaphore != 0 {
        ctx.dma.write_u32(semaphore, 0, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scissor_intersection() {
        let mut s = D3dState {
            clip_horizontal: (100 << 16) | 10,
            clip_vertical: (50 << 16) | 20,
            scissor_x: 0,
            scissor_width: 40,
            scissor_y: 30,
            scissor_height: 100,
            ..D3dState::default()
        };
        assert_eq!(s.scissored_rect(), Some((10, 30, 30, 40)));
        s.scissor_width = 5;
        assert_eq!(s.scissored_rect(), None);
    }

    #[test]
    fn format_selects_byte_counts() {
        let mut s = D3dState::default();
        s.set_format(0x0103);
        assert_eq!((s.color_bytes, s.depth_bytes), (2, 2));
        s.set_format(0x0208);
        assert_eq!((s.color_bytes, s.depth_bytes), (4, 4));
    }
}
