//! Destination surface classes: linear 2D surfaces (0x42/0x62) and swizzled surfaces (0x52).

use super::MethodCall;
use crate::channel::GraphState;
use crate::raster::color::{surface_color_bytes, swizzled_color_bytes};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface2d {
    /// Source DMA object (instance offset).
    pub src: u32,
    /// Destination DMA object (instance offset).
    pub dst: u32,
    pub format: u32,
    pub color_bytes: u32,
    pub pitch_src: u32,
    pub pitch_dst: u32,
    pub offset_src: u32,
    pub offset_dst: u32,
}

impl Default for Surface2d {
    fn default() -> Self {
        Self {
            src: 0,
            dst: 0,
            format: 0,
            color_bytes: 1,
            pitch_src: 0,
            pitch_dst: 0,
            offset_src: 0,
            offset_dst: 0,
        }
    }
}

impl Surface2d {
    /// Destination byte offset of pixel `(x, y)`.
    pub fn dst_offset(&self, x: u32, y: u32) -> u32 {
        self.offset_dst
            .wrapping_add(y.wrapping_mul(self.pitch_dst))
            .wrapping_add(x.wrapping_mul(self.color_bytes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwizzledSurface {
    pub object: u32,
    pub format: u32,
    pub width: u32,
    pub height: u32,
    pub color_bytes: u32,
    pub offset: u32,
}

impl Default for SwizzledSurface {
    fn default() -> Self {
        Self {
            object: 0,
            format: 0,
            width: 0,
            height: 0,
            color_bytes: 1,
            offset: 0,
        }
    }
}

impl SwizzledSurface {
    /// Byte offset of texel `(x, y)`.
    pub fn texel_offset(&self, x: u32, y: u32) -> u32 {
        let index = crate::raster::color::swizzle(x, y, self.width, self.height);
        self.offset.wrapping_add(index.wrapping_mul(self.color_bytes))
    }
}

pub fn surface2d_method(g: &mut GraphState, call: MethodCall) {
    let s = &mut g.surf2d;
    match call.method {
        0x061 => s.src = call.param,
        0x062 => s.dst = call.param,
        0x0c0 => {
            s.format = call.param;
            let Some(bytes) = surface_color_bytes(call.param) else {
                tracing::warn!(format = call.param, "unknown 2D surface color format");
                return;
            };
            let previous = s.color_bytes;
            s.color_bytes = bytes;
            if (previous == 1) != (bytes == 1) {
                g.ifc.update_color_bytes(call.param);
                g.sifc.update_color_bytes(call.param);
            }
        }
        0x0c1 => {
            s.pitch_src = call.param & 0xFFFF;
            s.pitch_dst = call.param >> 16;
        }
        0x0c2 => s.offset_src = call.param,
        0x0c3 => s.offset_dst = call.param,
        _ => {}
    }
}

pub fn swizzled_method(s: &mut SwizzledSurface, call: MethodCall) {
    match call.method {
        0x061 => s.object = call.param,
        0x0c0 => {
            s.format = call.param;
            s.width = 1u32.wrapping_shl((call.param >> 16) & 0xFF);
            s.height = 1u32.wrapping_shl(call.param >> 24);
            match swizzled_color_bytes(call.param & 0xFFFF) {
                Some(bytes) => s.color_bytes = bytes,
                None => tracing::warn!(
                    format = call.param & 0xFFFF,
                    "unknown swizzled surface color format"
                ),
            }
        }
        0x0c1 => s.offset = call.param,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(method: u32, param: u32) -> MethodCall {
        MethodCall {
            chid: 0,
            subchannel: 0,
            method,
            param,
            notifier: 0,
        }
    }

    #[test]
    fn surface_format_and_pitch() {
        let mut g = GraphState::default();
        surface2d_method(&mut g, call(0x0c0, 0x4));
        assert_eq!(g.surf2d.color_bytes, 2);
        surface2d_method(&mut g, call(0x0c0, 0x99));
        assert_eq!(g.surf2d.color_bytes, 2);
        surface2d_method(&mut g, call(0x0c1, 0x0800_0400));
        assert_eq!((g.surf2d.pitch_src, g.surf2d.pitch_dst), (0x400, 0x800));
        surface2d_method(&mut g, call(0x0c3, 0x1000));
        assert_eq!(g.surf2d.dst_offset(2, 3), 0x1000 + 3 * 0x800 + 4);
    }

    #[test]
    fn eight_bit_surface_forces_eight_bit_sources() {
        let mut g = GraphState::default();
        surface2d_method(&mut g, call(0x0c0, 0xA));
        g.ifc.format = 4;
        g.ifc.color_bytes = 4;
        surface2d_method(&mut g, call(0x0c0, 0x1));
        assert_eq!(g.ifc.color_bytes, 1);
        surface2d_method(&mut g, call(0x0c0, 0x6));
        assert_eq!(g.ifc.color_bytes, 4);
    }

    #[test]
    fn swizzled_format_sets_dimensions() {
        let mut s = SwizzledSurface::default();
        swizzled_method(&mut s, call(0x0c0, (4 << 24) | (3 << 16) | 0x4));
        assert_eq!((s.width, s.height, s.color_bytes), (8, 16, 2));
        swizzled_method(&mut s, call(0x0c1, 0x100));
        assert_eq!(s.texel_offset(1, 1), 0x100 + 3 * 2);
    }
}
