//! Image-from-CPU classes (0x21/0x61/0x65): pixels streamed inline through data methods and
//! written row by row as they arrive. The finished rectangle is reported once.

use super::{is_null_object, split, MethodCall, Window};
use crate::channel::GraphState;
use crate::raster::color::image_color_bytes;
use crate::raster::RasterCtx;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IfcState {
    pub color_key: bool,
    pub clip_enabled: bool,
    pub operation: u32,
    pub format: u32,
    /// Bytes per source pixel. Zero until a format has been accepted.
    pub color_bytes: u32,
    pub origin_x: u32,
    pub origin_y: u32,
    pub dst_width: u32,
    pub dst_height: u32,
    pub src_width: u32,
    pub src_height: u32,
    pub window: Window,
    /// Cursor inside the source image.
    pub x: u32,
    pub y: u32,
    /// Destination byte offset of the current row.
    pub row_offset: u32,
    /// Destination byte offset of the rectangle's top-left pixel.
    pub start_offset: u32,
}

impl IfcState {
    pub fn update_color_bytes(&mut self, surface_format: u32) {
        match image_color_bytes(surface_format, self.format) {
            Some(bytes) => self.color_bytes = bytes,
            None => tracing::warn!(format = self.format, "unknown IFC color format"),
        }
    }
}

pub fn method(g: &mut GraphState, ctx: &mut RasterCtx<'_>, call: MethodCall) {
    let ifc = &mut g.ifc;
    let param = call.param;
    match call.method {
        0x061 => ifc.color_key = !is_null_object(ctx, param),
        0x062 => ifc.clip_enabled = !is_null_object(ctx, param),
        0x0bf => ifc.operation = param,
        0x0c0 => {
            ifc.format = param;
            ifc.update_color_bytes(g.surf2d.format);
        }
        0x0c1 => {
            (ifc.origin_x, ifc.origin_y) = split(param);
            ifc.x = 0;
            ifc.y = 0;
            ifc.row_offset = g.surf2d.dst_offset(ifc.origin_x, ifc.origin_y);
            ifc.start_offset = ifc.row_offset;
        }
        0x0c2 => {
            (ifc.dst_width, ifc.dst_height) = split(param);
            let mut window = Window {
                x0: 0,
                y0: 0,
                x1: ifc.dst_width as i32,
                y1: ifc.dst_height as i32,
            };
            if ifc.clip_enabled {
                let clip = g.clip;
                let x0 = clip.x as i32 - ifc.origin_x as i32;
                let y0 = clip.y as i32 - ifc.origin_y as i32;
                window.x0 = window.x0.max(x0);
                window.y0 = window.y0.max(y0);
                window.x1 = window.x1.min(x0 + clip.width as i32);
                window.y1 = window.y1.min(y0 + clip.height as i32);
            }
            ifc.window = window;
        }
        0x0c3 => (ifc.src_width, ifc.src_height) = split(param),
        0x100..=0x7ff => push_word(g, ctx, param),
        _ => {}
    }
}

fn push_word(g: &mut GraphState, ctx: &mut RasterCtx<'_>, word: u32) {
    let GraphState {
        ifc,
        surf2d: surf,
        ops,
        chroma,
        ..
    } = g;
    let bytes = ifc.color_bytes;
    if bytes == 0 {
        tracing::debug!("IFC data before a color format was set");
        return;
    }
    let key = if ifc.color_key { chroma.key(bytes) } else { None };
    for i in 0..4 / bytes {
        if ifc.window.contains(ifc.x, ifc.y) {
            let src = match bytes {
                4 => word,
                2 => (word >> (i * 16)) & 0xFFFF,
                _ => (word >> (i * 8)) & 0xFF,
            };
            if key != Some(src) {
                let at = (ifc.origin_x + ifc.x, ifc.origin_y + ifc.y);
                ctx.draw_converted(ops, surf, ifc.operation, ifc.row_offset, ifc.x, src, bytes, at);
            }
        }
        ifc.x += 1;
        if ifc.x >= ifc.src_width {
            ifc.row_offset = ifc.row_offset.wrapping_add(surf.pitch_dst);
            ifc.x = 0;
            ifc.y += 1;
            if ifc.y == ifc.src_height {
                ctx.redraw(surf.dst, ifc.start_offset, ifc.dst_width, ifc.dst_height);
            }
        }
    }
}
