//! Texture-from-CPU class (0x7b): inline texel upload into a swizzled or linear surface.

use super::{split, MethodCall, Window};
use crate::channel::GraphState;
use crate::raster::color::image_color_bytes;
use crate::raster::RasterCtx;
use crate::transfer::{pixel_at, WordCollector};

/// Size parameter of the 256x256 upload that takes the direct-write path.
const UPLOAD_SIZE: u32 = 0x0100_0100;

#[derive(Debug, Clone, Default)]
pub struct TfcState {
    pub swizzled: bool,
    pub format: u32,
    pub color_bytes: u32,
    pub point: u32,
    pub size: u32,
    pub clip_wx: u32,
    pub clip_hy: u32,
    /// Data words go straight to the destination surface.
    pub upload: bool,
    pub upload_offset: u32,
    pub words: WordCollector,
}

/// Class bytes of objects that address memory in swizzled order.
pub(crate) fn is_swizzled_class(class: u8) -> bool {
    class == 0x52 || class == 0x9e
}

pub fn method(g: &mut GraphState, ctx: &mut RasterCtx<'_>, call: MethodCall) {
    let s = &mut g.tfc;
    let param = call.param;
    match call.method {
        0x061 => s.swizzled = is_swizzled_class(ctx.dma.class_of(param)),
        0x0c0 => {
            s.format = param;
            match image_color_bytes(0, param) {
                Some(bytes) => s.color_bytes = bytes,
                None => tracing::warn!(format = param, "unknown TFC color format"),
            }
        }
        0x0c1 => s.point = param,
        0x0c2 => {
            s.size = param;
            let surf = &g.surf2d;
            // A full 256x256 A8R8G8B8 upload into a 1 KiB-pitch surface is a plain linear copy.
            s.upload = param == UPLOAD_SIZE
                && s.point == 0
                && s.format == 4
                && surf.format == 0xA
                && surf.pitch_src == 0x400
                && surf.pitch_dst == 0x400;
            if s.upload {
                s.upload_offset = surf.offset_dst;
                s.words.start(0);
            } else {
                let (width, height) = split(param);
                let bytes = u64::from(width) * u64::from(height) * u64::from(s.color_bytes);
                s.words.start(bytes.div_ceil(4));
            }
        }
        0x0c3 => s.clip_wx = param,
        0x0c4 => s.clip_hy = param,
        0x100..=0x7ff => {
            if s.upload {
                ctx.dma.write_u32(g.surf2d.dst, s.upload_offset, param);
                s.upload_offset = s.upload_offset.wrapping_add(4);
            } else if s.words.push(param) {
                let words = s.words.take();
                draw(g, ctx, &words);
                g.tfc.words.restore(words);
            }
        }
        _ => {}
    }
}

fn draw(g: &GraphState, ctx: &mut RasterCtx<'_>, words: &[u32]) {
    let s = &g.tfc;
    let (dx, dy) = split(s.point);
    let (clip_x, clip_w) = split(s.clip_wx);
    let (clip_y, clip_h) = split(s.clip_hy);
    let x0 = clip_x as i32 - dx as i32;
    let y0 = clip_y as i32 - dy as i32;
    let window = Window {
        x0,
        y0,
        x1: x0 + clip_w as i32,
        y1: y0 + clip_h as i32,
    };
    let (width, height) = split(s.size);
    let texel_bytes = if s.color_bytes == 4 { 4 } else { 2 };
    let surf = &g.surf2d;
    let mut row = surf.dst_offset(dx, dy);
    let mut index = 0u32;
    for y in 0..height {
        for x in 0..width {
            if window.contains(x, y) {
                let src = pixel_at(words, index, texel_bytes);
                if s.swizzled {
                    let offset = g.swizzled.texel_offset(x + dx, y + dy);
                    ctx.put_texel(&g.swizzled, offset, src);
                } else {
                    ctx.put_pixel(surf, row, x, src);
                }
            }
            index = index.wrapping_add(1);
        }
        row = row.wrapping_add(surf.pitch_dst);
    }
}
