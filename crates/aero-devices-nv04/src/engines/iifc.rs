//! Indexed image-from-CPU classes (0x60/0x64): 4- or 8-bit palette indices streamed inline,
//! looked up in a palette held in a DMA object.

use super::{split, MethodCall, Window};
use crate::channel::GraphState;
use crate::raster::color::image_color_bytes;
use crate::raster::RasterCtx;
use crate::transfer::{word_at, WordCollector};

#[derive(Debug, Clone, Default)]
pub struct IifcState {
    pub palette: u32,
    pub operation: u32,
    pub format: u32,
    pub color_bytes: u32,
    pub bpp4: bool,
    pub palette_offset: u32,
    pub point: u32,
    pub dst_size: u32,
    pub src_size: u32,
    pub words: WordCollector,
}

impl IifcState {
    pub fn set_format(&mut self, format: u32) {
        self.format = format;
        match image_color_bytes(0, format) {
            Some(bytes) => self.color_bytes = bytes,
            None => tracing::warn!(format, "unknown IIFC color format"),
        }
    }

    /// Palette index `index` of the streamed symbol buffer.
    fn symbol(&self, words: &[u32], index: u32) -> u32 {
        if self.bpp4 {
            // Nibbles are swapped within each byte.
            let shift = ((index % 8) ^ 1) * 4;
            (word_at(words, index / 8) >> shift) & 0xF
        } else {
            let shift = (index % 4) * 8;
            (word_at(words, index / 4) >> shift) & 0xFF
        }
    }
}

pub fn method(g: &mut GraphState, ctx: &mut RasterCtx<'_>, call: MethodCall) {
    let s = &mut g.iifc;
    let param = call.param;
    match call.method {
        0x061 => s.palette = param,
        0x0f9 => s.operation = param,
        0x0fa => s.set_format(param),
        0x0fb => s.bpp4 = param != 0,
        0x0fc => s.palette_offset = param,
        0x0fd => s.point = param,
        0x0fe => s.dst_size = param,
        0x0ff => {
            s.src_size = param;
            let (width, height) = split(param);
            let bits = u64::from(width) * u64::from(height) * if s.bpp4 { 4 } else { 8 };
            s.words.start(bits.div_ceil(32));
        }
        0x100..=0x7ff => {
            if s.words.push(param) {
                let words = s.words.take();
                draw(g, ctx, &words);
                g.iifc.words.restore(words);
            }
        }
        _ => {}
    }
}

fn draw(g: &GraphState, ctx: &mut RasterCtx<'_>, words: &[u32]) {
    let s = &g.iifc;
    let surf = &g.surf2d;
    let (x0, y0) = split(s.point);
    let (dx, dy) = (i32::from(x0 as u16 as i16), i32::from(y0 as u16 as i16));
    let window = Window {
        x0: g.clip.x as i32 - dx,
        y0: g.clip.y as i32 - dy,
        x1: g.clip.x as i32 - dx + g.clip.width as i32,
        y1: g.clip.y as i32 - dy + g.clip.height as i32,
    };
    let swidth = s.src_size & 0xFFFF;
    let (dwidth, height) = split(s.dst_size);
    let start = surf.dst_offset(dx as u32, dy as u32);
    let mut row = start;
    let mut index = 0u32;
    for y in 0..height {
        for x in 0..dwidth {
            if window.contains(x, y) {
                let symbol = s.symbol(words, index);
                let src = match s.color_bytes {
                    4 => Some(ctx.dma.read_u32(s.palette, s.palette_offset.wrapping_add(symbol * 4))),
                    2 => Some(u32::from(
                        ctx.dma
                            .read_u16(s.palette, s.palette_offset.wrapping_add(symbol * 2)),
                    )),
                    _ => None,
                };
                if let Some(src) = src {
                    let at = ((dx + x as i32) as u32, (dy + y as i32) as u32);
                    ctx.draw_converted(&g.ops, surf, s.operation, row, x, src, s.color_bytes, at);
                }
            }
            index = index.wrapping_add(1);
        }
        index = index.wrapping_add(swidth.wrapping_sub(dwidth));
        row = row.wrapping_add(surf.pitch_dst);
    }
    ctx.redraw(surf.dst, start, dwidth, height);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_unpack_by_depth() {
        let words = [0x7654_3210];
        let mut s = IifcState {
            bpp4: true,
            ..IifcState::default()
        };
        assert_eq!(s.symbol(&words, 0), 0x1);
        assert_eq!(s.symbol(&words, 1), 0x0);
        assert_eq!(s.symbol(&words, 7), 0x6);
        s.bpp4 = false;
        assert_eq!(s.symbol(&words, 1), 0x32);
        assert_eq!(s.symbol(&words, 4), 0);
    }
}
