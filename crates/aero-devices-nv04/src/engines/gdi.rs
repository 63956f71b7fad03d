//! GDI rectangle-and-text class (0x4a/0x4b): solid fills and monochrome bitmap expansion.

use super::{split, MethodCall, Window};
use crate::channel::GraphState;
use crate::raster::color::rgb565_to_888;
use crate::raster::RasterCtx;
use crate::transfer::{word_at, WordCollector};

/// Mono format that stores bitmap bits MSB-first within each byte.
pub const MONO_FORMAT_CGA6: u32 = 1;

#[derive(Debug, Clone, Default)]
pub struct GdiState {
    pub operation: u32,
    pub color_format: u32,
    pub mono_format: u32,
    pub rect_color: u32,
    pub rect_xy: u32,
    pub rect_yx0: u32,
    pub clip_yx0: u32,
    pub clip_yx1: u32,
    pub fg: u32,
    pub bg: u32,
    pub image_swh: u32,
    pub image_dwh: u32,
    pub image_xy: u32,
    /// Whether the pending bitmap paints background pixels too.
    pub opaque: bool,
    pub words: WordCollector,
}

fn signed16(v: u32) -> i32 {
    i32::from(v as u16 as i16)
}

pub fn method(g: &mut GraphState, ctx: &mut RasterCtx<'_>, call: MethodCall) {
    let param = call.param;
    let gdi = &mut g.gdi;
    match call.method {
        0x0bf => gdi.operation = param,
        0x0c0 => gdi.color_format = param,
        0x0c1 => gdi.mono_format = param,
        0x0ff | 0x17f => gdi.rect_color = param,
        m @ 0x100..=0x13f => {
            if m & 1 == 0 {
                gdi.rect_xy = param;
            } else {
                // x is the high half here, unlike every other GDI point.
                let (dy, dx) = split(gdi.rect_xy);
                let (height, width) = split(param);
                fill_rect(g, ctx, signed16(dx), signed16(dy), width, height, None);
            }
        }
        0x17d | 0x1fb | 0x2f9 | 0x3fd => gdi.clip_yx0 = param,
        0x17e | 0x1fc | 0x2fa | 0x3fe => gdi.clip_yx1 = param,
        m @ 0x180..=0x1bf => {
            if m & 1 == 0 {
                gdi.rect_yx0 = param;
            } else {
                let (x0, y0) = split(gdi.rect_yx0);
                let (dx, dy) = (signed16(x0), signed16(y0));
                let (x1, y1) = split(param);
                let width = u32::from((x1 as i32 - dx) as u16);
                let height = u32::from((y1 as i32 - dy) as u16);
                let window = clip_window(gdi.clip_yx0, gdi.clip_yx1, dx, dy);
                fill_rect(g, ctx, dx, dy, width, height, Some(window));
            }
        }
        0x1fd | 0x2fc | 0x3ff => gdi.fg = param,
        0x1fe | 0x2fd => gdi.image_swh = param,
        0x2fb => gdi.bg = param,
        0x2fe => gdi.image_dwh = param,
        0x1ff | 0x2ff => {
            gdi.image_xy = param;
            let (width, height) = split(gdi.image_swh);
            let bits = u64::from(width) * u64::from(height);
            gdi.words.start(bits.div_ceil(32));
        }
        m @ (0x200..=0x27f | 0x300..=0x37f) => {
            // The data range, not the start method, picks transparent or opaque expansion.
            gdi.opaque = m >= 0x300;
            if gdi.words.push(param) {
                let words = gdi.words.take();
                blit(g, ctx, &words);
                g.gdi.words.restore(words);
            }
        }
        _ => {}
    }
}

fn clip_window(yx0: u32, yx1: u32, dx: i32, dy: i32) -> Window {
    let (x0, y0) = split(yx0);
    let (x1, y1) = split(yx1);
    Window {
        x0: signed16(x0) - dx,
        y0: signed16(y0) - dy,
        x1: signed16(x1) - dx,
        y1: signed16(y1) - dy,
    }
}

fn fill_rect(
    g: &GraphState,
    ctx: &mut RasterCtx<'_>,
    dx: i32,
    dy: i32,
    width: u32,
    height: u32,
    window: Option<Window>,
) {
    let surf = &g.surf2d;
    let start = surf.dst_offset(dx as u32, dy as u32);
    let color = g.gdi.rect_color;
    let mut row = start;
    for y in 0..height {
        for x in 0..width {
            if window.is_some_and(|w| !w.contains(x, y)) {
                continue;
            }
            let at = ((dx + x as i32) as u32, (dy + y as i32) as u32);
            ctx.draw_pixel(&g.ops, surf, g.gdi.operation, row, x, color, at);
        }
        row = row.wrapping_add(surf.pitch_dst);
    }
    ctx.redraw(surf.dst, start, width, height);
}

fn blit(g: &GraphState, ctx: &mut RasterCtx<'_>, words: &[u32]) {
    let gdi = &g.gdi;
    let surf = &g.surf2d;
    let (x0, y0) = split(gdi.image_xy);
    let (dx, dy) = (signed16(x0), signed16(y0));
    let window = clip_window(gdi.clip_yx0, gdi.clip_yx1, dx, dy);
    let (swidth, height) = split(gdi.image_swh);
    let dwidth = if gdi.opaque {
        gdi.image_dwh & 0xFFFF
    } else {
        swidth
    };
    let (mut fg, mut bg) = (gdi.fg, gdi.bg);
    if surf.color_bytes == 4 && gdi.color_format != 3 {
        fg = rgb565_to_888(fg);
        bg = rgb565_to_888(bg);
    }
    let start = surf.dst_offset(dx as u32, dy as u32);
    let mut row = start;
    let mut bit_index = 0u32;
    for y in 0..height {
        for x in 0..dwidth {
            if window.contains(x, y) {
                let mut bit = bit_index % 32;
                if gdi.mono_format == MONO_FORMAT_CGA6 {
                    bit ^= 7;
                }
                let word = word_at(words, bit_index / 32);
                let set = (word >> bit) & 1 != 0;
                if set || gdi.opaque {
                    let src = if set { fg } else { bg };
                    let at = ((dx + x as i32) as u32, (dy + y as i32) as u32);
                    ctx.draw_pixel(&g.ops, surf, gdi.operation, row, x, src, at);
                }
            }
            bit_index = bit_index.wrapping_add(1);
        }
        bit_index = bit_index.wrapping_add(swidth.wrapping_sub(dwidth));
        row = row.wrapping_add(surf.pitch_dst);
    }
    ctx.redraw(surf.dst, start, dwidth, height);
}
