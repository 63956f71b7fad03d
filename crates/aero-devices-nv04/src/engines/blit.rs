//! Image blit class (0x5f): screen-to-screen rectangle copy.

use super::{is_null_object, split, MethodCall};
use crate::channel::GraphState;
use crate::raster::RasterCtx;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageBlitState {
    pub color_key: bool,
    pub operation: u32,
    pub src_yx: u32,
    pub dst_yx: u32,
    pub size: u32,
}

pub fn method(g: &mut GraphState, ctx: &mut RasterCtx<'_>, call: MethodCall) {
    let b = &mut g.blit;
    match call.method {
        0x061 => b.color_key = !is_null_object(ctx, call.param),
        0x0bf => b.operation = call.param,
        0x0c0 => b.src_yx = call.param,
        0x0c1 => b.dst_yx = call.param,
        0x0c2 => {
            b.size = call.param;
            copy_area(g, ctx);
        }
        _ => {}
    }
}

/// Copies between two rectangles of the 2D surfaces. Rows and columns are walked away from the
/// overlap so a rectangle moved onto itself reads each source pixel before it is overwritten.
fn copy_area(g: &GraphState, ctx: &mut RasterCtx<'_>) {
    let b = &g.blit;
    let surf = &g.surf2d;
    let bytes = surf.color_bytes;
    let (sx, sy) = split(b.src_yx);
    let (dx, dy) = split(b.dst_yx);
    let (width, height) = split(b.size);
    if width == 0 || height == 0 {
        return;
    }
    let backwards_x = dx > sx;
    let backwards_y = dy > sy;
    let first_row = if backwards_y { height - 1 } else { 0 };
    let mut src_row = surf
        .offset_src
        .wrapping_add((sy + first_row).wrapping_mul(surf.pitch_src))
        .wrapping_add(sx.wrapping_mul(bytes));
    let mut dst_row = surf.dst_offset(dx, dy + first_row);
    let key = if b.color_key {
        g.chroma.key(bytes)
    } else {
        None
    };
    for y in 0..height {
        let row = if backwards_y { height - 1 - y } else { y };
        for x in 0..width {
            let col = if backwards_x { width - 1 - x } else { x };
            let src = ctx.get_pixel(surf.src, src_row, col, bytes);
            if key == Some(src) {
                continue;
            }
            ctx.draw_pixel(&g.ops, surf, b.operation, dst_row, col, src, (dx + col, dy + row));
        }
        if backwards_y {
            src_row = src_row.wrapping_sub(surf.pitch_src);
            dst_row = dst_row.wrapping_sub(surf.pitch_dst);
        } else {
            src_row = src_row.wrapping_add(surf.pitch_src);
            dst_row = dst_row.wrapping_add(surf.pitch_dst);
        }
    }
    ctx.redraw(surf.dst, surf.dst_offset(dx, dy), width, height);
}
