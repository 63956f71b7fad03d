//! Memory-to-memory format class (0x39): strided line copies between two DMA objects.

use super::MethodCall;
use crate::channel::GraphState;
use crate::raster::RasterCtx;

/// DMA target codes (descriptor bits 12..19) of objects that can alias the scanout.
const VISIBLE_TARGETS: [u32; 2] = [0x03, 0x0b];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct M2mfState {
    pub src: u32,
    pub dst: u32,
    pub src_offset: u32,
    pub dst_offset: u32,
    pub src_pitch: u32,
    pub dst_pitch: u32,
    pub line_length: u32,
    pub line_count: u32,
    pub format: u32,
    pub buffer_notify: u32,
}

pub fn method(g: &mut GraphState, ctx: &mut RasterCtx<'_>, call: MethodCall) {
    let s = &mut g.m2mf;
    let param = call.param;
    match call.method {
        0x061 => s.src = param,
        0x062 => s.dst = param,
        0x0c3 => s.src_offset = param,
        0x0c4 => s.dst_offset = param,
        0x0c5 => s.src_pitch = param,
        0x0c6 => s.dst_pitch = param,
        0x0c7 => s.line_length = param,
        0x0c8 => s.line_count = param,
        0x0c9 => s.format = param,
        0x0ca => {
            s.buffer_notify = param;
            copy(s, ctx);
            ctx.write_notifier(call.notifier, 0x10);
        }
        _ => {}
    }
}

fn copy(s: &M2mfState, ctx: &mut RasterCtx<'_>) {
    tracing::trace!(
        src = format_args!("0x{:x}", s.src),
        dst = format_args!("0x{:x}", s.dst),
        lines = s.line_count,
        length = s.line_length,
        "m2mf"
    );
    let mut src_offset = s.src_offset;
    let mut dst_offset = s.dst_offset;
    for _ in 0..s.line_count {
        ctx.dma.copy(s.dst, dst_offset, s.src, src_offset, s.line_length);
        src_offset = src_offset.wrapping_add(s.src_pitch);
        dst_offset = dst_offset.wrapping_add(s.dst_pitch);
    }
    let target = (ctx.dma.ramin_read32(s.dst) >> 12) & 0xFF;
    if VISIBLE_TARGETS.contains(&target) {
        let bytes_per_pixel = ctx.display.bytes_per_pixel().max(1);
        ctx.redraw(s.dst, s.dst_offset, s.line_length / bytes_per_pixel, s.line_count);
    }
}
