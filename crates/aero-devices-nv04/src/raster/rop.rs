//! Ternary raster operations.
//!
//! Bit `i` of the ROP code gives the result for destination, source and pattern bits where
//! `i = D | S << 1 | P << 2`, so `0xCC` is SRCCOPY, `0xF0` PATCOPY and `0xAA` leaves the
//! destination untouched.

pub const SRCCOPY: u8 = 0xCC;
pub const PATCOPY: u8 = 0xF0;
pub const SRCINVERT: u8 = 0x66;

pub fn uses_pattern(rop: u8) -> bool {
    (rop >> 4) != (rop & 0x0F)
}

pub fn uses_destination(rop: u8) -> bool {
    (rop >> 1) & 0x55 != rop & 0x55
}

/// Applies `rop` bitwise to the low `bytes` bytes of the operands.
pub fn rop3(rop: u8, dst: u32, src: u32, pat: u32, bytes: u32) -> u32 {
    let mut out = 0u32;
    for minterm in 0..8u32 {
        if rop & (1 << minterm) == 0 {
            continue;
        }
        let d = if minterm & 1 != 0 { dst } else { !dst };
        let s = if minterm & 2 != 0 { src } else { !src };
        let p = if minterm & 4 != 0 { pat } else { !pat };
        out |= d & s & p;
    }
    match bytes {
        1 => out & 0xFF,
        2 => out & 0xFFFF,
        3 => out & 0x00FF_FFFF,
        _ => out,
    }
}
