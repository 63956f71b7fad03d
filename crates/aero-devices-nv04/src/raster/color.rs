/// Expands an R5G6B5 pixel to X8R8G8B8, replicating the top bits into the low bits.
pub fn rgb565_to_888(value: u32) -> u32 {
    let r = (value >> 11) & 0x1F;
    let g = (value >> 5) & 0x3F;
    let b = value & 0x1F;
    let r = (r << 3) | (r >> 2);
    let g = (g << 2) | (g >> 4);
    let b = (b << 3) | (b >> 2);
    (r << 16) | (g << 8) | b
}

pub fn rgb888_to_565(value: u32) -> u32 {
    (((value >> 19) & 0x1F) << 11) | (((value >> 10) & 0x3F) << 5) | ((value >> 3) & 0x1F)
}

/// Bytes per pixel of a 2D surface format (`1` Y8, `4` R5G6B5, `6`/`0xA`/`0xB` 32-bit).
pub fn surface_color_bytes(fmt: u32) -> Option<u32> {
    match fmt {
        0x1 => Some(1),
        0x4 => Some(2),
        0x6 | 0xA | 0xB => Some(4),
        _ => None,
    }
}

/// Bytes per pixel of a swizzled surface format.
pub fn swizzled_color_bytes(fmt: u32) -> Option<u32> {
    match fmt {
        0x1 => Some(1),
        0x2 | 0x4 => Some(2),
        0x6 | 0xA | 0xB => Some(4),
        _ => None,
    }
}

/// Bytes per source pixel of an image-transfer format. An 8-bit destination surface forces
/// 8-bit sources.
pub fn image_color_bytes(surface_fmt: u32, fmt: u32) -> Option<u32> {
    if surface_fmt == 1 {
        return Some(1);
    }
    match fmt {
        1..=3 => Some(2),
        4 | 5 => Some(4),
        _ => None,
    }
}

/// Bytes per source pixel of a scaled-image-from-memory format.
pub fn sifm_color_bytes(fmt: u32) -> Option<u32> {
    match fmt {
        8 => Some(1),
        1 | 2 | 7 => Some(2),
        3 | 4 => Some(4),
        _ => None,
    }
}

/// Offset in texels of `(x, y)` inside a `width` x `height` Morton-swizzled surface. Bits of `x`
/// and `y` interleave, x first, until the shorter dimension runs out.
pub fn swizzle(x: u32, y: u32, width: u32, height: u32) -> u32 {
    let mut xleft = true;
    let mut yleft = true;
    let mut xbit = 1u32;
    let mut ybit = 1u32;
    let mut rbit = 1u32;
    let mut r = 0u32;
    while xleft || yleft {
        if xleft {
            if x & xbit != 0 {
                r |= rbit;
            }
            rbit = rbit.wrapping_shl(1);
            xbit = xbit.wrapping_shl(1);
            xleft = xbit != 0 && xbit < width;
        }
        if yleft {
            if y & ybit != 0 {
                r |= rbit;
            }
            rbit = rbit.wrapping_shl(1);
            ybit = ybit.wrapping_shl(1);
            yleft = ybit != 0 && ybit < height;
        }
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_between_565_and_888() {
        assert_eq!(rgb565_to_888(0xFFFF), 0x00FF_FFFF);
        assert_eq!(rgb565_to_888(0xF800), 0x00FF_0000);
        assert_eq!(rgb888_to_565(0x00FF_0000), 0xF800);
        assert_eq!(rgb888_to_565(rgb565_to_888(0x1234)), 0x1234);
    }

    #[test]
    fn swizzle_interleaves_bits() {
        assert_eq!(swizzle(0, 0, 4, 4), 0);
        assert_eq!(swizzle(1, 0, 4, 4), 1);
        assert_eq!(swizzle(0, 1, 4, 4), 2);
        assert_eq!(swizzle(3, 3, 4, 4), 15);
        // Once y runs out, remaining x bits are packed contiguously.
        assert_eq!(swizzle(4, 1, 8, 2), 0b1010);
    }

    #[test]
    fn format_tables() {
        assert_eq!(surface_color_bytes(0xA), Some(4));
        assert_eq!(surface_color_bytes(2), None);
        assert_eq!(image_color_bytes(1, 4), Some(1));
        assert_eq!(image_color_bytes(0xA, 3), Some(2));
        assert_eq!(image_color_bytes(0xA, 9), None);
        assert_eq!(sifm_color_bytes(7), Some(2));
        assert_eq!(sifm_color_bytes(5), None);
    }
}
