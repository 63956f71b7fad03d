use super::MethodCall;

/// Pattern type selecting the monochrome bitmap.
pub const PATTERN_MONO: u32 = 1;

/// 8x8 pattern (classes 0x18 and 0x44), indexed `y * 8 + x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternState {
    pub shape: u32,
    pub kind: u32,
    pub bg: u32,
    pub fg: u32,
    pub mono: [bool; 64],
    pub color: [u32; 64],
}

impl Default for PatternState {
    fn default() -> Self {
        Self {
            shape: 0,
            kind: 0,
            bg: 0,
            fg: 0,
            mono: [false; 64],
            color: [0; 64],
        }
    }
}

impl PatternState {
    /// Pattern colour for surface pixel `(px, py)`.
    pub fn color_at(&self, px: u32, py: u32) -> u32 {
        let i = ((py % 8) * 8 + px % 8) as usize;
        if self.kind == PATTERN_MONO {
            if self.mono[i] {
                self.fg
            } else {
                self.bg
            }
        } else {
            self.color[i]
        }
    }
}

pub fn method(p: &mut PatternState, call: MethodCall) {
    let param = call.param;
    match call.method {
        0x0c2 => p.shape = param,
        0x0c3 => p.kind = param,
        0x0c4 => p.bg = param,
        0x0c5 => p.fg = param,
        m @ (0x0c6 | 0x0c7) => {
            // Bits arrive MSB-first within each byte.
            let base = ((m & 1) * 32) as usize;
            for i in 0..32u32 {
                p.mono[base + i as usize] = param & (1 << (i ^ 7)) != 0;
            }
        }
        m @ 0x100..=0x10f => {
            let i = ((m - 0x100) * 4) as usize;
            for (k, slot) in p.color[i..i + 4].iter_mut().enumerate() {
                *slot = (param >> (k * 8)) & 0xFF;
            }
        }
        m @ 0x140..=0x15f => {
            let i = ((m - 0x140) * 2) as usize;
            p.color[i] = param & 0xFFFF;
            p.color[i + 1] = param >> 16;
        }
        m @ 0x1c0..=0x1ff => p.color[(m - 0x1c0) as usize] = param,
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
    fn mono_bits_are_msb_first() {
        let mut p = PatternState::default();
        method(&mut p, call(0x0c3, PATTERN_MONO));
        method(&mut p, call(0x0c4, 0x11));
        method(&mut p, call(0x0c5, 0x22));
        method(&mut p, call(0x0c6, 0x0000_0080));
        method(&mut p, call(0x0c7, 0x0100_0000));
        assert!(p.mono[0]);
        assert!(!p.mono[7]);
        assert!(p.mono[32 + 31]);
        assert_eq!(p.color_at(0, 0), 0x22);
        assert_eq!(p.color_at(1, 0), 0x11);
        assert_eq!(p.color_at(7, 7), 0x22);
    }

    #[test]
    fn color_uploads_by_depth() {
        let mut p = PatternState::default();
        method(&mut p, call(0x101, 0x4433_2211));
        assert_eq!(&p.color[4..8], &[0x11, 0x22, 0x33, 0x44]);
        method(&mut p, call(0x15f, 0xBBBB_AAAA));
        assert_eq!(&p.color[62..64], &[0xAAAA, 0xBBBB]);
        method(&mut p, call(0x1c9, 0x00C0_FFEE));
        assert_eq!(p.color_at(1, 1), 0x00C0_FFEE);
    }
}
