//! Small context classes that only latch state for the drawing classes: clip rectangle, ROP,
//! beta factors and chroma key.

use super::MethodCall;
use crate::channel::GraphState;

/// Shared clip rectangle (class 0x19).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Transparent colour (class 0x57).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChromaKey {
    pub format: u32,
    pub color: u32,
}

impl ChromaKey {
    /// Key for `bytes`-wide pixels. The key is live only when some bit above the pixel width is
    /// set.
    pub fn key(&self, bytes: u32) -> Option<u32> {
        let mask = match bytes {
            4 => 0x00FF_FFFF,
            2 => 0x0000_FFFF,
            _ => 0x0000_00FF,
        };
        (self.color & !mask != 0).then_some(self.color & mask)
    }
}

pub fn clip_method(g: &mut GraphState, call: MethodCall) {
    match call.method {
        0x0c0 => {
            g.clip.x = call.param & 0xFFFF;
            g.clip.y = call.param >> 16;
        }
        0x0c1 => {
            g.clip.width = call.param & 0xFFFF;
            g.clip.height = call.param >> 16;
        }
        _ => {}
    }
}

pub fn rop_method(g: &mut GraphState, call: MethodCall) {
    if call.method == 0x0c0 {
        g.ops.rop = call.param as u8;
    }
}

pub fn beta_method(g: &mut GraphState, call: MethodCall) {
    if call.method == 0x0c0 {
        g.ops.beta = call.param;
    }
}

pub fn chroma_method(g: &mut GraphState, call: MethodCall) {
    match call.method {
        0x0c0 => g.chroma.format = call.param,
        0x0c1 => g.chroma.color = call.param,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chroma_key_enable_depends_on_width() {
        let key = ChromaKey {
            format: 0,
            color: 0xFF00_1234,
        };
        assert_eq!(key.key(4), Some(0x0000_1234));
        assert_eq!(key.key(2), Some(0x1234));
        assert_eq!(key.key(1), Some(0x34));
        let key = ChromaKey {
            format: 0,
            color: 0x0000_1234,
        };
        assert_eq!(key.key(4), None);
        assert_eq!(key.key(2), None);
        assert_eq!(key.key(1), Some(0x34));
    }
}
