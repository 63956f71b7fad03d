//! Raster engine classes.
//!
//! A bound graphics object's class byte picks an [`EngineClass`]. Each class owns a method map
//! over its slice of [`GraphState`] and may run a raster primitive when the method that completes
//! a command arrives.

pub mod blit;
pub mod context;
pub mod d3d;
pub mod gdi;
pub mod ifc;
pub mod iifc;
pub mod m2mf;
pub mod pattern;
pub mod sifc;
pub mod sifm;
pub mod surface;
pub mod tfc;

use crate::channel::GraphState;
use crate::raster::RasterCtx;

/// One decoded method as seen by a class handler. Handle-carrying parameters (methods
/// `0x060..=0x07f`) have already been translated to instance offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodCall {
    pub chid: u32,
    pub subchannel: u32,
    pub method: u32,
    pub param: u32,
    /// Notifier bound to the subchannel.
    pub notifier: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineClass {
    Clip,
    MemoryToMemory,
    Rop,
    Pattern,
    Gdi,
    SwizzledSurface,
    Chroma,
    ImageBlit,
    Ifc,
    Surface2d,
    Iifc,
    Sifc,
    Beta,
    TextureFromCpu,
    Sifm,
    D3d,
}

impl EngineClass {
    pub fn from_class(class: u8) -> Option<Self> {
        Some(match class {
            0x19 => EngineClass::Clip,
            0x39 => EngineClass::MemoryToMemory,
            0x43 => EngineClass::Rop,
            0x18 | 0x44 => EngineClass::Pattern,
            0x4a | 0x4b => EngineClass::Gdi,
            0x52 => EngineClass::SwizzledSurface,
            0x57 => EngineClass::Chroma,
            0x5f => EngineClass::ImageBlit,
            0x21 | 0x61 | 0x65 => EngineClass::Ifc,
            0x42 | 0x62 => EngineClass::Surface2d,
            0x60 | 0x64 => EngineClass::Iifc,
            0x66 | 0x76 => EngineClass::Sifc,
            0x72 => EngineClass::Beta,
            0x7b => EngineClass::TextureFromCpu,
            0x89 => EngineClass::Sifm,
            0x55 => EngineClass::D3d,
            _ => return None,
        })
    }

    pub fn execute(self, g: &mut GraphState, ctx: &mut RasterCtx<'_>, call: MethodCall) {
        match self {
            EngineClass::Clip => context::clip_method(g, call),
            EngineClass::MemoryToMemory => m2mf::method(g, ctx, call),
            EngineClass::Rop => context::rop_method(g, call),
            EngineClass::Pattern => pattern::method(&mut g.ops.pattern, call),
            EngineClass::Gdi => gdi::method(g, ctx, call),
            EngineClass::SwizzledSurface => surface::swizzled_method(&mut g.swizzled, call),
            EngineClass::Chroma => context::chroma_method(g, call),
            EngineClass::ImageBlit => blit::method(g, ctx, call),
            EngineClass::Ifc => ifc::method(g, ctx, call),
            EngineClass::Surface2d => surface::surface2d_method(g, call),
            EngineClass::Iifc => iifc::method(g, ctx, call),
            EngineClass::Sifc => sifc::method(g, ctx, call),
            EngineClass::Beta => context::beta_method(g, call),
            EngineClass::TextureFromCpu => tfc::method(g, ctx, call),
            EngineClass::Sifm => sifm::method(g, ctx, call),
            EngineClass::D3d => d3d::method(&mut g.d3d, ctx, call),
        }
    }
}

/// Whether the object at `instance` is the null object (class byte `0x30`).
pub(crate) fn is_null_object(ctx: &RasterCtx<'_>, instance: u32) -> bool {
    ctx.dma.class_of(instance) == crate::dma::NULL_OBJECT_CLASS
}

/// Splits a `hi << 16 | lo` parameter into `(lo, hi)`.
pub(crate) fn split(param: u32) -> (u32, u32) {
    (param & 0xFFFF, param >> 16)
}

/// Clip window of a primitive in coordinates relative to its origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Window {
    pub fn contains(&self, x: u32, y: u32) -> bool {
        let (x, y) = (x as i32, y as i32);
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_bytes_route_to_engines() {
        assert_eq!(EngineClass::from_class(0x4a), Some(EngineClass::Gdi));
        assert_eq!(EngineClass::from_class(0x42), Some(EngineClass::Surface2d));
        assert_eq!(EngineClass::from_class(0x21), Some(EngineClass::Ifc));
        assert_eq!(EngineClass::from_class(0x76), Some(EngineClass::Sifc));
        assert_eq!(EngineClass::from_class(0x48), None);
        assert_eq!(EngineClass::from_class(0x30), None);
    }

    #[test]
    fn window_bounds_are_half_open() {
        let w = Window {
            x0: -2,
            y0: 0,
            x1: 3,
            y1: 1,
        };
        assert!(w.contains(0, 0));
        assert!(w.contains(2, 0));
        assert!(!w.contains(3, 0));
        assert!(!w.contains(0, 1));
    }
}
