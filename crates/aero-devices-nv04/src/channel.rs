//! Per-channel state: subchannel bindings, call stack, puller position and the latched state of
//! every graphics class.

use crate::engines::blit::ImageBlitState;
use crate::engines::context::{ChromaKey, ClipRect};
use crate::engines::d3d::D3dState;
use crate::engines::gdi::GdiState;
use crate::engines::ifc::IfcState;
use crate::engines::iifc::IifcState;
use crate::engines::m2mf::M2mfState;
use crate::engines::sifc::SifcState;
use crate::engines::sifm::SifmState;
use crate::engines::surface::{Surface2d, SwizzledSurface};
use crate::engines::tfc::TfcState;
use crate::fifo::PullerState;
use crate::raster::RasterOps;

pub const SUBCHANNEL_COUNT: usize = 8;

/// Graphics state shared by all objects bound on one channel. Each class owns the fields it
/// latches. The clip rectangle, raster ops and surfaces are read by several classes.
#[derive(Debug, Clone, Default)]
pub struct GraphState {
    pub clip: ClipRect,
    pub ops: RasterOps,
    pub chroma: ChromaKey,
    pub surf2d: Surface2d,
    pub swizzled: SwizzledSurface,
    pub gdi: GdiState,
    pub blit: ImageBlitState,
    pub ifc: IfcState,
    pub iifc: IifcState,
    pub sifc: SifcState,
    pub tfc: TfcState,
    pub sifm: SifmState,
    pub m2mf: M2mfState,
    pub d3d: D3dState,
}

/// Object bound to a subchannel by method 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Binding {
    /// RAMIN offset of the object.
    pub object: u32,
    pub engine: u8,
    /// RAMIN offset of the notifier DMA object.
    pub notifier: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Channel {
    /// Return address of the active call, if any. One level of nesting only.
    pub subroutine: Option<u32>,
    pub puller: PullerState,
    pub subchannels: [Binding; SUBCHANNEL_COUNT],
    /// A notify was requested by method 0x041 and fires after the next class method.
    pub notify_pending: bool,
    /// The pending notify also raises the graphics interrupt.
    pub notify_interrupt: bool,
    /// Set when a protocol violation failed the channel. Cleared by acknowledging
    /// `PFIFO_INTR.DMA_PUSHER`.
    pub errored: bool,
    pub graph: GraphState,
}

impl Channel {
    /// Clears the channel's failure state, the pending subroutine return and any half-decoded
    /// method run.
    pub fn recover(&mut self) {
        self.errored = false;
        self.subroutine = None;
        self.puller = PullerState::AwaitingControlWord;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_channel_has_unit_byte_counts() {
        let ch = Channel::default();
        assert_eq!(ch.graph.surf2d.color_bytes, 1);
        assert_eq!(ch.graph.swizzled.color_bytes, 1);
        assert_eq!(ch.graph.d3d.color_bytes, 1);
        assert_eq!(ch.graph.d3d.depth_bytes, 1);
        assert_eq!(ch.subroutine, None);
        assert_eq!(ch.puller, PullerState::AwaitingControlWord);
    }
}
