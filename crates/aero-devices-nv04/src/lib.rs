//! NV04 (RIVA TNT / TNT2) command-execution engine.
//!
//! The crate models the part of the card that turns guest command streams into pixels:
//! - per-channel push buffers fetched through DMA objects and decoded by the FIFO puller,
//! - the RAMHT object table and RAMFC channel contexts living at the top of VRAM,
//! - the 2D raster engine classes (rectangles, blits, image uploads, scaled copies, memory
//!   transfers) plus the D3D5 clear path,
//! - notifiers, the software-method ring, cross-channel semaphores and vblank pacing.
//!
//! The main entry point is [`device::Nv04Device`], which exposes BAR0 MMIO register handling, the
//! BAR1 VRAM aperture and an interrupt line driven by an externally supplied `now_ns` clock. The
//! host provides guest memory through [`MemoryBus`] and receives dirty rectangles through
//! [`DisplaySink`].
#![forbid(unsafe_code)]

pub mod bus;
pub mod channel;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod dma;
pub mod engines;
pub mod error;
pub mod executor;
pub mod fifo;
pub mod host;
pub mod puller;
pub mod ramfc;
pub mod ramht;
pub mod raster;
pub mod regs;
pub mod semaphore;
pub mod timer;
pub mod transfer;
pub mod vblank;
pub mod vram;

pub use bus::{MemoryBus, OpenBus};
pub use channel::{Channel, GraphState};
pub use config::{CardModel, Nv04DeviceConfig};
pub use device::Nv04Device;
pub use dma::{write_dma_object, DmaFlags, DmaObject, DmaSpace};
pub use error::{ChannelFault, DmaFault, RamhtError};
pub use executor::{Dispatch, ExecEnv, Nv04Executor};
pub use host::{
    Clock, DirtyRegion, DisplaySink, InstantClock, LegacyVga, ManualClock, NullDisplaySink,
    NullLegacyVga, RecordingDisplaySink,
};
pub use ramht::{ObjectContext, RamhtConfig};
pub use regs::{mmio, pmc_intr};
pub use vram::Vram;
