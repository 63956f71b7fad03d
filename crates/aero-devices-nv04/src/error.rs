/// Protocol violations that fail a channel.
///
/// These are raised by the FIFO puller and the method dispatcher when the guest's command stream
/// or object table is inconsistent. The device marks the offending channel errored, stops its
/// puller and raises `PFIFO_INTR.DMA_PUSHER`; other channels keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChannelFault {
    #[error("RAMHT has no object for handle 0x{handle:08x} on channel {chid}")]
    RamhtMiss { handle: u32, chid: u32 },

    #[error("call to 0x{target:08x} while a call returning to 0x{return_to:08x} is active")]
    NestedCall { target: u32, return_to: u32 },

    #[error("return with no active call")]
    ReturnWithoutCall,

    #[error("malformed FIFO control word 0x{0:08x}")]
    MalformedControlWord(u32),
}

/// Reasons a DMA access was rejected. The access is dropped (writes) or reads back as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DmaFault {
    #[error("DMA object 0x{instance:x} lies outside instance memory")]
    DescriptorOutOfRange { instance: u32 },

    #[error(
        "{width}-byte access at offset 0x{offset:x} exceeds limit 0x{limit:x} of DMA object 0x{instance:x}"
    )]
    LimitExceeded {
        instance: u32,
        offset: u32,
        width: u32,
        limit: u32,
    },

    #[error("page table entry {page} of DMA object 0x{instance:x} lies outside instance memory")]
    PageTableOutOfRange { instance: u32, page: u64 },

    #[error("{width}-byte access at VRAM address 0x{address:x} is out of range")]
    VramOutOfRange { address: u64, width: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RamhtError {
    #[error("RAMHT is full ({slots} slots)")]
    Full { slots: u32 },

    #[error("RAMHT at 0x{base:x} does not fit in instance memory")]
    OutOfRange { base: u32 },
}
