//! DMA object translation.
//!
//! A DMA object is a descriptor in RAMIN:
//!
//! | word | contents |
//! |---|---|
//! | 0 | flags: class (bits 0..11), page table present/linear (12, 13), target (16, 17), base adjust (20..31) |
//! | 1 | limit: last valid byte offset |
//! | 2.. | page table entries (paged objects) or the base frame (linear objects) |
//!
//! Every access is checked against the object's limit and, for VRAM targets, against the VRAM
//! size before any byte is touched. Rejected reads return zero and rejected writes are dropped.

use bitflags::bitflags;

use crate::bus::MemoryBus;
use crate::error::DmaFault;
use crate::vram::Vram;

pub const PAGE_SIZE: u32 = 0x1000;
const PAGE_MASK: u32 = !(PAGE_SIZE - 1);

/// Class byte of the null DMA object; notifiers and color keys bound to it are disabled.
pub const NULL_OBJECT_CLASS: u8 = 0x30;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DmaFlags: u32 {
        const PAGE_TABLE_PRESENT = 1 << 12;
        const PAGE_TABLE_LINEAR = 1 << 13;
        const TARGET_HOST = 1 << 17;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaTarget {
    Vram,
    Host,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaAddress {
    pub target: DmaTarget,
    pub address: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaObject {
    pub instance: u32,
    pub flags: DmaFlags,
    pub limit: u32,
    pub frame: u32,
}

impl DmaObject {
    pub fn load(vram: &Vram, instance: u32) -> Result<Self, DmaFault> {
        if !vram.ramin_contains(instance, 12) {
            return Err(DmaFault::DescriptorOutOfRange { instance });
        }
        Ok(Self {
            instance,
            flags: DmaFlags::from_bits_retain(vram.ramin_read32(instance)),
            limit: vram.ramin_read32(instance + 4),
            frame: vram.ramin_read32(instance + 8),
        })
    }

    pub fn class(&self) -> u8 {
        self.flags.bits() as u8
    }

    pub fn adjust(&self) -> u32 {
        self.flags.bits() >> 20
    }

    pub fn target(&self) -> DmaTarget {
        if self.flags.contains(DmaFlags::TARGET_HOST) {
            DmaTarget::Host
        } else {
            DmaTarget::Vram
        }
    }

    pub fn is_linear(&self) -> bool {
        self.flags.contains(DmaFlags::PAGE_TABLE_LINEAR)
    }

    pub fn translate(&self, vram: &Vram, offset: u32, width: u32) -> Result<DmaAddress, DmaFault> {
        let last = u64::from(offset) + u64::from(width.max(1)) - 1;
        if last > u64::from(self.limit) {
            return Err(DmaFault::LimitExceeded {
                instance: self.instance,
                offset,
                width,
                limit: self.limit,
            });
        }

        let adjusted = u64::from(offset) + u64::from(self.adjust());
        let address = if self.is_linear() {
            u64::from(self.frame & PAGE_MASK) + adjusted
        } else {
            let page = adjusted >> 12;
            let pte = u64::from(self.instance) + 8 + page * 4;
            let pte = u32::try_from(pte)
                .ok()
                .filter(|&pte| vram.ramin_contains(pte, 4))
                .ok_or(DmaFault::PageTableOutOfRange {
                    instance: self.instance,
                    page,
                })?;
            u64::from(vram.ramin_read32(pte) & PAGE_MASK) | (adjusted & 0xFFF)
        };

        let target = self.target();
        if target == DmaTarget::Vram && !vram.contains(address, width) {
            return Err(DmaFault::VramOutOfRange { address, width });
        }
        Ok(DmaAddress { target, address })
    }
}

/// The memory spaces a DMA object can reach: device VRAM and guest physical memory.
pub struct DmaSpace<'a> {
    pub vram: &'a mut Vram,
    pub host: &'a mut dyn MemoryBus,
}

impl<'a> DmaSpace<'a> {
    pub fn new(vram: &'a mut Vram, host: &'a mut dyn MemoryBus) -> Self {
        Self { vram, host }
    }

    pub fn ramin_read32(&self, offset: u32) -> u32 {
        self.vram.ramin_read32(offset)
    }

    /// Class byte of the object at `instance`.
    pub fn class_of(&self, instance: u32) -> u8 {
        self.vram.ramin_read32(instance) as u8
    }

    pub fn translate(&self, object: u32, offset: u32, width: u32) -> Result<DmaAddress, DmaFault> {
        DmaObject::load(self.vram, object)?.translate(self.vram, offset, width)
    }

    pub fn try_read(&mut self, object: u32, offset: u32, buf: &mut [u8]) -> Result<(), DmaFault> {
        let at = self.translate(object, offset, buf.len() as u32)?;
        match at.target {
            DmaTarget::Vram => {
                self.vram.read(at.address, buf);
            }
            DmaTarget::Host => self.host.read_physical(at.address, buf),
        }
        Ok(())
    }

    pub fn try_write(&mut self, object: u32, offset: u32, buf: &[u8]) -> Result<(), DmaFault> {
        let at = self.translate(object, offset, buf.len() as u32)?;
        match at.target {
            DmaTarget::Vram => {
                self.vram.write(at.address, buf);
            }
            DmaTarget::Host => self.host.write_physical(at.address, buf),
        }
        Ok(())
    }

    fn read_or_zero<const N: usize>(&mut self, object: u32, offset: u32) -> [u8; N] {
        let mut buf = [0u8; N];
        if let Err(err) = self.try_read(object, offset, &mut buf) {
            tracing::debug!(error = %err, "DMA read rejected");
            buf = [0u8; N];
        }
        buf
    }

    fn write_or_drop(&mut self, object: u32, offset: u32, buf: &[u8]) {
        if let Err(err) = self.try_write(object, offset, buf) {
            tracing::debug!(error = %err, "DMA write dropped");
        }
    }

    pub fn read_u8(&mut self, object: u32, offset: u32) -> u8 {
        self.read_or_zero::<1>(object, offset)[0]
    }

    pub fn read_u16(&mut self, object: u32, offset: u32) -> u16 {
        u16::from_le_bytes(self.read_or_zero(object, offset))
    }

    pub fn read_u32(&mut self, object: u32, offset: u32) -> u32 {
        u32::from_le_bytes(self.read_or_zero(object, offset))
    }

    pub fn write_u8(&mut self, object: u32, offset: u32, value: u8) {
        self.write_or_drop(object, offset, &[value]);
    }

    pub fn write_u16(&mut self, object: u32, offset: u32, value: u16) {
        self.write_or_drop(object, offset, &value.to_le_bytes());
    }

    pub fn write_u32(&mut self, object: u32, offset: u32, value: u32) {
        self.write_or_drop(object, offset, &value.to_le_bytes());
    }

    pub fn write_u64(&mut self, object: u32, offset: u32, value: u64) {
        self.write_or_drop(object, offset, &value.to_le_bytes());
    }

    /// Copies `len` bytes between two DMA objects, split so that no chunk crosses a 4 KiB page
    /// of either translated address. Stops at the first rejected chunk.
    pub fn copy(&mut self, dst: u32, dst_offset: u32, src: u32, src_offset: u32, len: u32) {
        let mut buf = [0u8; PAGE_SIZE as usize];
        let mut done = 0u32;
        while done < len {
            let (Some(s), Some(d)) = (src_offset.checked_add(done), dst_offset.checked_add(done))
            else {
                tracing::debug!("DMA copy offset overflow");
                return;
            };
            let chunk = match (self.translate(src, s, 1), self.translate(dst, d, 1)) {
                (Ok(sa), Ok(da)) => {
                    let src_room = PAGE_SIZE - (sa.address as u32 & 0xFFF);
                    let dst_room = PAGE_SIZE - (da.address as u32 & 0xFFF);
                    (len - done).min(src_room).min(dst_room)
                }
                (Err(err), _) | (_, Err(err)) => {
                    tracing::debug!(error = %err, "DMA copy aborted");
                    return;
                }
            };
            let chunk_buf = &mut buf[..chunk as usize];
            let mut result = self.try_read(src, s, chunk_buf);
            if result.is_ok() {
                result = self.try_write(dst, d, chunk_buf);
            }
            if let Err(err) = result {
                tracing::debug!(error = %err, "DMA copy aborted");
                return;
            }
            done += chunk;
        }
    }
}

/// Writes a DMA object descriptor into RAMIN. Host-side helper for building object tables.
pub fn write_dma_object(vram: &mut Vram, instance: u32, flags: u32, limit: u32, frames: &[u32]) {
    vram.ramin_write32(instance, flags);
    vram.ramin_write32(instance + 4, limit);
    for (i, frame) in frames.iter().enumerate() {
        vram.ramin_write32(instance + 8 + i as u32 * 4, *frame);
    }
}
