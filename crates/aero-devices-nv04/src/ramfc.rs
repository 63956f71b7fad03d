//! RAMFC: per-channel save area for the live FIFO cursor registers.

use crate::vram::Vram;

pub const RAMFC_CHANNEL_STRIDE: u32 = 0x80;

pub const SLOT_DMA_PUT: u32 = 0x00;
pub const SLOT_DMA_GET: u32 = 0x04;
pub const SLOT_REF_CNT: u32 = 0x08;
pub const SLOT_DMA_INSTANCE: u32 = 0x0C;
pub const SLOT_SEMAPHORE: u32 = 0x30;

/// RAMIN offset of `slot` in channel `chid`'s save area. `reg` is `PFIFO_RAMFC`.
pub fn ramfc_address(reg: u32, chid: u32, slot: u32) -> u32 {
    ((reg & 0xFFF) << 16) + chid * RAMFC_CHANNEL_STRIDE + slot
}

/// The cursor registers that follow the active channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FifoContext {
    pub dma_put: u32,
    pub dma_get: u32,
    pub ref_cnt: u32,
    pub dma_instance: u32,
    pub semaphore: u32,
}

impl FifoContext {
    pub fn save(&self, vram: &mut Vram, reg: u32, chid: u32) {
        vram.ramin_write32(ramfc_address(reg, chid, SLOT_DMA_PUT), self.dma_put);
        vram.ramin_write32(ramfc_address(reg, chid, SLOT_DMA_GET), self.dma_get);
        vram.ramin_write32(ramfc_address(reg, chid, SLOT_REF_CNT), self.ref_cnt);
        vram.ramin_write32(ramfc_address(reg, chid, SLOT_DMA_INSTANCE), self.dma_instance);
        vram.ramin_write32(ramfc_address(reg, chid, SLOT_SEMAPHORE), self.semaphore);
    }

    pub fn load(vram: &Vram, reg: u32, chid: u32) -> Self {
        Self {
            dma_put: vram.ramin_read32(ramfc_address(reg, chid, SLOT_DMA_PUT)),
            dma_get: vram.ramin_read32(ramfc_address(reg, chid, SLOT_DMA_GET)),
            ref_cnt: vram.ramin_read32(ramfc_address(reg, chid, SLOT_REF_CNT)),
            dma_instance: vram.ramin_read32(ramfc_address(reg, chid, SLOT_DMA_INSTANCE)),
            semaphore: vram.ramin_read32(ramfc_address(reg, chid, SLOT_SEMAPHORE)),
        }
    }
}

pub fn read_slot(vram: &Vram, reg: u32, chid: u32, slot: u32) -> u32 {
    vram.ramin_read32(ramfc_address(reg, chid, slot))
}

pub fn write_slot(vram: &mut Vram, reg: u32, chid: u32, slot: u32, value: u32) {
    vram.ramin_write32(ramfc_address(reg, chid, slot), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn address_uses_64k_units_and_channel_stride() {
        assert_eq!(ramfc_address(0x0001, 0, SLOT_DMA_PUT), 0x1_0000);
        assert_eq!(ramfc_address(0x0001, 3, SLOT_SEMAPHORE), 0x1_0000 + 3 * 0x80 + 0x30);
        assert_eq!(ramfc_address(0xF001, 1, SLOT_DMA_GET), 0x1_0084);
    }

    #[test]
    fn save_then_load() {
        let mut vram = Vram::new(1 << 20);
        let ctx = FifoContext {
            dma_put: 0x100,
            dma_get: 0x40,
            ref_cnt: 7,
            dma_instance: 0x1234,
            semaphore: 0x0050_0111,
        };
        ctx.save(&mut vram, 0x0001, 5);
        assert_eq!(FifoContext::load(&vram, 0x0001, 5), ctx);
        assert_eq!(FifoContext::load(&vram, 0x0001, 4), FifoContext::default());
        assert_eq!(read_slot(&vram, 0x0001, 5, SLOT_REF_CNT), 7);
    }
}
