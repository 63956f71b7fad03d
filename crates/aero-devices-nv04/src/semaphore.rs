//! Cross-channel semaphore gate (methods 0x018..0x01b).
//!
//! The shadow `semaphore` register packs the semaphore DMA object (RAMIN offset in 16-byte
//! units) in bits 0..19 and the byte offset within it in bits 20..31.

use crate::dma::DmaSpace;

const OBJECT_MASK: u32 = 0x000F_FFFF;

/// RAMIN offset of the bound semaphore object.
pub fn object(reg: u32) -> u32 {
    (reg & OBJECT_MASK) << 4
}

pub fn offset(reg: u32) -> u32 {
    reg >> 20
}

/// Method 0x018: binds the object at `instance` and resets the offset to zero.
pub fn bind_object(instance: u32) -> u32 {
    (instance >> 4) & OBJECT_MASK
}

/// Method 0x019.
pub fn set_offset(reg: u32, param: u32) -> u32 {
    (reg & OBJECT_MASK) | (param << 20)
}

/// Method 0x01a: whether the semaphore word already holds `expected`.
pub fn try_acquire(dma: &mut DmaSpace<'_>, reg: u32, expected: u32) -> bool {
    dma.read_u32(object(reg), offset(reg)) == expected
}

/// Method 0x01b.
pub fn release(dma: &mut DmaSpace<'_>, reg: u32, value: u32) {
    dma.write_u32(object(reg), offset(reg), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::test_bus::SparseBus;
    use crate::dma::{write_dma_object, DmaFlags};
    use crate::vram::Vram;

    #[test]
    fn register_packs_object_and_offset() {
        let reg = set_offset(bind_object(0x1_2340), 0x10);
        assert_eq!(object(reg), 0x1_2340);
        assert_eq!(offset(reg), 0x10);
        assert_eq!(object(set_offset(reg, 0x20)), 0x1_2340);
        assert_eq!(offset(bind_object(0x100)), 0);
    }

    #[test]
    fn acquire_compares_and_release_writes() {
        let mut vram = Vram::new(1024 * 1024);
        let mut bus = SparseBus::default();
        write_dma_object(&mut vram, 0x1000, DmaFlags::PAGE_TABLE_LINEAR.bits() | 0x3D, 0xFFF, &[0x8_0000]);
        let reg = set_offset(bind_object(0x1000), 0x20);
        let mut dma = DmaSpace::new(&mut vram, &mut bus);
        assert!(try_acquire(&mut dma, reg, 0));
        assert!(!try_acquire(&mut dma, reg, 7));
        release(&mut dma, reg, 7);
        assert!(try_acquire(&mut dma, reg, 7));
        assert_eq!(dma.vram.read_u32(0x8_0020), Some(7));
    }
}
