//! Device memory: the framebuffer store and its instance-memory (RAMIN) view.
//!
//! RAMIN is not separate storage. It aliases the top of VRAM with the address bits above the
//! 32-byte granule inverted, so RAMIN offset 0 lands on the last 32 bytes of VRAM. Aligned
//! dword accesses stay contiguous because the flip never touches the low five address bits.

use std::ops::Range;

pub struct Vram {
    bytes: Vec<u8>,
    ramin_flip: u32,
}

impl Vram {
    /// `size` must be a power of two no larger than 4 GiB.
    pub fn new(size: usize) -> Self {
        debug_assert!(size.is_power_of_two());
        debug_assert!(size as u64 <= 1 << 32);
        Self {
            bytes: vec![0u8; size],
            ramin_flip: (size as u64).saturating_sub(32) as u32,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    fn range(&self, addr: u64, width: usize) -> Option<Range<usize>> {
        let start = usize::try_from(addr).ok()?;
        let end = start.checked_add(width)?;
        (end <= self.bytes.len()).then_some(start..end)
    }

    pub fn contains(&self, addr: u64, width: u32) -> bool {
        self.range(addr, width as usize).is_some()
    }

    pub fn read(&self, addr: u64, buf: &mut [u8]) -> bool {
        match self.range(addr, buf.len()) {
            Some(r) => {
                buf.copy_from_slice(&self.bytes[r]);
                true
            }
            None => false,
        }
    }

    pub fn write(&mut self, addr: u64, buf: &[u8]) -> bool {
        match self.range(addr, buf.len()) {
            Some(r) => {
                self.bytes[r].copy_from_slice(buf);
                true
            }
            None => false,
        }
    }

    pub fn read_u8(&self, addr: u64) -> Option<u8> {
        let mut b = [0u8; 1];
        self.read(addr, &mut b).then_some(b[0])
    }

    pub fn read_u16(&self, addr: u64) -> Option<u16> {
        let mut b = [0u8; 2];
        self.read(addr, &mut b).then(|| u16::from_le_bytes(b))
    }

    pub fn read_u32(&self, addr: u64) -> Option<u32> {
        let mut b = [0u8; 4];
        self.read(addr, &mut b).then(|| u32::from_le_bytes(b))
    }

    pub fn write_u8(&mut self, addr: u64, value: u8) -> bool {
        self.write(addr, &[value])
    }

    pub fn write_u16(&mut self, addr: u64, value: u16) -> bool {
        self.write(addr, &value.to_le_bytes())
    }

    pub fn write_u32(&mut self, addr: u64, value: u32) -> bool {
        self.write(addr, &value.to_le_bytes())
    }

    pub fn write_u64(&mut self, addr: u64, value: u64) -> bool {
        self.write(addr, &value.to_le_bytes())
    }

    /// VRAM address backing RAMIN offset `offset`.
    pub fn ramin_address(&self, offset: u32) -> u64 {
        u64::from(offset ^ self.ramin_flip)
    }

    /// Whether `width` bytes starting at RAMIN offset `offset` are backed by VRAM.
    pub fn ramin_contains(&self, offset: u32, width: u32) -> bool {
        u64::from(offset) + u64::from(width) <= self.bytes.len() as u64
            && self.contains(self.ramin_address(offset), width)
    }

    pub fn ramin_read8(&self, offset: u32) -> u8 {
        if !self.ramin_contains(offset, 1) {
            tracing::debug!(offset = format_args!("0x{offset:x}"), "RAMIN read out of range");
            return 0;
        }
        self.read_u8(self.ramin_address(offset)).unwrap_or(0)
    }

    pub fn ramin_read32(&self, offset: u32) -> u32 {
        if !self.ramin_contains(offset, 4) {
            tracing::debug!(offset = format_args!("0x{offset:x}"), "RAMIN read out of range");
            return 0;
        }
        self.read_u32(self.ramin_address(offset)).unwrap_or(0)
    }

    pub fn ramin_write8(&mut self, offset: u32, value: u8) {
        if !self.ramin_contains(offset, 1) {
            tracing::debug!(offset = format_args!("0x{offset:x}"), "RAMIN write out of range");
            return;
        }
        let addr = self.ramin_address(offset);
        self.write_u8(addr, value);
    }

    pub fn ramin_write32(&mut self, offset: u32, value: u32) {
        if !self.ramin_contains(offset, 4) {
            tracing::debug!(offset = format_args!("0x{offset:x}"), "RAMIN write out of range");
            return;
        }
        let addr = self.ramin_address(offset);
        self.write_u32(addr, value);
    }
}

impl std::fmt::Debug for Vram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vram")
            .field("len", &self.bytes.len())
            .field("ramin_flip", &format_args!("0x{:x}", self.ramin_flip))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramin_aliases_top_of_vram() {
        let mut vram = Vram::new(1 << 20);
        vram.ramin_write32(0, 0xdead_beef);
        assert_eq!(vram.read_u32((1 << 20) - 32), Some(0xdead_beef));
        vram.ramin_write32(0x24, 0x1234_5678);
        assert_eq!(vram.read_u32((1 << 20) - 64 + 4), Some(0x1234_5678));
        assert_eq!(vram.ramin_read32(0x24), 0x1234_5678);
    }

    #[test]
    fn out_of_range_accesses_are_rejected() {
        let mut vram = Vram::new(1 << 20);
        assert!(!vram.write_u32((1 << 20) - 2, 1));
        assert_eq!(vram.read_u32(u64::MAX), None);
        assert_eq!(vram.ramin_read32(1 << 20), 0);
        vram.ramin_write32(1 << 20, 5);
        assert!(vram.as_slice().iter().all(|&b| b == 0));
    }
}
