//! RAMHT: the object hash table.
//!
//! Each 8-byte slot holds a `(handle, context)` pair. The context packs the object's RAMIN offset
//! in 16-byte units (bits 0..19), the engine id (bits 20..22) and the owning channel (bits 23..27).

use crate::error::{ChannelFault, RamhtError};
use crate::vram::Vram;

/// Hash table size exponents above this are clamped; real hardware tops out well below.
pub const MAX_TABLE_BITS: u32 = 16;

pub const ENGINE_SOFTWARE: u8 = 0;
pub const ENGINE_GRAPHICS: u8 = 1;

/// Location and size of the table, decoded from `PFIFO_RAMHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamhtConfig {
    pub base: u32,
    pub bits: u32,
}

impl RamhtConfig {
    pub fn from_reg(reg: u32) -> Self {
        Self {
            base: (reg & 0xFFF) << 8,
            bits: (((reg >> 16) & 0xFF) + 9).min(MAX_TABLE_BITS),
        }
    }

    pub fn size_bytes(&self) -> u32 {
        (1 << self.bits) << 3
    }

    /// Byte offset of the first slot searched for `(handle, chid)`.
    pub fn hash(&self, handle: u32, chid: u32) -> u32 {
        let mask = (1u32 << self.bits) - 1;
        let mut hash = 0;
        let mut x = handle;
        while x != 0 {
            hash ^= x & mask;
            x >>= self.bits;
        }
        hash ^= (chid & 0xF) << (self.bits - 4);
        hash << 3
    }

    pub fn slot_count(&self) -> u32 {
        1 << self.bits
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectContext {
    pub raw: u32,
}

impl ObjectContext {
    pub fn new(instance: u32, engine: u8, chid: u32) -> Self {
        Self {
            raw: ((instance >> 4) & 0xFFFFF) | (u32::from(engine & 7) << 20) | ((chid & 0x1F) << 23),
        }
    }

    /// RAMIN byte offset of the object.
    pub fn instance(&self) -> u32 {
        (self.raw & 0xFFFFF) << 4
    }

    pub fn engine(&self) -> u8 {
        ((self.raw >> 20) & 7) as u8
    }

    pub fn chid(&self) -> u32 {
        (self.raw >> 23) & 0x1F
    }
}

/// Resolves `handle` for channel `chid`, probing linearly from the hashed slot with wrap-around.
pub fn lookup(vram: &Vram, cfg: RamhtConfig, handle: u32, chid: u32) -> Result<ObjectContext, ChannelFault> {
    let size = cfg.size_bytes();
    let start = cfg.hash(handle, chid);
    let mut it = start;
    let mut steps = 1u32;
    loop {
        let slot = cfg.base + it;
        if vram.ramin_read32(slot) == handle {
            let ctx = ObjectContext {
                raw: vram.ramin_read32(slot + 4),
            };
            if ctx.chid() == chid {
                tracing::trace!(
                    handle = format_args!("0x{handle:08x}"),
                    context = format_args!("0x{:08x}", ctx.raw),
                    steps,
                    "RAMHT hit"
                );
                return Ok(ctx);
            }
        }
        steps += 1;
        it += 8;
        if it >= size {
            it = 0;
        }
        if it == start {
            return Err(ChannelFault::RamhtMiss { handle, chid });
        }
    }
}

/// Inserts `(handle, ctx)` at the first free slot of its search sequence, or overwrites the slot
/// already holding the same handle for the same channel. Returns the slot's RAMIN offset.
///
/// A slot is free when both of its words are zero. Drivers build the table themselves; this is for
/// hosts and tests that need to seed one.
pub fn insert(vram: &mut Vram, cfg: RamhtConfig, handle: u32, ctx: ObjectContext) -> Result<u32, RamhtError> {
    if !vram.ramin_contains(cfg.base, cfg.size_bytes()) {
        return Err(RamhtError::OutOfRange { base: cfg.base });
    }
    let size = cfg.size_bytes();
    let start = cfg.hash(handle, ctx.chid());
    let mut it = start;
    loop {
        let slot = cfg.base + it;
        let h = vram.ramin_read32(slot);
        let c = ObjectContext {
            raw: vram.ramin_read32(slot + 4),
        };
        let free = h == 0 && c.raw == 0;
        if free || (h == handle && c.chid() == ctx.chid()) {
            vram.ramin_write32(slot, handle);
            vram.ramin_write32(slot + 4, ctx.raw);
            return Ok(slot);
        }
        it += 8;
        if it >= size {
            it = 0;
        }
        if it == start {
            return Err(RamhtError::Full {
                slots: cfg.slot_count(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> RamhtConfig {
        RamhtConfig::from_reg(0x0000_0010)
    }

    #[test]
    fn config_decodes_base_and_bits() {
        let cfg = RamhtConfig::from_reg(0x0003_0012);
        assert_eq!(cfg.base, 0x1200);
        assert_eq!(cfg.bits, 12);
        assert_eq!(cfg.size_bytes(), 0x8000);
    }

    #[test]
    fn hash_folds_handle_and_channel() {
        let cfg = cfg();
        // bits = 9: 0x1234 -> 0x034 ^ 0x009 = 0x03d, chid 1 -> ^ 0x20
        assert_eq!(cfg.hash(0x1234, 0), 0x03d << 3);
        assert_eq!(cfg.hash(0x1234, 1), (0x03d ^ 0x20) << 3);
        assert_eq!(cfg.hash(0, 0), 0);
    }

    #[test]
    fn lookup_checks_channel() {
        let mut vram = Vram::new(1 << 20);
        let cfg = cfg();
        insert(&mut vram, cfg, 0xbeef, ObjectContext::new(0x4000, ENGINE_GRAPHICS, 2)).unwrap();
        let ctx = lookup(&vram, cfg, 0xbeef, 2).unwrap();
        assert_eq!(ctx.instance(), 0x4000);
        assert_eq!(ctx.engine(), ENGINE_GRAPHICS);
        assert_eq!(
            lookup(&vram, cfg, 0xbeef, 3),
            Err(ChannelFault::RamhtMiss {
                handle: 0xbeef,
                chid: 3
            })
        );
    }

    #[test]
    fn colliding_handles_take_the_next_slot() {
        let mut vram = Vram::new(1 << 20);
        let cfg = cfg();
        // Same hash for both handles: 0x200 folds to 0x001, as does 0x001.
        assert_eq!(cfg.hash(0x200, 0), cfg.hash(0x001, 0));
        let a = insert(&mut vram, cfg, 0x001, ObjectContext::new(0x100, 1, 0)).unwrap();
        let b = insert(&mut vram, cfg, 0x200, ObjectContext::new(0x200, 1, 0)).unwrap();
        assert_eq!(b, a + 8);
        assert_eq!(lookup(&vram, cfg, 0x200, 0).unwrap().instance(), 0x200);
        assert_eq!(lookup(&vram, cfg, 0x001, 0).unwrap().instance(), 0x100);
    }

    #[test]
    fn search_wraps_around_table_end() {
        let mut vram = Vram::new(1 << 20);
        let cfg = cfg();
        let last = cfg.size_bytes() - 8;
        // 0x1ff hashes to the last slot; occupy it so the next insert wraps to slot 0.
        assert_eq!(cfg.hash(0x1ff, 0), last);
        insert(&mut vram, cfg, 0x1ff, ObjectContext::new(0x10, 1, 0)).unwrap();
        let slot = insert(&mut vram, cfg, 0x3fe, ObjectContext::new(0x20, 1, 0));
        assert_eq!(cfg.hash(0x3fe, 0), last);
        assert_eq!(slot, Ok(cfg.base));
        assert_eq!(lookup(&vram, cfg, 0x3fe, 0).unwrap().instance(), 0x20);
    }
}
