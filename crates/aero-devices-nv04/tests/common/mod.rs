//! Shared helpers for `aero-devices-nv04` integration tests.
//!
//! Layout used by every harness:
//! - RAMHT at RAMIN `0x10000` (512 slots), RAMFC at RAMIN `0x20000`;
//! - a null DMA object at RAMIN `0`, so objects whose descriptor leaves the notifier at zero
//!   never write a notify record;
//! - one push buffer per channel in guest memory at `PUSHBUF_BASE + chid * PUSHBUF_STRIDE`,
//!   reached through a host DMA object at RAMIN `PUSHBUF_OBJECTS + chid * 0x10`.
#![allow(dead_code)]

use std::collections::BTreeMap;

use aero_devices_nv04::ramht::{self, ENGINE_GRAPHICS, ENGINE_SOFTWARE};
use aero_devices_nv04::{
    mmio, write_dma_object, DmaFlags, ManualClock, MemoryBus, Nv04Device, Nv04DeviceConfig,
    ObjectContext, RamhtConfig, RecordingDisplaySink,
};

pub const VRAM_BYTES: usize = 4 * 1024 * 1024;

pub const RAMHT_REG: u32 = 0x0000_0100;
pub const RAMFC_REG: u32 = 0x0000_0002;

pub const PUSHBUF_BASE: u64 = 0x10_0000;
pub const PUSHBUF_STRIDE: u64 = 0x1_0000;
pub const PUSHBUF_OBJECTS: u32 = 0x3_0000;

/// DMA class byte used for every test object.
pub const DMA_CLASS: u32 = 0x3D;
pub const VRAM_LINEAR: u32 = DMA_CLASS | DmaFlags::PAGE_TABLE_PRESENT.bits() | DmaFlags::PAGE_TABLE_LINEAR.bits();
pub const HOST_LINEAR: u32 = DMA_CLASS | DmaFlags::PAGE_TABLE_LINEAR.bits() | DmaFlags::TARGET_HOST.bits();

/// Sparse guest physical memory; untouched bytes read as zero.
#[derive(Default)]
pub struct GuestMemory {
    bytes: BTreeMap<u64, u8>,
}

impl MemoryBus for GuestMemory {
    fn read_physical(&mut self, paddr: u64, buf: &mut [u8]) {
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.bytes.get(&(paddr + i as u64)).copied().unwrap_or(0);
        }
    }

    fn write_physical(&mut self, paddr: u64, buf: &[u8]) {
        for (i, byte) in buf.iter().enumerate() {
            self.bytes.insert(paddr + i as u64, *byte);
        }
    }
}

/// Method header for `count` parameters starting at `method` on `subc`.
pub fn header(subc: u32, method: u32, count: u32) -> u32 {
    (count << 18) | (subc << 13) | (method << 2)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct Harness {
    pub dev: Nv04Device,
    pub mem: GuestMemory,
    pub display: RecordingDisplaySink,
    pub clock: ManualClock,
    put: [u32; 32],
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let mut dev = Nv04Device::new(Nv04DeviceConfig {
            vram_size_bytes: Some(VRAM_BYTES),
            vblank_hz: None,
            ..Default::default()
        });
        let display = RecordingDisplaySink::new(4);
        let clock = ManualClock::new(0);
        dev.set_display(Box::new(display.clone()));
        dev.set_clock(Box::new(clock.clone()));

        let mut h = Self {
            dev,
            mem: GuestMemory::default(),
            display,
            clock,
            put: [0; 32],
        };
        h.write_reg(mmio::PFIFO_RAMHT, RAMHT_REG);
        h.write_reg(mmio::PFIFO_RAMFC, RAMFC_REG);
        h.ramin_write(0, 0x30);
        h
    }

    pub fn write_reg(&mut self, reg: u32, value: u32) {
        self.dev.mmio_write(&mut self.mem, u64::from(reg), 4, u64::from(value));
    }

    pub fn read_reg(&mut self, reg: u32) -> u32 {
        self.dev.mmio_read(u64::from(reg), 4)
    }

    /// Dword write through the BAR0 RAMIN window.
    pub fn ramin_write(&mut self, offset: u32, value: u32) {
        self.write_reg(mmio::RAMIN + offset, value);
    }

    pub fn ramin_read(&mut self, offset: u32) -> u32 {
        self.read_reg(mmio::RAMIN + offset)
    }

    pub fn vram_u32(&self, addr: u64) -> u32 {
        self.dev.vram().read_u32(addr).expect("VRAM address in range")
    }

    pub fn set_vram_u32(&mut self, addr: u64, value: u32) {
        self.dev.bar1_write(addr, 4, u64::from(value));
    }

    pub fn register(&mut self, handle: u32, instance: u32, engine: u8, chid: u32) {
        let cfg = RamhtConfig::from_reg(RAMHT_REG);
        ramht::insert(self.dev.vram_mut(), cfg, handle, ObjectContext::new(instance, engine, chid))
            .expect("RAMHT insert");
    }

    /// Graphics object of `class` at `instance` with the null notifier.
    pub fn graphics_object(&mut self, handle: u32, instance: u32, class: u32, chid: u32) {
        self.ramin_write(instance, class);
        self.ramin_write(instance + 4, 0);
        self.register(handle, instance, ENGINE_GRAPHICS, chid);
    }

    pub fn software_object(&mut self, handle: u32, instance: u32, chid: u32) {
        self.register(handle, instance, ENGINE_SOFTWARE, chid);
    }

    pub fn dma_object(&mut self, handle: u32, instance: u32, flags: u32, base: u32, limit: u32, chid: u32) {
        write_dma_object(self.dev.vram_mut(), instance, flags, limit, &[base]);
        self.register(handle, instance, ENGINE_GRAPHICS, chid);
    }

    pub fn pushbuf_base(chid: u32) -> u64 {
        PUSHBUF_BASE + u64::from(chid) * PUSHBUF_STRIDE
    }

    /// Points `chid` at its push buffer and switches it to DMA mode.
    pub fn enable_dma_channel(&mut self, chid: u32) {
        let instance = PUSHBUF_OBJECTS + chid * 0x10;
        write_dma_object(
            self.dev.vram_mut(),
            instance,
            HOST_LINEAR,
            (PUSHBUF_STRIDE - 1) as u32,
            &[Self::pushbuf_base(chid) as u32],
        );
        let slot = (RAMFC_REG << 16) + chid * 0x80 + 0x0C;
        self.ramin_write(slot, instance >> 4);
        if self.read_reg(mmio::PFIFO_CACHE1_PUSH1) & 0x1F == chid {
            self.write_reg(mmio::PFIFO_CACHE1_DMA_INSTANCE, instance >> 4);
        }
        let mode = self.read_reg(mmio::PFIFO_MODE);
        self.write_reg(mmio::PFIFO_MODE, mode | (1 << chid));
    }

    /// Appends `words` at the channel's software PUT without kicking the puller.
    pub fn queue(&mut self, chid: u32, words: &[u32]) {
        let base = Self::pushbuf_base(chid);
        for word in words {
            let put = &mut self.put[chid as usize];
            self.mem.write_u32(base + u64::from(*put), *word);
            *put += 4;
        }
    }

    /// Writes `words` at an explicit push-buffer offset.
    pub fn place(&mut self, chid: u32, offset: u32, words: &[u32]) {
        let base = Self::pushbuf_base(chid) + u64::from(offset);
        for (i, word) in words.iter().enumerate() {
            self.mem.write_u32(base + i as u64 * 4, *word);
        }
    }

    /// Publishes the software PUT through the channel's control window.
    pub fn kick(&mut self, chid: u32) {
        let put = self.put[chid as usize];
        self.set_put(chid, put);
    }

    pub fn set_put(&mut self, chid: u32, put: u32) {
        self.put[chid as usize] = put;
        self.write_reg(user_reg(chid, mmio::USER_DMA_PUT), put);
    }

    pub fn push(&mut self, chid: u32, words: &[u32]) {
        self.queue(chid, words);
        self.kick(chid);
    }

    /// One method with one parameter.
    pub fn method(&mut self, chid: u32, subc: u32, method: u32, param: u32) {
        self.push(chid, &[header(subc, method, 1), param]);
    }

    /// PIO submission through the compact window.
    pub fn pio(&mut self, chid: u32, subc: u32, method: u32, param: u32) {
        let addr = mmio::USER_COMPACT + (chid << 16) + (subc << 13) + method * 4;
        self.write_reg(addr, param);
    }
}

pub fn user_reg(chid: u32, offset: u32) -> u32 {
    mmio::USER_COMPACT + (chid << 16) + offset
}

pub fn extended_reg(chid: u32, offset: u32) -> u32 {
    mmio::USER_EXTENDED + (chid << 12) + offset
}
