//! The NV04 register file: BAR0 decode, the BAR1 VRAM aperture, interrupt aggregation and vblank
//! pacing around an [`Nv04Executor`].

use std::collections::{HashMap, HashSet};

use crate::bus::MemoryBus;
use crate::config::Nv04DeviceConfig;
use crate::executor::{ExecEnv, Nv04Executor};
use crate::host::{Clock, DisplaySink, InstantClock, LegacyVga, NullDisplaySink, NullLegacyVga};
use crate::ramfc;
use crate::regs::{self, mmio, IntrPair, Pcrtc};
use crate::timer::Ptimer;
use crate::vblank::VblankSchedule;
use crate::vram::Vram;

/// Decoded address inside one of the per-channel control windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UserAccess {
    chid: u32,
    subchannel: u32,
    offset: u32,
    extended: bool,
}

impl UserAccess {
    fn decode(addr: u32) -> Option<Self> {
        if (mmio::USER_COMPACT..mmio::USER_COMPACT_END).contains(&addr) {
            return Some(Self {
                chid: (addr >> 16) & 0x1F,
                subchannel: (addr >> 13) & 7,
                offset: addr & 0x1FFF,
                extended: false,
            });
        }
        if !in_extended_window(addr) {
            return None;
        }
        let chid = (addr >> 12) & 0x1FF;
        if chid as usize >= crate::fifo::CHANNEL_COUNT {
            tracing::warn!(chid, offset = format_args!("0x{addr:06x}"), "access to nonexistent FIFO channel");
            return None;
        }
        Some(Self {
            chid,
            subchannel: 0,
            offset: addr & 0x1FF,
            extended: true,
        })
    }
}

/// Legacy VGA port behind a byte window: `(head, port)`.
fn vga_window(addr: u32) -> Option<(u32, u16)> {
    mmio::VGA_WINDOWS
        .iter()
        .any(|&(start, end)| (start..end).contains(&addr))
        .then(|| ((addr >> 13) & 1, (addr & 0xFFF) as u16))
}

fn in_ramin(addr: u32) -> bool {
    (mmio::RAMIN..mmio::RAMIN_END).contains(&addr)
}

fn in_extended_window(addr: u32) -> bool {
    (mmio::USER_EXTENDED..mmio::USER_EXTENDED_END).contains(&addr)
}

fn in_method_readout(addr: u32) -> bool {
    (mmio::PFIFO_CACHE1_METHOD..mmio::PFIFO_CACHE1_METHOD_END).contains(&addr)
}

pub struct Nv04Device {
    config: Nv04DeviceConfig,
    exec: Nv04Executor,

    pmc_intr_en: u32,
    pmc_enable: u32,
    pbus: IntrPair,
    timer: Ptimer,
    crtc: Pcrtc,
    straps: u32,
    /// Registers with no behaviour behind them.
    scratch: HashMap<u32, u32>,
    reported: HashSet<u32>,

    vblank: VblankSchedule,
    irq_level: bool,

    display: Box<dyn DisplaySink>,
    vga: Box<dyn LegacyVga>,
    clock: Box<dyn Clock>,
}

impl Nv04Device {
    pub fn new(config: Nv04DeviceConfig) -> Self {
        let vram_bytes = config.vram_bytes();
        tracing::debug!(
            model = ?config.model,
            vram_bytes,
            vblank_hz = ?config.vblank_hz,
            "NV04 device created"
        );
        Self {
            exec: Nv04Executor::new(vram_bytes),
            pmc_intr_en: 0,
            pmc_enable: 0,
            pbus: IntrPair::default(),
            timer: Ptimer::default(),
            crtc: Pcrtc::default(),
            straps: config.model.straps(),
            scratch: HashMap::new(),
            reported: HashSet::new(),
            vblank: VblankSchedule::new(config.vblank_hz),
            irq_level: false,
            display: Box::new(NullDisplaySink),
            vga: Box::new(NullLegacyVga),
            clock: Box::new(InstantClock::default()),
            config,
        }
    }

    pub fn set_display(&mut self, display: Box<dyn DisplaySink>) {
        self.display = display;
    }

    pub fn set_legacy_vga(&mut self, vga: Box<dyn LegacyVga>) {
        self.vga = vga;
    }

    pub fn set_clock(&mut self, clock: Box<dyn Clock>) {
        self.clock = clock;
    }

    pub fn config(&self) -> &Nv04DeviceConfig {
        &self.config
    }

    pub fn irq_level(&self) -> bool {
        self.irq_level
    }

    pub fn bar0_size(&self) -> u64 {
        mmio::BAR0_SIZE
    }

    pub fn bar1_size(&self) -> u64 {
        self.exec.vram.len() as u64
    }

    pub fn vram(&self) -> &Vram {
        &self.exec.vram
    }

    pub fn vram_mut(&mut self) -> &mut Vram {
        &mut self.exec.vram
    }

    pub fn executor(&self) -> &Nv04Executor {
        &self.exec
    }

    pub fn executor_mut(&mut self) -> &mut Nv04Executor {
        &mut self.exec
    }

    /// VRAM offset of the scanout surface (`PCRTC_START`).
    pub fn display_start(&self) -> u32 {
        self.crtc.start
    }

    /// Value of `PMC_INTR`.
    pub fn mc_intr(&self) -> u32 {
        regs::mc_intr(self.pbus, self.exec.fifo.pending(), self.exec.pgraph.intr, self.crtc.intr)
    }

    fn update_irq_level(&mut self) {
        self.irq_level = self.mc_intr() != 0 && self.pmc_intr_en & 1 != 0;
    }

    /// Returns every register, channel and VRAM byte to its power-on value.
    pub fn reset(&mut self) {
        self.exec.reset();
        self.pmc_intr_en = 0;
        self.pmc_enable = 0;
        self.pbus = IntrPair::default();
        self.timer = Ptimer::default();
        self.crtc = Pcrtc::default();
        self.straps = self.config.model.straps();
        self.scratch.clear();
        self.vblank.rearm();
        self.update_irq_level();
    }

    /// Delivers every vertical retrace that elapsed up to `now_ns`.
    pub fn tick(&mut self, mem: &mut dyn MemoryBus, now_ns: u64) {
        let ticks = self.vblank.advance(now_ns);
        for _ in 0..ticks {
            self.vblank(mem);
        }
    }

    /// One vertical retrace: raises `PCRTC_INTR` and retries channels stalled on an acquire.
    pub fn vblank(&mut self, mem: &mut dyn MemoryBus) {
        self.crtc.intr.status |= 1;
        self.update_irq_level();
        let now_ns = self.timer.time(self.clock.now_ns());
        let mut env = ExecEnv {
            mem,
            display: &mut *self.display,
            now_ns,
        };
        self.exec.retry_stalled(&mut env);
        self.update_irq_level();
    }

    /// Byte-granular read through the BAR1 VRAM aperture. The offset wraps at the VRAM size.
    pub fn bar1_read(&self, offset: u64, size: usize) -> u64 {
        let mask = self.exec.vram.len() as u64 - 1;
        (0..size.min(8)).fold(0u64, |acc, i| {
            let byte = self.exec.vram.read_u8((offset + i as u64) & mask).unwrap_or(0);
            acc | (u64::from(byte) << (i * 8))
        })
    }

    pub fn bar1_write(&mut self, offset: u64, size: usize, value: u64) {
        let mask = self.exec.vram.len() as u64 - 1;
        for i in 0..size.min(8) {
            self.exec
                .vram
                .write_u8((offset + i as u64) & mask, (value >> (i * 8)) as u8);
        }
    }

    pub fn mmio_read(&mut self, offset: u64, size: usize) -> u32 {
        if offset >= mmio::BAR0_SIZE || !matches!(size, 1 | 2 | 4) {
            return 0;
        }
        let addr = offset as u32;

        if let Some((head, port)) = vga_window(addr) {
            return self.vga_read(head, port).into();
        }
        if in_ramin(addr) {
            let base = addr - mmio::RAMIN;
            return (0..size as u32).fold(0, |acc, i| {
                acc | (u32::from(self.exec.vram.ramin_read8(base + i)) << (i * 8))
            });
        }

        let aligned = addr & !3;
        let shift = (addr & 3) * 8;
        let value = self.mmio_read_dword(aligned);
        match size {
            1 => (value >> shift) & 0xff,
            2 => (value >> shift) & 0xffff,
            _ => value,
        }
    }

    /// BAR0 write of 1, 2, 4 or 8 bytes. Eight-byte writes land as two dword writes.
    pub fn mmio_write(&mut self, mem: &mut dyn MemoryBus, offset: u64, size: usize, value: u64) {
        if offset >= mmio::BAR0_SIZE {
            return;
        }
        if size == 8 {
            self.mmio_write(mem, offset, 4, value & 0xFFFF_FFFF);
            self.mmio_write(mem, offset + 4, 4, value >> 32);
            return;
        }
        let addr = offset as u32;
        let value = value as u32;

        if let Some((head, port)) = vga_window(addr) {
            self.vga_write(head, port, value as u8);
            return;
        }
        if in_ramin(addr) && (size != 4 || addr & 3 != 0) {
            let base = addr - mmio::RAMIN;
            for i in 0..size.min(4) as u32 {
                self.exec.vram.ramin_write8(base + i, (value >> (i * 8)) as u8);
            }
            return;
        }

        let aligned = addr & !3;
        let shift = (addr & 3) * 8;
        let value32 = match size {
            1 => (value & 0xff) << shift,
            2 => (value & 0xffff) << shift,
            4 => value,
            _ => return,
        };

        let merged = if size == 4 {
            value32
        } else {
            let cur = self.mmio_read(u64::from(aligned), 4);
            let mask = match size {
                1 => 0xffu32 << shift,
                2 => 0xffffu32 << shift,
                _ => 0,
            };
            (cur & !mask) | value32
        };

        self.mmio_write_dword(mem, aligned, merged);
    }

    fn vga_read(&mut self, head: u32, port: u16) -> u8 {
        if head != 0 {
            return 0;
        }
        self.vga.read_port(port)
    }

    fn vga_write(&mut self, head: u32, port: u16, value: u8) {
        if head != 0 {
            tracing::trace!(head, port = format_args!("0x{port:03x}"), "VGA write to secondary head dropped");
            return;
        }
        self.vga.write_port(port, value);
    }

    fn mmio_read_dword(&mut self, addr: u32) -> u32 {
        let fifo = &self.exec.fifo;
        let pgraph = &self.exec.pgraph;
        match addr {
            mmio::PMC_BOOT_0 => self.config.model.boot_id(),
            mmio::PMC_INTR => self.mc_intr(),
            mmio::PMC_INTR_EN => self.pmc_intr_en,
            mmio::PMC_ENABLE => self.pmc_enable,

            mmio::PBUS_INTR => self.pbus.status,
            mmio::PBUS_INTR_EN => self.pbus.enable,

            mmio::PFIFO_INTR => fifo.intr,
            mmio::PFIFO_INTR_EN => fifo.intr_en,
            mmio::PFIFO_RAMHT => fifo.ramht,
            mmio::PFIFO_RAMFC => fifo.ramfc,
            mmio::PFIFO_RAMRO => fifo.ramro,
            mmio::PFIFO_RUNOUT_STATUS | mmio::PFIFO_CACHE1_STATUS => fifo.cache_status(),
            mmio::PFIFO_MODE => fifo.mode,
            mmio::PFIFO_CACHE1_PUSH1 => fifo.push1,
            mmio::PFIFO_CACHE1_PUT => fifo.ring.put(),
            mmio::PFIFO_CACHE1_DMA_PUSH => fifo.dma_push,
            mmio::PFIFO_CACHE1_DMA_INSTANCE => fifo.shadow.dma_instance,
            mmio::PFIFO_CACHE1_DMA_CTL => 0x8000_0000,
            mmio::PFIFO_CACHE1_DMA_PUT => fifo.shadow.dma_put,
            mmio::PFIFO_CACHE1_DMA_GET => fifo.shadow.dma_get,
            mmio::PFIFO_CACHE1_REF_CNT => fifo.shadow.ref_cnt,
            mmio::PFIFO_CACHE1_PULL0 => self.exec.fifo.read_pull0(),
            mmio::PFIFO_CACHE1_GET => fifo.ring.get(),
            _ if in_method_readout(addr) => {
                let rel = addr - mmio::PFIFO_CACHE1_METHOD;
                let index = (rel / 8) as usize;
                if rel & 4 == 0 {
                    fifo.ring.method_word(index)
                } else {
                    fifo.ring.data_word(index)
                }
            }

            mmio::PTIMER_INTR => self.timer.intr,
            mmio::PTIMER_INTR_EN => self.timer.intr_en,
            mmio::PTIMER_NUMERATOR => self.timer.numerator,
            mmio::PTIMER_DENOMINATOR => self.timer.denominator,
            mmio::PTIMER_TIME_0 => self.timer.time(self.clock.now_ns()) as u32,
            mmio::PTIMER_TIME_1 => (self.timer.time(self.clock.now_ns()) >> 32) as u32,
            mmio::PTIMER_ALARM_0 => self.timer.alarm,

            mmio::PFB_MEMORY_SIZE => self.exec.vram.len() as u32,
            mmio::PEXTDEV_STRAPS => self.straps,

            mmio::PGRAPH_INTR => pgraph.intr.status,
            mmio::PGRAPH_NSOURCE => pgraph.nsource,
            mmio::PGRAPH_INTR_EN => pgraph.intr.enable,
            mmio::PGRAPH_CTX_SWITCH1 => pgraph.ctx_switch1,
            mmio::PGRAPH_CTX_SWITCH2 => pgraph.ctx_switch2,
            mmio::PGRAPH_CTX_SWITCH4 => pgraph.ctx_switch4,
            mmio::PGRAPH_CTX_CONTROL => pgraph.ctx_control,
            mmio::PGRAPH_STATUS => pgraph.status,
            mmio::PGRAPH_TRAPPED_ADDR => pgraph.trapped_addr,
            mmio::PGRAPH_TRAPPED_DATA => pgraph.trapped_data,
            mmio::PGRAPH_NOTIFY => pgraph.notify,
            mmio::PGRAPH_FIFO => pgraph.fifo,
            mmio::PGRAPH_CHANNEL_CTX_TABLE => pgraph.channel_ctx_table,

            mmio::PCRTC_INTR => self.crtc.intr.status,
            mmio::PCRTC_INTR_EN => self.crtc.intr.enable,
            mmio::PCRTC_START => self.crtc.start,
            mmio::PCRTC_CONFIG => self.crtc.config,
            mmio::PCRTC_RASTER => u32::from(self.vga.read_port(mmio::VGA_INPUT_STATUS_1)) << 13,
            mmio::PCRTC_CURSOR_OFFSET => self.crtc.cursor_offset,
            mmio::PCRTC_CURSOR_CONFIG => self.crtc.cursor_config,

            mmio::PRAMDAC_CURSOR_SYNC | mmio::PRAMDAC_FP_HCRTC => 0,

            _ if in_ramin(addr) => self.exec.vram.ramin_read32(addr - mmio::RAMIN),
            _ => match UserAccess::decode(addr) {
                Some(access) => self.user_read(access),
                None if in_extended_window(addr) => 0,
                None => self.scratch_read(addr),
            },
        }
    }

    fn mmio_write_dword(&mut self, mem: &mut dyn MemoryBus, addr: u32, value: u32) {
        let now_ns = self.clock.now_ns();
        match addr {
            mmio::PMC_INTR_EN => self.pmc_intr_en = value,
            mmio::PMC_ENABLE => self.pmc_enable = value,

            mmio::PBUS_INTR => self.pbus.ack(value),
            mmio::PBUS_INTR_EN => self.pbus.enable = value,

            mmio::PFIFO_INTR => self.exec.ack_fifo_intr(value),
            mmio::PFIFO_INTR_EN => self.exec.fifo.intr_en = value,
            mmio::PFIFO_RAMHT => self.exec.fifo.ramht = value,
            mmio::PFIFO_RAMFC => self.exec.fifo.ramfc = value,
            mmio::PFIFO_RAMRO => self.exec.fifo.ramro = value,
            mmio::PFIFO_MODE => self.exec.fifo.mode = value,
            mmio::PFIFO_CACHE1_PUSH1 => self.exec.fifo.push1 = value,
            mmio::PFIFO_CACHE1_PUT => self.exec.fifo.ring.set_put(value),
            mmio::PFIFO_CACHE1_DMA_PUSH => self.exec.fifo.dma_push = value,
            mmio::PFIFO_CACHE1_DMA_INSTANCE => self.exec.fifo.shadow.dma_instance = value,
            mmio::PFIFO_CACHE1_DMA_PUT => self.exec.fifo.shadow.dma_put = value,
            mmio::PFIFO_CACHE1_DMA_GET => self.exec.fifo.shadow.dma_get = value,
            mmio::PFIFO_CACHE1_REF_CNT => self.exec.fifo.shadow.ref_cnt = value,
            mmio::PFIFO_CACHE1_PULL0 => self.exec.fifo.pull0 = value,
            mmio::PFIFO_CACHE1_GET => self.exec.fifo.write_cache1_get(value),

            mmio::PTIMER_INTR => self.timer.intr &= !value,
            mmio::PTIMER_INTR_EN => self.timer.intr_en = value,
            mmio::PTIMER_NUMERATOR => self.timer.numerator = value,
            mmio::PTIMER_DENOMINATOR => self.timer.denominator = value,
            mmio::PTIMER_TIME_0 => self.timer.write_time_low(now_ns, value),
            mmio::PTIMER_TIME_1 => self.timer.write_time_high(now_ns, value),
            mmio::PTIMER_ALARM_0 => self.timer.alarm = value,

            mmio::PEXTDEV_STRAPS => {
                self.straps = if value & (1 << 31) != 0 {
                    value
                } else {
                    self.config.model.straps()
                };
            }

            mmio::PGRAPH_INTR => self.exec.pgraph.intr.ack(value),
            mmio::PGRAPH_NSOURCE => self.exec.pgraph.nsource = value,
            mmio::PGRAPH_INTR_EN => self.exec.pgraph.intr.enable = value,
            mmio::PGRAPH_CTX_SWITCH1 => self.exec.pgraph.ctx_switch1 = value,
            mmio::PGRAPH_CTX_SWITCH2 => self.exec.pgraph.ctx_switch2 = value,
            mmio::PGRAPH_CTX_SWITCH4 => self.exec.pgraph.ctx_switch4 = value,
            mmio::PGRAPH_CTX_CONTROL => self.exec.pgraph.ctx_control = value,
            mmio::PGRAPH_STATUS => self.exec.pgraph.status = value,
            mmio::PGRAPH_TRAPPED_ADDR => self.exec.pgraph.trapped_addr = value,
            mmio::PGRAPH_TRAPPED_DATA => self.exec.pgraph.trapped_data = value,
            mmio::PGRAPH_NOTIFY => self.exec.pgraph.notify = value,
            mmio::PGRAPH_FIFO => self.exec.pgraph.fifo = value,
            mmio::PGRAPH_CHANNEL_CTX_TABLE => self.exec.pgraph.channel_ctx_table = value,

            mmio::PCRTC_INTR => self.crtc.intr.ack(value),
            mmio::PCRTC_INTR_EN => self.crtc.intr.enable = value,
            mmio::PCRTC_START => self.crtc.start = value,
            mmio::PCRTC_CONFIG => self.crtc.config = value,
            mmio::PCRTC_CURSOR_OFFSET => self.crtc.cursor_offset = value,
            mmio::PCRTC_CURSOR_CONFIG => self.crtc.cursor_config = value,

            mmio::PMC_BOOT_0
            | mmio::PMC_INTR
            | mmio::PFIFO_RUNOUT_STATUS
            | mmio::PFIFO_CACHE1_STATUS
            | mmio::PFIFO_CACHE1_DMA_CTL
            | mmio::PFB_MEMORY_SIZE
            | mmio::PCRTC_RASTER
            | mmio::PRAMDAC_CURSOR_SYNC
            | mmio::PRAMDAC_FP_HCRTC => self.read_only_write(addr, value),
            _ if in_method_readout(addr) => self.read_only_write(addr, value),

            _ if in_ramin(addr) => self.exec.vram.ramin_write32(addr - mmio::RAMIN, value),
            _ => match UserAccess::decode(addr) {
                Some(access) => self.user_write(mem, access, value),
                None if in_extended_window(addr) => {}
                None => self.scratch_write(addr, value),
            },
        }
        self.update_irq_level();
    }

    fn read_only_write(&self, addr: u32, value: u32) {
        tracing::trace!(
            offset = format_args!("0x{addr:06x}"),
            value = format_args!("0x{value:08x}"),
            "write to read-only register ignored"
        );
    }

    fn user_read(&self, access: UserAccess) -> u32 {
        let UserAccess { chid, offset, .. } = access;
        let fifo = &self.exec.fifo;
        let current = fifo.current_channel() == chid;
        let slot = |slot| ramfc::read_slot(&self.exec.vram, fifo.ramfc, chid, slot);
        match offset {
            mmio::USER_FREE => 0xFFFF,
            mmio::USER_DMA_PUT if current => fifo.shadow.dma_put,
            mmio::USER_DMA_PUT => slot(ramfc::SLOT_DMA_PUT),
            mmio::USER_DMA_GET if current => fifo.shadow.dma_get,
            mmio::USER_DMA_GET => slot(ramfc::SLOT_DMA_GET),
            mmio::USER_REF_CNT if current => fifo.shadow.ref_cnt,
            mmio::USER_REF_CNT => slot(ramfc::SLOT_REF_CNT),
            mmio::USER_SUBROUTINE if access.extended => {
                let get = if current {
                    fifo.shadow.dma_get
                } else {
                    slot(ramfc::SLOT_DMA_GET)
                };
                self.exec
                    .channel(chid)
                    .and_then(|ch| ch.subroutine)
                    .unwrap_or(get)
            }
            _ => {
                tracing::debug!(chid, offset = format_args!("0x{offset:03x}"), "read of unknown FIFO control offset");
                0
            }
        }
    }

    fn user_write(&mut self, mem: &mut dyn MemoryBus, access: UserAccess, value: u32) {
        let UserAccess {
            chid,
            subchannel,
            offset,
            extended,
        } = access;

        if self.exec.fifo.dma_push_enabled(chid) {
            if offset != mmio::USER_DMA_PUT {
                tracing::trace!(chid, offset = format_args!("0x{offset:03x}"), "FIFO control write ignored");
                return;
            }
            if self.exec.fifo.current_channel() == chid {
                self.exec.fifo.shadow.dma_put = value;
            } else {
                let reg = self.exec.fifo.ramfc;
                ramfc::write_slot(&mut self.exec.vram, reg, chid, ramfc::SLOT_DMA_PUT, value);
            }
            let now_ns = self.timer.time(self.clock.now_ns());
            let mut env = ExecEnv {
                mem,
                display: &mut *self.display,
                now_ns,
            };
            self.exec.process_channel(&mut env, chid);
        } else if !extended {
            let now_ns = self.timer.time(self.clock.now_ns());
            let mut env = ExecEnv {
                mem,
                display: &mut *self.display,
                now_ns,
            };
            self.exec.submit_pio(&mut env, chid, subchannel, offset / 4, value);
        } else {
            tracing::trace!(chid, offset = format_args!("0x{offset:03x}"), "PIO write to extended window ignored");
        }
    }

    fn scratch_read(&mut self, addr: u32) -> u32 {
        self.report_unimplemented(addr);
        self.scratch.get(&addr).copied().unwrap_or(0)
    }

    fn scratch_write(&mut self, addr: u32, value: u32) {
        self.report_unimplemented(addr);
        self.scratch.insert(addr, value);
    }

    fn report_unimplemented(&mut self, addr: u32) {
        if mmio::PLAIN_STORAGE.contains(&addr) || !self.reported.insert(addr) {
            return;
        }
        tracing::warn!(offset = format_args!("0x{addr:06x}"), "unimplemented NV04 register");
    }
}
