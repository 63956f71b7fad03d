//! BAR0 register map and the plain register banks behind it.

/// BAR0 byte offsets.
pub mod mmio {
    pub const BAR0_SIZE: u64 = 16 * 1024 * 1024;

    pub const PMC_BOOT_0: u32 = 0x000000;
    pub const PMC_INTR: u32 = 0x000100;
    pub const PMC_INTR_EN: u32 = 0x000140;
    pub const PMC_ENABLE: u32 = 0x000200;

    pub const PBUS_INTR: u32 = 0x001100;
    pub const PBUS_INTR_EN: u32 = 0x001140;

    pub const PFIFO_INTR: u32 = 0x002100;
    pub const PFIFO_INTR_EN: u32 = 0x002140;
    pub const PFIFO_RAMHT: u32 = 0x002210;
    pub const PFIFO_RAMFC: u32 = 0x002214;
    pub const PFIFO_RAMRO: u32 = 0x002218;
    pub const PFIFO_RUNOUT_STATUS: u32 = 0x002400;
    pub const PFIFO_MODE: u32 = 0x002504;
    pub const PFIFO_CACHE1_PUSH1: u32 = 0x003204;
    pub const PFIFO_CACHE1_PUT: u32 = 0x003210;
    pub const PFIFO_CACHE1_STATUS: u32 = 0x003214;
    pub const PFIFO_CACHE1_DMA_PUSH: u32 = 0x003220;
    pub const PFIFO_CACHE1_DMA_INSTANCE: u32 = 0x00322c;
    pub const PFIFO_CACHE1_DMA_CTL: u32 = 0x003230;
    pub const PFIFO_CACHE1_DMA_PUT: u32 = 0x003240;
    pub const PFIFO_CACHE1_DMA_GET: u32 = 0x003244;
    pub const PFIFO_CACHE1_REF_CNT: u32 = 0x003248;
    pub const PFIFO_CACHE1_PULL0: u32 = 0x003250;
    pub const PFIFO_CACHE1_GET: u32 = 0x003270;
    /// Software-method ring readout: method word at `+8*i`, data word at `+8*i + 4`.
    pub const PFIFO_CACHE1_METHOD: u32 = 0x003800;
    pub const PFIFO_CACHE1_METHOD_END: u32 = PFIFO_CACHE1_METHOD + 8 * crate::fifo::CACHE1_SIZE as u32;

    pub const PTIMER_INTR: u32 = 0x009100;
    pub const PTIMER_INTR_EN: u32 = 0x009140;
    pub const PTIMER_NUMERATOR: u32 = 0x009200;
    pub const PTIMER_DENOMINATOR: u32 = 0x009210;
    pub const PTIMER_TIME_0: u32 = 0x009400;
    pub const PTIMER_TIME_1: u32 = 0x009410;
    pub const PTIMER_ALARM_0: u32 = 0x009420;

    pub const PFB_MEMORY_SIZE: u32 = 0x100000;
    pub const PEXTDEV_STRAPS: u32 = 0x101000;

    pub const PGRAPH_INTR: u32 = 0x400100;
    pub const PGRAPH_NSOURCE: u32 = 0x400108;
    pub const PGRAPH_INTR_EN: u32 = 0x400140;
    pub const PGRAPH_CTX_SWITCH1: u32 = 0x40014c;
    pub const PGRAPH_CTX_SWITCH2: u32 = 0x400150;
    pub const PGRAPH_CTX_SWITCH4: u32 = 0x400158;
    pub const PGRAPH_CTX_CONTROL: u32 = 0x40032c;
    pub const PGRAPH_STATUS: u32 = 0x400700;
    pub const PGRAPH_TRAPPED_ADDR: u32 = 0x400704;
    pub const PGRAPH_TRAPPED_DATA: u32 = 0x400708;
    pub const PGRAPH_NOTIFY: u32 = 0x400718;
    pub const PGRAPH_FIFO: u32 = 0x400720;
    pub const PGRAPH_CHANNEL_CTX_TABLE: u32 = 0x400780;

    pub const PCRTC_INTR: u32 = 0x600100;
    pub const PCRTC_INTR_EN: u32 = 0x600140;
    pub const PCRTC_START: u32 = 0x600800;
    pub const PCRTC_CONFIG: u32 = 0x600804;
    pub const PCRTC_RASTER: u32 = 0x600808;
    pub const PCRTC_CURSOR_OFFSET: u32 = 0x60080c;
    pub const PCRTC_CURSOR_CONFIG: u32 = 0x600810;

    pub const PRAMDAC_CURSOR_POS: u32 = 0x680300;
    pub const PRAMDAC_CURSOR_SYNC: u32 = 0x680404;
    pub const PRAMDAC_VPLL: u32 = 0x680508;
    pub const PRAMDAC_PLL_SELECT: u32 = 0x68050c;
    pub const PRAMDAC_VPLL_B: u32 = 0x680578;
    pub const PRAMDAC_GENERAL_CONTROL: u32 = 0x680600;
    pub const PRAMDAC_FP_HCRTC: u32 = 0x680828;

    /// Registers kept as plain storage in the scratch map without an "unimplemented" warning.
    pub const PLAIN_STORAGE: [u32; 5] = [
        PRAMDAC_CURSOR_POS,
        PRAMDAC_VPLL,
        PRAMDAC_PLL_SELECT,
        PRAMDAC_VPLL_B,
        PRAMDAC_GENERAL_CONTROL,
    ];

    /// Byte-addressed legacy VGA windows: `(start, end)` pairs, head select in bit 13.
    pub const VGA_WINDOWS: [(u32, u32); 6] = [
        (0x0c0300, 0x0c0400),
        (0x0c2300, 0x0c2400),
        (0x601300, 0x601400),
        (0x603300, 0x603400),
        (0x681300, 0x681400),
        (0x683300, 0x683400),
    ];

    pub const RAMIN: u32 = 0x700000;
    pub const RAMIN_END: u32 = 0x800000;

    pub const USER_COMPACT: u32 = 0x800000;
    pub const USER_COMPACT_END: u32 = 0xA00000;
    pub const USER_EXTENDED: u32 = 0xC00000;
    pub const USER_EXTENDED_END: u32 = 0xE00000;

    /// Offsets within a channel's control window.
    pub const USER_FREE: u32 = 0x10;
    pub const USER_DMA_PUT: u32 = 0x40;
    pub const USER_DMA_GET: u32 = 0x44;
    pub const USER_REF_CNT: u32 = 0x48;
    pub const USER_SUBROUTINE: u32 = 0x54;

    /// Legacy input status register folded into `PCRTC_RASTER`.
    pub const VGA_INPUT_STATUS_1: u16 = 0x3da;
}

/// `PMC_INTR` bits.
pub mod pmc_intr {
    pub const PFIFO: u32 = 1 << 8;
    pub const PGRAPH: u32 = 1 << 12;
    pub const PCRTC: u32 = 1 << 24;
    pub const PBUS: u32 = 1 << 28;
}

/// `PGRAPH_NOTIFY` value latched by an interrupting notify.
pub const PGRAPH_NOTIFY_PENDING: u32 = 0x0011_0000;

/// A `(status, enable)` interrupt pair. Status is write-one-to-clear from the guest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntrPair {
    pub status: u32,
    pub enable: u32,
}

impl IntrPair {
    pub fn pending(&self) -> bool {
        self.status & self.enable != 0
    }

    pub fn ack(&mut self, value: u32) {
        self.status &= !value;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pgraph {
    pub intr: IntrPair,
    pub nsource: u32,
    pub ctx_switch1: u32,
    pub ctx_switch2: u32,
    pub ctx_switch4: u32,
    pub ctx_control: u32,
    pub status: u32,
    pub trapped_addr: u32,
    pub trapped_data: u32,
    pub notify: u32,
    pub fifo: u32,
    pub channel_ctx_table: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pcrtc {
    pub intr: IntrPair,
    pub start: u32,
    pub config: u32,
    pub cursor_offset: u32,
    pub cursor_config: u32,
}

/// Value of `PMC_INTR`: one summary bit per unit with an enabled pending interrupt.
pub fn mc_intr(bus: IntrPair, fifo_pending: bool, graph: IntrPair, crtc: IntrPair) -> u32 {
    let mut value = 0;
    if bus.pending() {
        value |= pmc_intr::PBUS;
    }
    if fifo_pending {
        value |= pmc_intr::PFIFO;
    }
    if graph.pending() {
        value |= pmc_intr::PGRAPH;
    }
    if crtc.pending() {
        value |= pmc_intr::PCRTC;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mc_intr_needs_status_and_enable() {
        let crtc = IntrPair { status: 1, enable: 0 };
        assert_eq!(mc_intr(IntrPair::default(), false, IntrPair::default(), crtc), 0);
        let crtc = IntrPair { status: 1, enable: 1 };
        let graph = IntrPair { status: 1, enable: 1 };
        assert_eq!(
            mc_intr(IntrPair::default(), true, graph, crtc),
            pmc_intr::PFIFO | pmc_intr::PGRAPH | pmc_intr::PCRTC
        );
    }

    #[test]
    fn ack_clears_written_bits() {
        let mut pair = IntrPair { status: 0b101, enable: 0 };
        pair.ack(0b100);
        assert_eq!(pair.status, 0b001);
    }
}
