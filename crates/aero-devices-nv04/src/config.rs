//! Device configuration.

/// Board variant emulated by the device. Selects the architecture id reported through
/// `PMC_BOOT_0` and the default amount of VRAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardModel {
    /// NV04, RIVA TNT.
    #[default]
    RivaTnt,
    /// NV05, RIVA TNT2 M64.
    RivaTnt2M64,
}

impl CardModel {
    pub fn architecture(self) -> u32 {
        match self {
            CardModel::RivaTnt => 0x04,
            CardModel::RivaTnt2M64 => 0x05,
        }
    }

    pub fn default_vram_bytes(self) -> usize {
        match self {
            CardModel::RivaTnt => 16 * 1024 * 1024,
            CardModel::RivaTnt2M64 => 32 * 1024 * 1024,
        }
    }

    /// Value of `PMC_BOOT_0`.
    pub fn boot_id(self) -> u32 {
        match self {
            CardModel::RivaTnt => 0x2004_4001,
            other => other.architecture() << 20,
        }
    }

    /// Power-on value of the PEXTDEV straps register.
    pub fn straps(self) -> u32 {
        0x0000_01A2
    }
}

#[derive(Clone, Debug)]
pub struct Nv04DeviceConfig {
    pub model: CardModel,
    /// Overrides the model's VRAM size. Rounded up to a power of two, minimum 1 MiB.
    pub vram_size_bytes: Option<usize>,
    /// Vertical blank rate driving `PCRTC_INTR` and semaphore retries. `None`/`Some(0)` disables
    /// pacing from [`crate::Nv04Device::tick`]; hosts can still call `vblank` directly.
    pub vblank_hz: Option<u32>,
}

impl Default for Nv04DeviceConfig {
    fn default() -> Self {
        Self {
            model: CardModel::default(),
            vram_size_bytes: None,
            vblank_hz: Some(60),
        }
    }
}

impl Nv04DeviceConfig {
    pub const MIN_VRAM_BYTES: usize = 1024 * 1024;
    pub const MAX_VRAM_BYTES: usize = 256 * 1024 * 1024;

    pub fn vram_bytes(&self) -> usize {
        let requested = self
            .vram_size_bytes
            .unwrap_or_else(|| self.model.default_vram_bytes());
        requested
            .clamp(Self::MIN_VRAM_BYTES, Self::MAX_VRAM_BYTES)
            .next_power_of_two()
    }
}
