//! PFIFO state: command-stream decoding, the puller state machine and the software-method ring.

use crate::ramfc::FifoContext;

pub const CHANNEL_COUNT: usize = 32;

/// Entries in the CACHE1 software-method ring.
pub const CACHE1_SIZE: usize = 64;

/// Control word that pops the subroutine return address.
pub const RETURN_WORD: u32 = 0x0002_0000;

/// `PFIFO_INTR` bits.
pub mod intr {
    pub const CACHE_ERROR: u32 = 1 << 0;
    pub const DMA_PUSHER: u32 = 1 << 12;
}

/// `PFIFO_CACHE1_DMA_PUSH` bits.
pub mod dma_push {
    pub const BUSY: u32 = 1 << 8;
    pub const ERROR: u32 = 1 << 12;
}

/// `PFIFO_CACHE1_PULL0` bit set while software methods are waiting.
pub const PULL0_SOFTWARE_PENDING: u32 = 1 << 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodHeader {
    pub method: u32,
    pub subchannel: u32,
    pub count: u32,
    pub non_incrementing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlWord {
    OldJump(u32),
    Jump(u32),
    Call(u32),
    Return,
    Method(MethodHeader),
    Invalid(u32),
}

impl ControlWord {
    pub fn decode(word: u32) -> Self {
        if word & 0xE000_0003 == 0x2000_0000 {
            ControlWord::OldJump(word & 0x1FFF_FFFF)
        } else if word & 3 == 1 {
            ControlWord::Jump(word & !3)
        } else if word & 3 == 2 {
            ControlWord::Call(word & !3)
        } else if word == RETURN_WORD {
            ControlWord::Return
        } else if word & 0xA003_0003 == 0 {
            ControlWord::Method(MethodHeader {
                method: (word >> 2) & 0x7FF,
                subchannel: (word >> 13) & 7,
                count: (word >> 18) & 0x7FF,
                non_incrementing: word & 0x4000_0000 != 0,
            })
        } else {
            ControlWord::Invalid(word)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PullerState {
    #[default]
    AwaitingControlWord,
    CollectingMethodData {
        method: u32,
        subchannel: u32,
        remaining: u32,
        non_incrementing: bool,
    },
}

impl PullerState {
    pub fn from_header(header: MethodHeader) -> Self {
        if header.count == 0 {
            return PullerState::AwaitingControlWord;
        }
        PullerState::CollectingMethodData {
            method: header.method,
            subchannel: header.subchannel,
            remaining: header.count,
            non_incrementing: header.non_incrementing,
        }
    }

    /// State after one parameter word of the current method run was consumed.
    pub fn advance(self) -> Self {
        match self {
            PullerState::CollectingMethodData {
                method,
                subchannel,
                remaining,
                non_incrementing,
            } if remaining > 1 => PullerState::CollectingMethodData {
                method: if non_incrementing { method } else { method + 1 },
                subchannel,
                remaining: remaining - 1,
                non_incrementing,
            },
            _ => PullerState::AwaitingControlWord,
        }
    }
}

/// Capture buffer for methods on objects with no hardware engine. The guest drains it through the
/// CACHE1 registers. `put` and `get` are byte indices (4 bytes per entry).
#[derive(Debug, Clone)]
pub struct SoftwareMethodRing {
    methods: [u32; CACHE1_SIZE],
    data: [u32; CACHE1_SIZE],
    put: u32,
    get: u32,
}

impl Default for SoftwareMethodRing {
    fn default() -> Self {
        Self {
            methods: [0; CACHE1_SIZE],
            data: [0; CACHE1_SIZE],
            put: 0,
            get: 0,
        }
    }
}

impl SoftwareMethodRing {
    const INDEX_MASK: u32 = (CACHE1_SIZE as u32 * 4) - 1;

    pub fn push(&mut self, subchannel: u32, method: u32, param: u32) {
        let slot = (self.put / 4) as usize % CACHE1_SIZE;
        self.methods[slot] = (method << 2) | (subchannel << 13);
        self.data[slot] = param;
        self.put = (self.put + 4) & Self::INDEX_MASK;
    }

    pub fn is_empty(&self) -> bool {
        self.put == self.get
    }

    pub fn put(&self) -> u32 {
        self.put
    }

    pub fn get(&self) -> u32 {
        self.get
    }

    /// Raw register write. The guest owns this index only for save/restore.
    pub fn set_put(&mut self, value: u32) {
        self.put = value;
    }

    pub fn set_get(&mut self, value: u32) {
        self.get = value & Self::INDEX_MASK & !3;
    }

    pub fn method_word(&self, index: usize) -> u32 {
        self.methods[index % CACHE1_SIZE]
    }

    pub fn data_word(&self, index: usize) -> u32 {
        self.data[index % CACHE1_SIZE]
    }
}

/// PFIFO registers plus the CACHE1 shadow of the active channel's cursors.
#[derive(Debug, Clone, Default)]
pub struct Pfifo {
    pub intr: u32,
    pub intr_en: u32,
    pub ramht: u32,
    pub ramfc: u32,
    pub ramro: u32,
    pub mode: u32,
    pub push1: u32,
    pub dma_push: u32,
    pub pull0: u32,
    pub shadow: FifoContext,
    pub ring: SoftwareMethodRing,
}

impl Pfifo {
    pub fn current_channel(&self) -> u32 {
        self.push1 & 0x1F
    }

    pub fn set_current_channel(&mut self, chid: u32) {
        self.push1 = (self.push1 & !0x1F) | (chid & 0x1F);
    }

    pub fn dma_push_enabled(&self, chid: u32) -> bool {
        chid < CHANNEL_COUNT as u32 && self.mode & (1 << chid) != 0
    }

    /// Value of `PFIFO_CACHE1_PULL0`. Reading latches the pending bit while the ring is non-empty.
    pub fn read_pull0(&mut self) -> u32 {
        if !self.ring.is_empty() {
            self.pull0 |= PULL0_SOFTWARE_PENDING;
        }
        self.pull0
    }

    /// `PFIFO_RUNOUT_STATUS` and `PFIFO_CACHE1_STATUS` share the "empty" encoding.
    pub fn cache_status(&self) -> u32 {
        if self.ring.is_empty() {
            0x10
        } else {
            0
        }
    }

    pub fn write_cache1_get(&mut self, value: u32) {
        self.ring.set_get(value);
        if self.ring.is_empty() {
            self.intr &= !intr::CACHE_ERROR;
            self.pull0 &= !PULL0_SOFTWARE_PENDING;
        } else {
            self.intr |= intr::CACHE_ERROR;
        }
    }

    pub fn push_software_method(&mut self, subchannel: u32, method: u32, param: u32) {
        self.intr |= intr::CACHE_ERROR;
        self.pull0 |= PULL0_SOFTWARE_PENDING;
        self.ring.push(subchannel, method, param);
    }

    pub fn pending(&self) -> bool {
        self.intr & self.intr_en != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_control_words() {
        assert_eq!(ControlWord::decode(0x2000_1000), ControlWord::OldJump(0x1000));
        assert_eq!(ControlWord::decode(0x0000_2001), ControlWord::Jump(0x2000));
        assert_eq!(ControlWord::decode(0x0000_3002), ControlWord::Call(0x3000));
        assert_eq!(ControlWord::decode(RETURN_WORD), ControlWord::Return);
        assert_eq!(
            ControlWord::decode((2 << 18) | (3 << 13) | (0x0c0 << 2)),
            ControlWord::Method(MethodHeader {
                method: 0x0c0,
                subchannel: 3,
                count: 2,
                non_incrementing: false,
            })
        );
        assert_eq!(
            ControlWord::decode(0x4000_0000 | (1 << 18) | (0x100 << 2)),
            ControlWord::Method(MethodHeader {
                method: 0x100,
                subchannel: 0,
                count: 1,
                non_incrementing: true,
            })
        );
        assert_eq!(ControlWord::decode(0x8000_0000), ControlWord::Invalid(0x8000_0000));
        assert_eq!(ControlWord::decode(0x0001_0000), ControlWord::Invalid(0x0001_0000));
    }

    #[test]
    fn puller_state_walks_method_run() {
        let header = MethodHeader {
            method: 0x40,
            subchannel: 1,
            count: 2,
            non_incrementing: false,
        };
        let s = PullerState::from_header(header);
        let s = s.advance();
        assert_eq!(
            s,
            PullerState::CollectingMethodData {
                method: 0x41,
                subchannel: 1,
                remaining: 1,
                non_incrementing: false
            }
        );
        assert_eq!(s.advance(), PullerState::AwaitingControlWord);
        assert_eq!(
            PullerState::from_header(MethodHeader { count: 0, ..header }),
            PullerState::AwaitingControlWord
        );
    }

    #[test]
    fn software_ring_wraps_and_drains() {
        let mut fifo = Pfifo::default();
        for i in 0..CACHE1_SIZE as u32 {
            fifo.push_software_method(2, 0x100 + i, i);
        }
        assert_eq!(fifo.ring.put(), 0);
        assert_eq!(fifo.ring.method_word(1), (0x101 << 2) | (2 << 13));
        fifo.push_software_method(0, 0x50, 0xaa);
        assert_eq!(fifo.ring.data_word(0), 0xaa);
        assert_ne!(fifo.intr & intr::CACHE_ERROR, 0);
        assert_eq!(fifo.cache_status(), 0);

        fifo.write_cache1_get(4);
        assert!(fifo.ring.is_empty());
        assert_eq!(fifo.intr & intr::CACHE_ERROR, 0);
        assert_eq!(fifo.read_pull0() & PULL0_SOFTWARE_PENDING, 0);
        assert_eq!(fifo.cache_status(), 0x10);
    }
}
