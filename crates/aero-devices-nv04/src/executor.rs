//! Command-execution core: channels, PFIFO and the PGRAPH state the dispatcher latches.
//!
//! [`Nv04Executor`] owns device memory and everything the FIFO puller mutates. The surrounding
//! [`crate::Nv04Device`] owns the register windows and hands collaborators in through an
//! [`ExecEnv`] on every entry point.

use crate::bus::MemoryBus;
use crate::channel::Channel;
use crate::error::ChannelFault;
use crate::fifo::{dma_push, intr, Pfifo, CHANNEL_COUNT};
use crate::host::DisplaySink;
use crate::ramht::RamhtConfig;
use crate::regs::Pgraph;
use crate::vram::Vram;

/// Collaborators a dispatched method may reach.
pub struct ExecEnv<'a> {
    pub mem: &'a mut dyn MemoryBus,
    pub display: &'a mut dyn DisplaySink,
    /// PTIMER value stamped into notifiers.
    pub now_ns: u64,
}

/// Outcome of dispatching one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Done,
    /// A semaphore acquire found the wrong value. The word must be re-read on the next retry.
    NotReady,
}

pub struct Nv04Executor {
    pub vram: Vram,
    pub channels: Vec<Channel>,
    pub fifo: Pfifo,
    pub pgraph: Pgraph,
    /// Some channel stalled on a semaphore acquire since the last vblank.
    pub acquire_active: bool,
}

impl Nv04Executor {
    pub fn new(vram_bytes: usize) -> Self {
        Self {
            vram: Vram::new(vram_bytes),
            channels: vec![Channel::default(); CHANNEL_COUNT],
            fifo: Pfifo::default(),
            pgraph: Pgraph::default(),
            acquire_active: false,
        }
    }

    pub fn reset(&mut self) {
        self.vram.clear();
        self.channels.iter_mut().for_each(|ch| *ch = Channel::default());
        self.fifo = Pfifo::default();
        self.pgraph = Pgraph::default();
        self.acquire_active = false;
    }

    pub fn ramht_config(&self) -> RamhtConfig {
        RamhtConfig::from_reg(self.fifo.ramht)
    }

    pub fn channel(&self, chid: u32) -> Option<&Channel> {
        self.channels.get(chid as usize)
    }

    /// Stops `chid` after a protocol violation and raises `PFIFO_INTR.DMA_PUSHER`.
    pub fn fail_channel(&mut self, chid: u32, fault: ChannelFault) {
        tracing::error!(chid, error = %fault, "FIFO channel failed");
        if let Some(ch) = self.channels.get_mut(chid as usize) {
            ch.errored = true;
        }
        self.fifo.intr |= intr::DMA_PUSHER;
        self.fifo.dma_push |= dma_push::ERROR;
    }

    /// `PFIFO_INTR` write. Acknowledging `DMA_PUSHER` returns failed channels to service.
    pub fn ack_fifo_intr(&mut self, value: u32) {
        self.fifo.intr &= !value;
        if value & intr::DMA_PUSHER != 0 {
            for (chid, ch) in self.channels.iter_mut().enumerate() {
                if ch.errored {
                    tracing::debug!(chid, "FIFO channel recovered");
                }
                ch.recover();
            }
        }
    }

    /// Vertical retrace: retries every channel if any of them stalled on an acquire.
    pub fn retry_stalled(&mut self, env: &mut ExecEnv<'_>) {
        if !self.acquire_active {
            return;
        }
        self.acquire_active = false;
        for chid in 0..CHANNEL_COUNT as u32 {
            self.process_channel(env, chid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fifo::PullerState;

    #[test]
    fn failed_channel_recovers_on_ack() {
        let mut exec = Nv04Executor::new(1 << 20);
        exec.channels[3].puller = PullerState::CollectingMethodData {
            method: 0x40,
            subchannel: 0,
            remaining: 2,
            non_incrementing: false,
        };
        exec.channels[3].subroutine = Some(0x40);
        exec.fail_channel(3, ChannelFault::ReturnWithoutCall);
        assert!(exec.channels[3].errored);
        assert_ne!(exec.fifo.intr & intr::DMA_PUSHER, 0);
        assert_ne!(exec.fifo.dma_push & dma_push::ERROR, 0);

        exec.ack_fifo_intr(intr::CACHE_ERROR);
        assert!(exec.channels[3].errored);

        exec.ack_fifo_intr(intr::DMA_PUSHER);
        assert!(!exec.channels[3].errored);
        assert_eq!(exec.channels[3].puller, PullerState::AwaitingControlWord);
        assert_eq!(exec.channels[3].subroutine, None);
        assert_eq!(exec.fifo.intr & intr::DMA_PUSHER, 0);
    }
}
