//! FIFO puller: walks a channel's push buffer from GET to PUT, decoding control words and feeding
//! method data to the dispatcher.

use crate::dma::DmaSpace;
use crate::error::ChannelFault;
use crate::executor::{Dispatch, ExecEnv, Nv04Executor};
use crate::fifo::{dma_push, ControlWord, PullerState};
use crate::ramfc::{self, FifoContext};

/// Words fetched per kick before the puller yields. A push buffer whose PUT is unreachable from
/// GET (misaligned, or behind a jump loop) would otherwise spin forever.
pub const MAX_WORDS_PER_KICK: u32 = 1 << 22;

impl Nv04Executor {
    /// Runs channel `chid` until its GET reaches PUT, it stalls on a semaphore, or it faults.
    pub fn process_channel(&mut self, env: &mut ExecEnv<'_>, chid: u32) {
        let Some(channel) = self.channels.get(chid as usize) else {
            tracing::warn!(chid, "FIFO kick for nonexistent channel");
            return;
        };
        if channel.errored {
            tracing::trace!(chid, "FIFO kick ignored on failed channel");
            return;
        }
        if self.fifo.current_channel() == chid {
            if self.fifo.shadow.dma_put == self.fifo.shadow.dma_get {
                return;
            }
        } else {
            let reg = self.fifo.ramfc;
            let put = ramfc::read_slot(&self.vram, reg, chid, ramfc::SLOT_DMA_PUT);
            let get = ramfc::read_slot(&self.vram, reg, chid, ramfc::SLOT_DMA_GET);
            if put == get {
                return;
            }
            self.switch_channel(chid);
        }
        self.fifo.dma_push |= dma_push::BUSY;
        if let Err(fault) = self.pull(env, chid) {
            self.fail_channel(chid, fault);
        }
    }

    /// Flushes the live cursors to the outgoing channel's RAMFC slot and loads `chid`'s.
    pub fn switch_channel(&mut self, chid: u32) {
        let old = self.fifo.current_channel();
        let reg = self.fifo.ramfc;
        self.fifo.shadow.save(&mut self.vram, reg, old);
        self.fifo.shadow = FifoContext::load(&self.vram, reg, chid);
        self.fifo.set_current_channel(chid);
        tracing::trace!(from = old, to = chid, "FIFO channel switch");
    }

    fn pull(&mut self, env: &mut ExecEnv<'_>, chid: u32) -> Result<(), ChannelFault> {
        let idx = chid as usize;
        let mut budget = MAX_WORDS_PER_KICK;
        while self.fifo.shadow.dma_get != self.fifo.shadow.dma_put {
            if budget == 0 {
                tracing::warn!(
                    chid,
                    get = format_args!("0x{:08x}", self.fifo.shadow.dma_get),
                    put = format_args!("0x{:08x}", self.fifo.shadow.dma_put),
                    "FIFO kick budget exhausted"
                );
                break;
            }
            budget -= 1;

            let get = self.fifo.shadow.dma_get;
            let pushbuf = self.fifo.shadow.dma_instance << 4;
            let word = DmaSpace::new(&mut self.vram, &mut *env.mem).read_u32(pushbuf, get);
            self.fifo.shadow.dma_get = get.wrapping_add(4);
            tracing::trace!(chid, get = format_args!("0x{get:08x}"), word = format_args!("0x{word:08x}"), "FIFO word");

            match self.channels[idx].puller {
                PullerState::CollectingMethodData {
                    method, subchannel, ..
                } => {
                    if self.execute_command(env, chid, subchannel, method, word)? == Dispatch::NotReady {
                        self.fifo.shadow.dma_get = get;
                        break;
                    }
                    let ch = &mut self.channels[idx];
                    ch.puller = ch.puller.advance();
                }
                PullerState::AwaitingControlWord => self.control_word(idx, word)?,
            }
        }
        Ok(())
    }

    fn control_word(&mut self, idx: usize, word: u32) -> Result<(), ChannelFault> {
        let ch = &mut self.channels[idx];
        let get = &mut self.fifo.shadow.dma_get;
        match ControlWord::decode(word) {
            ControlWord::OldJump(target) | ControlWord::Jump(target) => {
                tracing::trace!(target = format_args!("0x{target:08x}"), "FIFO jump");
                *get = target;
            }
            ControlWord::Call(target) => {
                if let Some(return_to) = ch.subroutine {
                    return Err(ChannelFault::NestedCall { target, return_to });
                }
                tracing::trace!(target = format_args!("0x{target:08x}"), "FIFO call");
                ch.subroutine = Some(*get);
                *get = target;
            }
            ControlWord::Return => {
                let return_to = ch.subroutine.take().ok_or(ChannelFault::ReturnWithoutCall)?;
                tracing::trace!(target = format_args!("0x{return_to:08x}"), "FIFO return");
                *get = return_to;
            }
            ControlWord::Method(header) => ch.puller = PullerState::from_header(header),
            ControlWord::Invalid(word) => return Err(ChannelFault::MalformedControlWord(word)),
        }
        Ok(())
    }

    /// Dispatches one method written straight to a channel's PIO window. There is no cursor to
    /// rewind, so a stalled acquire is dropped.
    pub fn submit_pio(&mut self, env: &mut ExecEnv<'_>, chid: u32, subc: u32, method: u32, param: u32) {
        match self.execute_command(env, chid, subc, method, param) {
            Ok(Dispatch::Done) => {}
            Ok(Dispatch::NotReady) => {
                tracing::debug!(chid, subc, "semaphore acquire on PIO submission dropped");
            }
            Err(fault) => self.fail_channel(chid, fault),
        }
    }
}
