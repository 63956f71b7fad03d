//! Method dispatch: subchannel binding, the FIFO-level system methods, and routing of class
//! methods to the raster engines.

use crate::channel::Binding;
use crate::dma::DmaSpace;
use crate::engines::{EngineClass, MethodCall};
use crate::error::ChannelFault;
use crate::executor::{Dispatch, ExecEnv, Nv04Executor};
use crate::ramht::{self, ENGINE_GRAPHICS, ENGINE_SOFTWARE};
use crate::raster::RasterCtx;
use crate::regs::PGRAPH_NOTIFY_PENDING;
use crate::semaphore;

/// FIFO-level method indices, handled before any class.
pub mod mthd {
    pub const BIND: u32 = 0x000;
    pub const REF_CNT: u32 = 0x014;
    pub const SEMAPHORE_OBJECT: u32 = 0x018;
    pub const SEMAPHORE_OFFSET: u32 = 0x019;
    pub const SEMAPHORE_ACQUIRE: u32 = 0x01a;
    pub const SEMAPHORE_RELEASE: u32 = 0x01b;
    /// First method routed to the bound object.
    pub const FIRST_CLASS_METHOD: u32 = 0x040;
    pub const NOTIFY: u32 = 0x041;
    pub const SET_NOTIFIER: u32 = 0x060;
}

/// Methods whose parameter is an object handle resolved through RAMHT.
const HANDLE_METHODS: std::ops::Range<u32> = 0x060..0x080;

impl Nv04Executor {
    /// Executes one `(subchannel, method, param)` triple on channel `chid`.
    pub fn execute_command(
        &mut self,
        env: &mut ExecEnv<'_>,
        chid: u32,
        subc: u32,
        method: u32,
        param: u32,
    ) -> Result<Dispatch, ChannelFault> {
        tracing::trace!(
            chid,
            subc,
            method = format_args!("0x{method:03x}"),
            param = format_args!("0x{param:08x}"),
            "method"
        );
        let idx = chid as usize;
        let sub = (subc & 7) as usize;
        if idx >= self.channels.len() {
            tracing::warn!(chid, "method for nonexistent channel");
            return Ok(Dispatch::Done);
        }

        match method {
            mthd::BIND => self.bind(chid, sub, param)?,
            mthd::REF_CNT => self.fifo.shadow.ref_cnt = param,
            mthd::SEMAPHORE_OBJECT => {
                let obj = ramht::lookup(&self.vram, self.ramht_config(), param, chid)?;
                self.fifo.shadow.semaphore = semaphore::bind_object(obj.instance());
            }
            mthd::SEMAPHORE_OFFSET => {
                self.fifo.shadow.semaphore = semaphore::set_offset(self.fifo.shadow.semaphore, param);
            }
            mthd::SEMAPHORE_ACQUIRE => {
                let reg = self.fifo.shadow.semaphore;
                let mut dma = DmaSpace::new(&mut self.vram, &mut *env.mem);
                if !semaphore::try_acquire(&mut dma, reg, param) {
                    tracing::debug!(chid, expected = format_args!("0x{param:08x}"), "semaphore acquire stalled");
                    self.acquire_active = true;
                    return Ok(Dispatch::NotReady);
                }
            }
            mthd::SEMAPHORE_RELEASE => {
                let reg = self.fifo.shadow.semaphore;
                let mut dma = DmaSpace::new(&mut self.vram, &mut *env.mem);
                semaphore::release(&mut dma, reg, param);
            }
            m if m >= mthd::FIRST_CLASS_METHOD => {
                match self.channels[idx].subchannels[sub].engine {
                    ENGINE_GRAPHICS => self.graphics_method(env, chid, sub, method, param)?,
                    ENGINE_SOFTWARE => self.fifo.push_software_method(sub as u32, method, param),
                    engine => tracing::warn!(chid, subc, engine, "method for unknown engine"),
                }
            }
            _ => tracing::trace!(chid, method = format_args!("0x{method:03x}"), "ignored FIFO method"),
        }
        Ok(Dispatch::Done)
    }

    fn bind(&mut self, chid: u32, sub: usize, handle: u32) -> Result<(), ChannelFault> {
        let idx = chid as usize;
        let old = self.channels[idx].subchannels[sub];
        if old.engine == ENGINE_GRAPHICS {
            self.save_object_context(idx, old);
        }
        let obj = ramht::lookup(&self.vram, self.ramht_config(), handle, chid)?;
        let binding = &mut self.channels[idx].subchannels[sub];
        binding.object = obj.instance();
        binding.engine = obj.engine();
        tracing::debug!(
            chid,
            subc = sub,
            handle = format_args!("0x{handle:08x}"),
            object = format_args!("0x{:x}", obj.instance()),
            engine = obj.engine(),
            "bind"
        );
        match obj.engine() {
            ENGINE_GRAPHICS => self.load_object_context(idx, sub),
            ENGINE_SOFTWARE => self.fifo.push_software_method(sub as u32, mthd::BIND, handle),
            engine => tracing::warn!(chid, subc = sub, engine, "bind to unknown engine"),
        }
        Ok(())
    }

    /// Writes the channel's latched class state back into the descriptor of the object being
    /// unbound.
    fn save_object_context(&mut self, idx: usize, old: Binding) {
        let g = &self.channels[idx].graph;
        let vram = &mut self.vram;
        let object = old.object;
        let mut word0 = vram.ramin_read32(object);
        let mut word1 = (vram.ramin_read32(object + 4) & 0xFFF0_0000) | (old.notifier >> 4);
        match word0 as u8 {
            0x4a | 0x4b => word1 = (word1 & 0xFCFF_FFFF) | ((g.gdi.mono_format & 3) << 24),
            0x42 | 0x62 => {
                vram.ramin_write32(object + 0x8, g.surf2d.src >> 4);
                vram.ramin_write32(object + 0xC, g.surf2d.dst >> 4);
            }
            0x60 | 0x64 => {
                vram.ramin_write32(object + 0x8, g.iifc.palette >> 4);
                word0 = (word0 & 0xFFC7_FFFF) | ((g.iifc.operation & 7) << 19);
                vram.ramin_write32(object, word0);
                word1 = (word1 & 0xFFFF_00FF) | ((g.iifc.format.wrapping_add(9) & 0xFF) << 8);
                vram.ramin_write32(object + 0x10, g.iifc.format);
            }
            _ => {}
        }
        vram.ramin_write32(object + 4, word1);
    }

    /// Loads the notifier and per-class state stored in a freshly bound object's descriptor.
    fn load_object_context(&mut self, idx: usize, sub: usize) {
        let object = self.channels[idx].subchannels[sub].object;
        let vram = &self.vram;
        let word0 = vram.ramin_read32(object);
        let word1 = vram.ramin_read32(object + 4);
        let ch = &mut self.channels[idx];
        ch.subchannels[sub].notifier = (word1 & 0xFFFFF) << 4;
        let g = &mut ch.graph;
        match word0 as u8 {
            0x4a | 0x4b => g.gdi.mono_format = (word1 >> 24) & 3,
            0x42 | 0x62 => {
                g.surf2d.src = vram.ramin_read32(object + 0x8) << 4;
                g.surf2d.dst = vram.ramin_read32(object + 0xC) << 4;
            }
            0x60 | 0x64 => {
                g.iifc.palette = vram.ramin_read32(object + 0x8) << 4;
                g.iifc.operation = (word0 >> 19) & 7;
                let format = vram.ramin_read32(object + 0x10);
                g.iifc.set_format(if format == 0 { 1 } else { format });
            }
            _ => {}
        }
    }

    fn graphics_method(
        &mut self,
        env: &mut ExecEnv<'_>,
        chid: u32,
        sub: usize,
        method: u32,
        mut param: u32,
    ) -> Result<(), ChannelFault> {
        if HANDLE_METHODS.contains(&method) {
            param = ramht::lookup(&self.vram, self.ramht_config(), param, chid)?.instance();
        }
        let idx = chid as usize;
        let binding = self.channels[idx].subchannels[sub];
        let class = self.vram.ramin_read32(binding.object) as u8;
        let call = MethodCall {
            chid,
            subchannel: sub as u32,
            method,
            param,
            notifier: binding.notifier,
        };

        let ch = &mut self.channels[idx];
        let mut ctx = RasterCtx {
            dma: DmaSpace::new(&mut self.vram, &mut *env.mem),
            display: &mut *env.display,
            now_ns: env.now_ns,
        };
        match EngineClass::from_class(class) {
            Some(engine) => engine.execute(&mut ch.graph, &mut ctx, call),
            None => tracing::warn!(
                chid,
                class = format_args!("0x{class:02x}"),
                method = format_args!("0x{method:03x}"),
                "no engine for object class"
            ),
        }

        if ch.notify_pending {
            ch.notify_pending = false;
            ctx.write_notifier(binding.notifier, 0);
            if ch.notify_interrupt {
                let pgraph = &mut self.pgraph;
                pgraph.intr.status |= 1;
                pgraph.nsource |= 1;
                pgraph.notify = PGRAPH_NOTIFY_PENDING;
                pgraph.ctx_switch1 = binding.notifier >> 4;
                pgraph.ctx_switch4 = binding.object >> 4;
                pgraph.trapped_addr = (method << 2) | ((sub as u32) << 16) | (chid << 20);
                pgraph.trapped_data = param;
                tracing::debug!(chid, "notify interrupt");
            }
        }
        match method {
            mthd::NOTIFY => {
                ch.notify_pending = true;
                ch.notify_interrupt = param != 0;
            }
            mthd::SET_NOTIFIER => ch.subchannels[sub].notifier = param,
            _ => {}
        }
        Ok(())
    }
}
