#![cfg(not(target_arch = "wasm32"))]

use aero_devices_nv04::dma::DmaTarget;
use aero_devices_nv04::ramht::{self, ENGINE_GRAPHICS};
use aero_devices_nv04::{write_dma_object, ChannelFault, DmaFlags, DmaObject, ObjectContext, RamhtConfig, Vram};
use proptest::prelude::*;

const VRAM_BYTES: usize = 1 << 20;

proptest! {
    #[test]
    fn ramht_finds_every_inserted_object(
        entries in proptest::collection::btree_map((1u32.., 0u32..32), 0u32..0x800, 1..96),
        missing in 1u32..,
    ) {
        let mut vram = Vram::new(VRAM_BYTES);
        let cfg = RamhtConfig::from_reg(0x100);
        for (&(handle, chid), &slot) in &entries {
            let ctx = ObjectContext::new(0x2_0000 + slot * 0x10, ENGINE_GRAPHICS, chid);
            ramht::insert(&mut vram, cfg, handle, ctx).unwrap();
        }
        for (&(handle, chid), &slot) in &entries {
            let ctx = ramht::lookup(&vram, cfg, handle, chid).unwrap();
            prop_assert_eq!(ctx.instance(), 0x2_0000 + slot * 0x10);
            prop_assert_eq!(ctx.chid(), chid);
            prop_assert_eq!(ctx.engine(), ENGINE_GRAPHICS);
        }
        if !entries.keys().any(|&(handle, chid)| handle == missing && chid == 0) {
            prop_assert_eq!(
                ramht::lookup(&vram, cfg, missing, 0),
                Err(ChannelFault::RamhtMiss { handle: missing, chid: 0 })
            );
        }
    }

    #[test]
    fn linear_dma_respects_limit(
        frame_page in 0u32..0x80,
        adjust in 0u32..0x1000,
        limit in 0u32..0x2_0000,
        offset in 0u32..0x4_0000,
        width in prop::sample::select(vec![1u32, 2, 4, 8]),
    ) {
        let mut vram = Vram::new(VRAM_BYTES);
        let flags = 0x3D | DmaFlags::PAGE_TABLE_LINEAR.bits() | (adjust << 20);
        write_dma_object(&mut vram, 0x1000, flags, limit, &[frame_page << 12]);
        let obj = DmaObject::load(&vram, 0x1000).unwrap();
        let result = obj.translate(&vram, offset, width);

        let last = u64::from(offset) + u64::from(width) - 1;
        if last > u64::from(limit) {
            prop_assert!(result.is_err());
        } else {
            let address = u64::from(frame_page << 12) + u64::from(adjust) + u64::from(offset);
            match result {
                Ok(at) => {
                    prop_assert_eq!(at.target, DmaTarget::Vram);
                    prop_assert_eq!(at.address, address);
                }
                Err(_) => prop_assert!(address + u64::from(width) > VRAM_BYTES as u64),
            }
        }
    }

    #[test]
    fn paged_dma_maps_each_page_through_its_entry(
        pages in proptest::collection::vec(0u32..0x100, 1..8),
        offset_seed in any::<u32>(),
    ) {
        let mut vram = Vram::new(VRAM_BYTES);
        let frames: Vec<u32> = pages.iter().map(|p| (p << 12) | 0x3).collect();
        let limit = pages.len() as u32 * 0x1000 - 1;
        let flags = 0x3D | DmaFlags::PAGE_TABLE_PRESENT.bits();
        write_dma_object(&mut vram, 0x1000, flags, limit, &frames);
        let obj = DmaObject::load(&vram, 0x1000).unwrap();

        let offset = offset_seed % (limit + 1) & !3;
        let at = obj.translate(&vram, offset, 4).unwrap();
        let page = (offset >> 12) as usize;
        prop_assert_eq!(at.address, u64::from(pages[page] << 12) + u64::from(offset & 0xFFF));
    }
}
