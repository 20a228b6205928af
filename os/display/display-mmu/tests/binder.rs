use display_addresses::{DeviceAddress, PhysicalAddress, PhysicalPage, Size4K};
use display_dma::{DmaMemory, DmaSlot, PoolBuffer, PoolDmaAllocator};
use display_info::EngineConfig;
use display_info::surface::{BlockSize, Compression};
use display_mmu::{MmuBinder, MmuError, SgTable, SurfaceLayout};
use display_registers::map::{MMU, mmu};

const CONFIG: EngineConfig = EngineConfig {
    mmu_pad_entries: 2,
    mmu_align_entries: 4,
    mmu_table_max_entries: 8,
    ..EngineConfig::DEFAULT
};

fn dma() -> PoolDmaAllocator {
    PoolDmaAllocator::new(DeviceAddress::new(0x4000_0000), 64, 0x40)
}

fn scattered(pfns: &[u64]) -> SgTable {
    SgTable::from_pages(pfns.iter().map(|&p| PhysicalPage::<Size4K>::from_pfn(p)))
}

fn words(slot: &DmaSlot<PoolBuffer>, from: usize, count: usize) -> Vec<u32> {
    slot.get().unwrap().as_bytes()[from * 4..(from + count) * 4]
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect()
}

#[test]
fn compressed_surface_aliases_the_first_table() {
    let binder = MmuBinder::from_config(&CONFIG);
    let mut dma = dma();
    let mut slot = DmaSlot::empty();
    let layout = SurfaceLayout::single(0x2800, Compression::Afbc(BlockSize::B32x8));

    let b = binder
        .bind(1, &layout, &scattered(&[0x100, 0x200, 0x300]), &mut dma, &mut slot)
        .unwrap();

    assert!(b.is_translated() && b.is_aliased());
    let t0 = *b.table(0).unwrap();
    assert_eq!(b.table(1), Some(&t0));
    assert_eq!(t0.va, 0x2000_0000);
    assert_eq!(t0.size, 0x3000);
    assert_eq!(t0.entries, 8);
    assert_eq!(b.plane_base(0), Some(DeviceAddress::new(0x2000_0000)));
    assert_eq!(
        words(&slot, 0, 8),
        [0x100, 0x200, 0x300, 0x300, 0x300, 0x300, 0x300, 0x300]
    );

    let mut writes = Vec::new();
    b.register_writes(&mut writes).unwrap();
    assert_eq!(writes[0], (MMU.at(1, mmu::CTRL).unwrap(), 0b1101));
    let base_lo = |i| {
        writes
            .iter()
            .find(|(r, _)| *r == MMU.at(1, mmu::table(i).base_lo).unwrap())
            .map(|&(_, v)| v)
    };
    assert_eq!(base_lo(0), base_lo(1));
}

#[test]
fn planes_get_their_own_tables_and_windows() {
    let binder = MmuBinder::from_config(&CONFIG);
    let mut dma = dma();
    let mut slot = DmaSlot::empty();
    let layout = SurfaceLayout {
        size: 0x3000,
        planes: 2,
        offsets: [0, 0x2000, 0],
        compression: Compression::None,
    };

    let b = binder
        .bind(0, &layout, &scattered(&[5, 7, 9]), &mut dma, &mut slot)
        .unwrap();

    let (t0, t1) = (*b.table(0).unwrap(), *b.table(1).unwrap());
    assert!(!b.is_aliased());
    assert_eq!((t0.va, t0.size, t0.entries), (0x1000_0000, 0x2000, 4));
    assert_eq!((t1.va, t1.size, t1.entries), (0x1000_2000, 0x1000, 4));
    assert_eq!(t1.base.as_u64() - t0.base.as_u64(), 16);
    assert_eq!(words(&slot, 0, 8), [5, 7, 7, 7, 9, 9, 9, 9]);
    assert_eq!(b.plane_base(1), Some(DeviceAddress::new(0x1000_2000)));
}

#[test]
fn planes_sharing_a_page_both_map_it() {
    let binder = MmuBinder::from_config(&CONFIG);
    let mut dma = dma();
    let mut slot = DmaSlot::empty();
    let layout = SurfaceLayout {
        size: 0x3000,
        planes: 2,
        offsets: [0, 0x1800, 0],
        compression: Compression::None,
    };

    let b = binder
        .bind(0, &layout, &scattered(&[5, 7, 9]), &mut dma, &mut slot)
        .unwrap();
    assert_eq!(b.table(1).unwrap().va, 0x1000_1000);
    assert_eq!(words(&slot, 4, 2), [7, 9]);
    assert_eq!(b.plane_base(1), Some(DeviceAddress::new(0x1000_1800)));
}

#[test]
fn absent_plane_offsets_start_at_the_end_of_the_buffer() {
    let binder = MmuBinder::from_config(&CONFIG);
    let mut dma = dma();
    let mut slot = DmaSlot::empty();
    let layout = SurfaceLayout {
        size: 0x2000,
        planes: 2,
        offsets: [0; 3],
        compression: Compression::None,
    };

    let b = binder
        .bind(0, &layout, &scattered(&[5, 9]), &mut dma, &mut slot)
        .unwrap();
    assert_eq!(layout.plane_range(1), (0x2000, 0x2000));
    assert_eq!(b.tables().count(), 1);
    let t0 = *b.table(0).unwrap();
    assert_eq!((t0.va, t0.size, t0.entries), (0x1000_0000, 0x2000, 4));
    assert_eq!(words(&slot, 0, 4), [5, 9, 9, 9]);
    assert_eq!(b.plane_base(1), Some(DeviceAddress::new(0x1000_2000)));

    let sg = SgTable::contiguous_run(PhysicalAddress::new(0x8000_0000), 0x2000);
    let direct = binder.bind(0, &layout, &sg, &mut dma, &mut slot).unwrap();
    assert_eq!(direct.plane_base(1), Some(DeviceAddress::new(0x8000_2000)));
}

#[test]
fn contiguous_buffer_ignores_the_window_size() {
    let narrow = MmuBinder::from_config(&EngineConfig {
        mmu_window_bytes: 0x4000,
        ..CONFIG
    });
    let mut dma = dma();
    let mut slot = DmaSlot::empty();
    let layout = SurfaceLayout::single(0x8000, Compression::None);
    let sg = SgTable::contiguous_run(PhysicalAddress::new(0x8000_0000), 0x8000);

    let b = narrow.bind(0, &layout, &sg, &mut dma, &mut slot).unwrap();
    assert!(!b.is_translated());
    assert_eq!(b.plane_base(0), Some(DeviceAddress::new(0x8000_0000)));
}

#[test]
fn contiguous_buffer_skips_the_tables() {
    let binder = MmuBinder::from_config(&CONFIG);
    let mut dma = dma();
    let mut slot = DmaSlot::empty();
    let layout = SurfaceLayout {
        size: 0x3000,
        planes: 2,
        offsets: [0, 0x2000, 0],
        compression: Compression::Afbc(BlockSize::B16x16),
    };
    let sg = SgTable::contiguous_run(PhysicalAddress::new(0x8000_0000), 0x3000);

    let b = binder.bind(3, &layout, &sg, &mut dma, &mut slot).unwrap();
    assert!(!b.is_translated());
    assert_eq!(b.plane_base(1), Some(DeviceAddress::new(0x8000_2000)));
    assert!(!slot.is_allocated());
    assert_eq!(dma.live_buffers(), 0);
}

#[test]
fn short_page_list_is_a_consistency_error() {
    let binder = MmuBinder::from_config(&CONFIG);
    let mut dma = dma();
    let mut slot = DmaSlot::empty();
    let layout = SurfaceLayout::single(0x4000, Compression::None);

    assert_eq!(
        binder.bind(0, &layout, &scattered(&[1, 3]), &mut dma, &mut slot),
        Err(MmuError::PageListExhausted {
            expected: 4,
            got: 2
        })
    );
    assert_eq!(dma.live_buffers(), 0);
}

#[test]
fn oversized_tables_and_windows_are_capacity_errors() {
    let binder = MmuBinder::from_config(&CONFIG);
    let mut dma = dma();
    let mut slot = DmaSlot::empty();

    let layout = SurfaceLayout::single(0x7000, Compression::None);
    let err = binder
        .bind(0, &layout, &scattered(&[1, 3, 5, 7, 9, 11, 13]), &mut dma, &mut slot)
        .unwrap_err();
    assert_eq!(err, MmuError::TableTooLarge { entries: 12, max: 8 });
    assert!(err.is_capacity());

    let narrow = MmuBinder::from_config(&EngineConfig {
        mmu_window_bytes: 0x4000,
        ..CONFIG
    });
    let layout = SurfaceLayout::single(0x4001, Compression::None);
    assert!(matches!(
        narrow.bind(0, &layout, &scattered(&[1, 3, 5, 7, 9]), &mut dma, &mut slot),
        Err(MmuError::WindowOverflow { size: 0x5000, .. })
    ));
}

#[test]
fn table_buffer_is_reused_and_released_with_its_slot() {
    let binder = MmuBinder::from_config(&CONFIG);
    let mut dma = dma();
    let mut slot = DmaSlot::empty();
    let small = SurfaceLayout::single(0x2000, Compression::None);
    let large = SurfaceLayout {
        size: 0x3000,
        planes: 3,
        offsets: [0, 0x1000, 0x2000],
        compression: Compression::None,
    };
    let sg = scattered(&[2, 4, 6]);

    let first = binder.bind(0, &small, &sg, &mut dma, &mut slot).unwrap();
    let again = binder.bind(0, &small, &sg, &mut dma, &mut slot).unwrap();
    assert_eq!(first.table(0).unwrap().base, again.table(0).unwrap().base);
    assert_eq!(dma.live_buffers(), 1);

    binder.bind(0, &large, &sg, &mut dma, &mut slot).unwrap();
    assert_eq!(slot.get().unwrap().len(), 3 * 4 * 4);
    assert_eq!(dma.live_buffers(), 1);

    drop(slot);
    assert_eq!(dma.live_buffers(), 0);
}

#[test]
fn exhausted_device_memory_is_an_allocation_error() {
    let binder = MmuBinder::from_config(&CONFIG);
    let mut dma = PoolDmaAllocator::new(DeviceAddress::new(0x4000_0000), 0, 0x40);
    let mut slot = DmaSlot::empty();
    let layout = SurfaceLayout::single(0x2000, Compression::None);
    assert_eq!(
        binder.bind(0, &layout, &scattered(&[1, 3]), &mut dma, &mut slot),
        Err(MmuError::OutOfMemory { bytes: 16 })
    );
}

#[test]
fn malformed_layouts_and_channels_are_rejected() {
    let binder = MmuBinder::from_config(&CONFIG);
    let mut dma = dma();
    let mut slot = DmaSlot::empty();
    let sg = scattered(&[1, 2]);

    let overlapping = SurfaceLayout {
        size: 0x2000,
        planes: 2,
        offsets: [0x1000, 0x1000, 0],
        compression: Compression::None,
    };
    assert_eq!(
        binder.bind(0, &overlapping, &sg, &mut dma, &mut slot),
        Err(MmuError::BadLayout)
    );
    let layout = SurfaceLayout::single(0x1000, Compression::None);
    assert_eq!(
        binder.bind(CONFIG.channels, &layout, &sg, &mut dma, &mut slot),
        Err(MmuError::InvalidChannel(CONFIG.channels))
    );
}
