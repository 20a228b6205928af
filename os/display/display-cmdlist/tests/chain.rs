use display_addresses::DeviceAddress;
use display_cmdlist::{
    ChannelGroups, ChannelMask, CmdListBuilder, CommandList, Idle, ListId, ListRef, Trailer,
};
use display_registers::RecordingIo;
use display_registers::map::{CHAN, TOP, chan, top};

const LIST_BASE: u64 = 0x8000_0000;
const LIST_STRIDE: u64 = 0x400;

/// One list per `(channel, vpos)`, each writing its vpos to `CROP_POS`.
fn frame(lists: &[(u8, u16)]) -> (Vec<CommandList>, ChannelGroups<Idle>) {
    let mut arena = Vec::new();
    let mut groups = ChannelGroups::<Idle>::new();
    for (i, &(channel, vpos)) in lists.iter().enumerate() {
        let mut builder = CmdListBuilder::new();
        builder.push(CHAN.at(channel, chan::CROP_POS).unwrap(), u32::from(vpos));
        arena.push(builder.build(Trailer { channel, scaler: None }, 16).unwrap());

        let id = ListId(u16::try_from(i).unwrap());
        let addr = DeviceAddress::new(LIST_BASE + LIST_STRIDE * i as u64);
        groups.insert(ListRef::new(id, channel, vpos, addr).unwrap());
    }
    (arena, groups)
}

/// Follow the encoded chain from `head` the way the sequencer would.
fn walk(memory: &[u8], head: DeviceAddress) -> Vec<u32> {
    let mut seen = Vec::new();
    let mut next = Some(head);
    while let Some(addr) = next {
        let at = usize::try_from(addr.as_u64() - LIST_BASE).unwrap();
        let list = CommandList::decode(&memory[at..]).unwrap();
        seen.push(list.body()[0].values[0]);
        next = list.header().next_list();
    }
    seen
}

#[test]
fn sequencer_visits_lists_in_line_order() {
    let (mut arena, groups) = frame(&[(2, 480), (2, 0), (4, 100), (2, 240)]);
    let linked = groups.link(arena.as_mut_slice());

    let mut memory = vec![0u8; LIST_STRIDE as usize * arena.len()];
    for (i, list) in arena.iter().enumerate() {
        let at = LIST_STRIDE as usize * i;
        list.encode_into(&mut memory[at..at + LIST_STRIDE as usize]).unwrap();
    }

    let head = linked.chain(2)[0].addr;
    assert_eq!(walk(&memory, head), [0, 240, 480]);
    assert_eq!(walk(&memory, linked.chain(4)[0].addr), [100]);

    let mut io = RecordingIo::new();
    let report = linked.commit(&mut io, ChannelMask::EMPTY).report();
    assert_eq!(report.lists, 4);
    assert_eq!(io.last_value(CHAN.at(2, chan::CMD_HEAD_LO).unwrap()), Some(head.lo()));
    assert_eq!(io.last_value(CHAN.at(2, chan::CMD_HEAD_VPOS).unwrap()), Some(0));
    assert_eq!(io.last_value(CHAN.at(4, chan::CMD_HEAD_VPOS).unwrap()), Some(100));
}

#[test]
fn consecutive_frames_hand_over_channels() {
    let (mut arena, groups) = frame(&[(0, 0), (1, 0)]);
    let mut io = RecordingIo::new();
    let first = groups.link(arena.as_mut_slice()).commit(&mut io, ChannelMask::EMPTY);
    let previous = first.report().enabled;
    assert_eq!(previous, ChannelMask::from_bits(0b11));

    io.clear_log();
    let (mut arena, groups) = frame(&[(1, 0), (6, 32)]);
    let second = groups.link(arena.as_mut_slice()).commit(&mut io, previous).report();

    assert_eq!(second.disabled.iter().collect::<Vec<_>>(), [0]);
    assert_eq!(second.enabled.iter().collect::<Vec<_>>(), [1, 6]);
    assert_eq!(io.last_value(CHAN.at(0, chan::CTRL).unwrap()), Some(0));
    assert_eq!(io.last_value(CHAN.at(0, chan::CMD_HEAD_LO).unwrap()), Some(0));
    assert!(
        io.writes()
            .iter()
            .all(|&(r, v)| r != TOP.at(0, top::CHANNEL_EN_CLR).unwrap() || v == 1)
    );
}
