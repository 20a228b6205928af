use std::collections::BTreeMap;

use display_cmdlist::{CmdListBuilder, CmdListError, CommandList, Trailer};
use display_registers::RegisterRef;
use proptest::prelude::*;

const TRAILER: Trailer = Trailer {
    channel: 3,
    scaler: Some(1),
};

fn writes() -> impl Strategy<Value = Vec<(RegisterRef, u32)>> {
    prop::collection::vec((0u32..48, any::<u32>()), 0..64).prop_map(|ws| {
        ws.into_iter()
            .map(|(word, v)| (RegisterRef::from_offset(0x1300 + 4 * word), v))
            .collect()
    })
}

fn pack(ws: &[(RegisterRef, u32)], max_rows: usize) -> Result<CommandList, CmdListError> {
    let mut builder = CmdListBuilder::new();
    for &(reg, v) in ws {
        builder.push(reg, v);
    }
    builder.build(TRAILER, max_rows)
}

proptest! {
    #[test]
    fn body_replays_the_last_write_per_register(ws in writes()) {
        let list = pack(&ws, 256).unwrap();
        let expected: BTreeMap<_, _> = ws.iter().copied().collect();
        let replayed: Vec<_> = list.body().iter().flat_map(|r| r.writes()).collect();
        prop_assert_eq!(replayed, expected.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn rows_only_split_at_gaps_or_full_rows(ws in writes()) {
        let list = pack(&ws, 256).unwrap();
        for pair in list.body().windows(2) {
            let prev_last = pair[0].writes().last().unwrap().0;
            let full = pair[0].writes().count() == 3;
            prop_assert!(full || pair[1].first_register() != prev_last.next());
        }
    }

    #[test]
    fn encoded_lists_decode_to_themselves(ws in writes()) {
        let list = pack(&ws, 256).unwrap();
        let mut buf = vec![0u8; list.encoded_len()];
        list.encode_into(&mut buf).unwrap();
        prop_assert_eq!(CommandList::decode(&buf), Ok(list));
    }

    #[test]
    fn overflow_is_reported_not_truncated(ws in writes(), max in 3usize..12) {
        let unbounded = pack(&ws, 256).unwrap();
        match pack(&ws, max) {
            Ok(list) => prop_assert_eq!(list, unbounded),
            Err(e) => prop_assert_eq!(e, CmdListError::Overflow { rows: unbounded.rows().len(), max }),
        }
    }
}
