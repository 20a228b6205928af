use display_fbc::{FbcPools, FbcRequest};
use proptest::prelude::*;

const POOLS: u8 = 4;
const CAPACITY: u32 = 1024;

fn requests() -> impl Strategy<Value = Vec<FbcRequest>> {
    prop::collection::vec(prop_oneof![Just(0u32), 0..=CAPACITY, 0..=2 * CAPACITY], usize::from(POOLS) * 2)
        .prop_map(|units| {
            units
                .into_iter()
                .enumerate()
                .map(|(ch, u)| FbcRequest::new(u8::try_from(ch).unwrap(), u))
                .collect()
        })
}

proptest! {
    #[test]
    fn pools_are_never_overcommitted(reqs in requests()) {
        let pools = FbcPools::new(POOLS, CAPACITY);
        if let Ok(plan) = pools.allocate(&reqs) {
            let mut drawn = [0u32; POOLS as usize];
            for (_, w) in plan.windows() {
                drawn[usize::from(w.pool)] += w.size;
                if let Some(spill) = w.spill {
                    drawn[usize::from(spill.pool)] += spill.size;
                }
            }
            for pool in 0..POOLS {
                prop_assert!(drawn[usize::from(pool)] <= CAPACITY);
                prop_assert_eq!(drawn[usize::from(pool)], plan.usage(pool).used);
            }

            let lenders = (0..POOLS).filter(|&p| plan.usage(p).lent_to.is_some()).count();
            let borrowers = plan.windows().filter(|(_, w)| w.is_split()).count();
            prop_assert_eq!(lenders, borrowers);
        }
    }

    #[test]
    fn every_nonzero_request_is_served_in_full(reqs in requests()) {
        let pools = FbcPools::new(POOLS, CAPACITY);
        if let Ok(plan) = pools.allocate(&reqs) {
            for req in &reqs {
                match plan.window(req.channel) {
                    Some(w) => prop_assert_eq!(w.total_units(), req.units),
                    None => prop_assert_eq!(req.units, 0),
                }
            }
        }
    }

    #[test]
    fn allocation_is_deterministic(reqs in requests()) {
        let pools = FbcPools::new(POOLS, CAPACITY);
        let first = pools.allocate(&reqs);
        let mut reversed = reqs.clone();
        reversed.reverse();
        prop_assert_eq!(&first, &pools.allocate(&reqs));
        prop_assert_eq!(&first, &pools.allocate(&reversed));
    }

    #[test]
    fn zero_requests_leave_pools_untouched(active in prop::collection::vec(any::<bool>(), usize::from(POOLS) * 2)) {
        let reqs: Vec<_> = active
            .iter()
            .enumerate()
            .map(|(ch, &on)| FbcRequest::new(u8::try_from(ch).unwrap(), u32::from(on)))
            .collect();
        let plan = FbcPools::new(POOLS, CAPACITY).allocate(&reqs).unwrap();
        for pool in 0..POOLS {
            let pair_active = active[usize::from(pool) * 2] || active[usize::from(pool) * 2 + 1];
            prop_assert_eq!(plan.usage(pool).touched, pair_active);
        }

        let mut writes = Vec::new();
        for (ch, &on) in active.iter().enumerate() {
            let ch = u8::try_from(ch).unwrap();
            let before = writes.len();
            plan.register_writes(ch, &mut writes).unwrap();
            prop_assert_eq!(writes.len() == before, !on);
        }
    }
}
