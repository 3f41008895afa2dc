//! Property tests for the merge laws of `ReplicaState`.

use crdt_relay::prelude::*;
use proptest::prelude::*;

fn arb_state() -> impl Strategy<Value = ReplicaState> {
    prop::collection::btree_map(0u64..8, 0u64..1_000, 0..8).prop_map(|counts| {
        counts
            .into_iter()
            .map(|(id, count)| (ReplicaId::new(id), count))
            .collect::<ReplicaState>()
    })
}

#[derive(Debug, Clone)]
enum Op {
    Increment(u64),
    Join(ReplicaState),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..5).prop_map(Op::Increment),
        arb_state().prop_map(Op::Join),
    ]
}

fn merged(base: &ReplicaState, others: &[&ReplicaState]) -> ReplicaState {
    let mut out = base.clone();
    for other in others {
        out.merge_from(other);
    }
    out
}

proptest! {
    #[test]
    fn merge_is_idempotent(a in arb_state(), s in arb_state()) {
        let once = merged(&a, &[&s]);
        let twice = merged(&once, &[&s]);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn merge_is_commutative(a in arb_state(), s1 in arb_state(), s2 in arb_state()) {
        prop_assert_eq!(merged(&a, &[&s1, &s2]), merged(&a, &[&s2, &s1]));
    }

    #[test]
    fn merge_is_associative(a in arb_state(), b in arb_state(), c in arb_state()) {
        let left = merged(&merged(&a, &[&b]), &[&c]);
        let right = merged(&a, &[&merged(&b, &[&c])]);
        prop_assert_eq!(left, right);
    }

    #[test]
    fn merge_with_self_is_noop(a in arb_state()) {
        let mut b = a.clone();
        b.merge(&a);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn counts_never_decrease(ops in prop::collection::vec(arb_op(), 1..40)) {
        let registry = Registry::new();
        let replica = registry.register();
        let mut previous = replica.snapshot_state();

        for op in ops {
            match op {
                Op::Increment(n) => replica.increment_by(n),
                Op::Join(state) => replica.receive_join(&state),
            }
            let current = replica.snapshot_state();
            for (id, count) in previous.iter() {
                prop_assert!(current.get(id) >= count, "entry {} went backwards", id);
            }
            prop_assert!(current.value() >= previous.value());
            previous = current;
        }
    }

    #[test]
    fn increment_leaves_other_entries_alone(seed in arb_state(), n in 1u64..10) {
        let registry = Registry::new();
        let replica = registry.register();
        replica.receive_join(&seed);
        let before = replica.snapshot_state();

        replica.increment_by(n);
        let after = replica.snapshot_state();
        for (id, count) in before.iter() {
            if id != replica.id() {
                prop_assert_eq!(after.get(id), count);
            }
        }
        prop_assert_eq!(after.get(replica.id()), before.get(replica.id()) + n);
    }

    #[test]
    fn replicas_converge_to_total_issued(plan in prop::collection::vec((0usize..4, 1u64..4), 0..60)) {
        let registry = Registry::new();
        let replicas: Vec<_> = (0..4).map(|_| registry.register()).collect();
        let mut issued = 0;
        for (who, n) in plan {
            replicas[who].increment_by(n);
            issued += n;
        }
        for r in &replicas {
            prop_assert_eq!(r.value(), issued);
        }
    }
}
