//! Delivery order holds for any interleaving of stores, ticks, outages and
//! pause/resume cycles.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::*;
use eventdepot_engine::{DepotContext, DepotOptions};
use eventdepot_storage::MemoryStore;
use proptest::prelude::*;

const BIN_SIZE: usize = 5;

#[derive(Debug, Clone)]
enum Step {
    Store(usize),
    Tick,
    Network(bool),
    Pause,
    Resume,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (1usize..15).prop_map(Step::Store),
        3 => Just(Step::Tick),
        2 => any::<bool>().prop_map(Step::Network),
        1 => Just(Step::Pause),
        1 => Just(Step::Resume),
    ]
}

fn run(steps: &[Step]) -> (Arc<ScriptedTransport>, DepotContext, i64) {
    let store = MemoryStore::new();
    let transport = ScriptedTransport::offline();
    let options = DepotOptions {
        max_events_per_bin: BIN_SIZE,
        ..DepotOptions::default()
    };
    let mut ctx = DepotContext::new(
        DEST,
        Duration::from_millis(100),
        &options,
        Arc::new(store),
        transport.clone(),
    );
    ctx.init();

    let sending = ctx.sending_flag();
    let mut next_seq = 0i64;
    for step in steps {
        match step {
            Step::Store(count) => {
                for _ in 0..*count {
                    ctx.store_event(event(next_seq));
                    next_seq += 1;
                    assert!(ctx.state().holding_bin.len() < BIN_SIZE);
                }
            }
            Step::Tick => ctx.process_bins(false),
            Step::Network(online) => transport.set_online(*online),
            Step::Pause => {
                sending.store(false, Ordering::SeqCst);
                ctx.pause();
            }
            Step::Resume => {
                ctx.resume();
                sending.store(true, Ordering::SeqCst);
            }
        }

        let delivered = transport.delivered_seqs();
        let expected: Vec<i64> = (0..delivered.len() as i64).collect();
        assert_eq!(delivered, expected, "delivery out of order after {step:?}");
    }

    (transport, ctx, next_seq)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn events_are_delivered_once_in_store_order(steps in prop::collection::vec(step(), 1..40)) {
        let (transport, mut ctx, stored) = run(&steps);

        ctx.resume();
        ctx.sending_flag().store(true, Ordering::SeqCst);
        transport.set_online(true);
        drain(&mut ctx);

        prop_assert_eq!(transport.delivered_seqs(), (0..stored).collect::<Vec<_>>());
    }
}
