#[path = "../common/mod.rs"]
mod common;

use common::fixtures::{aid, ee1, two_ees};
use libnfcee::events::EeEvent;
use libnfcee::routing;
use libnfcee::transport::Request;
use libnfcee::types::*;
use libnfcee::utils::ms;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Tech(u8),
    Proto(u8),
    Add(usize),
    Remove(usize),
}

const POOL: [&str; 4] = ["F001", "A0000000031010", "A0000000041010", "D2760000850101"];

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8).prop_map(Op::Tech),
        (0u8..32).prop_map(Op::Proto),
        (0..POOL.len()).prop_map(Op::Add),
        (0..POOL.len()).prop_map(Op::Remove),
    ]
}

proptest! {
    #[test]
    fn calls_within_window_push_once(
        script in prop::collection::vec((op(), 0u64..999), 1..10)
    ) {
        let mut h = two_ees();
        h.transport.clear();
        h.recorder.take();

        for (op, gap) in script {
            match op {
                Op::Tech(bits) => {
                    h.manager
                        .set_tech_config(ee1(), TechMask::from_bits_truncate(bits), TechMask::empty(), TechMask::empty())
                        .unwrap();
                }
                Op::Proto(bits) => {
                    h.manager
                        .set_proto_config(EeId::DH, ProtoMask::from_bits_truncate(bits), ProtoMask::empty(), ProtoMask::empty())
                        .unwrap();
                }
                Op::Add(i) => {
                    h.manager.add_aid(ee1(), aid(POOL[i]), PowerStates::SWITCH_ON).unwrap();
                }
                Op::Remove(i) => {
                    // a failed removal does not restart the window
                    if h.manager.remove_aid(ee1(), &aid(POOL[i])).is_err() {
                        continue;
                    }
                }
            }
            h.advance(ms(gap));
            prop_assert!(h.transport.routing_pushes().is_empty());
        }

        h.advance(ms(1000));

        let expected: Vec<Request> = routing::build(h.manager.table(), 0xfd)
            .unwrap()
            .into_iter()
            .map(|c| Request::SetRouting { more: c.more, ee: c.ee, tlv_count: c.tlv_count, tlvs: c.tlvs })
            .collect();
        prop_assert_eq!(h.transport.routing_pushes(), expected.clone());

        let updates = h
            .recorder
            .count(|e| matches!(e, EeEvent::RoutingUpdated { .. }));
        prop_assert_eq!(updates, usize::from(!expected.is_empty()));
    }
}

#[test]
fn update_now_cancels_pending_window() {
    let mut h = two_ees();
    h.transport.clear();
    h.manager
        .set_tech_config(ee1(), TechMask::B, TechMask::empty(), TechMask::empty())
        .unwrap();
    h.manager.update_now();
    assert_eq!(h.transport.routing_pushes().len(), 1);

    h.advance(ms(5000));
    assert_eq!(h.transport.routing_pushes().len(), 1);
}
