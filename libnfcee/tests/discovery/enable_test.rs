#[path = "../common/mod.rs"]
mod common;

use common::fixtures::{init_logging, two_ees, EE1, EE2};
use libnfcee::config::Config;
use libnfcee::dispatch::{DiscoverReqEntry, NciEvent};
use libnfcee::events::EeEvent;
use libnfcee::manager::EmState;
use libnfcee::test_support::{Harness, RecordingListener};
use libnfcee::transport::Request;
use libnfcee::types::*;
use libnfcee::utils::ms;
use proptest::prelude::*;

proptest! {
    #[test]
    fn announced_count_converges(k in 0u8..8) {
        init_logging();
        let mut h = Harness::new().unwrap();
        h.manager.enable().unwrap();
        h.nci(NciEvent::DiscoveryResponse { status: Status::Ok, count: k });
        for i in 0..k {
            prop_assert_ne!(h.manager.em_state(), EmState::InitDone);
            h.notify_ee(0x80 + i, EeStatus::Active, EeInterface::Apdu);
        }
        prop_assert_eq!(h.manager.em_state(), EmState::InitDone);
        prop_assert_eq!(h.manager.table().active_count(), usize::from(k).min(4));
        prop_assert_eq!(h.recorder.count(|e| *e == EeEvent::Enabled), 1);

        // late timer changes nothing
        h.advance(ms(5000));
        prop_assert_eq!(h.recorder.count(|e| *e == EeEvent::Enabled), 1);
    }
}

#[test]
fn full_table_closes_discovery_early() {
    init_logging();
    let config = Config::builder().max_ee(2).build().unwrap();
    let mut h = Harness::with_config(config).unwrap();
    h.manager.enable().unwrap();
    h.nci(NciEvent::DiscoveryResponse {
        status: Status::Ok,
        count: 2,
    });
    h.notify_ee(EE1, EeStatus::Active, EeInterface::Apdu);
    h.notify_ee(EE2, EeStatus::Active, EeInterface::Apdu);
    assert_eq!(
        h.transport.sent(),
        vec![Request::Discover(true), Request::Discover(false)]
    );
    assert_eq!(h.clock.remaining(libnfcee::timer::TimerId::DiscoveryTimeout), None);
}

#[test]
fn hot_plugged_ee_is_announced() {
    let mut h = two_ees();
    h.recorder.take();
    h.notify_ee(0x90, EeStatus::Active, EeInterface::Apdu);
    let events = h.recorder.take();
    match &events[..] {
        [EeEvent::NewEe(info)] => {
            assert_eq!(info.handle, EeId::new(0x90).handle());
            assert_eq!(info.interfaces, vec![EeInterface::Apdu]);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(h.manager.ee_info().len(), 3);
}

#[test]
fn removed_ee_is_not_announced() {
    let mut h = two_ees();
    h.recorder.take();
    h.notify_ee(0x90, EeStatus::Removed, EeInterface::Apdu);
    assert!(h.recorder.events().is_empty());
}

#[test]
fn discover_reports_current_ees() {
    let mut h = two_ees();
    let rec = RecordingListener::new();
    let id = h.manager.register(Box::new(rec.clone())).unwrap();
    rec.take();

    h.manager.discover(id).unwrap();
    h.nci(NciEvent::DiscoveryResponse {
        status: Status::Ok,
        count: 2,
    });
    h.notify_ee(EE1, EeStatus::Active, EeInterface::Apdu);
    assert!(rec.events().is_empty());
    h.notify_ee(EE2, EeStatus::Inactive, EeInterface::Apdu);

    match &rec.take()[..] {
        [EeEvent::Discovered { status, ees }] => {
            assert_eq!(*status, Status::Ok);
            let statuses: Vec<EeStatus> = ees.iter().map(|e| e.status).collect();
            assert_eq!(statuses, vec![EeStatus::Active, EeStatus::Inactive]);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn new_listener_gets_discover_request_aggregate() {
    let mut h = two_ees();
    h.nci(NciEvent::DiscoverRequest(vec![
        DiscoverReqEntry {
            ee: EeId::new(EE2),
            tech: ListenTech::F,
            protocol: 0x03,
            op: DiscoverReqOp::Add,
        },
        DiscoverReqEntry {
            ee: EeId::new(EE1),
            tech: ListenTech::A,
            protocol: 0x04,
            op: DiscoverReqOp::Add,
        },
        DiscoverReqEntry {
            ee: EeId::new(EE1),
            tech: ListenTech::A,
            protocol: 0x04,
            op: DiscoverReqOp::Remove,
        },
        DiscoverReqEntry {
            ee: EeId::new(EE1),
            tech: ListenTech::BPrime,
            protocol: 0x04,
            op: DiscoverReqOp::Add,
        },
    ]));

    let rec = RecordingListener::new();
    let id = h.manager.register(Box::new(rec.clone())).unwrap();
    let events = rec.take();
    assert_eq!(
        events[0],
        EeEvent::Registered {
            status: Status::Ok,
            listener: Some(id)
        }
    );
    match &events[1] {
        EeEvent::DiscoverRequest(infos) => {
            let summary: Vec<_> = infos.iter().map(|i| (i.handle, i.listen.clone())).collect();
            assert_eq!(
                summary,
                vec![
                    (EeId::new(EE1).handle(), vec![(ListenTech::BPrime, 0x04)]),
                    (EeId::new(EE2).handle(), vec![(ListenTech::F, 0x03)]),
                ]
            );
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn discover_request_held_while_dm_inactive() {
    init_logging();
    let mut h = Harness::new().unwrap();
    h.manager.enable().unwrap();
    h.nci(NciEvent::DiscoveryResponse {
        status: Status::Ok,
        count: 1,
    });
    h.notify_ee(EE1, EeStatus::Active, EeInterface::Apdu);
    h.recorder.take();
    h.nci(NciEvent::DiscoverRequest(vec![DiscoverReqEntry {
        ee: EeId::new(EE1),
        tech: ListenTech::A,
        protocol: 0x04,
        op: DiscoverReqOp::Add,
    }]));
    assert!(h.recorder.events().is_empty());
}
