#[path = "../common/mod.rs"]
mod common;

use common::fixtures::{aid, ee1, ee2, init_logging, two_ees, EE1};
use libnfcee::dispatch::NciEvent;
use libnfcee::events::EeEvent;
use libnfcee::test_support::Harness;
use libnfcee::transport::Request;
use libnfcee::types::*;
use libnfcee::utils::ms;
use libnfcee::Error;

#[test]
fn dh_tech_a_single_push() {
    init_logging();
    let mut h = Harness::enabled_with(&[]).unwrap();
    h.transport.clear();

    h.manager
        .set_tech_config(EeId::DH, TechMask::A, TechMask::empty(), TechMask::empty())
        .unwrap();
    h.advance(ms(1500));

    let pushes = h.transport.routing_pushes();
    assert_eq!(pushes.len(), 1);
    let Request::SetRouting { more, ee, tlv_count, tlvs } = &pushes[0] else {
        unreachable!()
    };
    assert!(!more);
    assert_eq!(*ee, EeId::DH);
    assert_eq!(*tlv_count, 1);
    // tag TECH, len 3, DH, switch-on, technology A
    assert_eq!(tlvs, &vec![0x00, 0x03, 0x00, 0x01, 0x00]);
}

#[test]
fn two_aids_in_one_window() {
    let mut h = two_ees();
    h.transport.clear();

    h.manager
        .add_aid(ee1(), aid("F001"), PowerStates::SWITCH_ON)
        .unwrap();
    h.advance(ms(300));
    h.manager
        .add_aid(ee1(), aid("F002"), PowerStates::SWITCH_ON)
        .unwrap();
    h.advance(ms(2000));

    assert_eq!(
        h.transport.routing_pushes(),
        vec![Request::SetRouting {
            more: false,
            ee: ee1(),
            tlv_count: 2,
            tlvs: vec![
                0x02, 0x04, EE1, 0x01, 0xF0, 0x01, //
                0x02, 0x04, EE1, 0x01, 0xF0, 0x02,
            ],
        }]
    );
}

#[test]
fn same_aid_on_second_ee_is_semantic_error() {
    let mut h = two_ees();
    h.manager
        .add_aid(ee1(), aid("F001"), PowerStates::SWITCH_ON)
        .unwrap();
    let err = h
        .manager
        .add_aid(ee2(), aid("F001"), PowerStates::SWITCH_ON)
        .unwrap_err();
    assert!(matches!(err, Error::SemanticError { .. }));
    assert_eq!(h.manager.ecb(ee2()).unwrap().aids.len(), 0);
}

#[test]
fn connect_over_unadvertised_interface() {
    let mut h = two_ees();
    let err = h
        .manager
        .connect(ee1(), EeInterface::T3tCommandSet, h.listener)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidParam(_)));
    assert_eq!(h.manager.ecb(ee1()).unwrap().connection, ConnState::None);
    assert!(h.transport.sent().iter().all(|r| !matches!(r, Request::ConnCreate(..))));
}

#[test]
fn deactivation_clears_routing_and_pushes() {
    let mut h = two_ees();
    h.manager
        .set_tech_config(ee1(), TechMask::A, TechMask::A, TechMask::empty())
        .unwrap();
    h.manager
        .set_proto_config(ee1(), ProtoMask::ISO_DEP, ProtoMask::empty(), ProtoMask::empty())
        .unwrap();
    h.manager
        .add_aid(ee1(), aid("A0000000031010"), PowerStates::SWITCH_ON)
        .unwrap();
    h.manager.update_now();
    h.transport.clear();

    h.manager.set_mode(ee1(), EeMode::Deactivate).unwrap();
    h.nci(NciEvent::ModeSetResponse {
        ee: ee1(),
        status: Status::Ok,
        mode: EeMode::Deactivate,
    });

    let cb = h.manager.ecb(ee1()).unwrap();
    assert_eq!(cb.status, EeStatus::Inactive);
    assert!(cb.tech.is_empty());
    assert!(cb.proto.is_empty());
    assert!(cb.aids.is_empty());

    h.advance(ms(1000));
    // nothing left anywhere: the controller's table is wiped
    assert_eq!(
        h.transport.routing_pushes(),
        vec![Request::SetRouting {
            more: false,
            ee: EeId::DH,
            tlv_count: 0,
            tlvs: vec![],
        }]
    );
}

#[test]
fn config_events_go_to_the_ecb_listener() {
    let mut h = two_ees();
    h.recorder.take();
    h.manager
        .set_tech_config(ee2(), TechMask::F, TechMask::empty(), TechMask::empty())
        .unwrap();
    h.manager
        .add_aid(ee2(), aid("D2760000850101"), PowerStates::SWITCH_ON)
        .unwrap();
    h.manager
        .remove_aid(ee2(), &aid("D2760000850101"))
        .unwrap();
    assert_eq!(
        h.recorder.take(),
        vec![
            EeEvent::TechConfigSet { status: Status::Ok },
            EeEvent::AidAdded { status: Status::Ok },
            EeEvent::AidRemoved { status: Status::Ok },
        ]
    );
}
