#[path = "../common/mod.rs"]
mod common;

use common::fixtures::{ee1, two_ees, visa};
use libnfcee::dispatch::NciEvent;
use libnfcee::events::EeEvent;
use libnfcee::manager::ConfigStatus;
use libnfcee::transport::Request;
use libnfcee::types::*;
use libnfcee::Error;

#[test]
fn dh_and_unknown_ids_are_rejected() {
    let mut h = two_ees();
    assert!(matches!(
        h.manager.set_mode(EeId::DH, EeMode::Activate),
        Err(Error::InvalidParam(_))
    ));
    assert_eq!(
        h.manager.set_mode(EeId::new(0x99), EeMode::Activate),
        Err(Error::UnknownEe(EeId::new(0x99)))
    );
}

#[test]
fn deactivate_closes_connection_first() {
    let mut h = two_ees();
    h.manager
        .connect(ee1(), EeInterface::Apdu, h.listener)
        .unwrap();
    h.nci(NciEvent::ConnectionCreated {
        ee: ee1(),
        conn: ConnId::new(7),
        status: Status::Ok,
    });
    h.transport.clear();

    h.manager.set_mode(ee1(), EeMode::Deactivate).unwrap();
    assert_eq!(
        h.transport.sent(),
        vec![
            Request::ConnClose(ConnId::new(7)),
            Request::ModeSet(ee1(), EeMode::Deactivate)
        ]
    );
    assert_eq!(
        h.manager.ecb(ee1()).unwrap().connection,
        ConnState::Disconnecting
    );
}

#[test]
fn rejected_close_aborts_deactivation() {
    let mut h = two_ees();
    h.manager
        .connect(ee1(), EeInterface::Apdu, h.listener)
        .unwrap();
    h.nci(NciEvent::ConnectionCreated {
        ee: ee1(),
        conn: ConnId::new(7),
        status: Status::Ok,
    });
    h.transport.clear();
    h.transport.set_close_failures(1);

    assert!(h.manager.set_mode(ee1(), EeMode::Deactivate).is_err());
    assert!(h.transport.sent().is_empty());
    let cb = h.manager.ecb(ee1()).unwrap();
    assert_eq!(cb.connection, ConnState::None);
    assert_eq!(cb.conn_id, None);
    assert!(h.manager.is_active(ee1()));

    // nothing is left half-closed, so the mode set can be retried
    h.manager.set_mode(ee1(), EeMode::Deactivate).unwrap();
    assert_eq!(h.transport.sent(), vec![Request::ModeSet(ee1(), EeMode::Deactivate)]);
}

#[test]
fn deactivating_a_routed_ee_forces_a_push() {
    let mut h = two_ees();
    h.manager
        .add_aid(ee1(), visa(), PowerStates::SWITCH_ON)
        .unwrap();
    h.manager.set_mode(ee1(), EeMode::Deactivate).unwrap();
    h.recorder.take();
    h.nci(NciEvent::ModeSetResponse {
        ee: ee1(),
        status: Status::Ok,
        mode: EeMode::Deactivate,
    });
    assert!(h.manager.config_status().contains(ConfigStatus::CHANGED_ROUTING));

    let events = h.recorder.take();
    assert_eq!(
        events[0],
        EeEvent::ModeSet {
            handle: ee1().handle(),
            status: Status::Ok,
            ee_status: EeStatus::Inactive
        }
    );
    // deactivation re-announces the listen requirements
    assert!(matches!(events[1], EeEvent::DiscoverRequest(_)));
}

#[test]
fn response_for_unknown_ee_is_ignored() {
    let mut h = two_ees();
    h.recorder.take();
    h.nci(NciEvent::ModeSetResponse {
        ee: EeId::new(0x99),
        status: Status::Ok,
        mode: EeMode::Activate,
    });
    assert!(h.recorder.events().is_empty());
}
