#[path = "../common/mod.rs"]
mod common;

use anyhow::Result;
use common::fixtures::{ee1, ee2, two_ees};
use libnfcee::dispatch::NciEvent;
use libnfcee::events::EeEvent;
use libnfcee::test_support::{Harness, RecordingListener};
use libnfcee::transport::Request;
use libnfcee::types::*;
use libnfcee::Error;

fn open(h: &mut Harness, ee: EeId, conn: u8) -> Result<RecordingListener> {
    let rec = RecordingListener::new();
    let id = h.manager.register(Box::new(rec.clone()))?;
    h.manager.connect(ee, EeInterface::Apdu, id)?;
    assert_eq!(h.manager.ecb(ee).unwrap().connection, ConnState::Wait);
    h.nci(NciEvent::ConnectionCreated {
        ee,
        conn: ConnId::new(conn),
        status: Status::Ok,
    });
    rec.take();
    Ok(rec)
}

#[test]
fn inbound_data_reaches_only_its_listener() -> Result<()> {
    let mut h = two_ees();
    let rec1 = open(&mut h, ee1(), 1)?;
    let rec2 = open(&mut h, ee2(), 2)?;
    h.recorder.take();

    h.nci(NciEvent::DataReceived {
        conn: ConnId::new(2),
        data: vec![0x6a, 0x82],
    });
    assert!(rec1.events().is_empty());
    assert!(h.recorder.events().is_empty());
    assert_eq!(
        rec2.events(),
        vec![EeEvent::Data {
            handle: ee2().handle(),
            data: vec![0x6a, 0x82]
        }]
    );
    Ok(())
}

#[test]
fn data_for_unknown_connection_is_dropped() -> Result<()> {
    let mut h = two_ees();
    let rec = open(&mut h, ee1(), 1)?;
    h.nci(NciEvent::DataReceived {
        conn: ConnId::new(9),
        data: vec![0x00],
    });
    assert!(rec.events().is_empty());
    Ok(())
}

#[test]
fn refused_connection_reports_status() -> Result<()> {
    let mut h = two_ees();
    let rec = RecordingListener::new();
    let id = h.manager.register(Box::new(rec.clone()))?;
    h.manager.connect(ee1(), EeInterface::Apdu, id)?;
    rec.take();

    h.nci(NciEvent::ConnectionCreated {
        ee: ee1(),
        conn: ConnId::new(1),
        status: Status::Rejected,
    });
    assert_eq!(
        rec.events(),
        vec![EeEvent::Connected {
            handle: ee1().handle(),
            status: Status::Rejected,
            interface: Some(EeInterface::Apdu)
        }]
    );
    assert_eq!(h.manager.ecb(ee1()).unwrap().connection, ConnState::None);

    // a fresh attempt is allowed afterwards
    h.manager.connect(ee1(), EeInterface::Apdu, id)?;
    Ok(())
}

#[test]
fn data_while_closing_is_dropped() -> Result<()> {
    let mut h = two_ees();
    let rec = open(&mut h, ee1(), 1)?;
    h.manager.disconnect(ee1())?;
    assert_eq!(h.manager.ecb(ee1()).unwrap().connection, ConnState::Disconnecting);

    h.nci(NciEvent::DataReceived {
        conn: ConnId::new(1),
        data: vec![0x90, 0x00],
    });
    assert!(rec.events().is_empty());

    h.nci(NciEvent::ConnectionClosed {
        conn: ConnId::new(1),
    });
    assert_eq!(
        rec.take(),
        vec![EeEvent::Disconnected {
            handle: ee1().handle()
        }]
    );
    Ok(())
}

#[test]
fn data_before_create_response_is_dropped() -> Result<()> {
    let mut h = two_ees();
    let rec = RecordingListener::new();
    let id = h.manager.register(Box::new(rec.clone()))?;
    h.manager.connect(ee1(), EeInterface::Apdu, id)?;
    rec.take();

    h.nci(NciEvent::DataReceived {
        conn: ConnId::new(1),
        data: vec![0x6f, 0x00],
    });
    assert!(rec.events().is_empty());
    assert!(h.recorder.events().iter().all(|e| !matches!(e, EeEvent::Data { .. })));
    Ok(())
}

#[test]
fn send_after_disconnect_fails() -> Result<()> {
    let mut h = two_ees();
    let rec = open(&mut h, ee1(), 1)?;
    h.manager.disconnect(ee1())?;
    assert_eq!(
        h.manager.send_data(ee1(), vec![0x00]),
        Err(Error::NoConnection(ee1()))
    );
    // the failure goes to the connection's own listener only
    assert_eq!(rec.take(), vec![EeEvent::NoCallbackError]);

    h.nci(NciEvent::ConnectionClosed {
        conn: ConnId::new(1),
    });
    assert_eq!(
        rec.take(),
        vec![EeEvent::Disconnected {
            handle: ee1().handle()
        }]
    );
    Ok(())
}

#[test]
fn disable_closes_everything_before_reporting() -> Result<()> {
    let mut h = two_ees();
    let _r1 = open(&mut h, ee1(), 1)?;
    let _r2 = open(&mut h, ee2(), 2)?;
    h.transport.clear();
    h.recorder.take();

    h.manager.disable();
    let closes: Vec<Request> = h
        .transport
        .sent()
        .into_iter()
        .filter(|r| matches!(r, Request::ConnClose(_)))
        .collect();
    assert_eq!(
        closes,
        vec![
            Request::ConnClose(ConnId::new(1)),
            Request::ConnClose(ConnId::new(2))
        ]
    );

    h.nci(NciEvent::ConnectionClosed {
        conn: ConnId::new(2),
    });
    assert!(h.recorder.events().is_empty());
    h.nci(NciEvent::ConnectionClosed {
        conn: ConnId::new(1),
    });
    assert_eq!(h.recorder.events(), vec![EeEvent::Disabled]);
    assert_eq!(h.manager.ee_info(), vec![]);

    // the manager can be enabled again
    h.enable_with(&[(0x86, EeInterface::Apdu)])?;
    assert!(h.manager.is_active(ee1()));
    Ok(())
}
