//! Walk the EE manager through a full session against the mock transport:
//! discovery, routing, a data exchange and disable.
//!
//! Usage:
//!   RUST_LOG=debug cargo run -p libnfcee --example mock_session

use libnfcee::prelude::*;
use libnfcee::test_support::Harness;
use libnfcee::transport::Request;

fn main() -> Result<()> {
    env_logger::init();

    let mut h = Harness::new()?;
    let listener = h.listener;

    h.manager.enable()?;
    h.nci(NciEvent::DiscoveryResponse {
        status: Status::Ok,
        count: 2,
    });
    h.notify_ee(0x86, EeStatus::Active, EeInterface::Apdu);
    h.notify_ee(0x87, EeStatus::Active, EeInterface::HciAccess);
    h.manager.handle(Message::DmActive(true));

    for info in h.manager.ee_info() {
        println!(
            "EE {:#06x}: {:?} {:?}",
            info.handle.as_u16(),
            info.status,
            info.interfaces
        );
    }

    let ese = EeId::new(0x86);
    h.manager
        .set_tech_config(EeId::DH, TechMask::F, TechMask::empty(), TechMask::empty())?;
    h.manager
        .add_aid(ese, Aid::from_hex("A0000000031010")?, PowerStates::all())?;
    h.advance(ms(1000));

    for req in h.transport.routing_pushes() {
        if let Request::SetRouting { more, ee, tlvs, .. } = req {
            println!("routing -> {} more={} {}", ee, more, bytes_to_hex_spaced(&tlvs));
        }
    }

    h.manager.connect(ese, EeInterface::Apdu, listener)?;
    h.nci(NciEvent::ConnectionCreated {
        ee: ese,
        conn: ConnId::new(1),
        status: Status::Ok,
    });
    h.manager
        .send_data(ese, parse_hex("00 A4 04 00 07 A0000000031010").map_err(Error::InvalidParam)?)?;
    h.nci(NciEvent::DataReceived {
        conn: ConnId::new(1),
        data: vec![0x90, 0x00],
    });

    h.manager.disable();
    h.nci(NciEvent::ConnectionClosed {
        conn: ConnId::new(1),
    });

    for event in h.recorder.take() {
        println!("event: {:?}", event);
    }
    Ok(())
}
