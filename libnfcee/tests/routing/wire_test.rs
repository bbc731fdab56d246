#[path = "../common/mod.rs"]
mod common;

use anyhow::Result;
use common::fixtures::{ee1, ee2, two_ees, visa};
use libnfcee::dispatch::NciEvent;
use libnfcee::events::EeEvent;
use libnfcee::routing::{decode_all, RouteTlv};
use libnfcee::transport::Request;
use libnfcee::types::*;

fn chunks(pushes: Vec<Request>) -> Vec<(bool, EeId, u8, Vec<RouteTlv>)> {
    pushes
        .into_iter()
        .map(|r| match r {
            Request::SetRouting {
                more,
                ee,
                tlv_count,
                tlvs,
            } => (more, ee, tlv_count, decode_all(&tlvs).unwrap()),
            other => panic!("not a routing push: {:?}", other),
        })
        .collect()
}

#[test]
fn dh_first_then_ees_in_table_order() -> Result<()> {
    let mut h = two_ees();
    h.transport.clear();
    h.manager
        .set_tech_config(ee2(), TechMask::F, TechMask::empty(), TechMask::empty())?;
    h.manager
        .add_aid(ee1(), visa(), PowerStates::SWITCH_ON | PowerStates::BATTERY_OFF)?;
    h.manager.set_proto_config(
        EeId::DH,
        ProtoMask::NFC_DEP | ProtoMask::T1T,
        ProtoMask::empty(),
        ProtoMask::empty(),
    )?;
    h.manager.update_now();

    let got = chunks(h.transport.routing_pushes());
    assert_eq!(got.len(), 3);

    assert_eq!((got[0].0, got[0].1, got[0].2), (true, EeId::DH, 2));
    assert_eq!(
        got[0].3,
        vec![
            RouteTlv::Protocol {
                ee: EeId::DH,
                power: PowerStates::SWITCH_ON,
                protocol: 0x01
            },
            RouteTlv::Protocol {
                ee: EeId::DH,
                power: PowerStates::SWITCH_ON,
                protocol: 0x05
            },
        ]
    );

    assert_eq!((got[1].0, got[1].1), (true, ee1()));
    assert_eq!(
        got[1].3,
        vec![RouteTlv::Aid {
            ee: ee1(),
            power: PowerStates::SWITCH_ON | PowerStates::BATTERY_OFF,
            aid: visa()
        }]
    );

    assert_eq!((got[2].0, got[2].1), (false, ee2()));
    assert_eq!(
        got[2].3,
        vec![RouteTlv::Technology {
            ee: ee2(),
            power: PowerStates::SWITCH_ON,
            tech: 0x02
        }]
    );
    Ok(())
}

#[test]
fn tech_power_states_merge_into_one_entry() -> Result<()> {
    let mut h = two_ees();
    h.transport.clear();
    h.manager
        .set_tech_config(ee1(), TechMask::A | TechMask::B, TechMask::A, TechMask::B)?;
    h.manager.update_now();

    let got = chunks(h.transport.routing_pushes());
    assert_eq!(
        got[0].3,
        vec![
            RouteTlv::Technology {
                ee: ee1(),
                power: PowerStates::SWITCH_ON | PowerStates::SWITCH_OFF,
                tech: 0x00
            },
            RouteTlv::Technology {
                ee: ee1(),
                power: PowerStates::SWITCH_ON | PowerStates::BATTERY_OFF,
                tech: 0x01
            },
        ]
    );
    Ok(())
}

#[test]
fn inactive_ee_contributes_nothing() -> Result<()> {
    let mut h = two_ees();
    h.manager
        .set_tech_config(ee2(), TechMask::A, TechMask::empty(), TechMask::empty())?;
    h.manager.set_mode(ee1(), EeMode::Deactivate)?;
    h.nci(NciEvent::ModeSetResponse {
        ee: ee1(),
        status: Status::Ok,
        mode: EeMode::Deactivate,
    });
    h.transport.clear();
    h.manager.update_now();

    let got = chunks(h.transport.routing_pushes());
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].1, ee2());
    Ok(())
}

#[test]
fn controller_limit_caps_the_table() -> Result<()> {
    let mut h = two_ees();
    // one 7-byte AID entry is 11 bytes on the wire
    h.transport.set_lmrt_size(10);
    h.manager
        .add_aid(ee1(), visa(), PowerStates::SWITCH_ON)?;
    h.recorder.take();
    h.manager.update_now();

    assert!(h.transport.routing_pushes().is_empty());
    assert_eq!(
        h.recorder.events(),
        vec![EeEvent::RoutingError {
            status: Status::BufferFull
        }]
    );

    h.transport.set_lmrt_size(11);
    h.manager.update_now();
    assert_eq!(h.transport.routing_pushes().len(), 1);
    Ok(())
}
