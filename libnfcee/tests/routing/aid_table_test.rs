#[path = "../common/mod.rs"]
mod common;

use common::fixtures::{aid, ee1, init_logging, mastercard, two_ees, visa, EE1};
use libnfcee::config::Config;
use libnfcee::events::EeEvent;
use libnfcee::test_support::Harness;
use libnfcee::types::*;
use libnfcee::Error;

fn aid_bytes(h: &Harness, ee: EeId) -> usize {
    h.manager.ecb(ee).unwrap().aids.used_bytes()
}

#[test]
fn readd_keeps_one_entry_with_new_power() {
    let mut h = two_ees();
    h.manager
        .add_aid(ee1(), visa(), PowerStates::SWITCH_ON)
        .unwrap();
    h.manager
        .add_aid(ee1(), visa(), PowerStates::SWITCH_ON | PowerStates::SWITCH_OFF)
        .unwrap();
    let cb = h.manager.ecb(ee1()).unwrap();
    assert_eq!(cb.aids.len(), 1);
    assert_eq!(
        cb.aids.find(&visa()).unwrap().power,
        PowerStates::SWITCH_ON | PowerStates::SWITCH_OFF
    );
}

#[test]
fn remove_then_find() {
    let mut h = two_ees();
    for a in [visa(), mastercard(), aid("F001")] {
        h.manager.add_aid(ee1(), a, PowerStates::SWITCH_ON).unwrap();
    }
    let before = aid_bytes(&h, ee1());
    h.manager.remove_aid(ee1(), &mastercard()).unwrap();

    let cb = h.manager.ecb(ee1()).unwrap();
    assert!(cb.aids.find(&mastercard()).is_none());
    assert_eq!(before - aid_bytes(&h, ee1()), mastercard().len() + 2);
    let order: Vec<Aid> = cb.aids.iter().map(|e| e.aid.clone()).collect();
    assert_eq!(order, vec![visa(), aid("F001")]);
}

#[test]
fn removal_compacts_stored_form() {
    let mut h = two_ees();
    let aids = [aid("F001"), aid("F00202"), aid("F0030303")];
    for a in &aids {
        h.manager
            .add_aid(ee1(), a.clone(), PowerStates::SWITCH_ON)
            .unwrap();
    }
    h.manager.remove_aid(ee1(), &aids[0]).unwrap();
    assert_eq!(
        h.manager.ecb(ee1()).unwrap().aids.to_cfg_bytes(),
        hex::decode("4F03F002024F04F0030303").unwrap()
    );
}

#[test]
fn budget_overflow_leaves_table_unchanged() {
    init_logging();
    let config = Config::builder().aid_table_budget(40).build().unwrap();
    let mut h = Harness::with_config(config).unwrap();
    h.enable_with(&[(EE1, EeInterface::Apdu)]).unwrap();

    // 9 bytes per entry: four fit, the fifth does not
    for i in 0..4u8 {
        let a = Aid::try_from(&[0xA0, 0, 0, 0, 0, 0, i][..]).unwrap();
        h.manager.add_aid(ee1(), a, PowerStates::SWITCH_ON).unwrap();
    }
    let snapshot = h.manager.ecb(ee1()).unwrap().aids.clone();
    h.recorder.take();

    let err = h
        .manager
        .add_aid(ee1(), aid("A0000000000004"), PowerStates::SWITCH_ON)
        .unwrap_err();
    assert_eq!(
        err,
        Error::BufferFull {
            needed: 45,
            capacity: 40
        }
    );
    assert_eq!(h.manager.ecb(ee1()).unwrap().aids, snapshot);
    // no listener on the block: failures are not broadcast
    assert!(h.recorder.events().is_empty());
}

#[test]
fn failure_reaches_the_ecb_listener() {
    let mut h = two_ees();
    let rec = libnfcee::test_support::RecordingListener::new();
    let id = h.manager.register(Box::new(rec.clone())).unwrap();
    h.manager
        .connect(ee1(), EeInterface::Apdu, id)
        .unwrap();
    rec.take();

    assert!(h.manager.remove_aid(ee1(), &visa()).is_err());
    assert_eq!(
        rec.events(),
        vec![EeEvent::AidRemoved {
            status: Status::InvalidParam
        }]
    );
}

#[test]
fn unknown_ee_is_rejected() {
    let mut h = two_ees();
    assert_eq!(
        h.manager
            .add_aid(EeId::new(0x99), visa(), PowerStates::SWITCH_ON),
        Err(Error::UnknownEe(EeId::new(0x99)))
    );
}
