// fixtures.rs: commonly used EE ids, AIDs and pre-enabled managers

use libnfcee::test_support::Harness;
use libnfcee::types::{Aid, EeId, EeInterface};

pub const EE1: u8 = 0x86;
pub const EE2: u8 = 0x87;
pub const EE_HCI: u8 = 0x80;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn ee1() -> EeId {
    EeId::new(EE1)
}

pub fn ee2() -> EeId {
    EeId::new(EE2)
}

pub fn aid(hex_str: &str) -> Aid {
    let bytes = hex::decode(hex_str).expect("fixture AID is valid hex");
    Aid::try_from(bytes.as_slice()).expect("fixture AID length")
}

pub fn visa() -> Aid {
    aid("A0000000031010")
}

pub fn mastercard() -> Aid {
    aid("A0000000041010")
}

/// Two active APDU EEs, device management active.
pub fn two_ees() -> Harness {
    init_logging();
    Harness::enabled_with(&[(EE1, EeInterface::Apdu), (EE2, EeInterface::Apdu)]).expect("fixture harness")
}

/// One APDU EE and one HCI-access EE.
pub fn apdu_and_hci() -> Harness {
    init_logging();
    Harness::enabled_with(&[(EE1, EeInterface::Apdu), (EE_HCI, EeInterface::HciAccess)]).expect("fixture harness")
}
