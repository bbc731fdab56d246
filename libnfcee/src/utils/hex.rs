// libnfcee-rs/libnfcee/src/utils/hex.rs
//! Hex helpers for AIDs and routing buffers in log output and test fixtures.

use std::fmt::Write;

/// Lowercase hex without separators, e.g. `&[0xa0, 0x00]` -> `"a000"`.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        // writing into a String cannot fail
        let _ = write!(s, "{:02x}", b);
        s
    })
}

/// Lowercase hex, one space between bytes. Used when tracing routing TLVs.
pub fn bytes_to_hex_spaced(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i != 0 {
            s.push(' ');
        }
        let _ = write!(s, "{:02x}", b);
    }
    s
}

/// Parse hex into bytes. ASCII whitespace and `:` separators are ignored so
/// both `"A0 00 00"` and `"a0:00:00"` are accepted.
pub fn parse_hex(s: &str) -> Result<Vec<u8>, String> {
    let digits: Vec<u8> = s
        .bytes()
        .filter(|c| !c.is_ascii_whitespace() && *c != b':')
        .collect();

    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in '{}'", s));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let hi = nibble(pair[0]);
            let lo = nibble(pair[1]);
            match (hi, lo) {
                (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
                _ => Err(format!(
                    "invalid hex pair '{}{}'",
                    pair[0] as char, pair[1] as char
                )),
            }
        })
        .collect()
}

fn nibble(c: u8) -> Option<u8> {
    (c as char).to_digit(16).map(|d| d as u8)
}
