#![no_main]

use dmlayer_core::fingerprint::{SEED_HIGH, SEED_LOW};
use dmlayer_core::{Fingerprint, crc16};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let fp = Fingerprint::of(data);
    assert_eq!(fp, Fingerprint::of(data));
    assert_eq!(fp.high(), crc16(data, SEED_HIGH));
    assert_eq!(fp.low(), crc16(data, SEED_LOW));
});
