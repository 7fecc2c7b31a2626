//! Property-based invariant tests for name fingerprints.
//!
//! 1. Fingerprinting is deterministic.
//! 2. The high and low halves are the two seeded CRCs.
//! 3. For names of equal length, `high ^ low` is constant.
//! 4. Collisions among random distinct names stay rare.
//! 5. No panics on arbitrary byte strings.

use std::collections::{HashMap, HashSet};

use dmlayer_core::fingerprint::{SEED_HIGH, SEED_LOW};
use dmlayer_core::{Fingerprint, crc16};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn name(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 1..max_len)
}

/// Deterministic 64-bit LCG so the collision census is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Determinism
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn fingerprint_is_deterministic(bytes in name(64)) {
        prop_assert_eq!(Fingerprint::of(&bytes), Fingerprint::of(&bytes.clone()));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Halves are the two seeded CRCs
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn halves_match_seeded_crcs(bytes in name(64)) {
        let fp = Fingerprint::of(&bytes);
        prop_assert_eq!(fp.high(), crc16(&bytes, SEED_HIGH));
        prop_assert_eq!(fp.low(), crc16(&bytes, SEED_LOW));
        prop_assert_eq!(fp.raw(), (u32::from(fp.high()) << 16) | u32::from(fp.low()));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Equal-length names share the seed delta
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn equal_length_names_share_seed_delta(
        (a, b) in (1usize..40).prop_flat_map(|len| (
            proptest::collection::vec(any::<u8>(), len),
            proptest::collection::vec(any::<u8>(), len),
        )),
    ) {
        let fa = Fingerprint::of(&a);
        let fb = Fingerprint::of(&b);
        prop_assert_eq!(fa.high() ^ fa.low(), fb.high() ^ fb.low());
        // Consequently equal high halves imply equal fingerprints.
        if fa.high() == fb.high() {
            prop_assert_eq!(fa, fb);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Collision census
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn random_names_rarely_collide() {
    let mut rng = Lcg(0x2545_F491_4F6C_DD1D);
    let mut seen: HashSet<Vec<u8>> = HashSet::new();
    let mut by_fingerprint: HashMap<Fingerprint, Vec<u8>> = HashMap::new();
    let mut collisions = 0usize;

    while seen.len() < 1000 {
        let len = 1 + (rng.next_u64() % 24) as usize;
        let bytes: Vec<u8> = (0..len).map(|_| 0x20 + (rng.next_u64() % 95) as u8).collect();
        if !seen.insert(bytes.clone()) {
            continue;
        }
        if by_fingerprint
            .insert(Fingerprint::of(&bytes), bytes)
            .is_some()
        {
            collisions += 1;
        }
    }
    assert!(collisions <= 16, "{collisions} collisions in 1000 names");
}

#[test]
fn single_byte_names_never_collide() {
    let mut fingerprints: Vec<Fingerprint> = (0..=255u8).map(|b| Fingerprint::of(&[b])).collect();
    fingerprints.sort_unstable();
    fingerprints.dedup();
    assert_eq!(fingerprints.len(), 256);
}

// ═════════════════════════════════════════════════════════════════════════
// 5. No panics
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn crc_accepts_any_seed_and_input(
        bytes in proptest::collection::vec(any::<u8>(), 0..256),
        seed in any::<u16>(),
    ) {
        let _ = crc16(&bytes, seed);
        if bytes.is_empty() {
            prop_assert_eq!(crc16(&bytes, seed), !seed);
        }
    }
}
