use std::hash::Hasher;

use twox_hash::XxHash64;

/// Fixed seed so fingerprints are reproducible across runs and platforms;
/// the on-disk format depends on it.
const SEED: u64 = 0xb911_5a39;

pub fn hash_key(key: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(SEED);
    hasher.write(key);
    hasher.finish()
}

/// Derives a nonzero 32-bit fingerprint from a key's hash, mod `fingerprint_mod`.
///
/// Zero is reserved as the empty-slot marker, so a hash landing on zero is
/// nudged by one before the mod is taken again.
pub fn fingerprint(key: &[u8], fingerprint_mod: u32) -> u32 {
    let mut h = hash_key(key);
    let mut fp = (h % fingerprint_mod as u64) as u32;
    if fp == 0 {
        h = if h == u64::MAX { h - 1 } else { h + 1 };
        fp = (h % fingerprint_mod as u64) as u32;
    }
    fp
}
