//! Frostbite string hashing.
//!
//! Type and field names in shared type descriptors are keyed by a 32-bit
//! hash: start at 5381, then for every byte multiply by 33 and XOR the byte.

const HASH_SEED: u32 = 5381;
const HASH_PRIME: u32 = 33;

/// Hash a byte slice.
#[inline]
pub fn hash_bytes(data: &[u8]) -> u32 {
    data.iter().fold(HASH_SEED, |hash, &b| {
        hash.wrapping_mul(HASH_PRIME) ^ u32::from(b)
    })
}

/// Hash a name.
#[inline]
pub fn hash_str(s: &str) -> u32 {
    hash_bytes(s.as_bytes())
}
