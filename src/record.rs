use bytemuck::{Pod, Zeroable};
use std::cmp::Ordering;

/// Leading bytes of the BLAKE3 digest kept per record.
pub const HASH_SIZE: usize = 10;
/// Width of the little-endian nonce field in bytes.
pub const NONCE_SIZE: usize = 6;
/// On-disk record width: hash first, nonce second, no padding or framing.
pub const RECORD_SIZE: usize = HASH_SIZE + NONCE_SIZE;

/// One fixed-width table entry. Records compare by unsigned lexicographic
/// order of the hash field alone; the nonce is never a tiebreaker.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    pub hash: [u8; HASH_SIZE],
    pub nonce: [u8; NONCE_SIZE],
}

unsafe impl Zeroable for Record {}
unsafe impl Pod for Record {}

impl Record {
    /// Build the record for one nonce value: encode it little-endian,
    /// hash the encoded bytes with BLAKE3 and keep the leading
    /// `HASH_SIZE` digest bytes. Pure and safe to call from any thread.
    pub fn from_nonce(value: u64) -> Self {
        let nonce = encode_nonce(value);
        let digest = blake3::hash(&nonce);
        let mut hash = [0u8; HASH_SIZE];
        hash.copy_from_slice(&digest.as_bytes()[..HASH_SIZE]);
        Record { hash, nonce }
    }

    /// The nonce field decoded back to its integer value.
    pub fn nonce_value(&self) -> u64 {
        decode_nonce(&self.nonce)
    }

    pub fn cmp_hash(&self, other: &Record) -> Ordering {
        self.hash.cmp(&other.hash)
    }
}

/// Encode a nonce value across `NONCE_SIZE` little-endian bytes. Bits
/// above `8 * NONCE_SIZE` are discarded; builders stay below that bound.
pub fn encode_nonce(mut value: u64) -> [u8; NONCE_SIZE] {
    let mut out = [0u8; NONCE_SIZE];
    for byte in out.iter_mut() {
        *byte = (value & 0xFF) as u8;
        value >>= 8;
    }
    out
}

/// Decode a little-endian nonce field back to an integer.
pub fn decode_nonce(bytes: &[u8; NONCE_SIZE]) -> u64 {
    let mut value = 0u64;
    for &byte in bytes.iter().rev() {
        value = (value << 8) | byte as u64;
    }
    value
}
