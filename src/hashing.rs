//! Hashing and canonical byte-encoding helpers
//!
//! Every digest in the chain is SHA-256; multi-byte integers are encoded
//! big-endian so that serialized headers sort the same way they compare.

use sha2::{Digest, Sha256};

/// Number of trailing checksum bytes in an encoded address.
pub const CHECKSUM_LEN: usize = 4;

/// SHA-256 digest of arbitrary bytes.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-256 applied twice, as used for address checksums.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// First four bytes of the double SHA-256 digest.
pub fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = double_sha256(payload);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

/// Canonical big-endian encoding of a u64 header field.
pub fn u64_be(num: u64) -> [u8; 8] {
    num.to_be_bytes()
}
