//! Named hash functions bound into the script sandbox.
//!
//! Each public function canonicalizes its argument first and returns a
//! fixed-length digest. SHA-256 doubles as the engine's content-address
//! hash; the twox variants are the xxhash64-based keyed hashes used for
//! storage-key derivation (`twox_128` is two seeded xxhash64 runs,
//! little-endian, concatenated).

use sha2::{Digest, Sha256};
use xxhash_rust::xxh64::xxh64;

use crate::bytes::{self, ByteInput};
use crate::error::Result;

/// SHA-256 over the canonicalized input.
pub fn sha2_256(input: impl Into<ByteInput>) -> Result<[u8; 32]> {
    let data = bytes::to_bytes(input)?;
    Ok(sha256_digest(&data))
}

/// Raw SHA-256 digest over an already-canonical byte slice.
pub fn sha256_digest(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// 64-bit twox hash (xxhash64, seed 0) over the canonicalized input.
pub fn twox_64(input: impl Into<ByteInput>) -> Result<[u8; 8]> {
    let data = bytes::to_bytes(input)?;
    Ok(xxh64(&data, 0).to_le_bytes())
}

/// 128-bit twox hash over the canonicalized input.
pub fn twox_128(input: impl Into<ByteInput>) -> Result<[u8; 16]> {
    let data = bytes::to_bytes(input)?;
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&xxh64(&data, 0).to_le_bytes());
    out[8..].copy_from_slice(&xxh64(&data, 1).to_le_bytes());
    Ok(out)
}
