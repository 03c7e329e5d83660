use linko_core::{base62, CodeLength};
use sha2::{Digest, Sha256};

/// Derives a short code string from a counter value.
///
/// The counter is zero-padded to `length.min()` decimal digits, hashed with
/// SHA-256, and the first 8 digest bytes (big-endian) are base62-encoded.
/// The result is left-padded with `'0'` to `length.min()` and cut to the
/// first `length.max()` characters.
pub fn hash_to_base62(counter: u64, length: CodeLength) -> String {
    let seed = format!("{counter:0width$}", width = length.min());
    let digest = Sha256::digest(seed.as_bytes());

    let mut head = [0_u8; 8];
    head.copy_from_slice(&digest[..8]);
    let encoded = base62::encode(u64::from_be_bytes(head));

    let mut code = format!("{encoded:0>width$}", width = length.min());
    code.truncate(length.max());
    code
}
