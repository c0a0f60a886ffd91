//! Pure cryptographic derivations over fixed-size byte sequences: MPTCP
//! tokens, initial data sequence numbers, and the HMAC-SHA1 authenticators
//! used to validate a joining subflow.
//!
//! The token is the **most**-significant 32 bits of SHA-1(key), per RFC
//! 6824 §3.2. Keys are always serialized with `to_be_bytes` at the call
//! site — never reinterpreted through a native-endianness integer pointer.

use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};

type HmacSha1 = Hmac<Sha1>;

/// `token32(key)` — the most-significant 32 bits of SHA-1 of `key`'s
/// 8-byte network-order serialization. Advertised in MP_JOIN SYN as
/// `receiver_token` to tie a joining subflow to an existing session.
pub fn token32(key: u64) -> u32 {
    let digest = Sha1::digest(key.to_be_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// `idsn64(key)` — the low 64 bits of SHA-1 of `key`'s network-order
/// serialization. Used once per session to fix `initial_dsn`/`initial_dack`.
pub fn idsn64(key: u64) -> u64 {
    let digest = Sha1::digest(key.to_be_bytes());
    u64::from_be_bytes([
        digest[12], digest[13], digest[14], digest[15], digest[16], digest[17], digest[18],
        digest[19],
    ])
}

/// `hmac64(key_a, key_b, n_a, n_b)` — the leading 64 bits of HMAC-SHA1 under
/// key `key_a ‖ key_b` (16 bytes) over message `n_a ‖ n_b` (8 bytes). The
/// caller is responsible for ordering `key_a`/`key_b` and `n_a`/`n_b` to
/// match RFC 6824 §3.2's per-message convention (the responder's key/nonce
/// lead for the SYN/ACK's tag, the initiator's lead for the ACK's).
pub fn hmac64(key_a: u64, key_b: u64, n_a: u32, n_b: u32) -> u64 {
    let tag = hmac160(key_a, key_b, n_a, n_b);
    u64::from_be_bytes([tag[0], tag[1], tag[2], tag[3], tag[4], tag[5], tag[6], tag[7]])
}

/// `hmac160(key_a, key_b, n_a, n_b)` — the full 20-byte HMAC-SHA1 tag,
/// written verbatim into a JOIN ACK's `sender_hmac` field.
pub fn hmac160(key_a: u64, key_b: u64, n_a: u32, n_b: u32) -> [u8; 20] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&key_a.to_be_bytes());
    key[8..].copy_from_slice(&key_b.to_be_bytes());

    let mut msg = [0u8; 8];
    msg[..4].copy_from_slice(&n_a.to_be_bytes());
    msg[4..].copy_from_slice(&n_b.to_be_bytes());

    let mut mac = HmacSha1::new_from_slice(&key).expect("HMAC accepts keys of any length");
    mac.update(&msg);
    let result = mac.finalize().into_bytes();
    let mut out = [0u8; 20];
    out.copy_from_slice(&result);
    out
}
