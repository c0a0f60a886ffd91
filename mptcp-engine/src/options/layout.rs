//! RFC 6824-derived byte layout for the three MPTCP option subtypes this
//! engine rewrites. All multi-byte fields are network byte order on the
//! wire; every accessor here converts explicitly rather than trusting host
//! endianness.

use crate::error::{EngineError, Result};

pub const KIND_MPTCP: u8 = 30;

pub const SUBTYPE_CAPABLE: u8 = 0;
pub const SUBTYPE_JOIN: u8 = 1;
pub const SUBTYPE_DSS: u8 = 8;

/// MP_CAPABLE option length carrying only the sender's key (the SYN and
/// SYN-ACK legs of the handshake).
pub const CAPABLE_SYN: usize = 12;
/// MP_CAPABLE option length carrying both keys (the final ACK).
pub const CAPABLE: usize = 20;

/// MP_JOIN SYN: header(4) + receiver_token(4) + sender_random(4).
pub const JOIN_SYN: usize = 12;
/// MP_JOIN SYN/ACK: header(4) + truncated sender_hmac(8) + sender_random(4).
pub const JOIN_SYN_ACK: usize = 16;
/// MP_JOIN ACK: header(4) + full sender_hmac(20).
pub const JOIN_ACK: usize = 24;

/// DSS with an 8-octet DSN, no data-ack, with checksum.
pub const DSS_DSN_CHECKSUM: usize = 20;
/// DSS with an 8-octet DSN, no data-ack, no checksum.
pub const DSS_DSN_NO_CHECKSUM: usize = 18;
/// DSS carrying only an 8-octet data-ack.
pub const DSS_DACK_ONLY: usize = 12;

/// Reads the subtype nibble out of an MPTCP option's raw bytes. Takes a
/// plain slice so it works equally against a [`crate::packet::TcpOptionView`]
/// being rewritten and a [`crate::packet::RawOption`] snapshot of a live
/// packet.
pub fn subtype(bytes: &[u8]) -> Result<u8> {
    let byte2 = *bytes.get(2).ok_or_else(|| EngineError::option("MPTCP option shorter than its subtype byte"))?;
    Ok(byte2 >> 4)
}

pub fn require_len(bytes: &[u8], expected: usize, what: &str) -> Result<()> {
    if bytes.len() != expected {
        return Err(EngineError::option(format!(
            "{what}: expected option length {expected}, got {}",
            bytes.len()
        )));
    }
    Ok(())
}

pub fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    let slice = bytes
        .get(offset..offset + 4)
        .ok_or_else(|| EngineError::option("MPTCP option too short to read a u32 field"))?;
    Ok(u32::from_be_bytes(slice.try_into().expect("slice is exactly 4 bytes")))
}

pub fn write_u32(bytes: &mut [u8], offset: usize, value: u32) -> Result<()> {
    let slice = bytes
        .get_mut(offset..offset + 4)
        .ok_or_else(|| EngineError::option("MPTCP option too short to write a u32 field"))?;
    slice.copy_from_slice(&value.to_be_bytes());
    Ok(())
}

pub fn read_u64(bytes: &[u8], offset: usize) -> Result<u64> {
    let slice = bytes
        .get(offset..offset + 8)
        .ok_or_else(|| EngineError::option("MPTCP option too short to read a u64 field"))?;
    Ok(u64::from_be_bytes(slice.try_into().expect("slice is exactly 8 bytes")))
}

pub fn write_u64(bytes: &mut [u8], offset: usize, value: u64) -> Result<()> {
    let slice = bytes
        .get_mut(offset..offset + 8)
        .ok_or_else(|| EngineError::option("MPTCP option too short to write a u64 field"))?;
    slice.copy_from_slice(&value.to_be_bytes());
    Ok(())
}

pub fn read_u16(bytes: &[u8], offset: usize) -> Result<u16> {
    let slice = bytes
        .get(offset..offset + 2)
        .ok_or_else(|| EngineError::option("MPTCP option too short to read a u16 field"))?;
    Ok(u16::from_be_bytes(slice.try_into().expect("slice is exactly 2 bytes")))
}

pub fn write_u16(bytes: &mut [u8], offset: usize, value: u16) -> Result<()> {
    let slice = bytes
        .get_mut(offset..offset + 2)
        .ok_or_else(|| EngineError::option("MPTCP option too short to write a u16 field"))?;
    slice.copy_from_slice(&value.to_be_bytes());
    Ok(())
}

pub fn read_u8(bytes: &[u8], offset: usize) -> Result<u8> {
    bytes
        .get(offset)
        .copied()
        .ok_or_else(|| EngineError::option("MPTCP option too short to read a byte field"))
}

pub fn write_u8(bytes: &mut [u8], offset: usize, value: u8) -> Result<()> {
    let slot = bytes
        .get_mut(offset)
        .ok_or_else(|| EngineError::option("MPTCP option too short to write a byte field"))?;
    *slot = value;
    Ok(())
}

pub fn write_bytes(bytes: &mut [u8], offset: usize, value: &[u8]) -> Result<()> {
    let slice = bytes
        .get_mut(offset..offset + value.len())
        .ok_or_else(|| EngineError::option("MPTCP option too short to write a byte range"))?;
    slice.copy_from_slice(value);
    Ok(())
}
