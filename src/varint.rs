// VCDIFF variable-length integer encoding (RFC 3284, Section 2).
//
// Base-128, big-endian: most-significant group first.  Each byte
// contributes its low 7 bits; bit 0x80 marks a continuation byte.
// Decoding is capped at 5 bytes; a 5th byte with the continuation bit
// still set is a format error.  Values destined for lengths or offsets
// go through the checked `usize` readers, since 35 bits can exceed the
// pointer width on 32-bit targets.

use std::io::Read;

use crate::error::{DecodeError, FormatError};

/// Maximum encoded length accepted by the decoder.
pub const MAX_LEN: usize = 5;

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a varint from the front of `data`.
///
/// Returns `(value, bytes_consumed)`.
pub fn read_slice(data: &[u8]) -> Result<(u64, usize), DecodeError> {
    let mut val: u64 = 0;
    for (i, &byte) in data.iter().take(MAX_LEN).enumerate() {
        val = (val << 7) | u64::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok((val, i + 1));
        }
    }
    if data.len() < MAX_LEN {
        Err(DecodeError::UnexpectedEof("varint"))
    } else {
        Err(FormatError::MalformedVarint.into())
    }
}

/// Decode a varint from `data` at `pos`, advancing the cursor.
pub fn read_at(data: &[u8], pos: &mut usize) -> Result<u64, DecodeError> {
    let (val, used) = read_slice(&data[*pos..])?;
    *pos += used;
    Ok(val)
}

/// Decode a varint destined for a length or offset, checked into `usize`.
pub fn read_at_usize(data: &[u8], pos: &mut usize) -> Result<usize, DecodeError> {
    to_usize(read_at(data, pos)?)
}

/// Decode a varint from a forward-only byte source.
pub fn read_stream<R: Read>(r: &mut R) -> Result<u64, DecodeError> {
    let mut val: u64 = 0;
    let mut buf = [0u8; 1];
    for _ in 0..MAX_LEN {
        r.read_exact(&mut buf)?;
        val = (val << 7) | u64::from(buf[0] & 0x7F);
        if buf[0] & 0x80 == 0 {
            return Ok(val);
        }
    }
    Err(FormatError::MalformedVarint.into())
}

/// `read_stream` checked into `usize`, for lengths and offsets.
pub fn read_stream_usize<R: Read>(r: &mut R) -> Result<usize, DecodeError> {
    to_usize(read_stream(r)?)
}

// A 5-byte varint holds up to 35 bits, which overflows usize on 32-bit
// targets.
fn to_usize(val: u64) -> Result<usize, DecodeError> {
    usize::try_from(val).map_err(|_| FormatError::VarintOverflow.into())
}

// ---------------------------------------------------------------------------
// Encoding
//
// Not used on the decode path; kept for building address sections and
// test fixtures.
// ---------------------------------------------------------------------------

/// Encode `num` into `buf`, returning the number of bytes written (1..=5).
///
/// Fills the scratch buffer from the end, continuation bit set on every
/// byte, then clears it on the final byte.  `num` must fit in 35 bits.
pub fn encode(mut num: u64, buf: &mut [u8; MAX_LEN]) -> usize {
    debug_assert!(num < 1 << 35, "value does not fit in a 5-byte varint");
    let mut i = MAX_LEN;
    loop {
        i -= 1;
        buf[i] = (num as u8 & 0x7F) | 0x80;
        num >>= 7;
        if num == 0 {
            break;
        }
    }
    buf[MAX_LEN - 1] &= 0x7F;
    MAX_LEN - i
}

/// Encode `num` into a fresh `Vec`.
pub fn to_vec(num: u64) -> Vec<u8> {
    let mut buf = [0u8; MAX_LEN];
    let len = encode(num, &mut buf);
    buf[MAX_LEN - len..].to_vec()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
