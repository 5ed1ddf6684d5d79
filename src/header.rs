// VCDIFF file header parsing (RFC 3284, Section 4.1).
//
// Validates the magic/version, the header indicator byte, and extracts
// the raw custom code table fields when present.  The application
// header, if flagged, is skipped without interpretation.  Building the
// custom code table from its raw fields requires a nested decode and
// lives in `decoder`.

use std::io::{self, Read};

use bitflags::bitflags;

use crate::error::{DecodeError, FormatError};
use crate::varint;

/// VCDIFF magic bytes plus the version byte.
pub const VCDIFF_MAGIC: [u8; 4] = [0xD6, 0xC3, 0xC4, 0x00];

bitflags! {
    /// Header indicator byte (hdr_ind).  Bits 3-7 are reserved and must
    /// be zero.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HdrIndicator: u8 {
        /// VCD_DECOMPRESS: a secondary compressor follows (rejected).
        const SECONDARY = 1 << 0;
        /// VCD_CODETABLE: a custom code table follows.
        const CODETABLE = 1 << 1;
        /// An application-defined header follows (skipped).
        const APPHEADER = 1 << 2;
    }
}

bitflags! {
    /// Window indicator byte (win_ind).  Unknown bits are ignored,
    /// matching the reference decoder.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WinIndicator: u8 {
        /// The window copies from the source (origin).
        const SOURCE = 1 << 0;
        /// The window copies from earlier target output.
        const TARGET = 1 << 1;
    }
}

/// Raw custom code table fields, as read from the header.
///
/// `compressed` is itself a complete VCDIFF delta whose implicit source
/// is the default table's 1536-byte serialization.
#[derive(Debug, Clone)]
pub struct RawCodeTable {
    pub near_size: u8,
    pub same_size: u8,
    pub compressed: Vec<u8>,
}

/// Parsed VCDIFF file header.
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub indicator: HdrIndicator,
    /// Present when `indicator` carries CODETABLE.
    pub code_table: Option<RawCodeTable>,
}

impl FileHeader {
    /// Read and validate a file header from the delta stream.
    pub fn read<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)
            .map_err(|e| eof_as(e, "file header"))?;
        if magic[..3] != VCDIFF_MAGIC[..3] {
            return Err(FormatError::InvalidMagic([magic[0], magic[1], magic[2]]).into());
        }
        if magic[3] != 0 {
            return Err(FormatError::UnsupportedVersion(magic[3]).into());
        }

        let byte = read_byte(r, "header indicator")?;
        let indicator =
            HdrIndicator::from_bits(byte).ok_or(FormatError::InvalidHeaderIndicator(byte))?;

        if indicator.contains(HdrIndicator::SECONDARY) {
            return Err(FormatError::SecondaryCompression.into());
        }

        let code_table = if indicator.contains(HdrIndicator::CODETABLE) {
            // The declared length covers the two cache-size bytes plus
            // the compressed table data.
            let declared = varint::read_stream_usize(r)?;
            let compressed_len = declared
                .checked_sub(2)
                .ok_or(FormatError::CodeTableLength(declared))?;
            let near_size = read_byte(r, "code table data")?;
            let same_size = read_byte(r, "code table data")?;
            let mut compressed = vec![0u8; compressed_len];
            r.read_exact(&mut compressed)
                .map_err(|e| eof_as(e, "code table data"))?;
            Some(RawCodeTable {
                near_size,
                same_size,
                compressed,
            })
        } else {
            None
        };

        if indicator.contains(HdrIndicator::APPHEADER) {
            let len = varint::read_stream(r)?;
            let skipped = io::copy(&mut r.by_ref().take(len), &mut io::sink())
                .map_err(DecodeError::Io)?;
            if skipped < len {
                return Err(DecodeError::UnexpectedEof("application header"));
            }
        }

        Ok(Self {
            indicator,
            code_table,
        })
    }
}

pub(crate) fn read_byte<R: Read>(r: &mut R, what: &'static str) -> Result<u8, DecodeError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf).map_err(|e| eof_as(e, what))?;
    Ok(buf[0])
}

pub(crate) fn eof_as(e: io::Error, what: &'static str) -> DecodeError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        DecodeError::UnexpectedEof(what)
    } else {
        DecodeError::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
