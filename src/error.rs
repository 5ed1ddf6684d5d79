// Error taxonomy for VCDIFF decoding.
//
// Two conditions exist: `FormatError` for byte streams that violate the
// VCDIFF format (or declare features this decoder rejects), and
// `DecodeError::UnexpectedEof` for streams that end before a declared
// section or field is complete.  Both are fatal for the decode in
// progress; there is no resynchronization or partial recovery.

use std::io;

use thiserror::Error;

/// A violation of the VCDIFF format (RFC 3284).
#[derive(Debug, Error)]
pub enum FormatError {
    /// The delta stream does not start with `D6 C3 C4`.
    #[error("invalid VCDIFF magic {0:02x?}, expected [d6, c3, c4]")]
    InvalidMagic([u8; 3]),

    /// The version byte following the magic is not zero.
    #[error("unsupported VCDIFF version {0:#04x}")]
    UnsupportedVersion(u8),

    /// Reserved bits 3-7 of the header indicator are set.
    #[error("invalid header indicator bits {0:#04x}")]
    InvalidHeaderIndicator(u8),

    /// The header declares a secondary compressor (VCD_DECOMPRESS).
    #[error("secondary compression is not supported")]
    SecondaryCompression,

    /// A window indicator sets both VCD_SOURCE and VCD_TARGET.
    #[error("window indicator sets both VCD_SOURCE and VCD_TARGET")]
    InvalidWindowIndicator,

    /// A window's delta indicator is nonzero (per-section secondary
    /// compression).
    #[error("nonzero delta indicator {0:#04x}: compressed sections are not supported")]
    NonzeroDeltaIndicator(u8),

    /// A varint still has its continuation bit set after the maximum
    /// number of bytes.
    #[error("malformed varint: continuation bit still set after 5 bytes")]
    MalformedVarint,

    /// A varint-valued length or offset does not fit in `usize` on this
    /// target.
    #[error("varint value does not fit in usize")]
    VarintOverflow,

    /// The declared custom code table length cannot even hold the two
    /// cache-size bytes.
    #[error("declared custom code table length {0} is too short")]
    CodeTableLength(usize),

    /// The nested custom code table decode produced the wrong number of
    /// bytes.
    #[error("custom code table decoded to {0} bytes, expected 1536")]
    CodeTableSize(usize),

    /// The nested custom code table decode itself failed.
    #[error("custom code table could not be decoded")]
    CodeTableDecode(#[source] Box<DecodeError>),

    /// A serialized code table slot carries an instruction type byte
    /// outside NOOP/ADD/RUN/COPY.
    #[error("invalid instruction type {0:#04x} in code table")]
    InvalidInstructionType(u8),

    /// A COPY instruction's address mode is outside the cache's valid
    /// range `[0, 2 + near + same)`.
    #[error("COPY address mode {mode} out of range (cache supports {modes} modes)")]
    AddressModeOutOfRange { mode: u8, modes: usize },

    /// A decoded COPY address over- or underflowed the address space.
    #[error("decoded COPY address is out of range")]
    InvalidAddress,

    /// A COPY range reads outside the source segment or at/after the
    /// window's write position.
    #[error("COPY range {addr}+{len} reads outside the decoded address space")]
    CopyOutOfRange { addr: u64, len: usize },

    /// An instruction would write past the declared target window length.
    #[error("instruction writes past the declared target window length {declared}")]
    TargetWindowOverrun { declared: usize },

    /// The window produced a different number of bytes than it declared.
    #[error("window produced {actual} bytes, declared target length is {declared}")]
    WindowSizeMismatch { declared: usize, actual: usize },
}

/// Any failure while decoding a delta stream.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The stream violates the VCDIFF format.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// The stream ended with a declared section or field incomplete.
    #[error("unexpected end of input while reading {0}")]
    UnexpectedEof(&'static str),

    /// A window references a source segment but no source was provided.
    #[error("source unavailable: {0}")]
    Source(&'static str),

    /// An I/O error other than end-of-input.
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::UnexpectedEof("delta stream")
        } else {
            DecodeError::Io(e)
        }
    }
}
