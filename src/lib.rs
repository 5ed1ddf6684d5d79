//! Undelta: a VCDIFF (RFC 3284) delta decoder in pure Rust.
//!
//! Reconstructs a target byte sequence from a source byte sequence plus
//! a compact binary delta, byte-for-byte per the RFC: strict header
//! validation, the per-window instruction loop, the NEAR/SAME address
//! cache, and self-referential custom code table decoding.  Encoding
//! and secondary compression are out of scope; deltas that declare a
//! secondary compressor are rejected.
//!
//! # Modules
//!
//! - `varint`        — Variable-length integer decoding (base-128, big-endian)
//! - `address_cache` — NEAR/SAME cache for COPY instruction addresses
//! - `code_table`    — Default RFC 3284 code table and custom table handling
//! - `header`        — File header validation
//! - `window`        — Per-window instruction execution
//! - `decoder`       — Stream orchestration and source providers
//!
//! # Quick Start
//!
//! ```
//! use undelta::decode_memory;
//!
//! // A minimal delta: one window that ADDs the literal bytes "hello".
//! let delta = [
//!     0xD6, 0xC3, 0xC4, 0x00, // magic + version
//!     0x00, // header indicator
//!     0x00, // window indicator
//!     0x0B, // encoded length (advisory)
//!     0x05, // target window length
//!     0x00, // delta indicator
//!     0x05, 0x01, 0x00, // data / instruction / address section lengths
//!     b'h', b'e', b'l', b'l', b'o', // data section
//!     0x06, // instruction section: ADD, size 5
//! ];
//!
//! let target = decode_memory(&delta, b"").unwrap();
//! assert_eq!(target, b"hello");
//! ```

pub mod address_cache;
pub mod code_table;
pub mod decoder;
pub mod error;
pub mod header;
pub mod varint;
pub mod window;

// Re-export the key types.
pub use address_cache::AddressCache;
pub use code_table::{CodeTable, Instruction, InstructionKind};
pub use decoder::{Decoder, NoSource, SeekSource, SourceProvider, decode_memory};
pub use error::{DecodeError, FormatError};
pub use header::{FileHeader, HdrIndicator, VCDIFF_MAGIC, WinIndicator};
pub use window::WindowHeader;
