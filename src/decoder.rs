// Top-level VCDIFF decoding: header validation, code table selection,
// and the window loop.
//
// A custom code table is itself delivered as a VCDIFF delta whose
// source is the default table's serialization; materializing it runs a
// fully independent nested decoder, so a failure there never corrupts
// the outer decoder's state.

use std::io::{Cursor, Read, Seek, SeekFrom};

use log::debug;

use crate::address_cache::AddressCache;
use crate::code_table::{self, CodeTable, TABLE_BYTES};
use crate::error::{DecodeError, FormatError};
use crate::header::{FileHeader, eof_as};
use crate::window;

// ---------------------------------------------------------------------------
// Source providers
// ---------------------------------------------------------------------------

/// Random-access readable origin for source-sourced windows.
///
/// The origin is immutable during a decode; reads may hit arbitrary
/// offsets in any order.
pub trait SourceProvider {
    /// Fill `buf` with origin bytes starting at `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), DecodeError>;
}

impl SourceProvider for &[u8] {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), DecodeError> {
        let start = usize::try_from(offset).map_err(|_| DecodeError::UnexpectedEof("source segment"))?;
        let end = start
            .checked_add(buf.len())
            .filter(|&end| end <= self.len())
            .ok_or(DecodeError::UnexpectedEof("source segment"))?;
        buf.copy_from_slice(&self[start..end]);
        Ok(())
    }
}

/// Origin for deltas that never reference a source.
pub struct NoSource;

impl SourceProvider for NoSource {
    fn read_at(&mut self, _offset: u64, _buf: &mut [u8]) -> Result<(), DecodeError> {
        Err(DecodeError::Source(
            "window references a source segment but no source was provided",
        ))
    }
}

/// Origin backed by a seekable reader, e.g. a file.
pub struct SeekSource<R> {
    inner: R,
}

impl<R: Read + Seek> SeekSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Recover the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> SourceProvider for SeekSource<R> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), DecodeError> {
        self.inner
            .seek(SeekFrom::Start(offset))
            .map_err(DecodeError::Io)?;
        self.inner
            .read_exact(buf)
            .map_err(|e| eof_as(e, "source segment"))
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingHeader,
    AwaitingWindow,
    Done,
}

/// Streaming VCDIFF decoder.
///
/// Reads the file header once, then decodes windows until the delta is
/// exhausted.  The code table and address cache are fixed after the
/// header; the cache is reset per window.  Any error is terminal for
/// this decoder: drop it and start over with fresh input.
pub struct Decoder<R: Read> {
    delta: R,
    table: CodeTable,
    cache: AddressCache,
    state: State,
}

impl<R: Read> Decoder<R> {
    /// Create a decoder over a delta stream.
    pub fn new(delta: R) -> Self {
        Self {
            delta,
            table: code_table::default_table().clone(),
            cache: AddressCache::new(),
            state: State::AwaitingHeader,
        }
    }

    /// Read and validate the file header, selecting the code table and
    /// address cache sizes.  Idempotent; `decode_window` calls this.
    pub fn read_header(&mut self) -> Result<(), DecodeError> {
        if self.state != State::AwaitingHeader {
            return Ok(());
        }
        let header = FileHeader::read(&mut self.delta)?;

        if let Some(raw) = header.code_table {
            let table_bytes = decode_memory(&raw.compressed, code_table::default_table_bytes())
                .map_err(|e| FormatError::CodeTableDecode(Box::new(e)))?;
            if table_bytes.len() != TABLE_BYTES {
                return Err(FormatError::CodeTableSize(table_bytes.len()).into());
            }
            self.table = CodeTable::from_bytes(&table_bytes)?;
            self.cache = AddressCache::with_sizes(raw.near_size as usize, raw.same_size as usize);
            debug!(
                "custom code table in effect: near={} same={}",
                raw.near_size, raw.same_size
            );
        }

        self.state = State::AwaitingWindow;
        Ok(())
    }

    /// Decode the next window, appending its output to `output`.
    ///
    /// Returns `Ok(false)` once the delta input is exhausted.
    pub fn decode_window<S: SourceProvider>(
        &mut self,
        source: &mut S,
        output: &mut Vec<u8>,
    ) -> Result<bool, DecodeError> {
        self.read_header()?;
        if self.state == State::Done {
            return Ok(false);
        }
        let more = window::decode_window(
            &mut self.delta,
            source,
            &self.table,
            &mut self.cache,
            output,
        )?;
        if !more {
            self.state = State::Done;
        }
        Ok(more)
    }

    /// Decode all remaining windows, appending to `output`.
    pub fn decode_all<S: SourceProvider>(
        &mut self,
        source: &mut S,
        output: &mut Vec<u8>,
    ) -> Result<(), DecodeError> {
        while self.decode_window(source, output)? {}
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Convenience
// ---------------------------------------------------------------------------

/// Decode a complete in-memory delta against an in-memory source.
///
/// Pure with respect to its inputs; every call uses fully independent
/// decoder state, so concurrent independent decodes are safe.
pub fn decode_memory(delta: &[u8], source: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut decoder = Decoder::new(Cursor::new(delta));
    let mut src: &[u8] = source;
    let mut output = Vec::new();
    decoder.decode_all(&mut src, &mut output)?;
    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
