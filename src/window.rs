// Per-window decoding: window header, section reads, and the
// ADD/RUN/COPY/NOOP execution loop (RFC 3284, Sections 4.2-4.3 and 6).
//
// Windows append to a shared output buffer.  COPY addresses live in a
// unified per-window address space: [0, src_len) is the materialized
// source segment, [src_len, here) is the target bytes this window has
// already produced.  Overlapping target copies must proceed byte by
// byte so later bytes of the copy can read bytes just written.

use std::io::{self, Read};

use log::{debug, trace};

use crate::address_cache::AddressCache;
use crate::code_table::{CodeTable, Instruction, InstructionKind};
use crate::decoder::SourceProvider;
use crate::error::{DecodeError, FormatError};
use crate::header::{WinIndicator, eof_as, read_byte};
use crate::varint;

// ---------------------------------------------------------------------------
// Window header
// ---------------------------------------------------------------------------

/// Parsed per-window header fields.
#[derive(Debug, Clone)]
pub struct WindowHeader {
    pub indicator: WinIndicator,
    /// Source segment length (when SOURCE or TARGET is set).
    pub src_len: usize,
    /// Source segment position in the origin or the produced target.
    pub src_pos: usize,
    /// Declared target window length.
    pub target_len: usize,
    pub data_len: usize,
    pub inst_len: usize,
    pub addr_len: usize,
}

impl WindowHeader {
    /// Read a window header.  Returns `None` on clean end-of-input at
    /// the window indicator byte: that is how a delta stream ends.
    pub fn read<R: Read>(r: &mut R) -> Result<Option<Self>, DecodeError> {
        let mut buf = [0u8; 1];
        match r.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let indicator = WinIndicator::from_bits_truncate(buf[0]);
        if indicator.contains(WinIndicator::SOURCE | WinIndicator::TARGET) {
            return Err(FormatError::InvalidWindowIndicator.into());
        }

        let (src_len, src_pos) = if indicator.intersects(WinIndicator::SOURCE | WinIndicator::TARGET)
        {
            let len = varint::read_stream_usize(r)?;
            let pos = varint::read_stream_usize(r)?;
            (len, pos)
        } else {
            (0, 0)
        };

        // The encoded-length field is advisory; read it and move on.
        let enc_len = varint::read_stream(r)?;
        trace!("window encoded length (ignored): {enc_len}");

        let target_len = varint::read_stream_usize(r)?;

        let del_ind = read_byte(r, "delta indicator")?;
        if del_ind != 0 {
            return Err(FormatError::NonzeroDeltaIndicator(del_ind).into());
        }

        let data_len = varint::read_stream_usize(r)?;
        let inst_len = varint::read_stream_usize(r)?;
        let addr_len = varint::read_stream_usize(r)?;

        Ok(Some(Self {
            indicator,
            src_len,
            src_pos,
            target_len,
            data_len,
            inst_len,
            addr_len,
        }))
    }
}

// ---------------------------------------------------------------------------
// Window decoding
// ---------------------------------------------------------------------------

/// Decode one window from `delta`, appending its output to `output`.
///
/// Returns `Ok(false)` on clean end-of-input (no window started).
pub fn decode_window<R: Read, S: SourceProvider>(
    delta: &mut R,
    source: &mut S,
    table: &CodeTable,
    cache: &mut AddressCache,
    output: &mut Vec<u8>,
) -> Result<bool, DecodeError> {
    let Some(header) = WindowHeader::read(delta)? else {
        return Ok(false);
    };
    debug!(
        "window: indicator={:?} src_len={} src_pos={} target_len={}",
        header.indicator, header.src_len, header.src_pos, header.target_len
    );

    // Materialize the source segment.  Target-sourced windows read from
    // the output produced so far; the append position is untouched.
    let segment: Vec<u8> = if header.indicator.contains(WinIndicator::SOURCE) {
        let mut seg = vec![0u8; header.src_len];
        source.read_at(header.src_pos as u64, &mut seg)?;
        seg
    } else if header.indicator.contains(WinIndicator::TARGET) {
        let end = header
            .src_pos
            .checked_add(header.src_len)
            .filter(|&end| end <= output.len())
            .ok_or(DecodeError::UnexpectedEof("target segment"))?;
        output[header.src_pos..end].to_vec()
    } else {
        Vec::new()
    };

    let data = read_section(delta, header.data_len, "data section")?;
    let inst = read_section(delta, header.inst_len, "instruction section")?;
    let addr = read_section(delta, header.addr_len, "address section")?;
    cache.init(addr);

    let base = output.len();
    output.reserve(header.target_len);

    let mut inst_pos = 0usize;
    let mut data_pos = 0usize;

    while inst_pos < inst.len() {
        let index = inst[inst_pos];
        inst_pos += 1;
        for slot in table.slots(index) {
            execute_slot(
                slot,
                &inst,
                &mut inst_pos,
                &data,
                &mut data_pos,
                cache,
                &segment,
                base,
                header.target_len,
                output,
            )?;
        }
    }

    let produced = output.len() - base;
    if produced != header.target_len {
        return Err(FormatError::WindowSizeMismatch {
            declared: header.target_len,
            actual: produced,
        }
        .into());
    }

    Ok(true)
}

/// Execute one instruction slot (half of a code table entry).
#[allow(clippy::too_many_arguments)]
fn execute_slot(
    slot: Instruction,
    inst: &[u8],
    inst_pos: &mut usize,
    data: &[u8],
    data_pos: &mut usize,
    cache: &mut AddressCache,
    segment: &[u8],
    base: usize,
    target_len: usize,
    output: &mut Vec<u8>,
) -> Result<(), DecodeError> {
    if slot.kind == InstructionKind::NoOp {
        return Ok(());
    }

    // An implicit size of zero means the real size follows as a varint
    // in the instruction section itself.
    let size = if slot.size == 0 {
        varint::read_at_usize(inst, inst_pos).map_err(|e| match e {
            DecodeError::UnexpectedEof(_) => DecodeError::UnexpectedEof("instruction section"),
            other => other,
        })?
    } else {
        slot.size as usize
    };

    let written = output.len() - base;
    if written + size > target_len {
        return Err(FormatError::TargetWindowOverrun {
            declared: target_len,
        }
        .into());
    }

    match slot.kind {
        InstructionKind::NoOp => {}

        InstructionKind::Add => {
            let end = data_pos
                .checked_add(size)
                .filter(|&end| end <= data.len())
                .ok_or(DecodeError::UnexpectedEof("data section"))?;
            output.extend_from_slice(&data[*data_pos..end]);
            *data_pos = end;
        }

        InstructionKind::Run => {
            let byte = *data
                .get(*data_pos)
                .ok_or(DecodeError::UnexpectedEof("data section"))?;
            *data_pos += 1;
            output.resize(output.len() + size, byte);
        }

        InstructionKind::Copy => {
            let src_len = segment.len();
            let here = (src_len + written) as u64;
            let addr = cache.decode_address(here, slot.mode)?;

            if (addr as usize) < src_len {
                let start = addr as usize;
                let end = start
                    .checked_add(size)
                    .filter(|&end| end <= src_len)
                    .ok_or(FormatError::CopyOutOfRange { addr, len: size })?;
                output.extend_from_slice(&segment[start..end]);
            } else {
                let local = addr as usize - src_len;
                if local >= written {
                    return Err(FormatError::CopyOutOfRange { addr, len: size }.into());
                }
                let abs = base + local;
                if local + size < written {
                    // The whole range is already finalized.
                    output.extend_from_within(abs..abs + size);
                } else {
                    // The range reaches the write position: copy byte by
                    // byte so a repeating pattern reads its own output.
                    for i in 0..size {
                        let byte = output[abs + i];
                        output.push(byte);
                    }
                }
            }
        }
    }

    Ok(())
}

fn read_section<R: Read>(
    r: &mut R,
    len: usize,
    what: &'static str,
) -> Result<Vec<u8>, DecodeError> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).map_err(|e| eof_as(e, what))?;
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
