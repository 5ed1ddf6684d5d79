// VCDIFF instruction code table (RFC 3284, Sections 5.4-5.6).
//
// Maps an instruction-index byte to two instruction slots.  The default
// table is the fixed RFC constant, built procedurally from the same
// descriptor values the RFC uses.  A custom table travels as a delta
// against the default table's 1536-byte serialization and is
// materialized with `CodeTable::from_bytes`.

use std::sync::LazyLock;

use crate::error::FormatError;

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// The four instruction types (RFC 3284, Section 5.4).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstructionKind {
    /// Filler: this slot carries no instruction.
    #[default]
    NoOp,
    /// Insert literal bytes from the data section.
    Add,
    /// Repeat one data-section byte.
    Run,
    /// Copy bytes from the window's unified address space.
    Copy,
}

impl InstructionKind {
    fn from_byte(b: u8) -> Result<Self, FormatError> {
        match b {
            0 => Ok(Self::NoOp),
            1 => Ok(Self::Add),
            2 => Ok(Self::Run),
            3 => Ok(Self::Copy),
            _ => Err(FormatError::InvalidInstructionType(b)),
        }
    }

    fn as_byte(self) -> u8 {
        match self {
            Self::NoOp => 0,
            Self::Add => 1,
            Self::Run => 2,
            Self::Copy => 3,
        }
    }
}

/// One slot of a code table entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Instruction {
    pub kind: InstructionKind,
    /// Implicit size.  Zero with a non-NoOp kind means the real size is
    /// read as a varint from the instruction section.
    pub size: u8,
    /// Address mode; meaningful only for COPY.
    pub mode: u8,
}

impl Instruction {
    const fn new(kind: InstructionKind, size: u8, mode: u8) -> Self {
        Self { kind, size, mode }
    }

    const NOOP: Self = Self::new(InstructionKind::NoOp, 0, 0);
}

// ---------------------------------------------------------------------------
// Code table
// ---------------------------------------------------------------------------

/// Serialized size of a code table: 256 entries x 2 slots x 3 fields.
pub const TABLE_BYTES: usize = 1536;

/// Immutable mapping of instruction-index byte -> two instruction slots.
#[derive(Clone)]
pub struct CodeTable {
    entries: [[Instruction; 2]; 256],
}

impl CodeTable {
    /// The two slots for an instruction-index byte.
    #[inline]
    pub fn slots(&self, index: u8) -> [Instruction; 2] {
        self.entries[index as usize]
    }

    /// Serialize as six 256-byte planes: slot-1 types, sizes, modes,
    /// then slot-2 types, sizes, modes.
    pub fn to_bytes(&self) -> [u8; TABLE_BYTES] {
        let mut out = [0u8; TABLE_BYTES];
        for (i, [first, second]) in self.entries.iter().enumerate() {
            out[i] = first.kind.as_byte();
            out[i + 256] = first.size;
            out[i + 512] = first.mode;
            out[i + 768] = second.kind.as_byte();
            out[i + 1024] = second.size;
            out[i + 1280] = second.mode;
        }
        out
    }

    /// Materialize a table from its 1536-byte serialization.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() != TABLE_BYTES {
            return Err(FormatError::CodeTableSize(bytes.len()));
        }
        let mut entries = [[Instruction::NOOP; 2]; 256];
        for (i, entry) in entries.iter_mut().enumerate() {
            entry[0] = Instruction::new(
                InstructionKind::from_byte(bytes[i])?,
                bytes[i + 256],
                bytes[i + 512],
            );
            entry[1] = Instruction::new(
                InstructionKind::from_byte(bytes[i + 768])?,
                bytes[i + 1024],
                bytes[i + 1280],
            );
        }
        Ok(Self { entries })
    }
}

// ---------------------------------------------------------------------------
// Default table (RFC 3284, Section 5.6)
// ---------------------------------------------------------------------------

/// Build the default RFC 3284 code table from its descriptor values.
fn build_default() -> CodeTable {
    use InstructionKind::{Add, Copy, Run};

    const ADD_SIZES: u8 = 17;
    const NEAR_MODES: u8 = 4;
    const SAME_MODES: u8 = 3;
    const COPY_MODES: u8 = 2 + NEAR_MODES + SAME_MODES; // 9
    const COPY_SIZES: u8 = 15;
    const MIN_MATCH: u8 = 4;

    let mut entries = [[Instruction::NOOP; 2]; 256];
    let mut idx = 0usize;
    let mut single = |inst: Instruction| {
        entries[idx][0] = inst;
        idx += 1;
    };

    // Index 0: RUN with explicit size.
    single(Instruction::new(Run, 0, 0));

    // Index 1: ADD with explicit size; 2..=18: ADD sizes 1..=17.
    single(Instruction::new(Add, 0, 0));
    for size in 1..=ADD_SIZES {
        single(Instruction::new(Add, size, 0));
    }

    // Per mode: COPY with explicit size, then sizes 4..=18.
    for mode in 0..COPY_MODES {
        single(Instruction::new(Copy, 0, mode));
        for size in MIN_MATCH..MIN_MATCH + COPY_SIZES {
            single(Instruction::new(Copy, size, mode));
        }
    }

    // ADD+COPY doubles: copy sizes 4..=6 for SELF/HERE/NEAR modes,
    // exactly 4 for SAME modes.
    let mut double = |a: Instruction, b: Instruction| {
        entries[idx] = [a, b];
        idx += 1;
    };
    for mode in 0..COPY_MODES {
        let copy_max = if mode < 2 + NEAR_MODES { 6 } else { 4 };
        for add_size in 1..=4 {
            for copy_size in MIN_MATCH..=copy_max {
                double(
                    Instruction::new(Add, add_size, 0),
                    Instruction::new(Copy, copy_size, mode),
                );
            }
        }
    }

    // COPY+ADD doubles: copy size 4, add size 1, all modes.
    for mode in 0..COPY_MODES {
        double(
            Instruction::new(Copy, MIN_MATCH, mode),
            Instruction::new(Add, 1, 0),
        );
    }

    debug_assert_eq!(idx, 256, "code table must have exactly 256 entries");
    CodeTable { entries }
}

/// The default RFC 3284 code table.
pub fn default_table() -> &'static CodeTable {
    static TABLE: LazyLock<CodeTable> = LazyLock::new(build_default);
    &TABLE
}

/// The default table's 1536-byte serialization, the implicit source for
/// custom code table deltas.
pub fn default_table_bytes() -> &'static [u8; TABLE_BYTES] {
    static BYTES: LazyLock<[u8; TABLE_BYTES]> = LazyLock::new(|| default_table().to_bytes());
    &BYTES
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use InstructionKind::{Add, Copy, NoOp, Run};

    #[test]
    fn index_0_is_run_with_explicit_size() {
        let [first, second] = default_table().slots(0);
        assert_eq!(first, Instruction::new(Run, 0, 0));
        assert_eq!(second, Instruction::NOOP);
    }

    #[test]
    fn indices_1_to_18_are_add() {
        let t = default_table();
        assert_eq!(t.slots(1)[0], Instruction::new(Add, 0, 0));
        for size in 1..=17u8 {
            assert_eq!(t.slots(1 + size)[0], Instruction::new(Add, size, 0));
        }
    }

    #[test]
    fn copy_blocks_are_16_wide_per_mode() {
        let t = default_table();
        for mode in 0..9u8 {
            let base = 19 + 16 * mode;
            assert_eq!(t.slots(base)[0], Instruction::new(Copy, 0, mode));
            for size in 4..=18u8 {
                assert_eq!(
                    t.slots(base + size - 3)[0],
                    Instruction::new(Copy, size, mode),
                    "mode {mode} size {size}"
                );
            }
        }
    }

    #[test]
    fn add_copy_doubles_start_at_163() {
        let [first, second] = default_table().slots(163);
        assert_eq!(first, Instruction::new(Add, 1, 0));
        assert_eq!(second, Instruction::new(Copy, 4, 0));
    }

    #[test]
    fn same_mode_add_copy_doubles_start_at_235() {
        let [first, second] = default_table().slots(235);
        assert_eq!(first, Instruction::new(Add, 1, 0));
        assert_eq!(second, Instruction::new(Copy, 4, 6));
    }

    #[test]
    fn copy_add_doubles_fill_247_to_255() {
        let t = default_table();
        for mode in 0..9u8 {
            let [first, second] = t.slots(247 + mode);
            assert_eq!(first, Instruction::new(Copy, 4, mode));
            assert_eq!(second, Instruction::new(Add, 1, 0));
        }
    }

    #[test]
    fn doubles_never_have_explicit_sizes() {
        let t = default_table();
        for index in 0..=255u8 {
            let [first, second] = t.slots(index);
            if second.kind != NoOp {
                assert_ne!(first.size, 0, "double at {index} has explicit size1");
                assert_ne!(second.size, 0, "double at {index} has explicit size2");
            }
        }
    }

    #[test]
    fn serialization_roundtrips() {
        let bytes = default_table_bytes();
        let rebuilt = CodeTable::from_bytes(&bytes[..]).unwrap();
        for index in 0..=255u8 {
            assert_eq!(rebuilt.slots(index), default_table().slots(index));
        }
    }

    #[test]
    fn serialization_layout_is_plane_major() {
        let bytes = default_table_bytes();
        // Index 0 slot 1: RUN, explicit size.
        assert_eq!(bytes[0], 2);
        assert_eq!(bytes[256], 0);
        // Index 20: COPY size 4 mode 0.
        assert_eq!(bytes[20], 3);
        assert_eq!(bytes[256 + 20], 4);
        assert_eq!(bytes[512 + 20], 0);
        // Index 255 slot 2: ADD size 1.
        assert_eq!(bytes[768 + 255], 1);
        assert_eq!(bytes[1024 + 255], 1);
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        assert!(matches!(
            CodeTable::from_bytes(&[0u8; 100]),
            Err(FormatError::CodeTableSize(100))
        ));
    }

    #[test]
    fn from_bytes_rejects_bad_type_byte() {
        let mut bytes = default_table_bytes().to_vec();
        bytes[7] = 9;
        assert!(matches!(
            CodeTable::from_bytes(&bytes),
            Err(FormatError::InvalidInstructionType(9))
        ));
    }
}
