// VCDIFF address cache (RFC 3284, Section 5.3).
//
// Implements the NEAR and SAME caches used to compactly encode COPY
// instruction addresses.  The cache owns the current window's address
// section: `init` binds the section bytes and a read cursor, and
// `decode_address` consumes from it as instructions execute.

use crate::error::{DecodeError, FormatError};
use crate::varint;

/// SELF mode: the address is a plain varint.
pub const VCD_SELF: u8 = 0;
/// HERE mode: the address is `here - varint`.
pub const VCD_HERE: u8 = 1;

/// NEAR/SAME address cache.
///
/// Default configuration (near=4, same=3) gives 9 address modes:
///   0      SELF  — absolute
///   1      HERE  — here - value
///   2..5   NEAR  — near\[mode-2\] + value
///   6..8   SAME  — same\[(mode-6)*256 + byte\], one raw byte, no varint
///
/// Cache sizes are fixed for the lifetime of a decoder; `init` is called
/// at the start of every window.
#[derive(Debug, Clone)]
pub struct AddressCache {
    near: Vec<u64>,
    same: Vec<u64>,
    next_slot: usize,
    addresses: Vec<u8>,
    pos: usize,
}

impl AddressCache {
    /// Default RFC 3284 cache: near=4, same=3.
    pub fn new() -> Self {
        Self::with_sizes(4, 3)
    }

    /// Create with custom cache sizes.  `same_size` is a multiplier of
    /// 256 slots.
    pub fn with_sizes(near_size: usize, same_size: usize) -> Self {
        Self {
            near: vec![0; near_size],
            same: vec![0; same_size * 256],
            next_slot: 0,
            addresses: Vec::new(),
            pos: 0,
        }
    }

    /// Number of NEAR slots.
    #[inline]
    pub fn near_size(&self) -> usize {
        self.near.len()
    }

    /// Number of SAME groups (each 256 slots).
    #[inline]
    pub fn same_size(&self) -> usize {
        self.same.len() / 256
    }

    /// Total number of address modes (2 + near + same).
    #[inline]
    pub fn mode_count(&self) -> usize {
        2 + self.near_size() + self.same_size()
    }

    /// Reset both caches and bind a fresh address section.
    pub fn init(&mut self, addresses: Vec<u8>) {
        self.near.fill(0);
        self.same.fill(0);
        self.next_slot = 0;
        self.addresses = addresses;
        self.pos = 0;
    }

    /// Bytes consumed from the bound address section so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Decode one COPY address.
    ///
    /// `here` is the current position in the window's unified address
    /// space (source segment length + target bytes produced so far).
    /// Every successfully decoded address updates both caches, whichever
    /// mode produced it.
    pub fn decode_address(&mut self, here: u64, mode: u8) -> Result<u64, DecodeError> {
        let m = mode as usize;
        if m >= self.mode_count() {
            return Err(FormatError::AddressModeOutOfRange {
                mode,
                modes: self.mode_count(),
            }
            .into());
        }

        let addr = if mode == VCD_SELF {
            self.read_varint()?
        } else if mode == VCD_HERE {
            let dist = self.read_varint()?;
            here.checked_sub(dist)
                .ok_or(FormatError::InvalidAddress)?
        } else if m < 2 + self.near_size() {
            let base = self.near[m - 2];
            let dist = self.read_varint()?;
            base.checked_add(dist).ok_or(FormatError::InvalidAddress)?
        } else {
            // SAME mode: one raw byte, no varint.
            let group = m - 2 - self.near_size();
            let byte = *self
                .addresses
                .get(self.pos)
                .ok_or(DecodeError::UnexpectedEof("address section"))?;
            self.pos += 1;
            self.same[group * 256 + byte as usize]
        };

        self.update(addr);
        Ok(addr)
    }

    // Unconditional after every decode: this is how SAME entries become
    // populated from addresses originally decoded via other modes.
    fn update(&mut self, addr: u64) {
        if !self.near.is_empty() {
            self.near[self.next_slot] = addr;
            self.next_slot = (self.next_slot + 1) % self.near.len();
        }
        if !self.same.is_empty() {
            let idx = (addr % self.same.len() as u64) as usize;
            self.same[idx] = addr;
        }
    }

    fn read_varint(&mut self) -> Result<u64, DecodeError> {
        varint::read_at(&self.addresses, &mut self.pos).map_err(|e| match e {
            DecodeError::UnexpectedEof(_) => DecodeError::UnexpectedEof("address section"),
            other => other,
        })
    }
}

impl Default for AddressCache {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cache_params() {
        let c = AddressCache::new();
        assert_eq!(c.near_size(), 4);
        assert_eq!(c.same_size(), 3);
        assert_eq!(c.mode_count(), 9);
    }

    #[test]
    fn self_mode_reads_a_varint() {
        let mut c = AddressCache::new();
        c.init(varint::to_vec(12345));
        assert_eq!(c.decode_address(100_000, VCD_SELF).unwrap(), 12345);
        assert_eq!(c.position(), 2);
    }

    #[test]
    fn here_mode_subtracts_from_here() {
        let mut c = AddressCache::new();
        c.init(varint::to_vec(10));
        assert_eq!(c.decode_address(1000, VCD_HERE).unwrap(), 990);
    }

    #[test]
    fn here_mode_underflow_is_invalid() {
        let mut c = AddressCache::new();
        c.init(varint::to_vec(10));
        assert!(matches!(
            c.decode_address(5, VCD_HERE),
            Err(DecodeError::Format(FormatError::InvalidAddress))
        ));
    }

    #[test]
    fn near_mode_adds_to_cached_slot() {
        let mut c = AddressCache::new();
        let mut addrs = varint::to_vec(500);
        addrs.extend(varint::to_vec(7));
        c.init(addrs);
        // SELF decode of 500 lands in near[0]; mode 2 then reads near[0] + 7.
        assert_eq!(c.decode_address(1000, VCD_SELF).unwrap(), 500);
        assert_eq!(c.decode_address(1000, 2).unwrap(), 507);
    }

    #[test]
    fn same_mode_consumes_one_raw_byte() {
        let mut c = AddressCache::new();
        let mut addrs = varint::to_vec(5);
        addrs.push(5); // slot byte for the SAME lookup
        c.init(addrs);

        // SELF decode of 5 populates same[5 % 768] = same[5].
        assert_eq!(c.decode_address(1000, VCD_SELF).unwrap(), 5);
        let before = c.position();
        // Mode 6 is the first SAME mode (group 0); slot byte 5 -> 5.
        assert_eq!(c.decode_address(1000, 6).unwrap(), 5);
        assert_eq!(c.position(), before + 1);
    }

    #[test]
    fn same_mode_groups_are_disjoint() {
        let mut c = AddressCache::new();
        let addr = 300u64; // lands in same[300]: group 1, byte 44
        let mut addrs = varint::to_vec(addr);
        addrs.push(44);
        c.init(addrs);

        assert_eq!(c.decode_address(1000, VCD_SELF).unwrap(), addr);
        assert_eq!(c.decode_address(1000, 7).unwrap(), addr);
    }

    #[test]
    fn mode_out_of_range_is_rejected() {
        let mut c = AddressCache::new();
        c.init(vec![0]);
        assert!(matches!(
            c.decode_address(10, 9),
            Err(DecodeError::Format(
                FormatError::AddressModeOutOfRange { mode: 9, modes: 9 }
            ))
        ));
    }

    #[test]
    fn near_cache_is_circular() {
        let mut c = AddressCache::new();
        let mut addrs = Vec::new();
        for i in 0..5u64 {
            addrs.extend(varint::to_vec(i * 100));
        }
        c.init(addrs);
        for _ in 0..5 {
            c.decode_address(1 << 20, VCD_SELF).unwrap();
        }
        // The 5th decode wrapped around and overwrote near[0].
        assert_eq!(c.near, vec![400, 100, 200, 300]);
    }

    #[test]
    fn init_resets_state() {
        let mut c = AddressCache::new();
        c.init(varint::to_vec(999));
        c.decode_address(10_000, VCD_SELF).unwrap();
        c.init(vec![]);
        assert!(c.near.iter().all(|&x| x == 0));
        assert!(c.same.iter().all(|&x| x == 0));
        assert_eq!(c.next_slot, 0);
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn truncated_address_section_is_eof() {
        let mut c = AddressCache::new();
        c.init(vec![]);
        assert!(matches!(
            c.decode_address(10, VCD_SELF),
            Err(DecodeError::UnexpectedEof("address section"))
        ));
        assert!(matches!(
            c.decode_address(10, 6),
            Err(DecodeError::UnexpectedEof("address section"))
        ));
    }

    #[test]
    fn zero_sized_caches() {
        let mut c = AddressCache::with_sizes(0, 0);
        assert_eq!(c.mode_count(), 2);
        c.init(varint::to_vec(42));
        assert_eq!(c.decode_address(100, VCD_SELF).unwrap(), 42);
        assert!(matches!(
            c.decode_address(100, 2),
            Err(DecodeError::Format(FormatError::AddressModeOutOfRange { .. }))
        ));
    }
}
