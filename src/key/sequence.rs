use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::FixedKey;
use crate::error::{IndexError, Result};

const BASES: [char; 4] = ['a', 'c', 'g', 't'];

/// A DNA sequence of 1..=31 bases packed two bits per base.
///
/// `a`, `c`, `g`, `t` map to `00`, `01`, `10`, `11`; the first base occupies
/// the most significant used bits, so for equal lengths the numeric order of
/// the packed value matches lexicographic order of the bases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Sequence {
    bits: u64,
    len: u8,
}

impl Sequence {
    /// Longest sequence that fits in the packed representation.
    pub const MAX_LEN: usize = 31;

    /// Validates a requested key length, returning it as a `usize`.
    pub fn check_len(len: i64) -> Result<usize> {
        if (1..=Self::MAX_LEN as i64).contains(&len) {
            Ok(len as usize)
        } else {
            Err(IndexError::InvalidKeyLength(len))
        }
    }

    /// Packs a slice of base characters (case-insensitive).
    pub fn from_bases(bases: &[u8]) -> Result<Self> {
        Self::check_len(bases.len() as i64)?;
        let mut bits = 0u64;
        for &base in bases {
            let code = base_code(base).ok_or_else(|| {
                IndexError::InvalidKey(format!(
                    "'{}' contains non-ACGT base '{}'",
                    String::from_utf8_lossy(bases),
                    base.escape_ascii()
                ))
            })?;
            bits = (bits << 2) | code;
        }
        Ok(Self {
            bits,
            len: bases.len() as u8,
        })
    }

    /// Builds a sequence from an already packed value.
    ///
    /// Bits above `2 * len` are discarded.
    pub(crate) fn from_packed(bits: u64, len: usize) -> Self {
        debug_assert!((1..=Self::MAX_LEN).contains(&len));
        Self {
            bits: bits & mask(len),
            len: len as u8,
        }
    }

    /// Packed 2-bit value.
    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Number of bases.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// True only for the zero-length padding value.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Maps a base character to its 2-bit code.
pub(crate) fn base_code(base: u8) -> Option<u64> {
    match base {
        b'a' | b'A' => Some(0),
        b'c' | b'C' => Some(1),
        b'g' | b'G' => Some(2),
        b't' | b'T' => Some(3),
        _ => None,
    }
}

/// Mask covering the low `2 * len` bits.
pub(crate) fn mask(len: usize) -> u64 {
    if len >= 32 {
        u64::MAX
    } else {
        (1u64 << (2 * len)) - 1
    }
}

impl Ord for Sequence {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bits
            .cmp(&other.bits)
            .then_with(|| self.len.cmp(&other.len))
    }
}

impl PartialOrd for Sequence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.len()).rev() {
            let code = (self.bits >> (2 * i)) & 0b11;
            write!(f, "{}", BASES[code as usize])?;
        }
        Ok(())
    }
}

impl FromStr for Sequence {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_bases(s.trim().as_bytes())
    }
}

impl FixedKey for Sequence {
    const ENCODED_LEN: usize = 9;

    fn zero() -> Self {
        Self { bits: 0, len: 0 }
    }

    fn encode_into(&self, dst: &mut [u8]) {
        dst[0] = self.len;
        dst[1..9].copy_from_slice(&self.bits.to_be_bytes());
    }

    fn decode_from(src: &[u8]) -> Result<Self> {
        if src.len() != Self::ENCODED_LEN {
            return Err(IndexError::corruption("sequence key length mismatch"));
        }
        let len = src[0] as usize;
        if len > Self::MAX_LEN {
            return Err(IndexError::corruption(format!(
                "sequence key claims {len} bases"
            )));
        }
        let mut value = [0u8; 8];
        value.copy_from_slice(&src[1..9]);
        let bits = u64::from_be_bytes(value);
        if bits & !mask(len) != 0 {
            return Err(IndexError::corruption(format!(
                "sequence key value {bits:#x} exceeds {len} bases"
            )));
        }
        Ok(Self {
            bits,
            len: len as u8,
        })
    }
}
