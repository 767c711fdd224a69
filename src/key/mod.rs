//! Key types stored in the index.

use std::fmt;

use crate::error::{IndexError, Result};

pub(crate) mod sequence;

pub use sequence::Sequence;

/// Trait implemented by key types with a fixed-width serialized form.
///
/// The tree never looks inside a key: it only orders them, compares them for
/// equality and copies their encoded bytes into node blocks.
pub trait FixedKey: Ord + Clone + fmt::Debug + fmt::Display {
    /// Number of bytes every encoded key occupies.
    const ENCODED_LEN: usize;

    /// Zero-valued instance, used for padding unused record slots.
    fn zero() -> Self;

    /// Encodes `self` into `dst`, which is exactly `ENCODED_LEN` bytes long.
    fn encode_into(&self, dst: &mut [u8]);

    /// Decodes a key from exactly `ENCODED_LEN` bytes.
    fn decode_from(src: &[u8]) -> Result<Self>;
}

impl FixedKey for u64 {
    const ENCODED_LEN: usize = 8;

    fn zero() -> Self {
        0
    }

    fn encode_into(&self, dst: &mut [u8]) {
        dst.copy_from_slice(&self.to_be_bytes());
    }

    fn decode_from(src: &[u8]) -> Result<Self> {
        let bytes: [u8; 8] = src
            .try_into()
            .map_err(|_| IndexError::corruption("u64 key length mismatch"))?;
        Ok(u64::from_be_bytes(bytes))
    }
}
