// Copyright 2025 FecFS Developers
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The 3-byte share header
//!
//! Every share file starts with `[required, share_index, excess_bytes]`,
//! where `excess_bytes = original_len % required` pins down the exact
//! plaintext size together with the encoded file size. This is the only
//! persisted format the crate defines: no footer, no checksum.

use crate::file::RandomAccessFile;
use crate::{FecFsError, Result};

/// Per-share wire header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareHeader {
    pub required: u8,
    pub share_index: u8,
    pub excess_bytes: u8,
}

impl ShareHeader {
    /// Wire length of the header
    pub const LEN: usize = 3;

    /// Build the header for one share of an `original_len`-byte file.
    pub fn new(required: u8, share_index: u8, original_len: u64) -> Self {
        Self {
            required,
            share_index,
            excess_bytes: (original_len % u64::from(required)) as u8,
        }
    }

    pub fn to_bytes(self) -> [u8; Self::LEN] {
        [self.required, self.share_index, self.excess_bytes]
    }

    /// Structural decode; consistency is validated at decoder construction.
    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self {
            required: bytes[0],
            share_index: bytes[1],
            excess_bytes: bytes[2],
        }
    }

    /// Read and decode the header at the start of a share file.
    pub fn read_from(file: &dyn RandomAccessFile) -> Result<Self> {
        let mut bytes = [0u8; Self::LEN];
        let got = file.read_at(&mut bytes, 0)?;
        if got < Self::LEN {
            return Err(FecFsError::MetadataReadShort { got, expected: Self::LEN });
        }
        Ok(Self::from_bytes(bytes))
    }

    /// Plaintext size of a share file of `encoded_size` total bytes.
    ///
    /// Inverse of [`encoded_size`]: when `excess_bytes` is nonzero the last
    /// payload byte covers a partial block of exactly `excess_bytes` source
    /// bytes.
    pub fn decoded_size(&self, encoded_size: u64) -> Result<u64> {
        if self.required == 0 {
            return Err(FecFsError::InconsistentMetadata { field: "required" });
        }
        let extra = Self::LEN as u64 + u64::from(self.excess_bytes != 0);
        if encoded_size < extra {
            return Err(FecFsError::InconsistentMetadata { field: "encoded size" });
        }
        Ok((encoded_size - extra) * u64::from(self.required) + u64::from(self.excess_bytes))
    }
}

/// Virtual size of one share of an `original_len`-byte file: the header plus
/// one payload byte per (possibly partial) block of `required` source bytes.
pub fn encoded_size(original_len: u64, required: usize) -> u64 {
    original_len.div_ceil(required as u64) + ShareHeader::LEN as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_roundtrip() {
        let header = ShareHeader::new(5, 17, 23);
        assert_eq!(header.excess_bytes, 3);
        assert_eq!(ShareHeader::from_bytes(header.to_bytes()), header);
        assert_eq!(header.to_bytes(), [5, 17, 3]);
    }

    #[test]
    fn test_size_roundtrip() {
        for required in [1usize, 2, 3, 5, 7, 254, 255] {
            for original_len in [0u64, 1, 2, 5, 6, 7, 100, 8192, 8193, 1 << 20] {
                let header = ShareHeader::new(required as u8, 0, original_len);
                let encoded = encoded_size(original_len, required);
                assert_eq!(
                    header.decoded_size(encoded).unwrap(),
                    original_len,
                    "required={required} original_len={original_len}"
                );
            }
        }
    }

    #[test]
    fn test_decoded_size_rejects_truncated_file() {
        let header = ShareHeader { required: 3, share_index: 0, excess_bytes: 1 };
        // needs at least the header plus the partial-block byte
        assert!(header.decoded_size(3).is_err());
        assert_eq!(header.decoded_size(4).unwrap(), 1);

        let aligned = ShareHeader { required: 3, share_index: 0, excess_bytes: 0 };
        assert_eq!(aligned.decoded_size(3).unwrap(), 0);
        assert!(aligned.decoded_size(2).is_err());
    }

    #[test]
    fn test_decoded_size_rejects_zero_required() {
        let header = ShareHeader { required: 0, share_index: 0, excess_bytes: 0 };
        assert!(header.decoded_size(10).is_err());
    }
}
