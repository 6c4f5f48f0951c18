// Copyright 2025 FecFS Developers
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The Reed-Solomon coding primitive
//!
//! A systematic `required`-of-`total` code over GF(256). Principal shares
//! (index below `required`) are plain strides of the source and never pass
//! through this module on the encode side; parity shares are per-block
//! linear combinations with Cauchy coefficients, so any `required` distinct
//! shares reconstruct the principals.
//!
//! Block length per call is bounded by the encoder's batch size (8192), but
//! nothing here depends on that bound.

use tracing::debug;

use crate::gf256::{self, Gf256};
use crate::{FecFsError, Result};

/// Process-wide coding parameters plus the parity coefficient rows derived
/// from them. Construct once, share behind an `Arc`.
#[derive(Debug)]
pub struct FecCodec {
    required: usize,
    total: usize,
    /// One coefficient row per parity index, `required` entries each
    parity_rows: Vec<Vec<Gf256>>,
}

impl FecCodec {
    /// Create a codec for `required`-of-`total` coding.
    ///
    /// GF(256) limits `total` to 255 shares.
    pub fn new(required: usize, total: usize) -> Result<Self> {
        if required == 0 || required > 255 || total < required || total > 255 {
            return Err(FecFsError::InvalidParameters { required, total });
        }

        // Parity row for share `s` has entries inv(s ^ j): a Cauchy matrix
        // over x_s = s, y_j = j, so every decode submatrix is invertible.
        let parity_rows: Vec<Vec<Gf256>> = (required..total)
            .map(|s| (0..required).map(|j| Gf256((s ^ j) as u8).inv()).collect())
            .collect();

        debug!(required, total, "created codec");
        Ok(Self { required, total, parity_rows })
    }

    /// Shares needed to reconstruct
    pub fn required(&self) -> usize {
        self.required
    }

    /// Total share indices produced
    pub fn total(&self) -> usize {
        self.total
    }

    fn parity_row(&self, index: usize) -> &[Gf256] {
        &self.parity_rows[index - self.required]
    }

    /// Encode one parity block: `out[..len] = sum_j row[index][j] * inputs[j]`.
    ///
    /// `inputs` holds the `required` principal blocks of one batch, each at
    /// least `len` bytes; `index` must be a parity index.
    pub fn encode_share(
        &self,
        out: &mut [u8],
        inputs: &[&[u8]],
        index: usize,
        len: usize,
    ) -> Result<()> {
        if index < self.required || index >= self.total {
            return Err(FecFsError::InvalidShareIndex { index, total: self.total });
        }
        debug_assert_eq!(inputs.len(), self.required);

        let out = &mut out[..len];
        out.fill(0);
        for (input, &coefficient) in inputs.iter().zip(self.parity_row(index)) {
            gf256::addmul_slice(out, &input[..len], coefficient);
        }
        Ok(())
    }

    /// Decode one batch of blocks.
    ///
    /// `inputs[i]` and `indices[i]` are paired and every principal index must
    /// sit at its own position (`indices[i] < required` implies
    /// `indices[i] == i`). For each position holding a parity share the
    /// reconstructed principal block is written to `outputs[i]`; positions
    /// holding principals are left untouched and must not be consulted.
    pub fn decode_blocks(
        &self,
        outputs: &mut [&mut [u8]],
        inputs: &[&[u8]],
        indices: &[usize],
        len: usize,
    ) -> Result<()> {
        let required = self.required;
        debug_assert_eq!(inputs.len(), required);
        debug_assert_eq!(indices.len(), required);

        for (position, &index) in indices.iter().enumerate() {
            if index >= self.total {
                return Err(FecFsError::InvalidShareIndex { index, total: self.total });
            }
            debug_assert!(index >= required || index == position, "indices not normalized");
        }
        if indices.iter().all(|&index| index < required) {
            return Ok(());
        }

        // The received vector is r = D * d with identity rows at principal
        // positions and Cauchy rows at parity positions; d = inv(D) * r.
        let mut matrix = vec![vec![Gf256::ZERO; required]; required];
        for (position, &index) in indices.iter().enumerate() {
            if index < required {
                matrix[position][index] = Gf256::ONE;
            } else {
                matrix[position].copy_from_slice(self.parity_row(index));
            }
        }
        let inverse = gf256::invert_matrix(&matrix).ok_or(FecFsError::SingularMatrix)?;

        for (position, &index) in indices.iter().enumerate() {
            if index < required {
                continue;
            }
            let out = &mut outputs[position][..len];
            out.fill(0);
            for (input, &coefficient) in inputs.iter().zip(&inverse[position]) {
                gf256::addmul_slice(out, &input[..len], coefficient);
            }
        }
        Ok(())
    }
}
