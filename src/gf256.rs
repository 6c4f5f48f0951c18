// Copyright 2025 FecFS Developers
// SPDX-License-Identifier: AGPL-3.0-or-later

//! GF(2^8) arithmetic for Reed-Solomon coding
//!
//! All tables are generated at compile time over the polynomial
//! `x^8 + x^4 + x^3 + x^2 + 1` (0x11d). The hot path is
//! [`addmul_slice`], a fused multiply-accumulate over whole blocks that
//! both the encode and decode matrix products reduce to.

/// A single field element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gf256(pub u8);

const GF_POLY: u32 = 0x11d;

const fn build_exp_log() -> ([u8; 512], [u8; 256]) {
    let mut exp = [0u8; 512];
    let mut log = [0u8; 256];
    let mut x: u32 = 1;
    let mut i = 0;
    while i < 255 {
        exp[i] = x as u8;
        exp[i + 255] = x as u8;
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= GF_POLY;
        }
        i += 1;
    }
    (exp, log)
}

const EXP_LOG: ([u8; 512], [u8; 256]) = build_exp_log();
const EXP: [u8; 512] = EXP_LOG.0;
const LOG: [u8; 256] = EXP_LOG.1;

const fn build_mul() -> [[u8; 256]; 256] {
    let mut table = [[0u8; 256]; 256];
    let mut a = 1;
    while a < 256 {
        let mut b = 1;
        while b < 256 {
            table[a][b] = EXP[LOG[a] as usize + LOG[b] as usize];
            b += 1;
        }
        a += 1;
    }
    table
}

static MUL: [[u8; 256]; 256] = build_mul();

const fn build_inv() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut a = 1;
    while a < 256 {
        table[a] = EXP[255 - LOG[a] as usize];
        a += 1;
    }
    table
}

static INV: [u8; 256] = build_inv();

impl Gf256 {
    pub const ZERO: Gf256 = Gf256(0);
    pub const ONE: Gf256 = Gf256(1);

    /// Multiplicative inverse. The inverse of zero is undefined and maps to
    /// zero; callers must only invert nonzero elements.
    pub fn inv(self) -> Gf256 {
        Gf256(INV[self.0 as usize])
    }
}

impl std::ops::Add for Gf256 {
    type Output = Gf256;

    fn add(self, other: Gf256) -> Gf256 {
        Gf256(self.0 ^ other.0)
    }
}

impl std::ops::Mul for Gf256 {
    type Output = Gf256;

    fn mul(self, other: Gf256) -> Gf256 {
        Gf256(MUL[self.0 as usize][other.0 as usize])
    }
}

/// `dst ^= src`, elementwise
pub fn add_slice(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= *s;
    }
}

/// `dst ^= c * src`, elementwise
pub fn addmul_slice(dst: &mut [u8], src: &[u8], c: Gf256) {
    if c.0 == 0 {
        return;
    }
    if c.0 == 1 {
        add_slice(dst, src);
        return;
    }
    let row = &MUL[c.0 as usize];
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= row[*s as usize];
    }
}

/// Invert a square matrix by Gauss-Jordan elimination. Returns `None` when
/// the matrix is singular.
pub fn invert_matrix(matrix: &[Vec<Gf256>]) -> Option<Vec<Vec<Gf256>>> {
    let n = matrix.len();
    let mut work: Vec<Vec<Gf256>> = matrix.to_vec();
    let mut inverse: Vec<Vec<Gf256>> = (0..n)
        .map(|i| {
            let mut row = vec![Gf256::ZERO; n];
            row[i] = Gf256::ONE;
            row
        })
        .collect();

    for col in 0..n {
        let pivot = (col..n).find(|&row| work[row][col].0 != 0)?;
        work.swap(col, pivot);
        inverse.swap(col, pivot);

        let scale = work[col][col].inv();
        for value in work[col].iter_mut() {
            *value = *value * scale;
        }
        for value in inverse[col].iter_mut() {
            *value = *value * scale;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = work[row][col];
            if factor.0 == 0 {
                continue;
            }
            for j in 0..n {
                work[row][j] = work[row][j] + work[col][j] * factor;
                inverse[row][j] = inverse[row][j] + inverse[col][j] * factor;
            }
        }
    }

    Some(inverse)
}
