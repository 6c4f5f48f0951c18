// Copyright 2025 FecFS Developers
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # fecfs - erasure-coded filesystem views
//!
//! This crate implements the read path of a virtual, read-only filesystem that
//! mirrors a source directory tree as a Reed-Solomon share fan-out. In encoder
//! mode a source tree is exposed as `total` share trees, any `required` of
//! which suffice to reconstruct it; in decoder mode a collection of share
//! trees is exposed as the reconstructed plaintext tree.
//!
//! ## Features
//! - Systematic GF(256) coding: principal shares carry plain strides of the
//!   source, parity shares carry per-block linear combinations
//! - Random-access reads: any `(offset, length)` window of a virtual file is
//!   computed on demand, without materializing whole files
//! - A compact 3-byte share header that round-trips the original file size
//! - Concurrency-safe read paths with per-thread scratch buffers

use std::io;
use thiserror::Error;

pub mod decoder;
pub mod encoder;
pub mod fec;
pub mod file;
pub mod gf256;
pub mod metadata;
pub mod mirror;
pub mod paths;
mod scratch;
pub mod stride;

pub use decoder::ShareDecoder;
pub use encoder::ShareEncoder;
pub use fec::FecCodec;
pub use metadata::ShareHeader;

/// Errors that can occur while encoding or decoding share files
#[derive(Debug, Error)]
pub enum FecFsError {
    #[error("invalid coding parameters: required={required}, total={total}")]
    InvalidParameters { required: usize, total: usize },

    #[error("share index out of bounds: {index} >= {total}")]
    InvalidShareIndex { index: usize, total: usize },

    #[error("insufficient shares for reconstruction: have {have}, need {need}")]
    InsufficientShares { have: usize, need: usize },

    #[error("share files disagree on {field}")]
    InconsistentMetadata { field: &'static str },

    #[error("share header truncated: got {got} of {expected} bytes")]
    MetadataReadShort { got: usize, expected: usize },

    #[error("two shares carry the same principal index {index}")]
    MalformedIndices { index: usize },

    #[error("decode matrix is not invertible")]
    SingularMatrix,

    #[error("not a share path: {0}")]
    InvalidSharePath(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, FecFsError>;
