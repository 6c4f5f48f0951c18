// Copyright 2025 FecFS Developers
// SPDX-License-Identifier: AGPL-3.0-or-later

//! On-demand share encoding
//!
//! [`ShareEncoder`] answers random-access reads over the virtual share file
//! of one source file at one share index: the 3-byte header first, then
//! payload produced in batches of [`TRANSFORM_BATCH`] coding blocks.
//! Principal shares are strided copies of the source; parity shares run each
//! batch through the Reed-Solomon codec. Reads are stateless apart from the
//! memoized source size, so the kernel may issue them concurrently.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::fec::FecCodec;
use crate::file::{OsFile, RandomAccessFile};
use crate::metadata::{self, ShareHeader};
use crate::scratch;
use crate::stride;
use crate::{FecFsError, Result};

/// Coding blocks per payload batch. The codec sees at most this many bytes
/// per block, which keeps each FEC call within its recommended block bound.
pub const TRANSFORM_BATCH: usize = 8192;

/// Read-only view of one share of one source file
pub struct ShareEncoder {
    file: Arc<dyn RandomAccessFile>,
    share_index: u8,
    codec: Arc<FecCodec>,
    /// Probed on first use, then fixed for the lifetime of the open
    original_size: Mutex<Option<u64>>,
}

impl ShareEncoder {
    /// Wrap an already-opened source file.
    pub fn new(
        file: Arc<dyn RandomAccessFile>,
        share_index: u8,
        codec: Arc<FecCodec>,
    ) -> Result<Self> {
        if usize::from(share_index) >= codec.total() {
            return Err(FecFsError::InvalidShareIndex {
                index: share_index.into(),
                total: codec.total(),
            });
        }
        Ok(Self {
            file,
            share_index,
            codec,
            original_size: Mutex::new(None),
        })
    }

    /// Open a source file from the filesystem.
    pub fn open(path: &Path, share_index: u8, codec: Arc<FecCodec>) -> Result<Self> {
        let file = OsFile::open(path)?;
        Self::new(Arc::new(file), share_index, codec)
    }

    /// Size of the virtual share file.
    pub fn size(&self) -> Result<u64> {
        Ok(metadata::encoded_size(
            self.original_size()?,
            self.codec.required(),
        ))
    }

    /// Read the virtual share at `offset` into `out`, returning the number
    /// of bytes produced. Short only at the end of the share.
    pub fn read(&self, out: &mut [u8], offset: u64) -> Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        let required = self.codec.required();

        let mut filled = self.fill_header(out, offset)?;
        while filled < out.len() {
            let payload_offset = offset + filled as u64 - ShareHeader::LEN as u64;
            let batch = (out.len() - filled).min(TRANSFORM_BATCH * required);
            let produced = match self.fill_payload(&mut out[filled..filled + batch], payload_offset)
            {
                Ok(produced) => produced,
                // bytes already emitted this call are returned as a short read
                Err(err) if filled > 0 => {
                    warn!(%err, offset, filled, "payload batch failed, short read");
                    break;
                }
                Err(err) => return Err(err),
            };
            if produced == 0 {
                break;
            }
            filled += produced;
        }
        Ok(filled)
    }

    /// Emit the part of the header covered by the read window. The same call
    /// continues into the payload phase, so a window straddling the header
    /// boundary is served atomically.
    fn fill_header(&self, out: &mut [u8], offset: u64) -> Result<usize> {
        if offset >= ShareHeader::LEN as u64 {
            return Ok(0);
        }
        let header = ShareHeader::new(
            self.codec.required() as u8,
            self.share_index,
            self.original_size()?,
        );
        let bytes = header.to_bytes();
        let tail = &bytes[offset as usize..];
        let n = tail.len().min(out.len());
        out[..n].copy_from_slice(&tail[..n]);
        Ok(n)
    }

    /// Produce up to `out.len()` payload bytes starting at `payload_offset`
    /// payload coordinates. Returns 0 at the end of the source file.
    fn fill_payload(&self, out: &mut [u8], payload_offset: u64) -> Result<usize> {
        let required = self.codec.required();
        scratch::with_encoder(|scratch| {
            scratch.read.resize(out.len() * required, 0);
            let mut size_read = self
                .file
                .read_at(&mut scratch.read, payload_offset * required as u64)?;
            if size_read == 0 {
                return Ok(0);
            }
            size_read = self.adjust_data_size(&mut scratch.read, size_read, payload_offset)?;
            let block_count = size_read / required;
            if block_count == 0 {
                return Ok(0);
            }

            let index = usize::from(self.share_index);
            if index < required {
                // Principal share: a plain stride of the source.
                stride::copy_nth_element(out, &scratch.read[index..size_read], required);
            } else {
                // Parity share: transpose the batch into `required` contiguous
                // blocks and run the codec over them.
                scratch.work.resize(size_read, 0);
                stride::distribute(&mut scratch.work, &scratch.read[..size_read], required);
                let inputs: Vec<&[u8]> = scratch.work.chunks(block_count).collect();
                self.codec.encode_share(out, &inputs, index, block_count)?;
            }
            Ok(block_count)
        })
    }

    /// EOF and alignment policy for a batch read: a short read mid-file is
    /// trimmed to whole coding blocks (the next batch re-reads the tail); a
    /// short read at EOF zero-pads the final partial block.
    fn adjust_data_size(
        &self,
        read_buf: &mut [u8],
        size_read: usize,
        payload_offset: u64,
    ) -> Result<usize> {
        let required = self.codec.required();
        let excess = size_read % required;
        if excess == 0 {
            return Ok(size_read);
        }
        if payload_offset * required as u64 + (size_read as u64) < self.original_size()? {
            Ok(size_read - excess)
        } else {
            let padded = size_read + (required - excess);
            read_buf[size_read..padded].fill(0);
            Ok(padded)
        }
    }

    /// Source size, probed once per open and memoized.
    fn original_size(&self) -> Result<u64> {
        let mut cached = self.original_size.lock();
        match *cached {
            Some(size) => Ok(size),
            None => {
                let size = self.file.len()?;
                *cached = Some(size);
                Ok(size)
            }
        }
    }
}
