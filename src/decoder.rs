// Copyright 2025 FecFS Developers
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Reconstruction from share files
//!
//! [`ShareDecoder`] opens `required` share files, validates their headers
//! against each other and against the process-wide parameters, and answers
//! random-access plaintext reads: one positioned read per share, index
//! normalization, a single FEC decode, then a modular reinterleave into the
//! caller's window.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::fec::FecCodec;
use crate::file::{OsFile, RandomAccessFile};
use crate::metadata::ShareHeader;
use crate::scratch::{self, DecoderScratch};
use crate::stride;
use crate::{FecFsError, Result};

/// Read-only view of the plaintext reconstructed from `required` shares
pub struct ShareDecoder {
    shares: Vec<Arc<dyn RandomAccessFile>>,
    /// Share index carried by each opened file, parallel to `shares`
    indices: Vec<usize>,
    plaintext_size: u64,
    codec: Arc<FecCodec>,
}

impl std::fmt::Debug for ShareDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareDecoder")
            .field("shares", &self.shares.len())
            .field("indices", &self.indices)
            .field("plaintext_size", &self.plaintext_size)
            .field("codec", &self.codec)
            .finish()
    }
}

impl ShareDecoder {
    /// Open a decoder over share files on disk. More than `required` paths
    /// may be given; only the first `required` are used.
    pub fn open(paths: &[impl AsRef<Path>], codec: Arc<FecCodec>) -> Result<Self> {
        let mut files: Vec<Arc<dyn RandomAccessFile>> = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(Arc::new(OsFile::open(path.as_ref())?));
        }
        Self::new(files, codec)
    }

    /// Build a decoder from already-opened share files.
    pub fn new(mut files: Vec<Arc<dyn RandomAccessFile>>, codec: Arc<FecCodec>) -> Result<Self> {
        let required = codec.required();
        if files.len() < required {
            return Err(FecFsError::InsufficientShares {
                have: files.len(),
                need: required,
            });
        }
        files.truncate(required);

        let mut indices = Vec::with_capacity(required);
        let mut common: Option<(ShareHeader, u64)> = None;
        for file in &files {
            let header = ShareHeader::read_from(file.as_ref())?;
            let encoded_size = file.len()?;

            if usize::from(header.required) != required {
                return Err(FecFsError::InconsistentMetadata { field: "required" });
            }
            if header.excess_bytes >= header.required {
                return Err(FecFsError::InconsistentMetadata { field: "excess bytes" });
            }
            if usize::from(header.share_index) >= codec.total() {
                return Err(FecFsError::InvalidShareIndex {
                    index: header.share_index.into(),
                    total: codec.total(),
                });
            }
            match &common {
                None => common = Some((header, encoded_size)),
                Some((first, first_size)) => {
                    if first.excess_bytes != header.excess_bytes {
                        return Err(FecFsError::InconsistentMetadata { field: "excess bytes" });
                    }
                    if *first_size != encoded_size {
                        return Err(FecFsError::InconsistentMetadata { field: "encoded size" });
                    }
                }
            }
            indices.push(usize::from(header.share_index));
        }
        let Some((header, encoded_size)) = common else {
            return Err(FecFsError::InsufficientShares { have: 0, need: required });
        };

        let plaintext_size = header.decoded_size(encoded_size)?;
        debug!(required, encoded_size, plaintext_size, "opened share decoder");
        Ok(Self {
            shares: files,
            indices,
            plaintext_size,
            codec,
        })
    }

    /// Plaintext size recorded by a single share file, for stat-style callers
    /// that do not want to open a full decoder.
    pub fn plaintext_size_of(file: &dyn RandomAccessFile) -> Result<u64> {
        let header = ShareHeader::read_from(file)?;
        header.decoded_size(file.len()?)
    }

    /// Size of the reconstructed plaintext.
    pub fn size(&self) -> u64 {
        self.plaintext_size
    }

    /// Read plaintext at `offset` into `out`, returning the number of bytes
    /// produced, clamped to the plaintext size.
    pub fn read(&self, out: &mut [u8], offset: u64) -> Result<usize> {
        if out.is_empty() || offset >= self.plaintext_size {
            return Ok(0);
        }
        let required = self.codec.required();
        // One extra payload byte per share covers windows that straddle
        // block boundaries on both ends.
        let bytes_to_read = out.len().div_ceil(required) + 1;
        let share_offset = offset / required as u64 + ShareHeader::LEN as u64;

        scratch::with_decoder(|scratch| {
            let DecoderScratch { reads, work } = scratch;

            reads.resize_with(required, Vec::new);
            let mut min_read = bytes_to_read;
            for (buf, share) in reads.iter_mut().zip(&self.shares) {
                buf.resize(bytes_to_read, 0);
                let n = share.read_at(buf, share_offset)?;
                min_read = min_read.min(n);
            }
            if min_read == 0 {
                return Ok(0);
            }

            let mut inputs: Vec<&[u8]> = reads.iter().map(|buf| &buf[..min_read]).collect();
            let mut indices = self.indices.clone();
            normalize_indices(&mut inputs, &mut indices, required)?;

            work.resize(min_read * required, 0);
            let mut outputs: Vec<&mut [u8]> = work.chunks_mut(min_read).collect();
            self.codec
                .decode_blocks(&mut outputs, &inputs, &indices, min_read)?;

            // Window within the decoded blocks: the first `correction` bytes
            // of the covered region were already served by earlier offsets.
            let correction = (offset % required as u64) as usize;
            let effective = out
                .len()
                .min(min_read * required - correction)
                .min((self.plaintext_size - offset) as usize);

            for i in 0..required {
                let decoded: &[u8] = if indices[i] < required {
                    inputs[i]
                } else {
                    &outputs[i][..]
                };
                let (start, source) = if correction > i {
                    // first byte of this stream precedes the window; skip it
                    // and wrap the target slot around the block
                    (i + required - correction, &decoded[1..])
                } else {
                    (i - correction, decoded)
                };
                if start >= effective {
                    continue;
                }
                stride::copy_to_nth_element(&mut out[start..effective], source, required);
            }
            Ok(effective)
        })
    }
}

/// Rearrange inputs so every principal index sits at its own position, the
/// layout the codec's decode requires. Pairwise swapping terminates because
/// each swap homes one more principal; a requested self-swap means two shares
/// claim the same principal index.
fn normalize_indices(inputs: &mut [&[u8]], indices: &mut [usize], required: usize) -> Result<()> {
    let mut i = 0;
    while i < required {
        let index = indices[i];
        if index < required && index != i {
            if indices[index] == index {
                return Err(FecFsError::MalformedIndices { index });
            }
            indices.swap(i, index);
            inputs.swap(i, index);
        } else {
            i += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::ShareEncoder;
    use crate::file::MemoryFile;
    use crate::metadata;

    /// Encode `contents` at the given share indices, materializing each share
    /// into an in-memory file.
    fn encode_shares(
        contents: &[u8],
        indices: impl IntoIterator<Item = u8>,
        codec: &Arc<FecCodec>,
    ) -> Vec<Arc<dyn RandomAccessFile>> {
        let source: Arc<dyn RandomAccessFile> = Arc::new(MemoryFile::new(contents.to_vec()));
        let encoded_size = metadata::encoded_size(contents.len() as u64, codec.required());
        indices
            .into_iter()
            .map(|index| {
                let encoder =
                    ShareEncoder::new(Arc::clone(&source), index, Arc::clone(codec)).unwrap();
                let mut encoded = vec![0u8; encoded_size as usize];
                assert_eq!(encoder.read(&mut encoded, 0).unwrap(), encoded.len());
                Arc::new(MemoryFile::new(encoded)) as Arc<dyn RandomAccessFile>
            })
            .collect()
    }

    #[test]
    fn test_roundtrip_with_full_sweep() {
        // 16 bytes over 7 chunks, two excess bytes
        let contents = b"1234567abc\n\0abcd";
        let codec = Arc::new(FecCodec::new(7, 20).unwrap());
        let shares = encode_shares(contents, 4..11, &codec);

        let decoder = ShareDecoder::new(shares, Arc::clone(&codec)).unwrap();
        assert_eq!(decoder.size(), contents.len() as u64);

        let mut decoded = vec![0u8; contents.len()];
        assert_eq!(decoder.read(&mut decoded, 0).unwrap(), contents.len());
        assert_eq!(decoded.as_slice(), contents);

        let mut buf = [0u8; 50];
        for offset in 0..20u64 {
            for length in 0..=(50 - offset as usize) {
                let expect = if offset >= contents.len() as u64 {
                    &[] as &[u8]
                } else {
                    let end = contents.len().min(offset as usize + length);
                    &contents[offset as usize..end]
                };
                let got = decoder.read(&mut buf[..length], offset).unwrap();
                assert_eq!(got, expect.len(), "offset={offset} length={length}");
                assert_eq!(&buf[..got], expect, "offset={offset} length={length}");
            }
        }
    }

    #[test]
    fn test_principal_only_subset() {
        let contents = b"principal shares decode without the codec matrix";
        let codec = Arc::new(FecCodec::new(4, 9).unwrap());
        let shares = encode_shares(contents, 0..4, &codec);

        let decoder = ShareDecoder::new(shares, codec).unwrap();
        let mut decoded = vec![0u8; contents.len()];
        assert_eq!(decoder.read(&mut decoded, 0).unwrap(), contents.len());
        assert_eq!(decoded.as_slice(), contents);
    }

    #[test]
    fn test_subset_independence() {
        let contents = b"any subset of required shares must agree";
        let codec = Arc::new(FecCodec::new(3, 10).unwrap());
        let all = encode_shares(contents, 0..10, &codec);

        for subset in [[0usize, 1, 2], [7, 2, 9], [9, 8, 7], [0, 5, 1], [3, 4, 5]] {
            let picked: Vec<_> = subset.iter().map(|&i| Arc::clone(&all[i])).collect();
            let decoder = ShareDecoder::new(picked, Arc::clone(&codec)).unwrap();
            assert_eq!(decoder.size(), contents.len() as u64);

            let mut decoded = vec![0u8; contents.len()];
            assert_eq!(decoder.read(&mut decoded, 0).unwrap(), contents.len());
            assert_eq!(decoded.as_slice(), contents, "subset {subset:?}");
        }
    }

    #[test]
    fn test_read_is_idempotent() {
        let contents = b"same request, same bytes";
        let codec = Arc::new(FecCodec::new(3, 6).unwrap());
        let decoder = ShareDecoder::new(encode_shares(contents, 3..6, &codec), codec).unwrap();

        let mut first = [0u8; 10];
        let mut second = [0u8; 10];
        assert_eq!(decoder.read(&mut first, 5).unwrap(), 10);
        assert_eq!(decoder.read(&mut second, 5).unwrap(), 10);
        assert_eq!(first, second);
        assert_eq!(&first, &contents[5..15]);
    }

    #[test]
    fn test_rejects_insufficient_shares() {
        let contents = b"not enough";
        let codec = Arc::new(FecCodec::new(5, 10).unwrap());
        let shares = encode_shares(contents, 0..4, &codec);
        let err = ShareDecoder::new(shares, codec).unwrap_err();
        assert!(matches!(
            err,
            FecFsError::InsufficientShares { have: 4, need: 5 }
        ));
    }

    #[test]
    fn test_rejects_mismatched_required() {
        let contents = b"different coding parameters";
        let codec3 = Arc::new(FecCodec::new(3, 10).unwrap());
        let shares = encode_shares(contents, 0..3, &codec3);

        let codec4 = Arc::new(FecCodec::new(4, 10).unwrap());
        let mut mixed = shares;
        mixed.extend(encode_shares(contents, 3..4, &codec4));
        // first share seen carries required=3, process-wide codec says 4
        let err = ShareDecoder::new(mixed, codec4).unwrap_err();
        assert!(matches!(
            err,
            FecFsError::InconsistentMetadata { field: "required" }
        ));
    }

    #[test]
    fn test_rejects_size_mismatch() {
        let codec = Arc::new(FecCodec::new(2, 6).unwrap());
        let mut shares = encode_shares(b"0123456789", 0..1, &codec);
        shares.extend(encode_shares(b"01234567", 1..2, &codec));
        let err = ShareDecoder::new(shares, codec).unwrap_err();
        assert!(matches!(
            err,
            FecFsError::InconsistentMetadata { field: "encoded size" }
        ));
    }

    #[test]
    fn test_rejects_truncated_header() {
        let codec = Arc::new(FecCodec::new(2, 4).unwrap());
        let good = encode_shares(b"abcdef", 0..1, &codec);
        let stub: Arc<dyn RandomAccessFile> = Arc::new(MemoryFile::new(vec![2u8]));
        let err = ShareDecoder::new(vec![Arc::clone(&good[0]), stub], codec).unwrap_err();
        assert!(matches!(err, FecFsError::MetadataReadShort { got: 1, .. }));
    }

    #[test]
    fn test_rejects_duplicate_principal_index() {
        let contents = b"duplicate shares cannot decode";
        let codec = Arc::new(FecCodec::new(3, 8).unwrap());
        let shares = encode_shares(contents, [0u8, 1, 1], &codec);
        let decoder = ShareDecoder::new(shares, codec).unwrap();

        let mut buf = [0u8; 8];
        let err = decoder.read(&mut buf, 0).unwrap_err();
        assert!(matches!(err, FecFsError::MalformedIndices { index: 1 }));
    }

    #[test]
    fn test_normalize_indices_homes_principals() {
        let buffers: Vec<Vec<u8>> = (0..7u8).map(|i| vec![i]).collect();
        let mut inputs: Vec<&[u8]> = buffers.iter().map(|b| b.as_slice()).collect();
        let mut indices = vec![4usize, 5, 6, 7, 8, 9, 10];
        normalize_indices(&mut inputs, &mut indices, 7).unwrap();

        assert_eq!(indices, vec![8, 9, 10, 7, 4, 5, 6]);
        // inputs moved in lockstep: position 4 now holds the share that
        // carried index 4
        assert_eq!(inputs[4], &[0u8][..]);
        assert_eq!(inputs[5], &[1u8][..]);
        assert_eq!(inputs[6], &[2u8][..]);
    }

    #[test]
    fn test_zero_length_and_past_eof_reads() {
        let contents = b"window clamping";
        let codec = Arc::new(FecCodec::new(3, 5).unwrap());
        let decoder = ShareDecoder::new(encode_shares(contents, 0..3, &codec), codec).unwrap();

        let mut buf = [0u8; 10];
        assert_eq!(decoder.read(&mut buf[..0], 0).unwrap(), 0);
        assert_eq!(decoder.read(&mut buf, contents.len() as u64).unwrap(), 0);
        assert_eq!(decoder.read(&mut buf, 1_000).unwrap(), 0);
    }

    #[test]
    fn test_plaintext_size_of() {
        let contents = b"stat without opening a decoder";
        let codec = Arc::new(FecCodec::new(4, 8).unwrap());
        let shares = encode_shares(contents, 5..9, &codec);
        assert_eq!(
            ShareDecoder::plaintext_size_of(shares[0].as_ref()).unwrap(),
            contents.len() as u64
        );
    }
}
