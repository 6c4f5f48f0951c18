// Copyright 2025 FecFS Developers
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Materializing encoded and decoded trees
//!
//! The CLI drives whole-tree conversions through the same engine a
//! filesystem binding would use: every output file is produced by streaming
//! `read` calls over a bounded window, so arbitrarily large files pass
//! through fixed-size buffers.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::decoder::ShareDecoder;
use crate::encoder::ShareEncoder;
use crate::fec::FecCodec;
use crate::paths;
use crate::{FecFsError, Result};

/// Bytes per `read` call when streaming a virtual file out to disk
const COPY_WINDOW: usize = 64 * 1024;

/// Materialize the encoded fan-out of `source` under `target`: one
/// two-hex-digit tree per share index, each mirroring the source tree.
pub fn encode_tree(source: &Path, target: &Path, codec: &Arc<FecCodec>) -> Result<()> {
    for index in 0..codec.total() {
        let share_root = target.join(paths::share_dir_name(index as u8));
        info!(index, root = %share_root.display(), "writing share tree");
        encode_dir(source, &share_root, index as u8, codec)?;
    }
    Ok(())
}

fn encode_dir(source: &Path, target: &Path, index: u8, codec: &Arc<FecCodec>) -> Result<()> {
    fs::create_dir_all(target)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let out_path = target.join(entry.file_name());
        let kind = entry.file_type()?;
        if kind.is_dir() {
            encode_dir(&path, &out_path, index, codec)?;
        } else if kind.is_file() {
            let encoder = ShareEncoder::open(&path, index, Arc::clone(codec))?;
            debug!(path = %path.display(), size = encoder.size()?, "encoding");
            write_stream(&out_path, |buf, offset| encoder.read(buf, offset))?;
        } else {
            warn!(path = %path.display(), "skipping special file");
        }
    }
    Ok(())
}

/// Reconstruct the plaintext tree of the share fan-out at `source` under
/// `target`. `source` holds one two-hex-digit directory per available share.
pub fn decode_tree(source: &Path, target: &Path, codec: &Arc<FecCodec>) -> Result<()> {
    let mut dirs = BTreeSet::new();
    let mut files = BTreeSet::new();
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if paths::parse_share_dir_name(name).is_none() {
            continue;
        }
        if entry.file_type()?.is_dir() {
            collect_relative(&entry.path(), Path::new(""), &mut dirs, &mut files)?;
        }
    }

    fs::create_dir_all(target)?;
    for dir in &dirs {
        fs::create_dir_all(target.join(dir))?;
    }

    let required = codec.required();
    for relative in &files {
        let shares = paths::locate_shares(source, relative, required)?;
        if shares.len() < required {
            warn!(path = %relative.display(), have = shares.len(), "not enough shares");
            return Err(FecFsError::InsufficientShares {
                have: shares.len(),
                need: required,
            });
        }
        let decoder = ShareDecoder::open(&shares, Arc::clone(codec))?;
        debug!(path = %relative.display(), size = decoder.size(), "reconstructing");
        write_stream(&target.join(relative), |buf, offset| decoder.read(buf, offset))?;
    }
    Ok(())
}

/// Union of relative paths over one share tree
fn collect_relative(
    root: &Path,
    prefix: &Path,
    dirs: &mut BTreeSet<PathBuf>,
    files: &mut BTreeSet<PathBuf>,
) -> Result<()> {
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let relative = prefix.join(entry.file_name());
        let kind = entry.file_type()?;
        if kind.is_dir() {
            dirs.insert(relative.clone());
            collect_relative(&entry.path(), &relative, dirs, files)?;
        } else if kind.is_file() {
            files.insert(relative);
        }
    }
    Ok(())
}

/// Stream a virtual file to `path` through a bounded window.
fn write_stream(path: &Path, mut read: impl FnMut(&mut [u8], u64) -> Result<usize>) -> Result<()> {
    let mut out = fs::File::create(path)?;
    let mut buf = vec![0u8; COPY_WINDOW];
    let mut offset = 0u64;
    loop {
        let n = read(&mut buf, offset)?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
        offset += n as u64;
    }
    Ok(())
}
