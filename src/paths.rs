// Copyright 2025 FecFS Developers
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Share path grammar
//!
//! Encoder-side virtual paths name the share in their first component as two
//! lowercase hex digits: `/<xx>[/rest]`. Decoder-side source directories hold
//! one such subdirectory per available share, each mirroring the plaintext
//! tree.

use std::path::{Path, PathBuf};

use crate::{FecFsError, Result};

/// Directory name of a share index: two lowercase hex digits.
pub fn share_dir_name(index: u8) -> String {
    hex::encode([index])
}

/// Parse a two-lowercase-hex-digit share directory name.
pub fn parse_share_dir_name(name: &str) -> Option<u8> {
    if name.len() != 2 || name.bytes().any(|b| b.is_ascii_uppercase()) {
        return None;
    }
    hex::decode(name).ok().map(|bytes| bytes[0])
}

/// Split an encoder-side virtual path `/<xx>[/rest]` into the share index and
/// the path relative to the source root. Returns `None` for the root itself.
pub fn split_virtual_path(path: &str) -> Result<Option<(u8, PathBuf)>> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Ok(None);
    }
    let (first, rest) = match trimmed.split_once('/') {
        Some((first, rest)) => (first, rest),
        None => (trimmed, ""),
    };
    let index = parse_share_dir_name(first)
        .ok_or_else(|| FecFsError::InvalidSharePath(path.to_string()))?;
    Ok(Some((index, PathBuf::from(rest))))
}

/// Locate share files carrying `relative` under `root`, scanning share
/// directories in index order and stopping after `want` matches.
pub fn locate_shares(root: &Path, relative: &Path, want: usize) -> Result<Vec<PathBuf>> {
    let mut dirs: Vec<(u8, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(index) = parse_share_dir_name(name) {
            dirs.push((index, entry.path()));
        }
    }
    dirs.sort_by_key(|(index, _)| *index);

    let mut found = Vec::new();
    for (_, dir) in dirs {
        let candidate = dir.join(relative);
        if candidate.is_file() {
            found.push(candidate);
            if found.len() == want {
                break;
            }
        }
    }
    Ok(found)
}
