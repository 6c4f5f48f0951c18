// Copyright 2025 FecFS Developers
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fecfs::fec::FecCodec;
use fecfs::file::{OsFile, RandomAccessFile};
use fecfs::metadata::ShareHeader;
use fecfs::mirror;

#[derive(Parser)]
#[command(
    name = "fecfs",
    version,
    about = "Erasure-coded mirror trees: split a directory into N share trees, any K of which recover it"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the erasure-coded fan-out of a source tree
    Encode {
        /// Shares needed to reconstruct (K)
        #[arg(short, long)]
        required: usize,
        /// Total shares produced (N)
        #[arg(short, long)]
        shares: usize,
        /// Plaintext tree to encode
        source: PathBuf,
        /// Directory receiving one subdirectory per share
        target: PathBuf,
    },
    /// Reconstruct the plaintext tree from a directory of share trees
    Decode {
        /// Shares needed to reconstruct (K)
        #[arg(short, long)]
        required: usize,
        /// Total shares the fan-out was produced with (N)
        #[arg(short, long)]
        shares: usize,
        /// Directory holding two-hex-digit share trees
        source: PathBuf,
        /// Directory receiving the plaintext tree
        target: PathBuf,
    },
    /// Show the header of a single share file
    Info {
        share: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Commands::Encode { required, shares, source, target } => {
            let codec = Arc::new(FecCodec::new(required, shares)?);
            mirror::encode_tree(&source, &target, &codec)
                .with_context(|| format!("encoding {}", source.display()))?;
        }
        Commands::Decode { required, shares, source, target } => {
            let codec = Arc::new(FecCodec::new(required, shares)?);
            mirror::decode_tree(&source, &target, &codec)
                .with_context(|| format!("decoding {}", source.display()))?;
        }
        Commands::Info { share } => {
            let file = OsFile::open(&share)
                .with_context(|| format!("opening {}", share.display()))?;
            let header = ShareHeader::read_from(&file)?;
            let encoded_size = file.len()?;
            println!("share index:    {}", header.share_index);
            println!("required:       {}", header.required);
            println!("excess bytes:   {}", header.excess_bytes);
            println!("encoded size:   {encoded_size}");
            println!("plaintext size: {}", header.decoded_size(encoded_size)?);
        }
    }
    Ok(())
}
