//! soextract - pick and durably extract native libraries
//!
//! Thin command-line front end over the `soextract` library.

use anyhow::{Context, Result};
use clap::Parser;
use soextract::backends::LocalFileSystem;
use soextract::blob::{DependencyBlob, FixedVersion};
use soextract::cli::{Args, Command, ExtractConfig};
use soextract::prealloc::{Fallocate, NoFallocate, PlatformFallocate};
use soextract::{host, DurableFileOps, Extractor};
use std::fs::File;
use tracing::{debug, info};

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_max_level(args.output.log_level())
        .with_writer(std::io::stderr)
        .init();

    args.validate()?;
    debug!("arguments: {:?}", args);

    match &args.command {
        Command::Abis { host: overrides } => {
            let supported = host::detect(&overrides.abis).supported_abis();
            for abi in supported.iter() {
                println!("{abi}");
            }
        }
        Command::Rank {
            candidates,
            host: overrides,
        } => {
            let supported = host::detect(&overrides.abis).supported_abis();
            let ranked = supported.rank(candidates.iter().cloned());
            if ranked.is_empty() {
                anyhow::bail!("No candidate matches a supported ABI");
            }
            for (abi, path) in ranked {
                println!("{abi}\t{}", path.display());
            }
        }
        Command::Extract(extract) => {
            if extract.io.no_preallocate {
                run_extract(extract, NoFallocate)?;
            } else {
                run_extract(extract, PlatformFallocate::default())?;
            }
        }
        Command::Fsync { path } => {
            DurableFileOps::local()
                .recursive_fsync(path)
                .with_context(|| format!("Failed to fsync {}", path.display()))?;
            info!("synced {}", path.display());
        }
        Command::Delete { path } => {
            DurableFileOps::local()
                .recursive_delete(path)
                .with_context(|| format!("Failed to delete {}", path.display()))?;
            info!("deleted {}", path.display());
        }
        Command::DepBlock { path, version_code } => {
            let blob = DependencyBlob::for_file(path, &FixedVersion(*version_code))?;
            let hex: String = blob.encode()?.iter().map(|b| format!("{b:02x}")).collect();
            println!("{hex}");
        }
    }

    Ok(())
}

fn run_extract<P: Fallocate>(config: &ExtractConfig, fallocate: P) -> Result<()> {
    let name = config.file_name()?;
    let mut source = File::open(&config.source)
        .with_context(|| format!("Failed to open {}", config.source.display()))?;
    let source_len = source
        .metadata()
        .with_context(|| format!("Failed to stat {}", config.source.display()))?
        .len();
    let expected = config.limit.map_or(source_len, |limit| limit.min(source_len));

    let extractor = Extractor::new(DurableFileOps::new(LocalFileSystem::new(), fallocate))
        .with_buffer_size(config.io.buffer_size_bytes());
    let path = extractor
        .extract(&mut source, expected, &config.dest, &name)
        .with_context(|| format!("Failed to extract {}", config.source.display()))?;

    println!("{}", path.display());
    Ok(())
}
