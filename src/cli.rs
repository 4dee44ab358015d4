//! Command-line interface definitions
//!
//! Arguments are grouped by the component that consumes them: host ABI
//! overrides, copy I/O settings, and output/logging.

use crate::extract::is_plain_file_name;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pick and durably extract native libraries for this host
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Operation to run
    #[command(subcommand)]
    pub command: Command,

    /// Output and logging configuration
    #[command(flatten)]
    pub output: OutputConfig,
}

/// Operations exposed by the binary
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the ABIs this host supports, most preferred first
    Abis {
        /// Host ABI overrides
        #[command(flatten)]
        host: HostConfig,
    },

    /// Order ABI-tagged library candidates by host preference
    Rank {
        /// Candidate as ABI=PATH; repeat for each variant
        #[arg(long = "candidate", value_name = "ABI=PATH", required = true, value_parser = parse_candidate)]
        candidates: Vec<(String, PathBuf)>,

        /// Host ABI overrides
        #[command(flatten)]
        host: HostConfig,
    },

    /// Copy a library into a directory and fsync it
    Extract(ExtractConfig),

    /// Recursively fsync a file or directory, skipping lock files
    Fsync {
        /// File or directory to flush
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Recursively delete a file or directory
    Delete {
        /// File or directory to remove
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Print the dependency blob for a container file
    DepBlock {
        /// Container file to fingerprint
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Application version counter to record
        #[arg(long, default_value = "0")]
        version_code: i32,
    },
}

// ============================================================================
// FUNCTIONAL GROUPS: Organized by what component consumes them
// ============================================================================

/// Host ABI configuration
///
/// Used by: `host::detect()`
#[derive(clap::Args, Debug, Clone, Default)]
#[command(next_help_heading = "Host Options")]
pub struct HostConfig {
    /// Treat the host as supporting exactly these ABIs (repeatable)
    ///
    /// The list is reordered so the family matching this process's bitness
    /// comes first.
    #[arg(long = "abi", value_name = "ABI")]
    pub abis: Vec<String>,
}

/// Extraction configuration
///
/// Used by: `Extractor::extract()`
#[derive(clap::Args, Debug, Clone)]
pub struct ExtractConfig {
    /// Library file to copy
    #[arg(long, value_name = "FILE")]
    pub source: PathBuf,

    /// Directory to place the library in
    #[arg(long, value_name = "DIR")]
    pub dest: PathBuf,

    /// File name inside DIR (default: the source file name)
    #[arg(long)]
    pub name: Option<String>,

    /// Copy at most this many bytes (default: the source size)
    #[arg(long, value_name = "BYTES")]
    pub limit: Option<u64>,

    /// Copy I/O configuration
    #[command(flatten)]
    pub io: IoConfig,
}

/// Copy I/O configuration
///
/// Used by: `Extractor::with_buffer_size()`, `DurableFileOps::preallocate()`
#[derive(clap::Args, Debug, Clone, Default)]
#[command(next_help_heading = "I/O Options")]
pub struct IoConfig {
    /// Buffer size in KB (0 = default, 64KB)
    #[arg(long, default_value = "0")]
    pub buffer_size_kb: usize,

    /// Skip disk space preallocation
    #[arg(long)]
    pub no_preallocate: bool,
}

/// Output and logging configuration
///
/// Used by: `main()`, logging initialization
#[derive(clap::Args, Debug, Clone, Default)]
#[command(next_help_heading = "Output Options")]
pub struct OutputConfig {
    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl OutputConfig {
    /// Log level implied by `--quiet` and the `-v` count
    #[must_use]
    pub const fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

impl IoConfig {
    /// Buffer size in bytes; zero means "use the default"
    #[must_use]
    pub const fn buffer_size_bytes(&self) -> usize {
        self.buffer_size_kb * 1024
    }
}

impl ExtractConfig {
    /// File name the library gets inside the destination directory
    ///
    /// # Errors
    ///
    /// Returns an error if no name was given and the source has none.
    pub fn file_name(&self) -> Result<String> {
        if let Some(name) = &self.name {
            return Ok(name.clone());
        }
        self.source
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Cannot derive a file name from {}; pass --name",
                    self.source.display()
                )
            })
    }
}

// ============================================================================
// IMPLEMENTATION: Validation
// ============================================================================

impl Args {
    /// Validate command-line arguments
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - Both --quiet and --verbose options are used
    /// - The extraction source is missing or not a regular file
    /// - The extraction name is empty or contains a path separator
    /// - The buffer size is too large (>1GB)
    pub fn validate(&self) -> Result<()> {
        if self.output.quiet && self.output.verbose > 0 {
            anyhow::bail!("Cannot use both --quiet and --verbose options");
        }

        if let Command::Extract(extract) = &self.command {
            if !extract.source.is_file() {
                anyhow::bail!(
                    "Source must be an existing file: {}",
                    extract.source.display()
                );
            }

            let name = extract.file_name()?;
            if !is_plain_file_name(&name) {
                anyhow::bail!("Library name must be a plain file name, got: {name:?}");
            }

            if extract.io.buffer_size_kb > 1024 * 1024 {
                anyhow::bail!(
                    "Buffer size too large (max 1GB): {} KB",
                    extract.io.buffer_size_kb
                );
            }
        }

        Ok(())
    }
}

/// Parse an `ABI=PATH` candidate
fn parse_candidate(raw: &str) -> std::result::Result<(String, PathBuf), String> {
    match raw.split_once('=') {
        Some((abi, path)) if !abi.is_empty() && !path.is_empty() => {
            Ok((abi.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected ABI=PATH, got {raw:?}")),
    }
}
