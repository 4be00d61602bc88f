//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use harvester_core::HarvestConfig;

/// Collect a paginated document catalog and download the referenced files.
///
/// `collect` walks the catalog's search results and writes a listing plus a
/// JSON record file; `download` fetches every recorded document; `run` does
/// both in sequence.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// JSON configuration file; absent fields keep their defaults
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for the record artifacts and raw page captures
    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory downloaded documents are written to
    #[arg(long, global = true, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Attempts per page fetch and per document (1-10)
    #[arg(short = 'r', long, global = true, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_retries: Option<u32>,

    /// Page ceiling applied alongside the catalog's own page count (1-1000)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub max_pages: Option<u32>,

    /// Disable all pacing and retry delays
    #[arg(long, global = true)]
    pub no_delay: bool,

    /// Disable the byte progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Stage to run
    #[command(subcommand)]
    pub command: Command,
}

/// Pipeline stages.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Collect catalog records and write the listing and JSON artifacts
    Collect,
    /// Download every document in the JSON artifact
    Download,
    /// Collect, then download
    Run,
}

impl Args {
    /// Applies command-line overrides on top of a loaded configuration.
    #[must_use]
    pub fn apply_overrides(&self, mut config: HarvestConfig) -> HarvestConfig {
        if let Some(dir) = &self.output_dir {
            config.storage.output_dir.clone_from(dir);
        }
        if let Some(dir) = &self.download_dir {
            config.storage.download_dir.clone_from(dir);
        }
        if let Some(attempts) = self.max_retries {
            config.collect.max_attempts = attempts;
            config.download.max_retries = attempts;
        }
        if let Some(pages) = self.max_pages {
            config.collect.hard_max_pages = pages;
        }
        if self.no_progress {
            config.download.show_progress = false;
        }
        if self.no_delay {
            config = config.without_delays();
        }
        config
    }
}
