//! Command-line argument surface (interface to the core, not part of it).

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "covmap",
    about = "Normalize coverage reports and rank risk hotspots",
    version
)]
pub struct Args {
    /// Report files to ingest (any supported format, mixed freely)
    #[arg(short, long = "report", required = true, num_args = 1..)]
    pub reports: Vec<PathBuf>,

    /// Directories to search when a report omits source positions
    #[arg(short, long = "source-dir")]
    pub source_dirs: Vec<PathBuf>,

    /// Assembly filters, e.g. +libcalc* or -*test*
    #[arg(long = "assembly-filter", allow_hyphen_values = true)]
    pub assembly_filters: Vec<String>,

    /// Class filters, same syntax as assembly filters
    #[arg(long = "class-filter", allow_hyphen_values = true)]
    pub class_filters: Vec<String>,

    /// File filters, matched against source paths
    #[arg(long = "file-filter", allow_hyphen_values = true)]
    pub file_filters: Vec<String>,

    /// Maximum number of ranked hotspots (overrides covmap.toml)
    #[arg(long)]
    pub hotspots: Option<usize>,

    /// Write the JSON summary here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Increase log verbosity (-v: info, -vv: debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
