use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use unitload_core::{LoadMode, ManifestFormat};

#[derive(Parser)]
#[command(
    name = "unitload",
    version,
    about = "Ordered, bounded-concurrency loading of manifest-driven script units"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Dry-run a load session and print the insertion order
    Plan(PlanArgs),
    /// Resolve a manifest and print its identifiers
    Manifest(ManifestArgs),
    Version,
}

/// Where the manifest and units come from.
///
/// Unset flags fall back to the `UNITLOAD_*` environment variables.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Manifest location, relative to the base URL or root
    #[arg(long)]
    pub manifest: Option<String>,

    /// Base URL units are fetched from
    #[arg(long, conflicts_with = "root")]
    pub base_url: Option<String>,

    /// Read units from this directory instead of over HTTP
    #[arg(long)]
    pub root: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = FormatArg::Auto)]
    pub format: FormatArg,

    /// Strip this prefix from every manifest entry
    #[arg(long)]
    pub strip_prefix: Option<String>,

    /// Prepend this prefix to every manifest entry (after stripping)
    #[arg(long)]
    pub prepend: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Maximum outstanding loads
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Print the load report and insertion events as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ManifestArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Print identifiers as a JSON array
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Buffered,
    Streaming,
    Append,
    Harness,
}

impl From<ModeArg> for LoadMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Buffered => LoadMode::Buffered,
            ModeArg::Streaming => LoadMode::Streaming,
            ModeArg::Append => LoadMode::SequentialAppend,
            ModeArg::Harness => LoadMode::TestHarness,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Auto,
    Json,
    Text,
}

impl From<FormatArg> for ManifestFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Auto => ManifestFormat::Auto,
            FormatArg::Json => ManifestFormat::Json,
            FormatArg::Text => ManifestFormat::Text,
        }
    }
}
