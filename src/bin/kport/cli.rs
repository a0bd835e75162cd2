//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// kport - close a BSD network stack port over its header and symbol gaps
#[derive(Parser)]
#[command(name = "kport")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Project configuration file (defaults to ./kport.toml)
    #[arg(long, global = true, env = "KPORT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build repeatedly, copying missing headers from the donor tree
    Close(CloseArgs),

    /// Link once and list the donor files defining undefined symbols
    Resolve(ResolveArgs),

    /// Cross-reference definitions between two indexes or trees
    Xref(XrefArgs),

    /// List manifest files that still need stubs
    Stubs(StubsArgs),

    /// Extract the definitions of a source tree
    Index(IndexArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Tree selection shared by `close` and `resolve`.
#[derive(Args)]
pub struct TreeArgs {
    /// Donor tree headers are copied from
    #[arg(long)]
    pub donor: Option<PathBuf>,

    /// Target tree being built
    #[arg(long)]
    pub target: Option<PathBuf>,
}

#[derive(Args)]
pub struct CloseArgs {
    #[command(flatten)]
    pub trees: TreeArgs,

    /// Build command, e.g. `--build-cmd make --build-cmd -k`
    #[arg(long = "build-cmd", value_name = "ARG")]
    pub build_cmd: Vec<String>,

    /// Replay saved build logs, one per pass, instead of running the build
    #[arg(long, value_name = "FILE")]
    pub from_log: Vec<PathBuf>,

    /// Passes without a new header before giving up
    #[arg(long)]
    pub stall_threshold: Option<usize>,

    /// Prefix for copied header file names
    #[arg(long)]
    pub prefix: Option<String>,

    /// Replace differing files that already exist in the target tree
    #[arg(long)]
    pub allow_overwrite: bool,

    /// Do not write the audit log
    #[arg(long)]
    pub no_log: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub trees: TreeArgs,

    /// Link command, e.g. `--link-cmd make --link-cmd link`
    #[arg(long = "link-cmd", value_name = "ARG")]
    pub link_cmd: Vec<String>,

    /// Replay a saved link log instead of linking
    #[arg(long, value_name = "FILE")]
    pub from_log: Option<PathBuf>,

    /// `file symbol` listing to resolve against
    #[arg(long, value_name = "FILE")]
    pub symbols: Option<PathBuf>,

    /// Object globs (relative to the donor tree) to scan with nm
    #[arg(long = "objects", value_name = "GLOB")]
    pub objects: Vec<String>,

    /// Write the manifest to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct XrefArgs {
    /// Reference index listing or source tree (usually the target ecosystem)
    pub reference: PathBuf,

    /// Candidate index listing or source tree (usually the donor)
    pub candidate: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct StubsArgs {
    /// Manifest of every required file
    pub required: PathBuf,

    /// Manifest of files already handled
    pub handled: PathBuf,

    /// Write the remaining manifest to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum IndexFormatArg {
    Triples,
    Json,
}

#[derive(Args)]
pub struct IndexArgs {
    /// Source tree to index
    pub root: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "triples")]
    pub format: IndexFormatArg,

    /// Write the index to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
