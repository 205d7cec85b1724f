use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "treefs",
    about = "Browse or serve a Git reference, or a snapshot of a directory, as a read-only filesystem",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve the tree over HTTP
    Serve(ServeArgs),
    /// List a directory of the tree
    Ls(LsArgs),
    /// Print a file of the tree
    Cat(CatArgs),
    /// Show file information for a path of the tree
    Stat(StatArgs),
}

/// Where the tree comes from.
#[derive(Args)]
pub struct SourceArgs {
    #[command(flatten)]
    pub location: Location,
    /// Reference to read: HEAD, a branch or tag name, or a full refs/ name
    #[arg(long = "ref", value_name = "NAME")]
    pub reference: Option<String>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct Location {
    /// Directory to snapshot into an in-memory repository
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Git repository to read, bare or with a work tree
    #[arg(long)]
    pub repo: Option<PathBuf>,
}

#[derive(Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Address to listen on (overrides the config file)
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// TOML server configuration
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Answer 404 for directories without an index file
    #[arg(long)]
    pub no_listing: bool,
}

#[derive(Args)]
pub struct LsArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[arg(default_value = "/")]
    pub path: String,
}

#[derive(Args)]
pub struct CatArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    pub path: String,
}

#[derive(Args)]
pub struct StatArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    pub path: String,
}
