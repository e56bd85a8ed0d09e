use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "webextract", version)]
#[command(about = "Collects per-tenant web data usage from remote access logs", long_about = None)]
pub struct Cli {
    /// TOML config file (default: ./webextract.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Bucket width in minutes
    #[arg(short = 'i', long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    pub interval: Option<u32>,

    #[arg(short = 'd', long, global = true)]
    pub database: Option<PathBuf>,

    /// Local scratch file the fetched logs are concatenated into
    #[arg(long, global = true)]
    pub working_file: Option<PathBuf>,

    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Collect, aggregate and store usage for every registered host (default)
    Run,
    /// Register a host and its log directories
    AddHost(AddHostArgs),
    /// Print stored usage rows
    Usage(UsageArgs),
}

#[derive(Debug, Args)]
pub struct AddHostArgs {
    #[arg(long)]
    pub host: String,

    #[arg(long)]
    pub user: String,

    #[arg(long, conflicts_with = "key_file")]
    pub password: Option<String>,

    #[arg(long)]
    pub key_file: Option<PathBuf>,

    /// Directory holding the access logs; repeat for several
    #[arg(long = "dir", required = true)]
    pub directories: Vec<String>,
}

#[derive(Debug, Args)]
pub struct UsageArgs {
    #[arg(long)]
    pub tenant: Option<i64>,
}
