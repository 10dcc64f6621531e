//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "sharecopy")]
#[command(about = "Copy a file or directory tree onto a remote share")]
#[command(version)]
pub struct Cli {
    /// Local file or directory to copy
    #[arg(short, long)]
    pub source: PathBuf,

    /// Server name or address
    #[arg(short = 'r', long)]
    pub server: String,

    /// Share (tree) name on the server
    #[arg(short, long)]
    pub tree: String,

    /// Destination directory inside the share
    #[arg(short, long)]
    pub destination: String,

    /// Authentication domain
    #[arg(short = 'n', long)]
    pub domain: String,

    /// Username (anonymous when omitted)
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password
    #[arg(short, long, env = "SHARECOPY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Skip files that already exist on the server
    #[arg(short = 'k', long)]
    pub skip_existing: bool,

    /// Directory the share servers are mounted under
    #[arg(long)]
    pub mount_root: Option<PathBuf>,

    /// Configuration file (defaults to ~/.config/sharecopy/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
