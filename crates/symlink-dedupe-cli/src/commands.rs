use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "symlink-dedupe")]
#[command(about = "Run npm dedupe across linked modules", long_about = None)]
pub struct Cli {
    /// Package directory containing the module directory (defaults to the current directory)
    #[arg(short, long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Stage linked modules, dedupe, and restore the links (default)
    Run,
    /// List linked modules and the links that would be restored
    List,
    /// Report whether an earlier run left the module directory staged
    Status,
    /// Print configuration values
    PrintConfig,
}
