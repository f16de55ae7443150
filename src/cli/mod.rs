//! CLI definitions and entry point.

use crate::config::CliOverrides;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Issue report tracker backend (`SQLite` + HTTP/JSON)
#[derive(Parser, Debug)]
#[command(name = "issue-tracker", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./issue-tracker.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs and errors as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),

    /// Print the resolved configuration as JSON
    Config(StorageArgs),

    /// Create the database schema and attachments directory
    Init(StorageArgs),
}

/// Settings shared by every command that touches storage.
#[derive(Args, Debug, Clone, Default)]
pub struct StorageArgs {
    /// Database path
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Directory attachment files are stored under
    #[arg(long)]
    pub attachments_dir: Option<PathBuf>,

    /// `SQLite` busy timeout in ms
    #[arg(long)]
    pub lock_timeout: Option<u64>,
}

impl StorageArgs {
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            db: self.db.clone(),
            bind: None,
            attachments_dir: self.attachments_dir.clone(),
            lock_timeout: self.lock_timeout,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(long)]
    pub bind: Option<String>,

    #[command(flatten)]
    pub storage: StorageArgs,
}

impl ServeArgs {
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            bind: self.bind.clone(),
            ..self.storage.overrides()
        }
    }
}
