//! Command-line and environment configuration.

use std::path::PathBuf;
use clap::{Args, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Which store backs the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// JSON files under the data directory
    Json,
    /// SQLite database (requires the `sqlite` feature)
    Sqlite,
}

/// Storage settings shared by every command.
#[derive(Debug, Clone, Args)]
pub struct StoreConfig {
    /// Directory holding the JSON store
    #[arg(long, global = true, env = "PATHWAY_DATA_DIR", default_value = ".pathways")]
    pub data_dir: PathBuf,

    /// Storage backend
    #[arg(long, global = true, env = "PATHWAY_BACKEND", value_enum, default_value = "json")]
    pub backend: Backend,

    /// Database URL for the SQLite backend
    #[arg(long, global = true, env = "PATHWAY_DATABASE_URL", default_value = "sqlite://pathways.db")]
    pub database_url: String,
}

/// Install the global tracing subscriber.
///
/// Honours `RUST_LOG`, falling back to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
