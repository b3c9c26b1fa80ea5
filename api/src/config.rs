//! Command line and environment configuration.

use clap::Parser;
use evidence_common::db_util::{PgEvidenceStore, get_database_pool};
use evidence_common::{EvidenceStore, MemoryEvidenceStore};
use std::net::IpAddr;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 3001, env = "PORT")]
    pub port: u16,

    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0", env = "EVIDENCE_ADDRESS")]
    pub address: IpAddr,

    /// Postgres connection string
    #[arg(
        long,
        env = "DATABASE_URL",
        required_unless_present = "memory_store",
        hide_env_values = true
    )]
    pub database_url: Option<String>,

    /// Maximum number of pooled database connections
    #[arg(long, default_value_t = 10, env = "EVIDENCE_POOL_SIZE")]
    pub pool_size: u32,

    /// Origin allowed to call the API from a browser
    #[arg(long, default_value = "*", env = "EVIDENCE_CORS_ORIGIN")]
    pub cors_origin: String,

    /// Keep records in memory instead of Postgres (lost on restart)
    #[arg(long, env = "EVIDENCE_MEMORY_STORE")]
    pub memory_store: bool,
}

impl Cli {
    /// Build the store this configuration asks for.
    pub fn build_store(&self) -> Arc<dyn EvidenceStore> {
        match (&self.database_url, self.memory_store) {
            (Some(url), false) => {
                tracing::info!(pool_size = self.pool_size, "Using Postgres evidence store");
                Arc::new(PgEvidenceStore::new(get_database_pool(url, self.pool_size)))
            }
            _ => {
                tracing::warn!("Using in-memory evidence store, records will not persist");
                Arc::new(MemoryEvidenceStore::new())
            }
        }
    }
}
