// src/state.rs
use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::db::{create_pool, run_migrations, PgStore};
use crate::error::StartupError;
use crate::memory::MemoryStore;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Store, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Connects to PostgreSQL and applies migrations, or starts an empty
    /// in-process store when no database is configured.
    pub async fn from_config(config: Config) -> Result<Self, StartupError> {
        let store = match config.database_url.as_deref() {
            Some(url) => {
                info!(max_connections = config.max_connections, "Connecting to PostgreSQL...");
                let pool = create_pool(url, config.max_connections).await?;
                run_migrations(&pool).await?;
                Store::Postgres(PgStore::new(pool))
            }
            None => {
                info!("Using in-process store, data is lost on shutdown");
                Store::Memory(MemoryStore::new())
            }
        };

        Ok(Self::new(store, config))
    }
}
