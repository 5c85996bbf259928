//! Storage layer
//!
//! [`DeskStore`] is the seam between the engine and persistence. Three
//! backends implement it:
//!
//! - [`MemoryStore`]: process-local, used by tests and the HTTP server
//! - [`FileStore`]: a YAML document guarded by a lock file, used by the CLI
//! - `SqliteStore` (feature `database`): conditional updates in transactions

mod changeset;
mod file;
mod memory;
mod repository;
mod state;

#[cfg(feature = "database")]
mod sqlite;

pub use changeset::{ChangeSet, MetricsUpdate, SlotChange, TicketWrite};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use repository::DeskStore;
pub use state::DeskState;

#[cfg(feature = "database")]
pub use sqlite::SqliteStore;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// Open the backend selected in configuration
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn DeskStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::File => {
            let store = FileStore::new(config.resolved_path()?).with_lock_settings(
                Duration::from_millis(config.lock_timeout_ms),
                Duration::from_secs(config.stale_lock_secs),
            );
            Ok(Arc::new(store))
        },
        #[cfg(feature = "database")]
        StorageBackend::Sqlite => {
            let store = SqliteStore::connect(
                &config.database_url,
                Duration::from_millis(config.lock_timeout_ms),
            )
            .await?;
            Ok(Arc::new(store))
        },
        #[cfg(not(feature = "database"))]
        StorageBackend::Sqlite => Err(crate::error::ServiceDeskError::Unavailable(
            "the sqlite backend requires the `database` feature".to_string(),
        )),
    }
}
