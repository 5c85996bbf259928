//! Handler for the `init` command

use super::load_config;
use crate::cli::{GlobalOptions, OutputFormatter};
use crate::config::StorageBackend;
use crate::error::Result;
use crate::storage::{FileStore, open_store};
use std::time::Duration;

/// Create the desk data store for the configured backend
///
/// For the file backend an empty document is written unless one exists.
/// The SQLite backend bootstraps its schema when opened.
pub async fn handle_init(options: &GlobalOptions, formatter: &OutputFormatter) -> Result<()> {
    let config = load_config(options)?;

    match config.storage.backend {
        StorageBackend::File => {
            let path = config.storage.resolved_path()?;
            let store = FileStore::new(&path).with_lock_settings(
                Duration::from_millis(config.storage.lock_timeout_ms),
                Duration::from_secs(config.storage.stale_lock_secs),
            );
            let created = store.init()?;

            if formatter.is_json() {
                formatter.print_json(&serde_json::json!({
                    "status": "success",
                    "backend": "file",
                    "path": path,
                    "created": created,
                }))?;
            } else if created {
                formatter.success(&format!("Initialized desk data at {}", path.display()));
            } else {
                formatter.warning(&format!("Desk data already exists at {}", path.display()));
            }
        },
        StorageBackend::Sqlite => {
            open_store(&config.storage).await?;
            if formatter.is_json() {
                formatter.print_json(&serde_json::json!({
                    "status": "success",
                    "backend": "sqlite",
                    "database_url": config.storage.database_url,
                }))?;
            } else {
                formatter.success(&format!(
                    "Database ready at {}",
                    config.storage.database_url
                ));
            }
        },
        StorageBackend::Memory => {
            formatter.warning("The memory backend keeps no data between runs; nothing to initialize");
        },
    }

    Ok(())
}
