//! Shared setup for command handlers
//!
//! Every command except `init` needs the same things: the layered
//! configuration, an opened store, an engine, the acting identity and the
//! notification worker. [`HandlerContext`] bundles them.

use crate::cli::{GlobalOptions, OutputFormatter};
use crate::config::{DeskConfig, StorageBackend};
use crate::core::Actor;
use crate::engine::TicketEngine;
use crate::error::Result;
use crate::notify::{DispatchWorker, LogDispatcher, MessageTemplates, Notifier, spawn_dispatcher};
use crate::storage::open_store;
use std::sync::Arc;
use tracing::debug;

/// Load configuration, letting `--data` override the storage location
pub fn load_config(options: &GlobalOptions) -> Result<DeskConfig> {
    let mut config = DeskConfig::load(options.config.as_deref())?;
    if let Some(data) = &options.data {
        config.storage.backend = StorageBackend::File;
        config.storage.path = Some(data.clone());
    }
    Ok(config)
}

/// Resources a handler works with
pub struct HandlerContext {
    pub config: DeskConfig,
    pub engine: Arc<TicketEngine>,
    pub actor: Actor,
    pub formatter: OutputFormatter,
    worker: Option<DispatchWorker>,
}

impl HandlerContext {
    /// Build the context; must run inside the tokio runtime
    pub async fn new(options: &GlobalOptions, formatter: OutputFormatter) -> Result<Self> {
        let config = load_config(options)?;
        let store = open_store(&config.storage).await?;

        let (notifier, worker) = if config.notifications.enabled {
            let (notifier, worker) =
                spawn_dispatcher(Arc::new(LogDispatcher), MessageTemplates::new()?);
            (notifier, Some(worker))
        } else {
            (Notifier::disabled(), None)
        };

        let engine = Arc::new(TicketEngine::new(store, notifier, &config.engine));
        let actor = options.actor.map_or_else(Actor::system, |id| Actor {
            id,
            admin_override: options.admin,
        });

        Ok(Self {
            config,
            engine,
            actor,
            formatter,
            worker,
        })
    }

    /// Drop the engine and wait for queued notifications to go out
    pub async fn finish(self) {
        let Self { engine, worker, .. } = self;
        drop(engine);
        if let Some(worker) = worker {
            let delivered = worker.finish().await;
            debug!("Delivered {} notifications", delivered);
        }
    }

    pub fn success(&self, message: &str) {
        self.formatter.success(message);
    }

    pub fn info(&self, message: &str) {
        self.formatter.info(message);
    }

    pub fn warning(&self, message: &str) {
        self.formatter.warning(message);
    }
}
