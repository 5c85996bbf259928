//! YAML file backend
//!
//! The whole desk state lives in one YAML document. Writers take a lock file
//! next to it (created with `create_new`, so acquisition is atomic across
//! processes), reload the document, apply the change set and replace the
//! file through a temporary file and a rename. Readers never see a partially
//! written document. A lock older than the stale threshold is assumed to
//! belong to a crashed process and is removed.

use super::{ChangeSet, DeskState, DeskStore};
use crate::core::{
    Availability, AuditNote, PerformanceMetrics, StatusHistoryEntry, TechnicianId, Technician,
    Ticket, TicketId,
};
use crate::error::{Result, ServiceDeskError};
use async_trait::async_trait;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30);

/// Store backed by a single YAML file
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock_timeout: Duration,
    stale_after: Duration,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            stale_after: DEFAULT_STALE_AFTER,
        }
    }

    /// Override lock acquisition timeout and stale-lock threshold
    #[must_use]
    pub const fn with_lock_settings(mut self, timeout: Duration, stale_after: Duration) -> Self {
        self.lock_timeout = timeout;
        self.stale_after = stale_after;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Creates an empty document if none exists; returns whether it did
    pub fn init(&self) -> Result<bool> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let _lock = LockGuard::acquire(&self.lock_path(), self.lock_timeout, self.stale_after)?;
        if self.path.exists() {
            return Ok(false);
        }
        self.save(&DeskState::default())?;
        Ok(true)
    }

    fn load(&self) -> Result<DeskState> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ServiceDeskError::Unavailable(format!(
                    "no desk data at {}; run `service-desk init` first",
                    self.path.display()
                ))
            } else {
                ServiceDeskError::Io(e)
            }
        })?;
        if content.trim().is_empty() {
            return Ok(DeskState::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    fn save(&self, state: &DeskState) -> Result<()> {
        let content = serde_yaml::to_string(state)?;
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn read_blocking<T>(&self, read: impl FnOnce(&DeskState) -> Result<T>) -> Result<T> {
        let state = self.load()?;
        read(&state)
    }

    fn write_blocking<T>(&self, write: impl FnOnce(&mut DeskState) -> Result<T>) -> Result<T> {
        let _lock = LockGuard::acquire(&self.lock_path(), self.lock_timeout, self.stale_after)?;
        let mut state = self.load()?;
        let output = write(&mut state)?;
        self.save(&state)?;
        Ok(output)
    }

    async fn read<T, F>(&self, read: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&DeskState) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.read_blocking(read))
            .await
            .map_err(|e| ServiceDeskError::Unavailable(format!("file store task failed: {e}")))?
    }

    async fn write<T, F>(&self, write: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut DeskState) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.write_blocking(write))
            .await
            .map_err(|e| ServiceDeskError::Unavailable(format!("file store task failed: {e}")))?
    }
}

#[async_trait]
impl DeskStore for FileStore {
    async fn ticket(&self, id: &TicketId) -> Result<Ticket> {
        let id = *id;
        self.read(move |state| state.ticket(&id)).await
    }

    async fn tickets(&self) -> Result<Vec<Ticket>> {
        self.read(|state| Ok(state.tickets())).await
    }

    async fn technician(&self, id: &TechnicianId) -> Result<Technician> {
        let id = *id;
        self.read(move |state| state.technician(&id)).await
    }

    async fn technicians(&self) -> Result<Vec<Technician>> {
        self.read(|state| Ok(state.technicians())).await
    }

    async fn metrics(&self, id: &TechnicianId) -> Result<PerformanceMetrics> {
        let id = *id;
        self.read(move |state| Ok(state.metrics(&id))).await
    }

    async fn status_history(&self, id: &TicketId) -> Result<Vec<StatusHistoryEntry>> {
        let id = *id;
        self.read(move |state| Ok(state.status_history(&id))).await
    }

    async fn audit_notes(&self, id: &TicketId) -> Result<Vec<AuditNote>> {
        let id = *id;
        self.read(move |state| Ok(state.audit_notes(&id))).await
    }

    async fn register_technician(&self, technician: &Technician) -> Result<()> {
        let technician = technician.clone();
        self.write(move |state| state.register_technician(&technician))
            .await
    }

    async fn set_availability(
        &self,
        id: &TechnicianId,
        availability: Availability,
    ) -> Result<()> {
        let id = *id;
        self.write(move |state| state.set_availability(&id, availability))
            .await
    }

    async fn apply(&self, change: ChangeSet) -> Result<()> {
        self.write(move |state| state.apply(change)).await
    }
}

/// Exclusive lock held for the duration of one write
struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    fn acquire(path: &Path, timeout: Duration, stale_after: Duration) -> Result<Self> {
        let deadline = Instant::now() + timeout;
        let mut backoff = Duration::from_millis(5);

        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    writeln!(file, "{}", std::process::id())?;
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                },
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if Self::is_stale(path, stale_after) {
                        debug!("Removing stale lock file {}", path.display());
                        let _ = fs::remove_file(path);
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(ServiceDeskError::Unavailable(format!(
                            "timed out waiting for lock {}",
                            path.display()
                        )));
                    }
                    std::thread::sleep(backoff);
                    backoff = (backoff * 2).min(Duration::from_millis(100));
                },
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn is_stale(path: &Path, stale_after: Duration) -> bool {
        fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age > stale_after)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove lock file {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FileStore {
        FileStore::new(dir.path().join("desk").join("desk.yaml"))
    }

    #[tokio::test]
    async fn test_init_creates_document_once() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        assert!(store.init().unwrap());
        assert!(!store.init().unwrap());
        assert!(store.path().exists());
        assert!(store.tickets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_uninitialized_store_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        assert!(matches!(
            store.technicians().await,
            Err(ServiceDeskError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_state_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        store.init().unwrap();

        let technician = Technician::new("Dennis", 2);
        store.register_technician(&technician).await.unwrap();
        store
            .set_availability(&technician.id, Availability::Offline)
            .await
            .unwrap();

        let reopened = store_in(&temp_dir);
        let loaded = reopened.technician(&technician.id).await.unwrap();
        assert_eq!(loaded.name, "Dennis");
        assert_eq!(loaded.availability, Availability::Offline);
        assert!(!reopened.lock_path().exists());
    }

    #[tokio::test]
    async fn test_held_lock_times_out() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir)
            .with_lock_settings(Duration::from_millis(50), Duration::from_secs(60));
        store.init().unwrap();

        fs::write(store.lock_path(), "12345").unwrap();

        let result = store
            .register_technician(&Technician::new("Ken", 1))
            .await;
        assert!(matches!(result, Err(ServiceDeskError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_stale_lock_is_reclaimed() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir)
            .with_lock_settings(Duration::from_millis(200), Duration::ZERO);
        store.init().unwrap();

        fs::write(store.lock_path(), "12345").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        store
            .register_technician(&Technician::new("Bjarne", 1))
            .await
            .expect("stale lock should be reclaimed");
        assert_eq!(store.technicians().await.unwrap().len(), 1);
    }
}
