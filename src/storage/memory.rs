use super::{ChangeSet, DeskState, DeskStore};
use crate::core::{
    Availability, AuditNote, PerformanceMetrics, StatusHistoryEntry, TechnicianId, Technician,
    Ticket, TicketId,
};
use crate::error::{Result, ServiceDeskError};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

/// Process-local store; every operation runs under a single mutex
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<DeskState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot
    #[must_use]
    pub fn with_state(state: DeskState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> Result<DeskState> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, DeskState>> {
        self.state
            .lock()
            .map_err(|_| ServiceDeskError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl DeskStore for MemoryStore {
    async fn ticket(&self, id: &TicketId) -> Result<Ticket> {
        self.lock()?.ticket(id)
    }

    async fn tickets(&self) -> Result<Vec<Ticket>> {
        Ok(self.lock()?.tickets())
    }

    async fn technician(&self, id: &TechnicianId) -> Result<Technician> {
        self.lock()?.technician(id)
    }

    async fn technicians(&self) -> Result<Vec<Technician>> {
        Ok(self.lock()?.technicians())
    }

    async fn metrics(&self, id: &TechnicianId) -> Result<PerformanceMetrics> {
        Ok(self.lock()?.metrics(id))
    }

    async fn status_history(&self, id: &TicketId) -> Result<Vec<StatusHistoryEntry>> {
        Ok(self.lock()?.status_history(id))
    }

    async fn audit_notes(&self, id: &TicketId) -> Result<Vec<AuditNote>> {
        Ok(self.lock()?.audit_notes(id))
    }

    async fn register_technician(&self, technician: &Technician) -> Result<()> {
        self.lock()?.register_technician(technician)
    }

    async fn set_availability(
        &self,
        id: &TechnicianId,
        availability: Availability,
    ) -> Result<()> {
        self.lock()?.set_availability(id, availability)
    }

    async fn apply(&self, change: ChangeSet) -> Result<()> {
        self.lock()?.apply(change)
    }
}
