use super::ChangeSet;
use crate::core::{
    Availability, AuditNote, PerformanceMetrics, StatusHistoryEntry, TechnicianId, Technician,
    Ticket, TicketId,
};
use crate::error::Result;
use async_trait::async_trait;

/// Storage interface for tickets, technicians and the audit trail
///
/// Reads are plain lookups. Every write that touches ticket status,
/// assignment or a capacity counter goes through [`DeskStore::apply`], which
/// must be atomic: either the whole change set becomes visible or none of it
/// does.
#[async_trait]
pub trait DeskStore: Send + Sync {
    /// Loads a ticket by ID
    async fn ticket(&self, id: &TicketId) -> Result<Ticket>;

    /// Loads all tickets
    async fn tickets(&self) -> Result<Vec<Ticket>>;

    /// Loads a technician by ID
    async fn technician(&self, id: &TechnicianId) -> Result<Technician>;

    /// Loads all technicians
    async fn technicians(&self) -> Result<Vec<Technician>>;

    /// Performance aggregates; a technician with no record yet gets zeroes
    async fn metrics(&self, id: &TechnicianId) -> Result<PerformanceMetrics>;

    /// Status history of a ticket in insertion order (oldest first)
    async fn status_history(&self, id: &TicketId) -> Result<Vec<StatusHistoryEntry>>;

    /// Audit notes of a ticket in insertion order
    async fn audit_notes(&self, id: &TicketId) -> Result<Vec<AuditNote>>;

    /// Adds a technician; the counter is stored as zero whatever was passed
    async fn register_technician(&self, technician: &Technician) -> Result<()>;

    /// Changes availability only, never the counter
    async fn set_availability(&self, id: &TechnicianId, availability: Availability)
    -> Result<()>;

    /// Applies a change set atomically
    ///
    /// Fails with `Conflict` when the ticket's stored version differs from
    /// the expected one, `CapacityExceeded` / `TechnicianUnavailable` when a
    /// slot reservation cannot be made, and `NotFound` for missing rows.
    async fn apply(&self, change: ChangeSet) -> Result<()>;
}
