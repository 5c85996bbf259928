//! Ticket lifecycle engine
//!
//! [`TicketEngine`] is the facade the CLI and the HTTP API talk to. It wires
//! the components together:
//!
//! - [`AssignmentCoordinator`]: assignment and reassignment
//! - [`CompletionHandler`]: resolution, closure, status moves, ratings, deletion
//! - [`WorkloadAggregator`]: read-only workload snapshots and the unassigned queue
//! - [`TicketIntake`]: opening tickets and managing technicians
//!
//! Every mutating operation validates its preconditions, builds one
//! [`ChangeSet`](crate::storage::ChangeSet) and hands it to the store. When
//! the ticket changed underneath (a `Conflict`), the operation is planned
//! again from fresh reads, up to `engine.max_conflict_retries` times.
//! Notifications are emitted only after the store has committed.

mod assignment;
mod completion;
mod intake;
pub mod state_machine;
mod workload;

pub use assignment::AssignmentCoordinator;
pub use completion::CompletionHandler;
pub use intake::TicketIntake;
pub use state_machine::{allowed_transitions, can_transition, validate_transition};
pub use workload::{
    DispatchSuggestion, TechnicianWorkload, WorkloadAggregator, WorkloadReport, order_queue,
    suggest_dispatch, technician_workloads,
};

use crate::config::EngineConfig;
use crate::core::{
    Actor, Availability, AuditNote, CustomerId, PerformanceMetrics, Priority, StatusHistoryEntry,
    Status, Technician, TechnicianId, Ticket, TicketId,
};
use crate::error::{Result, ServiceDeskError};
use crate::notify::Notifier;
use crate::storage::DeskStore;
use std::sync::Arc;
use tracing::debug;

/// Decides whether a failed commit is planned again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConflictRetry {
    max_retries: u32,
}

impl ConflictRetry {
    pub(crate) const fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// `Ok(())` means "re-plan and try again"; anything else is final
    pub(crate) fn check(&self, attempt: u32, error: ServiceDeskError) -> Result<()> {
        match error {
            ServiceDeskError::Conflict { id } if attempt < self.max_retries => {
                debug!(
                    "Ticket {} changed concurrently, re-planning (attempt {})",
                    id,
                    attempt + 1
                );
                Ok(())
            },
            ServiceDeskError::Conflict { id } => Err(ServiceDeskError::Unavailable(format!(
                "ticket {id} kept changing concurrently; gave up after {} retries",
                self.max_retries
            ))),
            other => Err(other),
        }
    }
}

/// Entry point for every ticket and technician operation
pub struct TicketEngine {
    store: Arc<dyn DeskStore>,
    assignment: AssignmentCoordinator,
    completion: CompletionHandler,
    workload: WorkloadAggregator,
    intake: TicketIntake,
}

impl std::fmt::Debug for TicketEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketEngine")
            .field("store", &"Arc<dyn DeskStore>")
            .finish_non_exhaustive()
    }
}

impl TicketEngine {
    pub fn new(store: Arc<dyn DeskStore>, notifier: Notifier, settings: &EngineConfig) -> Self {
        let retry = ConflictRetry::new(settings.max_conflict_retries);
        Self {
            assignment: AssignmentCoordinator::new(store.clone(), notifier.clone(), retry),
            completion: CompletionHandler::new(
                store.clone(),
                notifier.clone(),
                retry,
                settings.resolution_clock,
            ),
            workload: WorkloadAggregator::new(store.clone()),
            intake: TicketIntake::new(store.clone(), notifier),
            store,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<dyn DeskStore> {
        &self.store
    }

    pub async fn open_ticket(
        &self,
        customer_id: CustomerId,
        subject: &str,
        priority: Priority,
        actor: &Actor,
    ) -> Result<Ticket> {
        self.intake
            .open_ticket(customer_id, subject, priority, actor)
            .await
    }

    pub async fn register_technician(&self, technician: Technician) -> Result<Technician> {
        self.intake.register_technician(technician).await
    }

    pub async fn set_availability(
        &self,
        technician_id: &TechnicianId,
        availability: Availability,
    ) -> Result<Technician> {
        self.intake
            .set_availability(technician_id, availability)
            .await
    }

    pub async fn assign(
        &self,
        ticket_id: &TicketId,
        technician_id: &TechnicianId,
        actor: &Actor,
        reason: Option<&str>,
    ) -> Result<Ticket> {
        self.assignment
            .assign(ticket_id, technician_id, actor, reason)
            .await
    }

    pub async fn complete(
        &self,
        ticket_id: &TicketId,
        actor: &Actor,
        target: Status,
        resolution_notes: &str,
        time_spent_hours: Option<f64>,
    ) -> Result<Ticket> {
        self.completion
            .complete(ticket_id, actor, target, resolution_notes, time_spent_hours)
            .await
    }

    pub async fn transition(
        &self,
        ticket_id: &TicketId,
        actor: &Actor,
        to: Status,
        reason: &str,
    ) -> Result<Ticket> {
        self.completion.transition(ticket_id, actor, to, reason).await
    }

    pub async fn record_rating(&self, ticket_id: &TicketId, actor: &Actor, rating: u8) -> Result<Ticket> {
        self.completion.record_rating(ticket_id, actor, rating).await
    }

    pub async fn delete_ticket(&self, ticket_id: &TicketId, actor: &Actor) -> Result<Ticket> {
        self.completion.delete(ticket_id, actor).await
    }

    pub async fn workload(&self) -> Result<WorkloadReport> {
        self.workload.report().await
    }

    pub async fn dispatch_suggestions(&self) -> Result<Vec<DispatchSuggestion>> {
        self.workload.dispatch_suggestions().await
    }

    /// Status trail of a ticket, newest entry first
    pub async fn status_history(&self, ticket_id: &TicketId) -> Result<Vec<StatusHistoryEntry>> {
        let mut entries = self.store.status_history(ticket_id).await?;
        if entries.is_empty() {
            // Distinguish "no such ticket" from an empty trail.
            self.store.ticket(ticket_id).await?;
        }
        entries.reverse();
        Ok(entries)
    }

    pub async fn audit_notes(&self, ticket_id: &TicketId) -> Result<Vec<AuditNote>> {
        self.store.audit_notes(ticket_id).await
    }

    pub async fn ticket(&self, ticket_id: &TicketId) -> Result<Ticket> {
        self.store.ticket(ticket_id).await
    }

    pub async fn tickets(&self) -> Result<Vec<Ticket>> {
        self.store.tickets().await
    }

    pub async fn technician(&self, technician_id: &TechnicianId) -> Result<Technician> {
        self.store.technician(technician_id).await
    }

    pub async fn technicians(&self) -> Result<Vec<Technician>> {
        self.store.technicians().await
    }

    pub async fn metrics(&self, technician_id: &TechnicianId) -> Result<PerformanceMetrics> {
        self.store.technician(technician_id).await?;
        self.store.metrics(technician_id).await
    }
}
