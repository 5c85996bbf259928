//! Test utilities for service-desk
//!
//! Shared fixtures so engine tests read as scenarios rather than setup.

#![cfg(test)]

use crate::config::EngineConfig;
use crate::core::{
    Actor, Availability, AuditNote, CustomerId, PerformanceMetrics, Priority, Status,
    StatusHistoryEntry, Technician, TechnicianId, Ticket, TicketBuilder, TicketId,
};
use crate::engine::TicketEngine;
use crate::error::{Result, ServiceDeskError};
use crate::notify::{NotificationRequest, Notifier};
use crate::storage::{ChangeSet, DeskState, DeskStore, MemoryStore};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// An engine over an in-memory store with a captured notification outbox
pub struct TestDesk {
    pub store: Arc<MemoryStore>,
    pub engine: TicketEngine,
    pub customer: CustomerId,
    notifications: Mutex<mpsc::UnboundedReceiver<NotificationRequest>>,
}

impl TestDesk {
    pub fn new() -> Self {
        Self::with_settings(EngineConfig::default())
    }

    pub fn with_settings(settings: EngineConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let (notifier, receiver) = Notifier::channel();
        let engine = TicketEngine::new(store.clone(), notifier, &settings);
        Self {
            store,
            engine,
            customer: CustomerId::new(),
            notifications: Mutex::new(receiver),
        }
    }

    /// Register an available technician
    pub async fn technician(&self, name: &str, max_capacity: u32) -> Technician {
        self.engine
            .register_technician(Technician::new(name, max_capacity))
            .await
            .expect("Failed to register technician")
    }

    /// Open a ticket for the fixture customer
    pub async fn open(&self, subject: &str, priority: Priority) -> Ticket {
        self.engine
            .open_ticket(self.customer, subject, priority, &Actor::system())
            .await
            .expect("Failed to open ticket")
    }

    /// Open a ticket and assign it
    pub async fn assigned(&self, subject: &str, technician: &Technician) -> Ticket {
        let ticket = self.open(subject, Priority::Medium).await;
        self.engine
            .assign(&ticket.id, &technician.id, &Actor::system(), None)
            .await
            .expect("Failed to assign ticket")
    }

    pub async fn counter(&self, id: &TechnicianId) -> u32 {
        self.engine
            .technician(id)
            .await
            .expect("Technician not found")
            .current_tickets
    }

    pub async fn availability(&self, id: &TechnicianId) -> Availability {
        self.engine
            .technician(id)
            .await
            .expect("Technician not found")
            .availability
    }

    pub fn snapshot(&self) -> DeskState {
        self.store.snapshot().expect("Failed to snapshot store")
    }

    /// Panics unless every counter equals the technician's active tickets
    pub fn assert_counters_consistent(&self) {
        let mismatches = self.snapshot().counter_mismatches();
        assert!(
            mismatches.is_empty(),
            "counter mismatches (technician, counter, actual): {mismatches:?}"
        );
    }

    /// Everything emitted since the last drain
    pub fn drain_notifications(&self) -> Vec<NotificationRequest> {
        let mut receiver = self.notifications.lock().expect("notification lock");
        let mut drained = Vec::new();
        while let Ok(request) = receiver.try_recv() {
            drained.push(request);
        }
        drained
    }
}

/// Create a ticket directly, bypassing the engine
pub fn create_test_ticket(subject: &str, priority: Priority, status: Status) -> Ticket {
    TicketBuilder::new()
        .subject(subject)
        .priority(priority)
        .status(status)
        .build()
}

/// Store wrapper whose first `conflicts` applies fail with `Conflict`
pub struct ConflictingStore {
    inner: MemoryStore,
    conflicts_left: AtomicU32,
    applies: AtomicU32,
}

impl ConflictingStore {
    pub fn new(conflicts: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            conflicts_left: AtomicU32::new(conflicts),
            applies: AtomicU32::new(0),
        }
    }

    pub fn apply_calls(&self) -> u32 {
        self.applies.load(Ordering::SeqCst)
    }

    /// Apply directly to the wrapped store, without injected conflicts
    pub async fn seed(&self, change: ChangeSet) -> Result<()> {
        self.inner.apply(change).await
    }
}

#[async_trait]
impl DeskStore for ConflictingStore {
    async fn ticket(&self, id: &TicketId) -> Result<Ticket> {
        self.inner.ticket(id).await
    }

    async fn tickets(&self) -> Result<Vec<Ticket>> {
        self.inner.tickets().await
    }

    async fn technician(&self, id: &TechnicianId) -> Result<Technician> {
        self.inner.technician(id).await
    }

    async fn technicians(&self) -> Result<Vec<Technician>> {
        self.inner.technicians().await
    }

    async fn metrics(&self, id: &TechnicianId) -> Result<PerformanceMetrics> {
        self.inner.metrics(id).await
    }

    async fn status_history(&self, id: &TicketId) -> Result<Vec<StatusHistoryEntry>> {
        self.inner.status_history(id).await
    }

    async fn audit_notes(&self, id: &TicketId) -> Result<Vec<AuditNote>> {
        self.inner.audit_notes(id).await
    }

    async fn register_technician(&self, technician: &Technician) -> Result<()> {
        self.inner.register_technician(technician).await
    }

    async fn set_availability(
        &self,
        id: &TechnicianId,
        availability: Availability,
    ) -> Result<()> {
        self.inner.set_availability(id, availability).await
    }

    async fn apply(&self, change: ChangeSet) -> Result<()> {
        self.applies.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .conflicts_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if injected {
            return Err(ServiceDeskError::Conflict {
                id: change.ticket().ticket_id().to_string(),
            });
        }
        self.inner.apply(change).await
    }
}
