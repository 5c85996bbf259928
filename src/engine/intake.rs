use crate::core::{
    Actor, Availability, CustomerId, Priority, StatusHistoryEntry, Technician, TechnicianId,
    Ticket,
};
use crate::error::{Result, ServiceDeskError};
use crate::notify::{NotificationKind, NotificationRequest, Notifier};
use crate::storage::{ChangeSet, DeskStore, TicketWrite};
use std::sync::Arc;
use tracing::info;

/// Creates tickets and manages the technician roster
#[derive(Clone)]
pub struct TicketIntake {
    store: Arc<dyn DeskStore>,
    notifier: Notifier,
}

impl TicketIntake {
    pub(crate) fn new(store: Arc<dyn DeskStore>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    /// Open an unassigned ticket and record its first history entry
    pub async fn open_ticket(
        &self,
        customer_id: CustomerId,
        subject: &str,
        priority: Priority,
        actor: &Actor,
    ) -> Result<Ticket> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(ServiceDeskError::validation("Ticket subject is required"));
        }

        let ticket = Ticket::new(customer_id, subject, priority);
        let change = ChangeSet::new(TicketWrite::Insert(ticket.clone())).with_history(
            StatusHistoryEntry::new(
                ticket.id,
                None,
                ticket.status,
                actor.id,
                "Ticket opened",
                ticket.created_at,
            ),
        );
        self.store.apply(change).await?;

        info!(
            "Opened ticket {} ({}) for customer {}",
            ticket.id.short(),
            ticket.priority,
            customer_id.short()
        );
        self.notifier.emit(NotificationRequest::to_customer(
            NotificationKind::TicketReceived,
            &ticket,
        ));
        Ok(ticket)
    }

    /// Add a technician; the stored counter always starts at zero
    pub async fn register_technician(&self, technician: Technician) -> Result<Technician> {
        let name = technician.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceDeskError::validation("Technician name is required"));
        }
        if technician.max_capacity == 0 {
            return Err(ServiceDeskError::validation(
                "Technician capacity must be at least 1",
            ));
        }

        let technician = Technician {
            name,
            current_tickets: 0,
            ..technician
        };
        self.store.register_technician(&technician).await?;
        info!(
            "Registered technician {} ({}) with capacity {}",
            technician.name,
            technician.id.short(),
            technician.max_capacity
        );
        Ok(technician)
    }

    /// Change availability; the counter is untouched
    pub async fn set_availability(
        &self,
        technician_id: &TechnicianId,
        availability: Availability,
    ) -> Result<Technician> {
        self.store
            .set_availability(technician_id, availability)
            .await?;
        self.store.technician(technician_id).await
    }
}
