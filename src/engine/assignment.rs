use super::ConflictRetry;
use crate::core::{
    Actor, AuditNote, StatusHistoryEntry, Status, Technician, TechnicianId, Ticket, TicketId,
};
use crate::error::{Result, ServiceDeskError};
use crate::notify::{NotificationKind, NotificationRequest, Notifier};
use crate::storage::{ChangeSet, DeskStore, SlotChange};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Assigns and reassigns tickets while keeping capacity counters exact
///
/// The capacity check that matters happens inside the store: the new
/// technician's slot is reserved with a conditional increment in the same
/// unit of work that writes the ticket, so two callers racing for the last
/// slot cannot both win. The checks done here only produce an early, precise
/// error.
#[derive(Clone)]
pub struct AssignmentCoordinator {
    store: Arc<dyn DeskStore>,
    notifier: Notifier,
    retry: ConflictRetry,
}

struct AssignmentPlan {
    change: ChangeSet,
    ticket: Ticket,
    technician: Technician,
    previous: Option<Technician>,
}

impl AssignmentCoordinator {
    pub(crate) fn new(store: Arc<dyn DeskStore>, notifier: Notifier, retry: ConflictRetry) -> Self {
        Self {
            store,
            notifier,
            retry,
        }
    }

    /// Assign `ticket_id` to `technician_id`, releasing the previous
    /// assignee's slot on reassignment. An OPEN ticket becomes IN_PROGRESS.
    pub async fn assign(
        &self,
        ticket_id: &TicketId,
        technician_id: &TechnicianId,
        actor: &Actor,
        reason: Option<&str>,
    ) -> Result<Ticket> {
        let mut attempt = 0;
        let plan = loop {
            let plan = self.plan(ticket_id, technician_id, actor, reason).await?;
            match self.store.apply(plan.change.clone()).await {
                Ok(()) => break plan,
                Err(e) => self.retry.check(attempt, e)?,
            }
            attempt += 1;
        };

        info!(
            "Assigned ticket {} to technician {} ({})",
            plan.ticket.id.short(),
            plan.technician.name,
            plan.technician.id.short()
        );
        self.notify(&plan);
        Ok(plan.ticket)
    }

    async fn plan(
        &self,
        ticket_id: &TicketId,
        technician_id: &TechnicianId,
        actor: &Actor,
        reason: Option<&str>,
    ) -> Result<AssignmentPlan> {
        let ticket = self.store.ticket(ticket_id).await?;
        match ticket.status {
            Status::Closed => {
                return Err(ServiceDeskError::AlreadyClosed {
                    id: ticket.id.to_string(),
                });
            },
            Status::Resolved => {
                return Err(ServiceDeskError::InvalidTransition {
                    from: Status::Resolved,
                    to: Status::InProgress,
                });
            },
            Status::Open | Status::InProgress | Status::Pending => {},
        }

        let technician = self.store.technician(technician_id).await?;
        if ticket.assigned_to == Some(technician.id) {
            return Err(ServiceDeskError::validation(format!(
                "Ticket {} is already assigned to {}",
                ticket.id, technician.name
            )));
        }
        if let Some(reason) = technician.unavailability_reason() {
            return Err(ServiceDeskError::TechnicianUnavailable {
                id: technician.id.to_string(),
                reason: reason.to_string(),
            });
        }
        if !technician.has_free_slot() {
            return Err(ServiceDeskError::CapacityExceeded {
                id: technician.id.to_string(),
                current: technician.current_tickets,
                max: technician.max_capacity,
            });
        }

        let previous = match ticket.assigned_to {
            Some(previous_id) => Some(self.store.technician(&previous_id).await?),
            None => None,
        };

        let action = match &previous {
            Some(previous) => format!("Reassigned from {} to {}", previous.name, technician.name),
            None => format!("Assigned to {}", technician.name),
        };
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        let note = match reason {
            Some(reason) => format!("{action}. Reason: {reason}"),
            None => action.clone(),
        };

        let now = Utc::now();
        let mut next = ticket.clone();
        next.assigned_to = Some(technician.id);
        if next.status == Status::Open {
            next.status = Status::InProgress;
        }

        let history = StatusHistoryEntry::new(
            ticket.id,
            Some(ticket.status),
            next.status,
            actor.id,
            reason.map_or(action, str::to_string),
            now,
        );

        let mut change = ChangeSet::update(next);
        if let Some(previous) = &previous {
            change = change.with_slot(SlotChange::Release(previous.id));
        }
        let change = change
            .with_slot(SlotChange::Reserve(technician.id))
            .with_history(history)
            .with_note(AuditNote::new(ticket.id, actor.id, note, now));

        let ticket = change
            .resulting_ticket()
            .cloned()
            .ok_or_else(|| ServiceDeskError::InvariantViolation("assignment without ticket".to_string()))?;

        Ok(AssignmentPlan {
            change,
            ticket,
            technician,
            previous,
        })
    }

    fn notify(&self, plan: &AssignmentPlan) {
        let ticket = &plan.ticket;
        let technician = &plan.technician;

        let mut requests = vec![
            NotificationRequest::to_customer(NotificationKind::TicketAssigned, ticket)
                .with_technician_name(&technician.name),
            NotificationRequest::to_technician(NotificationKind::NewAssignment, technician, ticket)
                .with_technician_name(&technician.name),
        ];
        if let Some(previous) = &plan.previous {
            requests.push(
                NotificationRequest::to_technician(
                    NotificationKind::TicketReassigned,
                    previous,
                    ticket,
                )
                .with_technician_name(&technician.name),
            );
        }
        self.notifier.emit_all(requests);
    }
}
