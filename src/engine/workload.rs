//! Read-only workload snapshots
//!
//! Nothing here writes; the functions are pure over a list of technicians
//! and tickets so they can be reused by the CLI, the API and benchmarks.

use crate::core::{Availability, Priority, TechnicianId, Technician, Ticket, TicketId};
use crate::error::Result;
use crate::storage::DeskStore;
use serde::Serialize;
use std::cmp::Reverse;
use std::sync::Arc;

/// Workload of one technician
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianWorkload {
    pub technician_id: TechnicianId,
    pub name: String,
    pub availability: Availability,
    pub current_tickets: u32,
    pub max_capacity: u32,
    pub workload_percentage: f64,
    pub available_slots: u32,
    pub can_take_more_tickets: bool,
}

impl From<&Technician> for TechnicianWorkload {
    fn from(technician: &Technician) -> Self {
        Self {
            technician_id: technician.id,
            name: technician.name.clone(),
            availability: technician.availability,
            current_tickets: technician.current_tickets,
            max_capacity: technician.max_capacity,
            workload_percentage: technician.workload_percentage(),
            available_slots: technician.available_slots(),
            can_take_more_tickets: technician.can_take_more_tickets(),
        }
    }
}

/// Workloads plus the queue of tickets waiting for a technician
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadReport {
    pub technicians: Vec<TechnicianWorkload>,
    pub unassigned_queue: Vec<Ticket>,
}

/// A proposed pairing of a queued ticket with a technician
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSuggestion {
    pub ticket_id: TicketId,
    pub priority: Priority,
    pub technician_id: TechnicianId,
    pub technician_name: String,
}

/// Workloads of technicians with the capability flag, sorted by name
#[must_use]
pub fn technician_workloads(technicians: &[Technician]) -> Vec<TechnicianWorkload> {
    let mut workloads: Vec<TechnicianWorkload> = technicians
        .iter()
        .filter(|t| t.can_handle_tickets)
        .map(TechnicianWorkload::from)
        .collect();
    workloads.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.technician_id.cmp(&b.technician_id))
    });
    workloads
}

/// Unassigned active tickets: priority descending, then oldest first, then id
#[must_use]
pub fn order_queue(tickets: &[Ticket]) -> Vec<Ticket> {
    let mut queue: Vec<Ticket> = tickets
        .iter()
        .filter(|t| t.is_unassigned() && t.status.is_active())
        .cloned()
        .collect();
    queue.sort_by_key(|t| (Reverse(t.priority), t.created_at, t.id));
    queue
}

/// Greedy pairing of the queue with the least loaded eligible technicians
///
/// Each suggestion consumes one slot, so a technician is never suggested
/// past capacity. Ties go to the technician with more free slots, then by
/// name, then by id.
#[must_use]
pub fn suggest_dispatch(technicians: &[Technician], queue: &[Ticket]) -> Vec<DispatchSuggestion> {
    let mut pool: Vec<Technician> = technicians
        .iter()
        .filter(|t| t.unavailability_reason().is_none())
        .cloned()
        .collect();

    let mut suggestions = Vec::new();
    for ticket in queue {
        let best = pool
            .iter_mut()
            .filter(|t| t.has_free_slot())
            .min_by(|a, b| {
                a.workload_percentage()
                    .total_cmp(&b.workload_percentage())
                    .then_with(|| b.available_slots().cmp(&a.available_slots()))
                    .then_with(|| a.name.cmp(&b.name))
                    .then_with(|| a.id.cmp(&b.id))
            });
        let Some(technician) = best else {
            break;
        };

        technician.current_tickets += 1;
        suggestions.push(DispatchSuggestion {
            ticket_id: ticket.id,
            priority: ticket.priority,
            technician_id: technician.id,
            technician_name: technician.name.clone(),
        });
    }
    suggestions
}

/// Read-only view over technician load and the unassigned queue
#[derive(Clone)]
pub struct WorkloadAggregator {
    store: Arc<dyn DeskStore>,
}

impl WorkloadAggregator {
    pub(crate) fn new(store: Arc<dyn DeskStore>) -> Self {
        Self { store }
    }

    pub async fn report(&self) -> Result<WorkloadReport> {
        let technicians = self.store.technicians().await?;
        let tickets = self.store.tickets().await?;
        Ok(WorkloadReport {
            technicians: technician_workloads(&technicians),
            unassigned_queue: order_queue(&tickets),
        })
    }

    pub async fn dispatch_suggestions(&self) -> Result<Vec<DispatchSuggestion>> {
        let technicians = self.store.technicians().await?;
        let tickets = self.store.tickets().await?;
        Ok(suggest_dispatch(&technicians, &order_queue(&tickets)))
    }
}
