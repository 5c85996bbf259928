//! In-process desk state shared by the memory and file backends

use super::{ChangeSet, MetricsUpdate, SlotChange, TicketWrite};
use crate::core::{
    Availability, AuditNote, PerformanceMetrics, StatusHistoryEntry, TechnicianId, Technician,
    Ticket, TicketId,
};
use crate::error::{Result, ServiceDeskError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Complete snapshot of tickets, technicians, metrics and the audit trail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeskState {
    #[serde(default)]
    tickets: BTreeMap<TicketId, Ticket>,
    #[serde(default)]
    technicians: BTreeMap<TechnicianId, Technician>,
    #[serde(default)]
    metrics: BTreeMap<TechnicianId, PerformanceMetrics>,
    #[serde(default)]
    history: Vec<StatusHistoryEntry>,
    #[serde(default)]
    notes: Vec<AuditNote>,
}

impl DeskState {
    pub fn ticket(&self, id: &TicketId) -> Result<Ticket> {
        self.tickets
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceDeskError::ticket_not_found(id))
    }

    pub fn tickets(&self) -> Vec<Ticket> {
        self.tickets.values().cloned().collect()
    }

    pub fn technician(&self, id: &TechnicianId) -> Result<Technician> {
        self.technicians
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceDeskError::technician_not_found(id))
    }

    pub fn technicians(&self) -> Vec<Technician> {
        self.technicians.values().cloned().collect()
    }

    pub fn metrics(&self, id: &TechnicianId) -> PerformanceMetrics {
        self.metrics.get(id).cloned().unwrap_or_default()
    }

    pub fn status_history(&self, id: &TicketId) -> Vec<StatusHistoryEntry> {
        self.history
            .iter()
            .filter(|entry| entry.ticket_id == *id)
            .cloned()
            .collect()
    }

    pub fn audit_notes(&self, id: &TicketId) -> Vec<AuditNote> {
        self.notes
            .iter()
            .filter(|note| note.ticket_id == *id)
            .cloned()
            .collect()
    }

    pub fn register_technician(&mut self, technician: &Technician) -> Result<()> {
        if self.technicians.contains_key(&technician.id) {
            return Err(ServiceDeskError::validation(format!(
                "Technician {} already exists",
                technician.id
            )));
        }
        if technician.max_capacity == 0 {
            return Err(ServiceDeskError::validation(
                "Technician capacity must be at least 1",
            ));
        }

        let mut technician = technician.clone();
        technician.current_tickets = 0;
        self.technicians.insert(technician.id, technician);
        Ok(())
    }

    pub fn set_availability(&mut self, id: &TechnicianId, availability: Availability) -> Result<()> {
        let technician = self
            .technicians
            .get_mut(id)
            .ok_or_else(|| ServiceDeskError::technician_not_found(id))?;
        technician.availability = availability;
        Ok(())
    }

    /// Applies a change set; on error nothing has been modified
    pub fn apply(&mut self, change: ChangeSet) -> Result<()> {
        self.check_ticket_write(change.ticket())?;
        let counters = self.check_slots(change.slots())?;

        // Everything below is infallible.
        match change.ticket() {
            TicketWrite::Insert(ticket) | TicketWrite::Update { ticket, .. } => {
                self.tickets.insert(ticket.id, ticket.clone());
            },
            TicketWrite::Delete { id, .. } => {
                self.tickets.remove(id);
            },
        }

        for (id, current) in counters {
            if let Some(technician) = self.technicians.get_mut(&id) {
                technician.current_tickets = current;
            }
        }

        for slot in change.slots() {
            match slot {
                SlotChange::Reserve(id) => {
                    if let Some(technician) = self.technicians.get_mut(id) {
                        if !technician.has_free_slot()
                            && technician.availability == Availability::Available
                        {
                            technician.availability = Availability::Busy;
                        }
                    }
                },
                SlotChange::Release(id) => {
                    if let Some(technician) = self.technicians.get_mut(id) {
                        if technician.has_free_slot()
                            && technician.availability == Availability::Busy
                        {
                            technician.availability = Availability::Available;
                        }
                    }
                },
            }
        }

        for update in change.metrics() {
            match *update {
                MetricsUpdate::Resolution { technician, hours } => {
                    self.metrics
                        .entry(technician)
                        .or_default()
                        .record_resolution(hours);
                },
                MetricsUpdate::Rating { technician, rating } => {
                    self.metrics.entry(technician).or_default().record_rating(rating);
                },
            }
        }

        self.history.extend_from_slice(change.history());
        self.notes.extend_from_slice(change.notes());
        Ok(())
    }

    fn check_ticket_write(&self, write: &TicketWrite) -> Result<()> {
        match write {
            TicketWrite::Insert(ticket) => {
                if self.tickets.contains_key(&ticket.id) {
                    return Err(ServiceDeskError::validation(format!(
                        "Ticket {} already exists",
                        ticket.id
                    )));
                }
                Ok(())
            },
            TicketWrite::Update {
                ticket,
                expected_version,
            } => self.check_version(&ticket.id, *expected_version),
            TicketWrite::Delete {
                id,
                expected_version,
            } => self.check_version(id, *expected_version),
        }
    }

    fn check_version(&self, id: &TicketId, expected_version: u32) -> Result<()> {
        let stored = self
            .tickets
            .get(id)
            .ok_or_else(|| ServiceDeskError::ticket_not_found(id))?;
        if stored.version != expected_version {
            return Err(ServiceDeskError::Conflict { id: id.to_string() });
        }
        Ok(())
    }

    /// Simulates slot movements and returns the resulting counters
    fn check_slots(&self, slots: &[SlotChange]) -> Result<HashMap<TechnicianId, u32>> {
        let mut counters: HashMap<TechnicianId, u32> = HashMap::new();

        for slot in slots {
            let id = slot.technician();
            let technician = self
                .technicians
                .get(id)
                .ok_or_else(|| ServiceDeskError::technician_not_found(id))?;
            let current = counters.entry(*id).or_insert(technician.current_tickets);

            match slot {
                SlotChange::Reserve(_) => {
                    if let Some(reason) = technician.unavailability_reason() {
                        return Err(ServiceDeskError::TechnicianUnavailable {
                            id: id.to_string(),
                            reason: reason.to_string(),
                        });
                    }
                    if *current >= technician.max_capacity {
                        return Err(ServiceDeskError::CapacityExceeded {
                            id: id.to_string(),
                            current: *current,
                            max: technician.max_capacity,
                        });
                    }
                    *current += 1;
                },
                SlotChange::Release(_) => {
                    *current = current.checked_sub(1).ok_or_else(|| {
                        ServiceDeskError::InvariantViolation(format!(
                            "release on technician {id} with no active tickets"
                        ))
                    })?;
                },
            }
        }

        Ok(counters)
    }

    /// Technicians whose counter disagrees with their assigned active tickets
    pub fn counter_mismatches(&self) -> Vec<(TechnicianId, u32, usize)> {
        self.technicians
            .values()
            .filter_map(|technician| {
                let actual = self
                    .tickets
                    .values()
                    .filter(|ticket| ticket.occupies_slot_of(&technician.id))
                    .count();
                (technician.current_tickets as usize != actual).then_some((
                    technician.id,
                    technician.current_tickets,
                    actual,
                ))
            })
            .collect()
    }
}
