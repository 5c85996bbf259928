//! The single transactional primitive of the engine
//!
//! A [`ChangeSet`] describes one unit of work: a ticket write, the capacity
//! slot movements it implies, metric updates and audit records. Stores apply
//! a change set all-or-nothing. Constructors are crate-private, so only the
//! engine can express counter movements.

use crate::core::{AuditNote, StatusHistoryEntry, TechnicianId, Ticket, TicketId};

/// How the ticket row is written
#[derive(Debug, Clone, PartialEq)]
pub enum TicketWrite {
    /// Insert a ticket that must not exist yet
    Insert(Ticket),
    /// Replace a ticket whose stored version equals `expected_version`
    Update {
        ticket: Ticket,
        expected_version: u32,
    },
    /// Remove a ticket whose stored version equals `expected_version`
    Delete {
        id: TicketId,
        expected_version: u32,
    },
}

impl TicketWrite {
    #[must_use]
    pub const fn ticket_id(&self) -> &TicketId {
        match self {
            Self::Insert(ticket) | Self::Update { ticket, .. } => &ticket.id,
            Self::Delete { id, .. } => id,
        }
    }
}

/// Movement of one capacity slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotChange {
    /// Conditional increment: succeeds only while the technician can handle
    /// tickets, is not offline, and has `current < max`. A technician that
    /// becomes full is marked BUSY.
    Reserve(TechnicianId),
    /// Decrement. A BUSY technician drops back to AVAILABLE as soon as a
    /// slot is free again; OFFLINE is left alone.
    Release(TechnicianId),
}

impl SlotChange {
    #[must_use]
    pub const fn technician(&self) -> &TechnicianId {
        match self {
            Self::Reserve(id) | Self::Release(id) => id,
        }
    }
}

/// Update to a technician's performance aggregates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricsUpdate {
    Resolution {
        technician: TechnicianId,
        hours: f64,
    },
    Rating {
        technician: TechnicianId,
        rating: u8,
    },
}

/// One atomic unit of work against a store
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    ticket: TicketWrite,
    slots: Vec<SlotChange>,
    metrics: Vec<MetricsUpdate>,
    history: Vec<StatusHistoryEntry>,
    notes: Vec<AuditNote>,
}

impl ChangeSet {
    pub(crate) const fn new(ticket: TicketWrite) -> Self {
        Self {
            ticket,
            slots: Vec::new(),
            metrics: Vec::new(),
            history: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Start a change set that replaces `ticket`, bumping its version
    pub(crate) fn update(mut ticket: Ticket) -> Self {
        let expected_version = ticket.version;
        ticket.version = expected_version.wrapping_add(1);
        Self::new(TicketWrite::Update {
            ticket,
            expected_version,
        })
    }

    pub(crate) fn with_slot(mut self, slot: SlotChange) -> Self {
        self.slots.push(slot);
        self
    }

    pub(crate) fn with_metrics(mut self, update: MetricsUpdate) -> Self {
        self.metrics.push(update);
        self
    }

    pub(crate) fn with_history(mut self, entry: StatusHistoryEntry) -> Self {
        self.history.push(entry);
        self
    }

    pub(crate) fn with_note(mut self, note: AuditNote) -> Self {
        self.notes.push(note);
        self
    }

    #[must_use]
    pub const fn ticket(&self) -> &TicketWrite {
        &self.ticket
    }

    /// Slot movements in application order (releases before reserves)
    #[must_use]
    pub fn slots(&self) -> &[SlotChange] {
        &self.slots
    }

    #[must_use]
    pub fn metrics(&self) -> &[MetricsUpdate] {
        &self.metrics
    }

    #[must_use]
    pub fn history(&self) -> &[StatusHistoryEntry] {
        &self.history
    }

    #[must_use]
    pub fn notes(&self) -> &[AuditNote] {
        &self.notes
    }

    /// The ticket as it will look after commit, if it survives the change
    #[must_use]
    pub const fn resulting_ticket(&self) -> Option<&Ticket> {
        match &self.ticket {
            TicketWrite::Insert(ticket) | TicketWrite::Update { ticket, .. } => Some(ticket),
            TicketWrite::Delete { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CustomerId, Priority};

    #[test]
    fn test_update_bumps_version() {
        let mut ticket = Ticket::new(CustomerId::new(), "Email bounce", Priority::Medium);
        ticket.version = 4;

        let change = ChangeSet::update(ticket);
        match change.ticket() {
            TicketWrite::Update {
                ticket,
                expected_version,
            } => {
                assert_eq!(*expected_version, 4);
                assert_eq!(ticket.version, 5);
            },
            other => panic!("Expected update, got {other:?}"),
        }
    }

    #[test]
    fn test_slots_keep_order() {
        let old = TechnicianId::new();
        let new = TechnicianId::new();
        let ticket = Ticket::new(CustomerId::new(), "Laptop", Priority::Low);

        let change = ChangeSet::update(ticket)
            .with_slot(SlotChange::Release(old))
            .with_slot(SlotChange::Reserve(new));

        assert_eq!(
            change.slots(),
            &[SlotChange::Release(old), SlotChange::Reserve(new)]
        );
    }
}
