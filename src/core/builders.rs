use super::{
    Availability, CustomerId, Priority, Status, TechnicianId, Technician, Ticket, TicketId,
};
use chrono::{DateTime, Utc};

/// Builder for creating Ticket instances
#[derive(Default)]
pub struct TicketBuilder {
    id: Option<TicketId>,
    subject: Option<String>,
    customer_id: Option<CustomerId>,
    status: Option<Status>,
    priority: Option<Priority>,
    assigned_to: Option<TechnicianId>,
    created_at: Option<DateTime<Utc>>,
    reopened_at: Option<DateTime<Utc>>,
}

impl TicketBuilder {
    /// Create a new ticket builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ticket ID
    #[must_use]
    pub const fn id(mut self, id: TicketId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the subject line
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the owning customer
    #[must_use]
    pub const fn customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    /// Set the status
    #[must_use]
    pub const fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the priority
    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the assigned technician
    #[must_use]
    pub const fn assigned_to(mut self, technician: TechnicianId) -> Self {
        self.assigned_to = Some(technician);
        self
    }

    /// Set `created_at` timestamp
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Set `reopened_at` timestamp
    #[must_use]
    pub const fn reopened_at(mut self, reopened_at: DateTime<Utc>) -> Self {
        self.reopened_at = Some(reopened_at);
        self
    }

    /// Build the ticket
    pub fn build(self) -> Ticket {
        Ticket {
            id: self.id.unwrap_or_default(),
            subject: self.subject.unwrap_or_default(),
            customer_id: self.customer_id.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            assigned_to: self.assigned_to,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            reopened_at: self.reopened_at,
            completed_at: None,
            resolution_notes: None,
            resolution_time_hours: None,
            time_spent_hours: None,
            customer_rating: None,
            version: 0,
        }
    }
}

/// Builder for creating Technician instances
///
/// The active-ticket counter of a built technician is always zero.
pub struct TechnicianBuilder {
    id: Option<TechnicianId>,
    name: Option<String>,
    can_handle_tickets: bool,
    availability: Availability,
    max_capacity: u32,
}

impl Default for TechnicianBuilder {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            can_handle_tickets: true,
            availability: Availability::Available,
            max_capacity: 1,
        }
    }
}

impl TechnicianBuilder {
    /// Create a new technician builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the technician ID
    #[must_use]
    pub const fn id(mut self, id: TechnicianId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the display name
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set whether the technician may be assigned tickets
    #[must_use]
    pub const fn can_handle_tickets(mut self, can_handle: bool) -> Self {
        self.can_handle_tickets = can_handle;
        self
    }

    /// Set availability
    #[must_use]
    pub const fn availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    /// Set maximum concurrent tickets
    #[must_use]
    pub const fn max_capacity(mut self, max_capacity: u32) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Build the technician
    pub fn build(self) -> Technician {
        Technician {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            can_handle_tickets: self.can_handle_tickets,
            availability: self.availability,
            max_capacity: self.max_capacity,
            current_tickets: 0,
        }
    }
}
