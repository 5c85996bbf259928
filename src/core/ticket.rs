use super::{CustomerId, TechnicianId, TicketId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Open,
    InProgress,
    Pending,
    Resolved,
    Closed,
}

impl Status {
    pub const ALL: [Self; 5] = [
        Self::Open,
        Self::InProgress,
        Self::Pending,
        Self::Resolved,
        Self::Closed,
    ];

    /// Statuses that occupy a technician's capacity slot
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Open | Self::InProgress | Self::Pending)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::Pending => "PENDING",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "OPEN" => Ok(Self::Open),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "PENDING" => Ok(Self::Pending),
            "RESOLVED" => Ok(Self::Resolved),
            "CLOSED" => Ok(Self::Closed),
            _ => Err(format!(
                "Invalid status: {s}. Must be one of: open, in_progress, pending, resolved, closed"
            )),
        }
    }
}

/// Ticket priority; the derived ordering is LOW < MEDIUM < HIGH < URGENT
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(format!(
                "Invalid priority: {s}. Must be one of: low, medium, high, urgent"
            )),
        }
    }
}

/// A customer support ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub subject: String,
    pub customer_id: CustomerId,
    pub status: Status,
    pub priority: Priority,
    pub assigned_to: Option<TechnicianId>,
    pub created_at: DateTime<Utc>,
    /// Last time the ticket went from RESOLVED back to IN_PROGRESS
    pub reopened_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
    pub resolution_time_hours: Option<f64>,
    pub time_spent_hours: Option<f64>,
    pub customer_rating: Option<u8>,
    /// Bumped on every committed write; stores reject stale updates
    pub version: u32,
}

impl Ticket {
    /// Create a new, unassigned OPEN ticket
    pub fn new(customer_id: CustomerId, subject: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: TicketId::new(),
            subject: subject.into(),
            customer_id,
            status: Status::Open,
            priority,
            assigned_to: None,
            created_at: Utc::now(),
            reopened_at: None,
            completed_at: None,
            resolution_notes: None,
            resolution_time_hours: None,
            time_spent_hours: None,
            customer_rating: None,
            version: 0,
        }
    }

    /// Whether this ticket currently occupies a slot of the given technician
    #[must_use]
    pub fn occupies_slot_of(&self, technician: &TechnicianId) -> bool {
        self.status.is_active() && self.assigned_to.as_ref() == Some(technician)
    }

    #[must_use]
    pub const fn is_unassigned(&self) -> bool {
        self.assigned_to.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_activity() {
        assert!(Status::Open.is_active());
        assert!(Status::InProgress.is_active());
        assert!(Status::Pending.is_active());
        assert!(!Status::Resolved.is_active());
        assert!(!Status::Closed.is_active());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("in-progress".parse::<Status>(), Ok(Status::InProgress));
        assert_eq!("RESOLVED".parse::<Status>(), Ok(Status::Resolved));
        assert!("done".parse::<Status>().is_err());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Urgent > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
        assert_eq!("Urgent".parse::<Priority>(), Ok(Priority::Urgent));
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&Status::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
    }

    #[test]
    fn test_occupies_slot() {
        let technician = TechnicianId::new();
        let mut ticket = Ticket::new(CustomerId::new(), "Printer jam", Priority::Low);
        assert!(!ticket.occupies_slot_of(&technician));

        ticket.assigned_to = Some(technician);
        assert!(ticket.occupies_slot_of(&technician));

        ticket.status = Status::Resolved;
        assert!(!ticket.occupies_slot_of(&technician));
    }
}
