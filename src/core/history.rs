use super::{ActorId, Status, TicketId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One immutable entry of a ticket's status trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub ticket_id: TicketId,
    /// `None` for the entry written when the ticket was opened
    pub prior_status: Option<Status>,
    pub new_status: Status,
    pub actor_id: ActorId,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl StatusHistoryEntry {
    pub fn new(
        ticket_id: TicketId,
        prior_status: Option<Status>,
        new_status: Status,
        actor_id: ActorId,
        reason: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticket_id,
            prior_status,
            new_status,
            actor_id,
            reason: reason.into(),
            created_at,
        }
    }
}

/// Free-form note appended to a ticket's audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditNote {
    pub id: Uuid,
    pub ticket_id: TicketId,
    pub author_id: ActorId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl AuditNote {
    pub fn new(
        ticket_id: TicketId,
        author_id: ActorId,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticket_id,
            author_id,
            body: body.into(),
            created_at,
        }
    }
}
