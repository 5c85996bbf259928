//! Core domain types
//!
//! Tickets, technicians, the audit trail and the acting identity. These types
//! carry no behaviour that touches storage; the engine and the stores operate
//! on them.

mod actor;
mod builders;
mod history;
mod technician;
mod ticket;

pub use actor::{Actor, ActorId};
pub use builders::{TechnicianBuilder, TicketBuilder};
pub use history::{AuditNote, StatusHistoryEntry};
pub use technician::{Availability, PerformanceMetrics, Technician};
pub use ticket::{Priority, Status, Ticket};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parse from the hyphenated string form
            pub fn parse_str(s: &str) -> std::result::Result<Self, uuid::Error> {
                Uuid::parse_str(s.trim()).map(Self)
            }

            /// First eight characters, for human-facing output
            #[must_use]
            pub fn short(&self) -> String {
                self.0.simple().to_string()[..8].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Self::parse_str(s)
            }
        }
    };
}

entity_id!(
    /// Identifier of a support ticket
    TicketId
);
entity_id!(
    /// Identifier of a technician
    TechnicianId
);
entity_id!(
    /// Identifier of the customer who owns a ticket
    CustomerId
);
