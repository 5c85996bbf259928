use super::{TechnicianId, Ticket};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identity of whoever issues an engine call (technician or administrator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(Uuid);

impl ActorId {
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Whether this actor is the given technician
    #[must_use]
    pub fn is_technician(&self, technician: &TechnicianId) -> bool {
        self.0 == *technician.as_uuid()
    }
}

impl From<TechnicianId> for ActorId {
    fn from(id: TechnicianId) -> Self {
        Self(*id.as_uuid())
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ActorId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Caller context passed explicitly into every engine operation
///
/// The upstream permission gate decides whether the caller may use the
/// engine at all and whether it holds administrative override. The engine
/// itself only asks "is this the assignee, or an administrator?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub admin_override: bool,
}

impl Actor {
    #[must_use]
    pub fn technician(id: TechnicianId) -> Self {
        Self {
            id: id.into(),
            admin_override: false,
        }
    }

    #[must_use]
    pub const fn admin(id: ActorId) -> Self {
        Self {
            id,
            admin_override: true,
        }
    }

    /// Administrator identity with the nil id, for system-initiated calls
    #[must_use]
    pub fn system() -> Self {
        Self::admin(ActorId::from_uuid(Uuid::nil()))
    }

    /// Assignee-or-admin ownership check
    #[must_use]
    pub fn may_act_on(&self, ticket: &Ticket) -> bool {
        self.admin_override
            || ticket
                .assigned_to
                .as_ref()
                .is_some_and(|assignee| self.id.is_technician(assignee))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CustomerId, Priority};

    #[test]
    fn test_ownership_check() {
        let owner = TechnicianId::new();
        let other = TechnicianId::new();
        let mut ticket = Ticket::new(CustomerId::new(), "VPN down", Priority::High);
        ticket.assigned_to = Some(owner);

        assert!(Actor::technician(owner).may_act_on(&ticket));
        assert!(!Actor::technician(other).may_act_on(&ticket));
        assert!(Actor::system().may_act_on(&ticket));
    }

    #[test]
    fn test_unassigned_ticket_requires_admin() {
        let ticket = Ticket::new(CustomerId::new(), "Password reset", Priority::Low);
        assert!(!Actor::technician(TechnicianId::new()).may_act_on(&ticket));
        assert!(Actor::admin(ActorId::from_uuid(Uuid::new_v4())).may_act_on(&ticket));
    }
}
