use super::TechnicianId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a technician is accepting work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    #[default]
    Available,
    Busy,
    Offline,
}

impl Availability {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Busy => "BUSY",
            Self::Offline => "OFFLINE",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Availability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "available" => Ok(Self::Available),
            "busy" => Ok(Self::Busy),
            "offline" => Ok(Self::Offline),
            _ => Err(format!(
                "Invalid availability: {s}. Must be one of: available, busy, offline"
            )),
        }
    }
}

/// A technician and their capacity counter
///
/// `current_tickets` always equals the number of tickets assigned to this
/// technician whose status is active. Only change sets built by the engine
/// move it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technician {
    pub id: TechnicianId,
    pub name: String,
    pub can_handle_tickets: bool,
    pub availability: Availability,
    pub max_capacity: u32,
    pub current_tickets: u32,
}

impl Technician {
    /// Create an available technician with an empty workload
    pub fn new(name: impl Into<String>, max_capacity: u32) -> Self {
        Self {
            id: TechnicianId::new(),
            name: name.into(),
            can_handle_tickets: true,
            availability: Availability::Available,
            max_capacity,
            current_tickets: 0,
        }
    }

    /// Reason the technician cannot accept assignments, if any
    #[must_use]
    pub fn unavailability_reason(&self) -> Option<&'static str> {
        if !self.can_handle_tickets {
            Some("technician cannot handle tickets")
        } else if self.availability == Availability::Offline {
            Some("technician is offline")
        } else {
            None
        }
    }

    #[must_use]
    pub const fn has_free_slot(&self) -> bool {
        self.current_tickets < self.max_capacity
    }

    #[must_use]
    pub const fn available_slots(&self) -> u32 {
        self.max_capacity.saturating_sub(self.current_tickets)
    }

    #[must_use]
    pub fn workload_percentage(&self) -> f64 {
        if self.max_capacity == 0 {
            return 100.0;
        }
        f64::from(self.current_tickets) / f64::from(self.max_capacity) * 100.0
    }

    #[must_use]
    pub fn can_take_more_tickets(&self) -> bool {
        self.availability != Availability::Offline && self.has_free_slot()
    }
}

/// Per-technician performance aggregates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub tickets_resolved: u32,
    pub avg_resolution_hours: f64,
    pub ratings_count: u32,
    pub avg_rating: f64,
}

impl PerformanceMetrics {
    /// Fold one resolution into the running average
    pub fn record_resolution(&mut self, resolution_hours: f64) {
        let count = f64::from(self.tickets_resolved);
        self.avg_resolution_hours =
            self.avg_resolution_hours.mul_add(count, resolution_hours) / (count + 1.0);
        self.tickets_resolved += 1;
    }

    /// Fold one customer rating into the running average
    pub fn record_rating(&mut self, rating: u8) {
        let count = f64::from(self.ratings_count);
        self.avg_rating = self.avg_rating.mul_add(count, f64::from(rating)) / (count + 1.0);
        self.ratings_count += 1;
    }
}
