//! Error types for the service desk engine
//!
//! Every failure the engine reports to a caller is a variant of
//! [`ServiceDeskError`]. Precondition failures are raised before any write,
//! so receiving one of them guarantees that no ticket, counter, history or
//! metric changed.

use crate::core::Status;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ServiceDeskError>;

/// Errors produced by the ticket lifecycle engine and its storage backends
#[derive(Error, Debug)]
pub enum ServiceDeskError {
    /// A ticket or technician does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The actor is neither the assignee nor an administrator
    #[error("Actor {actor} is not allowed to modify ticket {ticket}")]
    Forbidden { actor: String, ticket: String },

    /// The technician is offline or cannot handle tickets
    #[error("Technician {id} is unavailable: {reason}")]
    TechnicianUnavailable { id: String, reason: String },

    /// Taking the ticket would exceed the technician's concurrent capacity
    #[error("Technician {id} is at capacity ({current}/{max})")]
    CapacityExceeded { id: String, current: u32, max: u32 },

    /// The requested move is not in the status transition table
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: Status, to: Status },

    #[error("Ticket {id} is already closed")]
    AlreadyClosed { id: String },

    /// A required field is missing or malformed
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// The ticket changed between read and commit; the engine retries these
    #[error("Ticket {id} was modified concurrently")]
    Conflict { id: String },

    /// Storage could not be reached in time
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Persisted state contradicts an engine invariant
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl ServiceDeskError {
    /// Shorthand for a missing ticket
    pub fn ticket_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "Ticket",
            id: id.to_string(),
        }
    }

    /// Shorthand for a missing technician
    pub fn technician_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "Technician",
            id: id.to_string(),
        }
    }

    /// Shorthand for a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// Stable machine-readable code, used by the HTTP API and JSON output
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::TechnicianUnavailable { .. } => "TECHNICIAN_UNAVAILABLE",
            Self::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::AlreadyClosed { .. } => "ALREADY_CLOSED",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::Conflict { .. } => "CONFLICT",
            Self::Unavailable(_) => "UNAVAILABLE",
            _ => "INTERNAL",
        }
    }

    /// Whether the error is a caller-facing precondition failure
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Forbidden { .. }
                | Self::TechnicianUnavailable { .. }
                | Self::CapacityExceeded { .. }
                | Self::InvalidTransition { .. }
                | Self::AlreadyClosed { .. }
                | Self::ValidationError(_)
        )
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for ServiceDeskError {
    fn from(error: sqlx::Error) -> Self {
        if is_lock_timeout(&error) {
            return Self::Unavailable(error.to_string());
        }
        match error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(error.to_string())
            },
            other => Self::Database(other),
        }
    }
}

/// `SQLITE_BUSY` / `SQLITE_LOCKED`, including their extended codes (517, 262, ...)
#[cfg(feature = "database")]
fn is_lock_timeout(error: &sqlx::Error) -> bool {
    const SQLITE_BUSY: i32 = 5;
    const SQLITE_LOCKED: i32 = 6;

    let sqlx::Error::Database(db) = error else {
        return false;
    };
    db.code()
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
}
