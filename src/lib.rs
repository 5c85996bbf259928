//! service-desk - ticket lifecycle and technician assignment for a service desk
//!
//! This crate provides the engine behind a service desk's ticket handling:
//! - A status state machine for tickets (OPEN through CLOSED)
//! - Capacity-checked assignment and reassignment to technicians
//! - Resolution and closure with running performance metrics
//! - An append-only status history and audit trail
//! - Read-only workload views and a priority-ordered unassigned queue

// Allow missing error documentation for internal implementations
#![allow(clippy::missing_errors_doc)]
// Allow some pedantic lints that don't improve code quality
#![allow(clippy::option_if_let_else)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_self)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::redundant_clone)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::single_match_else)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::fn_params_excessive_bools)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::branches_sharing_code)]
#![allow(clippy::map_unwrap_or)]

//! # Consistency
//!
//! Every mutating operation is planned as a single change set and committed
//! atomically by the storage backend. A technician's `current_tickets`
//! counter always equals the number of tickets assigned to them in an active
//! status (OPEN, IN_PROGRESS or PENDING), including when two requests race
//! for the last free slot.
//!
//! # Example
//!
//! ```rust,ignore
//! use service_desk::config::EngineConfig;
//! use service_desk::core::{Actor, CustomerId, Priority, Status, Technician};
//! use service_desk::engine::TicketEngine;
//! use service_desk::notify::Notifier;
//! use service_desk::storage::MemoryStore;
//! use std::sync::Arc;
//!
//! let engine = TicketEngine::new(
//!     Arc::new(MemoryStore::new()),
//!     Notifier::disabled(),
//!     &EngineConfig::default(),
//! );
//! let technician = engine.register_technician(Technician::new("Ada", 3)).await?;
//! let ticket = engine
//!     .open_ticket(CustomerId::new(), "VPN drops", Priority::High, &Actor::system())
//!     .await?;
//! engine.assign(&ticket.id, &technician.id, &Actor::system(), None).await?;
//! engine
//!     .complete(&ticket.id, &Actor::technician(technician.id), Status::Resolved, "Rotated keys", None)
//!     .await?;
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod notify;
pub mod storage;

#[cfg(feature = "api")]
pub mod api;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use error::{Result, ServiceDeskError};
