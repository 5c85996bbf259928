//! Command-line interface
//!
//! The argument tree lives here; [`handlers`] contains one module per
//! command group and [`output`] the formatter shared by all of them.

pub mod handlers;
pub mod output;

pub use output::OutputFormatter;

use crate::core::{ActorId, Availability, CustomerId, Priority, Status, TechnicianId, TicketId};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "service-desk")]
#[command(author, version, about = "Ticket lifecycle and technician assignment for a service desk", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (YAML)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Desk data file; implies the file backend
    #[arg(long, global = true, value_name = "PATH")]
    pub data: Option<PathBuf>,

    /// Act as this identity instead of the system administrator
    #[arg(long = "as", global = true, value_name = "ACTOR_ID")]
    pub actor: Option<ActorId>,

    /// Together with --as, act with administrative override
    #[arg(long, global = true, requires = "actor")]
    pub admin: bool,
}

impl Cli {
    #[must_use]
    pub fn global_options(&self) -> GlobalOptions {
        GlobalOptions {
            config: self.config.clone(),
            data: self.data.clone(),
            actor: self.actor,
            admin: self.admin,
        }
    }
}

/// Flags every handler needs to build its context
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub data: Option<PathBuf>,
    pub actor: Option<ActorId>,
    pub admin: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the desk data store
    Init,

    /// Manage technicians
    Technician {
        #[command(subcommand)]
        command: TechnicianCommands,
    },

    /// Open, inspect and move tickets
    Ticket {
        #[command(subcommand)]
        command: TicketCommands,
    },

    /// Assign or reassign a ticket to a technician
    Assign {
        ticket: TicketId,
        technician: TechnicianId,

        /// Reason recorded in the audit trail
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// Resolve or close a ticket
    Complete {
        ticket: TicketId,

        /// Target status (resolved or closed)
        #[arg(short, long, default_value = "resolved")]
        status: Status,

        /// Resolution notes
        #[arg(short, long)]
        notes: String,

        /// Hours spent working on the ticket
        #[arg(long)]
        hours: Option<f64>,
    },

    /// Show the status history of a ticket, newest first
    History {
        ticket: TicketId,

        /// Include audit notes
        #[arg(long)]
        notes: bool,
    },

    /// Show technician workload and the unassigned queue
    Workload {
        /// Emit technician workloads as CSV
        #[arg(long, conflicts_with = "suggest")]
        csv: bool,

        /// Propose assignments for the unassigned queue
        #[arg(long)]
        suggest: bool,
    },

    /// Serve the HTTP API
    #[cfg(feature = "api")]
    Serve {
        /// Bind address (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TechnicianCommands {
    /// Register a technician
    Add {
        name: String,

        /// Maximum concurrent active tickets
        #[arg(short, long, default_value_t = 5)]
        capacity: u32,

        /// Register without the ability to take tickets
        #[arg(long)]
        no_tickets: bool,
    },

    /// Set availability (available, busy, offline)
    Availability {
        technician: TechnicianId,
        availability: Availability,
    },

    /// List technicians
    List,

    /// Show a technician with performance metrics
    Show { technician: TechnicianId },
}

#[derive(Subcommand, Debug)]
pub enum TicketCommands {
    /// Open a new ticket
    Open {
        subject: String,

        /// low, medium, high or urgent
        #[arg(short, long, default_value = "medium")]
        priority: Priority,

        /// Owning customer; a new id is generated when omitted
        #[arg(long)]
        customer: Option<CustomerId>,
    },

    /// Show a ticket
    Show { ticket: TicketId },

    /// List tickets
    List {
        #[arg(short, long)]
        status: Option<Status>,
    },

    /// Move a ticket to another status
    Transition {
        ticket: TicketId,
        status: Status,

        #[arg(short, long)]
        reason: Option<String>,
    },

    /// Record the customer's rating (1-5)
    Rate { ticket: TicketId, rating: u8 },

    /// Delete a ticket (administrators only)
    Delete { ticket: TicketId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["service-desk", "init"]);
        assert!(matches!(cli.command, Commands::Init));

        let cli = Cli::parse_from([
            "service-desk",
            "--json",
            "ticket",
            "open",
            "Laptop will not boot",
            "--priority",
            "urgent",
        ]);
        assert!(cli.json);
        match cli.command {
            Commands::Ticket {
                command: TicketCommands::Open { subject, priority, customer },
            } => {
                assert_eq!(subject, "Laptop will not boot");
                assert_eq!(priority, Priority::Urgent);
                assert!(customer.is_none());
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_complete_defaults_to_resolved() {
        let id = TicketId::new().to_string();
        let cli = Cli::parse_from(["service-desk", "complete", &id, "--notes", "Fixed"]);
        match cli.command {
            Commands::Complete { status, hours, .. } => {
                assert_eq!(status, Status::Resolved);
                assert!(hours.is_none());
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_admin_requires_actor() {
        assert!(Cli::try_parse_from(["service-desk", "--admin", "workload"]).is_err());
        assert!(Cli::try_parse_from(["service-desk", "ticket", "rate", "not-an-id", "5"]).is_err());
    }
}
