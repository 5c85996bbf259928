//! Command handlers
//!
//! Each handler takes a [`HandlerContext`] plus its own arguments, calls
//! into the engine and reports through the context's formatter.

mod base;
mod init;
#[cfg(feature = "api")]
mod serve;
mod technician;
mod ticket;
mod workflow;
mod workload;

pub use base::{HandlerContext, load_config};
pub use init::handle_init;
#[cfg(feature = "api")]
pub use serve::handle_serve;
pub use technician::{
    handle_technician_add, handle_technician_availability, handle_technician_list,
    handle_technician_show,
};
pub use ticket::{
    handle_ticket_delete, handle_ticket_list, handle_ticket_open, handle_ticket_rate,
    handle_ticket_show, handle_ticket_transition,
};
pub use workflow::{handle_assign, handle_complete, handle_history};
pub use workload::handle_workload;
