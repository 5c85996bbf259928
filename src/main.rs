//! service-desk - ticket lifecycle and technician assignment
//!
//! Entry point of the command-line tool. Parses arguments, sets up logging
//! and dispatches to the command handlers.

use anyhow::Context;
use clap::Parser;
use service_desk::ServiceDeskError;
use service_desk::cli::handlers::{self, HandlerContext};
use service_desk::cli::{Cli, Commands, GlobalOptions, OutputFormatter, TechnicianCommands, TicketCommands};
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let formatter = OutputFormatter::new(cli.json, cli.no_color);

    init_tracing(&cli);

    if let Err(e) = run(cli, formatter).await {
        handle_error(&e, &formatter);
        process::exit(1);
    }
}

/// `RUST_LOG` wins, then `--verbose`, then `logging.filter` from configuration
fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            let directive = handlers::load_config(&cli.global_options())
                .map(|config| config.logging.filter)
                .unwrap_or_else(|_| "warn".to_string());
            EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"))
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli, formatter: OutputFormatter) -> anyhow::Result<()> {
    let options = cli.global_options();

    if matches!(cli.command, Commands::Init) {
        return handlers::handle_init(&options, &formatter)
            .await
            .context("failed to initialize desk storage");
    }

    let ctx = HandlerContext::new(&options, formatter)
        .await
        .context("failed to open the service desk")?;
    let result = dispatch_command(cli.command, &ctx).await;
    ctx.finish().await;
    Ok(result?)
}

async fn dispatch_command(command: Commands, ctx: &HandlerContext) -> service_desk::Result<()> {
    match command {
        Commands::Init => unreachable!("init is handled before the context is built"),
        Commands::Technician { command } => dispatch_technician_command(command, ctx).await,
        Commands::Ticket { command } => dispatch_ticket_command(command, ctx).await,
        Commands::Assign {
            ticket,
            technician,
            reason,
        } => handlers::handle_assign(ctx, &ticket, &technician, reason.as_deref()).await,
        Commands::Complete {
            ticket,
            status,
            notes,
            hours,
        } => handlers::handle_complete(ctx, &ticket, status, &notes, hours).await,
        Commands::History { ticket, notes } => handlers::handle_history(ctx, &ticket, notes).await,
        Commands::Workload { csv, suggest } => handlers::handle_workload(ctx, csv, suggest).await,
        #[cfg(feature = "api")]
        Commands::Serve { host, port } => handlers::handle_serve(ctx, host, port).await,
    }
}

async fn dispatch_technician_command(
    command: TechnicianCommands,
    ctx: &HandlerContext,
) -> service_desk::Result<()> {
    match command {
        TechnicianCommands::Add {
            name,
            capacity,
            no_tickets,
        } => handlers::handle_technician_add(ctx, &name, capacity, no_tickets).await,
        TechnicianCommands::Availability {
            technician,
            availability,
        } => handlers::handle_technician_availability(ctx, &technician, availability).await,
        TechnicianCommands::List => handlers::handle_technician_list(ctx).await,
        TechnicianCommands::Show { technician } => {
            handlers::handle_technician_show(ctx, &technician).await
        },
    }
}

async fn dispatch_ticket_command(
    command: TicketCommands,
    ctx: &HandlerContext,
) -> service_desk::Result<()> {
    match command {
        TicketCommands::Open {
            subject,
            priority,
            customer,
        } => handlers::handle_ticket_open(ctx, &subject, priority, customer).await,
        TicketCommands::Show { ticket } => handlers::handle_ticket_show(ctx, &ticket).await,
        TicketCommands::List { status } => handlers::handle_ticket_list(ctx, status).await,
        TicketCommands::Transition {
            ticket,
            status,
            reason,
        } => handlers::handle_ticket_transition(ctx, &ticket, status, reason.as_deref()).await,
        TicketCommands::Rate { ticket, rating } => {
            handlers::handle_ticket_rate(ctx, &ticket, rating).await
        },
        TicketCommands::Delete { ticket } => handlers::handle_ticket_delete(ctx, &ticket).await,
    }
}

/// Report a failure on stderr, plus a JSON body in `--json` mode
fn handle_error(error: &anyhow::Error, formatter: &OutputFormatter) {
    let desk_error = error.downcast_ref::<ServiceDeskError>();
    formatter.error(&format!("{error:#}"));

    if let Some(ServiceDeskError::Unavailable(_)) = desk_error {
        formatter.warning("Hint: run `service-desk init` or check the storage settings");
    }

    if formatter.is_json() {
        let _ = formatter.print_json(&serde_json::json!({
            "status": "error",
            "error": desk_error.map_or("INTERNAL", ServiceDeskError::code),
            "message": format!("{error:#}"),
            "precondition": desk_error.is_some_and(ServiceDeskError::is_precondition),
        }));
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        eprintln!("\nDebug information:");
        eprintln!("{error:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let _cli = Cli::parse_from(["service-desk", "init"]);
        let _cli = Cli::parse_from(["service-desk", "workload", "--csv"]);
        let _cli = Cli::parse_from(["service-desk", "technician", "list"]);
    }

    #[test]
    fn test_global_options_carry_actor() {
        let id = "6f9b1a52-4a51-4d0e-9d8e-2f0e9b7e3c11";
        let cli = Cli::parse_from(["service-desk", "--as", id, "--admin", "workload"]);
        let options: GlobalOptions = cli.global_options();
        assert_eq!(options.actor.map(|a| a.to_string()).as_deref(), Some(id));
        assert!(options.admin);
    }
}
