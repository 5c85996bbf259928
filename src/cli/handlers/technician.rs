//! Handlers for `technician` subcommands

use super::HandlerContext;
use crate::core::{Availability, Technician, TechnicianBuilder, TechnicianId};
use crate::error::Result;

pub async fn handle_technician_add(
    ctx: &HandlerContext,
    name: &str,
    capacity: u32,
    no_tickets: bool,
) -> Result<()> {
    let technician = TechnicianBuilder::new()
        .name(name)
        .max_capacity(capacity)
        .can_handle_tickets(!no_tickets)
        .build();
    let technician = ctx.engine.register_technician(technician).await?;

    if ctx.formatter.is_json() {
        ctx.formatter.print_json(&serde_json::json!({
            "status": "success",
            "technician": technician,
        }))?;
    } else {
        ctx.success(&format!(
            "Registered technician {} (capacity {})",
            technician.name, technician.max_capacity
        ));
        ctx.info(&format!("ID: {}", technician.id));
    }
    Ok(())
}

pub async fn handle_technician_availability(
    ctx: &HandlerContext,
    technician_id: &TechnicianId,
    availability: Availability,
) -> Result<()> {
    let technician = ctx
        .engine
        .set_availability(technician_id, availability)
        .await?;

    if ctx.formatter.is_json() {
        ctx.formatter.print_json(&serde_json::json!({
            "status": "success",
            "technician": technician,
        }))?;
    } else {
        ctx.success(&format!(
            "{} is now {}",
            technician.name, technician.availability
        ));
    }
    Ok(())
}

pub async fn handle_technician_list(ctx: &HandlerContext) -> Result<()> {
    let mut technicians = ctx.engine.technicians().await?;
    technicians.sort_by(|a, b| a.name.cmp(&b.name));

    if ctx.formatter.is_json() {
        return ctx.formatter.print_json(&technicians);
    }
    if technicians.is_empty() {
        ctx.info("No technicians registered");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = technicians.iter().map(technician_row).collect();
    ctx.formatter
        .table(&["ID", "NAME", "AVAILABILITY", "LOAD", "TICKETS"], &rows);
    Ok(())
}

pub async fn handle_technician_show(ctx: &HandlerContext, technician_id: &TechnicianId) -> Result<()> {
    let technician = ctx.engine.technician(technician_id).await?;
    let metrics = ctx.engine.metrics(technician_id).await?;

    if ctx.formatter.is_json() {
        return ctx.formatter.print_json(&serde_json::json!({
            "technician": technician,
            "metrics": metrics,
        }));
    }

    ctx.info(&format!("Technician: {}", technician.name));
    ctx.info(&format!("ID: {}", technician.id));
    ctx.info(&format!("Availability: {}", technician.availability));
    ctx.info(&format!(
        "Workload: {}/{} ({:.0}%)",
        technician.current_tickets,
        technician.max_capacity,
        technician.workload_percentage()
    ));
    if !technician.can_handle_tickets {
        ctx.warning("Not eligible for ticket assignment");
    }
    ctx.info(&format!(
        "Resolved: {} (avg {:.1}h)",
        metrics.tickets_resolved, metrics.avg_resolution_hours
    ));
    if metrics.ratings_count > 0 {
        ctx.info(&format!(
            "Rating: {:.1}/5 from {} ratings",
            metrics.avg_rating, metrics.ratings_count
        ));
    }
    Ok(())
}

fn technician_row(technician: &Technician) -> Vec<String> {
    vec![
        technician.id.short(),
        technician.name.clone(),
        technician.availability.to_string(),
        format!("{:.0}%", technician.workload_percentage()),
        format!("{}/{}", technician.current_tickets, technician.max_capacity),
    ]
}
