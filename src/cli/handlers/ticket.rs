//! Handlers for `ticket` subcommands

use super::HandlerContext;
use crate::core::{CustomerId, Priority, Status, Ticket, TicketId};
use crate::error::Result;

/// Print the outcome of a ticket mutation
pub(super) fn report_ticket(ctx: &HandlerContext, headline: &str, ticket: &Ticket) -> Result<()> {
    if ctx.formatter.is_json() {
        return ctx.formatter.print_json(&serde_json::json!({
            "status": "success",
            "ticket": ticket,
        }));
    }
    ctx.success(headline);
    print_ticket(ctx, ticket);
    Ok(())
}

fn print_ticket(ctx: &HandlerContext, ticket: &Ticket) {
    ctx.info(&format!("Ticket: {}", ticket.subject));
    ctx.info(&format!("ID: {}", ticket.id));
    ctx.info(&format!("Status: {}", ticket.status));
    ctx.info(&format!("Priority: {}", ticket.priority));
    match &ticket.assigned_to {
        Some(technician) => ctx.info(&format!("Assigned to: {technician}")),
        None => ctx.info("Assigned to: -"),
    }
    ctx.info(&format!(
        "Created: {}",
        ticket.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    if let Some(completed_at) = ticket.completed_at {
        ctx.info(&format!(
            "Completed: {}",
            completed_at.format("%Y-%m-%d %H:%M UTC")
        ));
    }
    if let Some(hours) = ticket.resolution_time_hours {
        ctx.info(&format!("Resolution time: {hours:.2}h"));
    }
    if let Some(notes) = &ticket.resolution_notes {
        ctx.info(&format!("Resolution: {notes}"));
    }
    if let Some(rating) = ticket.customer_rating {
        ctx.info(&format!("Rating: {rating}/5"));
    }
}

pub async fn handle_ticket_open(
    ctx: &HandlerContext,
    subject: &str,
    priority: Priority,
    customer: Option<CustomerId>,
) -> Result<()> {
    let customer = customer.unwrap_or_default();
    let ticket = ctx
        .engine
        .open_ticket(customer, subject, priority, &ctx.actor)
        .await?;
    report_ticket(ctx, &format!("Opened ticket {}", ticket.id.short()), &ticket)
}

pub async fn handle_ticket_show(ctx: &HandlerContext, ticket_id: &TicketId) -> Result<()> {
    let ticket = ctx.engine.ticket(ticket_id).await?;
    if ctx.formatter.is_json() {
        return ctx.formatter.print_json(&ticket);
    }
    print_ticket(ctx, &ticket);
    Ok(())
}

pub async fn handle_ticket_list(ctx: &HandlerContext, status: Option<Status>) -> Result<()> {
    let mut tickets: Vec<Ticket> = ctx
        .engine
        .tickets()
        .await?
        .into_iter()
        .filter(|t| status.is_none_or(|s| t.status == s))
        .collect();
    tickets.sort_by_key(|t| std::cmp::Reverse(t.created_at));

    if ctx.formatter.is_json() {
        return ctx.formatter.print_json(&tickets);
    }
    if tickets.is_empty() {
        ctx.info("No tickets found");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = tickets
        .iter()
        .map(|t| {
            vec![
                t.id.short(),
                t.status.to_string(),
                t.priority.to_string(),
                t.assigned_to.map_or_else(|| "-".to_string(), |id| id.short()),
                t.subject.clone(),
            ]
        })
        .collect();
    ctx.formatter
        .table(&["ID", "STATUS", "PRIORITY", "ASSIGNEE", "SUBJECT"], &rows);
    Ok(())
}

pub async fn handle_ticket_transition(
    ctx: &HandlerContext,
    ticket_id: &TicketId,
    status: Status,
    reason: Option<&str>,
) -> Result<()> {
    let ticket = ctx
        .engine
        .transition(ticket_id, &ctx.actor, status, reason.unwrap_or_default())
        .await?;
    report_ticket(
        ctx,
        &format!("Ticket {} is now {}", ticket.id.short(), ticket.status),
        &ticket,
    )
}

pub async fn handle_ticket_rate(ctx: &HandlerContext, ticket_id: &TicketId, rating: u8) -> Result<()> {
    let ticket = ctx.engine.record_rating(ticket_id, &ctx.actor, rating).await?;
    report_ticket(
        ctx,
        &format!("Recorded rating {rating}/5 for ticket {}", ticket.id.short()),
        &ticket,
    )
}

pub async fn handle_ticket_delete(ctx: &HandlerContext, ticket_id: &TicketId) -> Result<()> {
    let ticket = ctx.engine.delete_ticket(ticket_id, &ctx.actor).await?;
    if ctx.formatter.is_json() {
        return ctx.formatter.print_json(&serde_json::json!({
            "status": "success",
            "deleted": ticket.id,
        }));
    }
    ctx.success(&format!("Deleted ticket {} ({})", ticket.id.short(), ticket.subject));
    Ok(())
}
