//! Handlers for `assign`, `complete` and `history`

use super::HandlerContext;
use super::ticket::report_ticket;
use crate::core::{Status, TechnicianId, TicketId};
use crate::error::Result;

pub async fn handle_assign(
    ctx: &HandlerContext,
    ticket_id: &TicketId,
    technician_id: &TechnicianId,
    reason: Option<&str>,
) -> Result<()> {
    let ticket = ctx
        .engine
        .assign(ticket_id, technician_id, &ctx.actor, reason)
        .await?;
    let technician = ctx.engine.technician(technician_id).await?;
    report_ticket(
        ctx,
        &format!(
            "Assigned ticket {} to {} ({}/{})",
            ticket.id.short(),
            technician.name,
            technician.current_tickets,
            technician.max_capacity
        ),
        &ticket,
    )
}

pub async fn handle_complete(
    ctx: &HandlerContext,
    ticket_id: &TicketId,
    status: Status,
    notes: &str,
    hours: Option<f64>,
) -> Result<()> {
    let ticket = ctx
        .engine
        .complete(ticket_id, &ctx.actor, status, notes, hours)
        .await?;
    report_ticket(
        ctx,
        &format!("Ticket {} marked {}", ticket.id.short(), ticket.status),
        &ticket,
    )
}

/// Status history, newest first, optionally with audit notes
pub async fn handle_history(ctx: &HandlerContext, ticket_id: &TicketId, with_notes: bool) -> Result<()> {
    let entries = ctx.engine.status_history(ticket_id).await?;
    let notes = if with_notes {
        ctx.engine.audit_notes(ticket_id).await?
    } else {
        Vec::new()
    };

    if ctx.formatter.is_json() {
        let mut payload = serde_json::json!({
            "ticket_id": ticket_id,
            "entries": entries,
        });
        if with_notes {
            payload["notes"] = serde_json::to_value(&notes)?;
        }
        return ctx.formatter.print_json(&payload);
    }

    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|entry| {
            vec![
                entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                entry
                    .prior_status
                    .map_or_else(|| "-".to_string(), |s| s.to_string()),
                entry.new_status.to_string(),
                entry.reason.clone(),
            ]
        })
        .collect();
    ctx.formatter.table(&["WHEN", "FROM", "TO", "REASON"], &rows);

    if with_notes && !notes.is_empty() {
        ctx.info("");
        ctx.info("Notes:");
        for note in &notes {
            ctx.info(&format!(
                "  {}  {}",
                note.created_at.format("%Y-%m-%d %H:%M:%S"),
                note.body
            ));
        }
    }
    Ok(())
}
