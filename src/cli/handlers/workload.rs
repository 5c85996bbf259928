//! Handler for the `workload` command

use super::HandlerContext;
use crate::engine::{TechnicianWorkload, WorkloadReport};
use crate::error::Result;
use std::io::Write;

pub async fn handle_workload(ctx: &HandlerContext, csv: bool, suggest: bool) -> Result<()> {
    let report = ctx.engine.workload().await?;

    if csv {
        let stdout = std::io::stdout();
        write_csv(stdout.lock(), &report.technicians)?;
        return Ok(());
    }

    let suggestions = if suggest {
        Some(ctx.engine.dispatch_suggestions().await?)
    } else {
        None
    };

    if ctx.formatter.is_json() {
        let mut payload = serde_json::to_value(&report)?;
        if let Some(suggestions) = &suggestions {
            payload["suggestions"] = serde_json::to_value(suggestions)?;
        }
        return ctx.formatter.print_json(&payload);
    }

    print_report(ctx, &report);

    if let Some(suggestions) = suggestions {
        ctx.info("");
        if suggestions.is_empty() {
            ctx.info("No assignments to suggest");
        } else {
            ctx.info("Suggested assignments:");
            let rows: Vec<Vec<String>> = suggestions
                .iter()
                .map(|s| {
                    vec![
                        s.ticket_id.short(),
                        s.priority.to_string(),
                        s.technician_name.clone(),
                        s.technician_id.to_string(),
                    ]
                })
                .collect();
            ctx.formatter
                .table(&["TICKET", "PRIORITY", "TECHNICIAN", "TECHNICIAN ID"], &rows);
        }
    }
    Ok(())
}

fn print_report(ctx: &HandlerContext, report: &WorkloadReport) {
    if report.technicians.is_empty() {
        ctx.info("No technicians can take tickets");
    } else {
        let rows: Vec<Vec<String>> = report
            .technicians
            .iter()
            .map(|w| {
                vec![
                    w.name.clone(),
                    w.availability.to_string(),
                    format!("{}/{}", w.current_tickets, w.max_capacity),
                    format!("{:.0}%", w.workload_percentage),
                    w.available_slots.to_string(),
                    if w.can_take_more_tickets { "yes" } else { "no" }.to_string(),
                ]
            })
            .collect();
        ctx.formatter
            .table(&["TECHNICIAN", "AVAILABILITY", "TICKETS", "LOAD", "FREE", "ACCEPTS"], &rows);
    }

    ctx.info("");
    if report.unassigned_queue.is_empty() {
        ctx.success("Unassigned queue is empty");
        return;
    }
    ctx.info(&format!("Unassigned queue ({}):", report.unassigned_queue.len()));
    let rows: Vec<Vec<String>> = report
        .unassigned_queue
        .iter()
        .map(|t| {
            vec![
                t.id.short(),
                t.priority.to_string(),
                t.created_at.format("%Y-%m-%d %H:%M").to_string(),
                t.subject.clone(),
            ]
        })
        .collect();
    ctx.formatter
        .table(&["ID", "PRIORITY", "OPENED", "SUBJECT"], &rows);
}

/// One CSV row per technician, with a header
fn write_csv<W: Write>(writer: W, workloads: &[TechnicianWorkload]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for workload in workloads {
        writer.serialize(workload)?;
    }
    writer.flush()?;
    Ok(())
}
