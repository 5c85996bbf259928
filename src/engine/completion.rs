//! Resolution, closure and the remaining lifecycle moves

use super::ConflictRetry;
use super::state_machine::{enters_active_set, leaves_active_set, validate_transition};
use crate::config::ResolutionClock;
use crate::core::{Actor, AuditNote, StatusHistoryEntry, Status, Technician, Ticket, TicketId};
use crate::error::{Result, ServiceDeskError};
use crate::notify::{NotificationKind, NotificationRequest, Notifier};
use crate::storage::{ChangeSet, DeskStore, MetricsUpdate, SlotChange, TicketWrite};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Hours between the resolution baseline and `now`
#[must_use]
pub fn resolution_hours(ticket: &Ticket, now: DateTime<Utc>, clock: ResolutionClock) -> f64 {
    let baseline = match (clock, ticket.reopened_at) {
        (ResolutionClock::FromLastReopen, Some(reopened_at)) => reopened_at,
        _ => ticket.created_at,
    };
    #[allow(clippy::cast_precision_loss)]
    let hours = (now - baseline).num_milliseconds() as f64 / MILLIS_PER_HOUR;
    hours.max(0.0)
}

/// Owns every move out of (and back into) the active statuses
///
/// Capacity is released exactly once, on the move that leaves the active
/// set, and reserved again when a resolved ticket is reopened.
#[derive(Clone)]
pub struct CompletionHandler {
    store: Arc<dyn DeskStore>,
    notifier: Notifier,
    retry: ConflictRetry,
    clock: ResolutionClock,
}

struct Planned {
    change: ChangeSet,
    ticket: Ticket,
    notifications: Vec<NotificationRequest>,
}

impl Planned {
    fn new(change: ChangeSet) -> Result<Self> {
        let ticket = change.resulting_ticket().cloned().ok_or_else(|| {
            ServiceDeskError::InvariantViolation("change set has no resulting ticket".to_string())
        })?;
        Ok(Self {
            change,
            ticket,
            notifications: Vec::new(),
        })
    }
}

impl CompletionHandler {
    pub(crate) fn new(
        store: Arc<dyn DeskStore>,
        notifier: Notifier,
        retry: ConflictRetry,
        clock: ResolutionClock,
    ) -> Self {
        Self {
            store,
            notifier,
            retry,
            clock,
        }
    }

    /// Resolve or close a ticket
    ///
    /// Checks run in this order: `NotFound`, `AlreadyClosed`,
    /// `ValidationError`, `InvalidTransition`, `Forbidden`.
    pub async fn complete(
        &self,
        ticket_id: &TicketId,
        actor: &Actor,
        target: Status,
        resolution_notes: &str,
        time_spent_hours: Option<f64>,
    ) -> Result<Ticket> {
        let mut attempt = 0;
        let planned = loop {
            let planned = self
                .plan_completion(ticket_id, actor, target, resolution_notes, time_spent_hours)
                .await?;
            match self.store.apply(planned.change.clone()).await {
                Ok(()) => break planned,
                Err(e) => self.retry.check(attempt, e)?,
            }
            attempt += 1;
        };

        info!(
            "Ticket {} moved to {} by {}",
            planned.ticket.id.short(),
            planned.ticket.status,
            actor.id
        );
        self.notifier.emit_all(planned.notifications);
        Ok(planned.ticket)
    }

    async fn plan_completion(
        &self,
        ticket_id: &TicketId,
        actor: &Actor,
        target: Status,
        resolution_notes: &str,
        time_spent_hours: Option<f64>,
    ) -> Result<Planned> {
        let ticket = self.store.ticket(ticket_id).await?;
        if ticket.status == Status::Closed {
            return Err(ServiceDeskError::AlreadyClosed {
                id: ticket.id.to_string(),
            });
        }

        if !matches!(target, Status::Resolved | Status::Closed) {
            return Err(ServiceDeskError::validation(format!(
                "Completion target must be RESOLVED or CLOSED, got {target}"
            )));
        }
        let notes = resolution_notes.trim();
        if notes.is_empty() {
            return Err(ServiceDeskError::validation("Resolution notes are required"));
        }
        if let Some(hours) = time_spent_hours {
            if !hours.is_finite() || hours < 0.0 {
                return Err(ServiceDeskError::validation(format!(
                    "Time spent must be a non-negative number of hours, got {hours}"
                )));
            }
        }

        validate_transition(ticket.status, target)?;
        ensure_may_act(actor, &ticket)?;

        let now = Utc::now();
        let mut next = ticket.clone();
        next.status = target;
        next.completed_at = Some(now);
        next.resolution_notes = Some(notes.to_string());
        if time_spent_hours.is_some() {
            next.time_spent_hours = time_spent_hours;
        }

        let releases = leaves_active_set(ticket.status, target);
        let mut hours = None;
        if releases {
            let elapsed = resolution_hours(&ticket, now, self.clock);
            next.resolution_time_hours = Some(elapsed);
            hours = Some(elapsed);
        }

        let mut change = ChangeSet::update(next);
        if let (Some(technician), Some(hours)) = (ticket.assigned_to, hours) {
            change = change
                .with_slot(SlotChange::Release(technician))
                .with_metrics(MetricsUpdate::Resolution { technician, hours });
        }
        let change = change
            .with_history(StatusHistoryEntry::new(
                ticket.id,
                Some(ticket.status),
                target,
                actor.id,
                notes,
                now,
            ))
            .with_note(AuditNote::new(
                ticket.id,
                actor.id,
                format!("{target}: {notes}"),
                now,
            ));

        let mut planned = Planned::new(change)?;
        let kind = if target == Status::Closed {
            NotificationKind::TicketClosed
        } else {
            NotificationKind::TicketResolved
        };
        planned
            .notifications
            .push(NotificationRequest::to_customer(kind, &planned.ticket).with_notes(notes));
        Ok(planned)
    }

    /// Any other state-machine move
    ///
    /// RESOLVED and CLOSED targets go through [`Self::complete`] with `reason`
    /// as the resolution notes. Reopening (RESOLVED to IN_PROGRESS) reserves
    /// the assignee's slot again and may fail with `CapacityExceeded`.
    pub async fn transition(
        &self,
        ticket_id: &TicketId,
        actor: &Actor,
        to: Status,
        reason: &str,
    ) -> Result<Ticket> {
        if matches!(to, Status::Resolved | Status::Closed) {
            let current = self.store.ticket(ticket_id).await?;
            if current.status == Status::Closed {
                return Err(ServiceDeskError::InvalidTransition {
                    from: Status::Closed,
                    to,
                });
            }
            return self.complete(ticket_id, actor, to, reason, None).await;
        }

        let mut attempt = 0;
        let planned = loop {
            let planned = self.plan_transition(ticket_id, actor, to, reason).await?;
            match self.store.apply(planned.change.clone()).await {
                Ok(()) => break planned,
                Err(e) => self.retry.check(attempt, e)?,
            }
            attempt += 1;
        };

        info!(
            "Ticket {} moved to {} by {}",
            planned.ticket.id.short(),
            planned.ticket.status,
            actor.id
        );
        self.notifier.emit_all(planned.notifications);
        Ok(planned.ticket)
    }

    async fn plan_transition(
        &self,
        ticket_id: &TicketId,
        actor: &Actor,
        to: Status,
        reason: &str,
    ) -> Result<Planned> {
        let ticket = self.store.ticket(ticket_id).await?;
        validate_transition(ticket.status, to)?;
        ensure_may_act(actor, &ticket)?;
        if to != Status::Open && ticket.is_unassigned() {
            return Err(ServiceDeskError::validation(format!(
                "Ticket {} must be assigned before it can move to {to}",
                ticket.id
            )));
        }

        let reason = match reason.trim() {
            "" => format!("Status changed from {} to {}", ticket.status, to),
            given => given.to_string(),
        };
        let now = Utc::now();
        let reopening = enters_active_set(ticket.status, to);

        let mut next = ticket.clone();
        next.status = to;
        if reopening {
            next.completed_at = None;
            next.resolution_time_hours = None;
            next.reopened_at = Some(now);
        }

        let mut change = ChangeSet::update(next);
        let mut reopened_for: Option<Technician> = None;
        if reopening {
            if let Some(technician_id) = ticket.assigned_to {
                reopened_for = Some(self.store.technician(&technician_id).await?);
                change = change.with_slot(SlotChange::Reserve(technician_id));
            }
        }
        let change = change
            .with_history(StatusHistoryEntry::new(
                ticket.id,
                Some(ticket.status),
                to,
                actor.id,
                reason,
                now,
            ));

        let mut planned = Planned::new(change)?;
        if let Some(technician) = reopened_for {
            planned.notifications.push(NotificationRequest::to_technician(
                NotificationKind::TicketReopened,
                &technician,
                &planned.ticket,
            ));
        }
        Ok(planned)
    }

    /// Record the customer's 1-5 rating of a resolved or closed ticket
    pub async fn record_rating(
        &self,
        ticket_id: &TicketId,
        actor: &Actor,
        rating: u8,
    ) -> Result<Ticket> {
        let mut attempt = 0;
        loop {
            let ticket = self.store.ticket(ticket_id).await?;
            if !(1..=5).contains(&rating) {
                return Err(ServiceDeskError::validation(format!(
                    "Rating must be between 1 and 5, got {rating}"
                )));
            }
            if !matches!(ticket.status, Status::Resolved | Status::Closed) {
                return Err(ServiceDeskError::validation(format!(
                    "Only resolved or closed tickets can be rated; ticket {} is {}",
                    ticket.id, ticket.status
                )));
            }
            let Some(technician) = ticket.assigned_to else {
                return Err(ServiceDeskError::validation(format!(
                    "Ticket {} was never assigned, there is nobody to rate",
                    ticket.id
                )));
            };
            if ticket.customer_rating.is_some() {
                return Err(ServiceDeskError::validation(format!(
                    "Ticket {} has already been rated",
                    ticket.id
                )));
            }

            let now = Utc::now();
            let mut next = ticket.clone();
            next.customer_rating = Some(rating);
            let change = ChangeSet::update(next)
                .with_metrics(MetricsUpdate::Rating { technician, rating })
                .with_note(AuditNote::new(
                    ticket.id,
                    actor.id,
                    format!("Customer rating: {rating}/5"),
                    now,
                ));
            let planned = Planned::new(change)?;

            match self.store.apply(planned.change).await {
                Ok(()) => {
                    debug!("Ticket {} rated {}/5", ticket.id.short(), rating);
                    return Ok(planned.ticket);
                },
                Err(e) => self.retry.check(attempt, e)?,
            }
            attempt += 1;
        }
    }

    /// Remove a ticket (administrators only), freeing its slot if active
    ///
    /// The status history and audit notes of the ticket are kept.
    pub async fn delete(&self, ticket_id: &TicketId, actor: &Actor) -> Result<Ticket> {
        let mut attempt = 0;
        loop {
            let ticket = self.store.ticket(ticket_id).await?;
            if !actor.admin_override {
                return Err(ServiceDeskError::Forbidden {
                    actor: actor.id.to_string(),
                    ticket: ticket.id.to_string(),
                });
            }

            let mut change = ChangeSet::new(TicketWrite::Delete {
                id: ticket.id,
                expected_version: ticket.version,
            });
            if ticket.status.is_active() {
                if let Some(technician) = ticket.assigned_to {
                    change = change.with_slot(SlotChange::Release(technician));
                }
            }
            let change = change.with_note(AuditNote::new(
                ticket.id,
                actor.id,
                format!("Ticket deleted while {}", ticket.status),
                Utc::now(),
            ));

            match self.store.apply(change).await {
                Ok(()) => {
                    info!("Deleted ticket {}", ticket.id.short());
                    return Ok(ticket);
                },
                Err(e) => self.retry.check(attempt, e)?,
            }
            attempt += 1;
        }
    }
}

fn ensure_may_act(actor: &Actor, ticket: &Ticket) -> Result<()> {
    if actor.may_act_on(ticket) {
        Ok(())
    } else {
        Err(ServiceDeskError::Forbidden {
            actor: actor.id.to_string(),
            ticket: ticket.id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::{Availability, Priority, TicketBuilder};
    use crate::engine::TicketEngine;
    use crate::notify::Notifier;
    use crate::test_utils::{ConflictingStore, TestDesk, create_test_ticket};
    use chrono::Duration;

    #[tokio::test]
    async fn test_resolving_last_ticket_frees_technician() {
        let desk = TestDesk::new();
        let technician = desk.technician("Grace", 1).await;
        let ticket = desk.assigned("Compiler crash", &technician).await;
        assert_eq!(desk.availability(&technician.id).await, Availability::Busy);

        let resolved = desk
            .engine
            .complete(
                &ticket.id,
                &Actor::technician(technician.id),
                Status::Resolved,
                "Patched the optimizer",
                Some(1.5),
            )
            .await
            .unwrap();

        assert_eq!(resolved.status, Status::Resolved);
        assert!(resolved.completed_at.is_some());
        assert!(resolved.resolution_time_hours.is_some());
        assert_eq!(resolved.time_spent_hours, Some(1.5));
        assert_eq!(desk.counter(&technician.id).await, 0);
        assert_eq!(desk.availability(&technician.id).await, Availability::Available);
        desk.assert_counters_consistent();

        let metrics = desk.engine.metrics(&technician.id).await.unwrap();
        assert_eq!(metrics.tickets_resolved, 1);
    }

    #[tokio::test]
    async fn test_closing_resolved_ticket_keeps_counters_and_metrics() {
        let desk = TestDesk::new();
        let technician = desk.technician("Donald", 2).await;
        let ticket = desk.assigned("Typesetting", &technician).await;
        let actor = Actor::technician(technician.id);

        let resolved = desk
            .engine
            .complete(&ticket.id, &actor, Status::Resolved, "Fixed kerning", None)
            .await
            .unwrap();
        let closed = desk
            .engine
            .complete(&ticket.id, &actor, Status::Closed, "Customer confirmed", None)
            .await
            .unwrap();

        assert_eq!(closed.status, Status::Closed);
        assert_eq!(closed.resolution_time_hours, resolved.resolution_time_hours);
        assert_eq!(desk.counter(&technician.id).await, 0);
        let metrics = desk.engine.metrics(&technician.id).await.unwrap();
        assert_eq!(metrics.tickets_resolved, 1);
        desk.assert_counters_consistent();
    }

    #[tokio::test]
    async fn test_completing_closed_ticket_fails() {
        let desk = TestDesk::new();
        let ticket = desk.open("Old request", Priority::Low).await;
        desk.engine
            .complete(&ticket.id, &Actor::system(), Status::Closed, "Duplicate", None)
            .await
            .unwrap();

        let again = desk
            .engine
            .complete(&ticket.id, &Actor::system(), Status::Closed, "Duplicate", None)
            .await;
        assert!(matches!(again, Err(ServiceDeskError::AlreadyClosed { .. })));
    }

    #[tokio::test]
    async fn test_open_ticket_can_be_resolved_directly() {
        let desk = TestDesk::new();
        let ticket = desk.open("Question answered by phone", Priority::Low).await;

        let resolved = desk
            .engine
            .complete(&ticket.id, &Actor::system(), Status::Resolved, "Answered", None)
            .await
            .unwrap();
        assert_eq!(resolved.status, Status::Resolved);
        desk.assert_counters_consistent();
    }

    #[tokio::test]
    async fn test_only_assignee_or_admin_may_complete() {
        let desk = TestDesk::new();
        let owner = desk.technician("Leslie", 2).await;
        let stranger = desk.technician("Butler", 2).await;
        let ticket = desk.assigned("Clock drift", &owner).await;
        let before = desk.snapshot();

        let result = desk
            .engine
            .complete(
                &ticket.id,
                &Actor::technician(stranger.id),
                Status::Resolved,
                "Synced NTP",
                None,
            )
            .await;

        assert!(matches!(result, Err(ServiceDeskError::Forbidden { .. })));
        assert_eq!(desk.snapshot(), before);
    }

    #[tokio::test]
    async fn test_completion_validation() {
        let desk = TestDesk::new();
        let technician = desk.technician("Tim", 2).await;
        let ticket = desk.assigned("Web page down", &technician).await;
        let actor = Actor::technician(technician.id);

        for (target, notes, hours) in [
            (Status::Resolved, "   ", None),
            (Status::Pending, "notes", None),
            (Status::Resolved, "notes", Some(-1.0)),
            (Status::Resolved, "notes", Some(f64::NAN)),
        ] {
            let result = desk
                .engine
                .complete(&ticket.id, &actor, target, notes, hours)
                .await;
            assert!(
                matches!(result, Err(ServiceDeskError::ValidationError(_))),
                "{target} {notes:?} {hours:?}"
            );
        }
        assert_eq!(desk.counter(&technician.id).await, 1);
    }

    #[tokio::test]
    async fn test_closed_ticket_cannot_move() {
        let desk = TestDesk::new();
        let ticket = desk.open("Archive", Priority::Low).await;
        desk.engine
            .complete(&ticket.id, &Actor::system(), Status::Closed, "Won't fix", None)
            .await
            .unwrap();

        for to in Status::ALL {
            let result = desk
                .engine
                .transition(&ticket.id, &Actor::system(), to, "try")
                .await;
            assert!(
                matches!(result, Err(ServiceDeskError::InvalidTransition { .. })),
                "{to}"
            );
        }
    }

    #[tokio::test]
    async fn test_pending_round_trip_keeps_slot() {
        let desk = TestDesk::new();
        let technician = desk.technician("Alan", 2).await;
        let ticket = desk.assigned("Waiting on parts", &technician).await;
        let actor = Actor::technician(technician.id);

        let pending = desk
            .engine
            .transition(&ticket.id, &actor, Status::Pending, "parts ordered")
            .await
            .unwrap();
        assert_eq!(pending.status, Status::Pending);
        assert_eq!(desk.counter(&technician.id).await, 1);

        let back = desk
            .engine
            .transition(&ticket.id, &actor, Status::InProgress, "")
            .await
            .unwrap();
        assert_eq!(back.status, Status::InProgress);
        assert_eq!(desk.counter(&technician.id).await, 1);

        let history = desk.engine.status_history(&ticket.id).await.unwrap();
        assert_eq!(history[0].reason, "Status changed from PENDING to IN_PROGRESS");
        desk.assert_counters_consistent();
    }

    #[tokio::test]
    async fn test_transition_to_resolved_routes_through_completion() {
        let desk = TestDesk::new();
        let technician = desk.technician("Radia", 1).await;
        let ticket = desk.assigned("Spanning tree loop", &technician).await;

        let resolved = desk
            .engine
            .transition(
                &ticket.id,
                &Actor::technician(technician.id),
                Status::Resolved,
                "Removed loop",
            )
            .await
            .unwrap();

        assert_eq!(resolved.resolution_notes.as_deref(), Some("Removed loop"));
        assert_eq!(desk.counter(&technician.id).await, 0);
    }

    #[tokio::test]
    async fn test_reopen_reserves_slot_again() {
        let desk = TestDesk::new();
        let technician = desk.technician("Barbara", 1).await;
        let ticket = desk.assigned("Login loop", &technician).await;
        let actor = Actor::technician(technician.id);
        desk.engine
            .complete(&ticket.id, &actor, Status::Resolved, "Cleared cookies", None)
            .await
            .unwrap();

        let reopened = desk
            .engine
            .transition(&ticket.id, &actor, Status::InProgress, "Came back")
            .await
            .unwrap();

        assert_eq!(reopened.status, Status::InProgress);
        assert!(reopened.completed_at.is_none());
        assert!(reopened.reopened_at.is_some());
        assert_eq!(desk.counter(&technician.id).await, 1);
        assert_eq!(desk.availability(&technician.id).await, Availability::Busy);
        assert!(
            desk.drain_notifications()
                .iter()
                .any(|n| n.kind == NotificationKind::TicketReopened)
        );
        desk.assert_counters_consistent();
    }

    #[tokio::test]
    async fn test_reopen_respects_capacity() {
        let desk = TestDesk::new();
        let technician = desk.technician("Jean", 1).await;
        let first = desk.assigned("First", &technician).await;
        let actor = Actor::technician(technician.id);
        desk.engine
            .complete(&first.id, &actor, Status::Resolved, "done", None)
            .await
            .unwrap();
        desk.assigned("Second", &technician).await;

        let result = desk
            .engine
            .transition(&first.id, &actor, Status::InProgress, "not fixed")
            .await;

        assert!(matches!(
            result,
            Err(ServiceDeskError::CapacityExceeded { .. })
        ));
        assert_eq!(
            desk.engine.ticket(&first.id).await.unwrap().status,
            Status::Resolved
        );
        desk.assert_counters_consistent();
    }

    #[tokio::test]
    async fn test_unassigned_ticket_cannot_start() {
        let desk = TestDesk::new();
        let ticket = desk.open("Nobody yet", Priority::Low).await;

        let result = desk
            .engine
            .transition(&ticket.id, &Actor::system(), Status::InProgress, "")
            .await;
        assert!(matches!(result, Err(ServiceDeskError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_rating_updates_running_average() {
        let desk = TestDesk::new();
        let technician = desk.technician("Kathleen", 2).await;
        let customer = Actor::system();

        for (subject, rating) in [("One", 5), ("Two", 3)] {
            let ticket = desk.assigned(subject, &technician).await;
            desk.engine
                .complete(&ticket.id, &customer, Status::Resolved, "ok", None)
                .await
                .unwrap();
            let rated = desk
                .engine
                .record_rating(&ticket.id, &customer, rating)
                .await
                .unwrap();
            assert_eq!(rated.customer_rating, Some(rating));
        }

        let metrics = desk.engine.metrics(&technician.id).await.unwrap();
        assert_eq!(metrics.ratings_count, 2);
        assert!((metrics.avg_rating - 4.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_rating_rules() {
        let desk = TestDesk::new();
        let technician = desk.technician("Lynn", 2).await;
        let active = desk.assigned("Active", &technician).await;
        let done = desk.assigned("Done", &technician).await;
        desk.engine
            .complete(&done.id, &Actor::system(), Status::Resolved, "ok", None)
            .await
            .unwrap();

        let not_resolved = desk
            .engine
            .record_rating(&active.id, &Actor::system(), 4)
            .await;
        assert!(matches!(not_resolved, Err(ServiceDeskError::ValidationError(_))));

        let out_of_range = desk
            .engine
            .record_rating(&done.id, &Actor::system(), 6)
            .await;
        assert!(matches!(out_of_range, Err(ServiceDeskError::ValidationError(_))));

        desk.engine
            .record_rating(&done.id, &Actor::system(), 4)
            .await
            .unwrap();
        let twice = desk
            .engine
            .record_rating(&done.id, &Actor::system(), 5)
            .await;
        assert!(matches!(twice, Err(ServiceDeskError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_delete_releases_slot_and_keeps_history() {
        let desk = TestDesk::new();
        let technician = desk.technician("Hedy", 1).await;
        let ticket = desk.assigned("Spam", &technician).await;

        let forbidden = desk
            .engine
            .delete_ticket(&ticket.id, &Actor::technician(technician.id))
            .await;
        assert!(matches!(forbidden, Err(ServiceDeskError::Forbidden { .. })));

        desk.engine
            .delete_ticket(&ticket.id, &Actor::system())
            .await
            .unwrap();

        assert!(matches!(
            desk.engine.ticket(&ticket.id).await,
            Err(ServiceDeskError::NotFound { .. })
        ));
        assert_eq!(desk.counter(&technician.id).await, 0);
        assert_eq!(desk.availability(&technician.id).await, Availability::Available);
        assert_eq!(desk.engine.status_history(&ticket.id).await.unwrap().len(), 2);
        desk.assert_counters_consistent();
    }

    #[tokio::test]
    async fn test_conflicts_are_retried() {
        let store = Arc::new(ConflictingStore::new(2));
        let technician = Technician::new("Ida", 1);
        store.register_technician(&technician).await.unwrap();
        let ticket = create_test_ticket("Retry me", Priority::Low, Status::Open);
        store
            .seed(ChangeSet::new(TicketWrite::Insert(ticket.clone())))
            .await
            .unwrap();

        let engine = TicketEngine::new(store.clone(), Notifier::disabled(), &EngineConfig::default());
        let assigned = engine
            .assign(&ticket.id, &technician.id, &Actor::system(), None)
            .await
            .unwrap();

        assert_eq!(assigned.assigned_to, Some(technician.id));
        assert_eq!(store.apply_calls(), 3);
        assert_eq!(store.technician(&technician.id).await.unwrap().current_tickets, 1);
    }

    #[tokio::test]
    async fn test_persistent_conflict_becomes_unavailable() {
        let store = Arc::new(ConflictingStore::new(u32::MAX));
        let ticket = create_test_ticket("Hot row", Priority::Low, Status::Open);
        store
            .seed(ChangeSet::new(TicketWrite::Insert(ticket.clone())))
            .await
            .unwrap();

        let settings = EngineConfig {
            max_conflict_retries: 2,
            ..Default::default()
        };
        let engine = TicketEngine::new(store.clone(), Notifier::disabled(), &settings);
        let result = engine
            .complete(&ticket.id, &Actor::system(), Status::Resolved, "done", None)
            .await;

        assert!(matches!(result, Err(ServiceDeskError::Unavailable(_))));
        assert_eq!(store.apply_calls(), 3);
    }

    #[test]
    fn test_resolution_clock_baselines() {
        let now = Utc::now();
        let mut ticket = TicketBuilder::new()
            .subject("Clock")
            .status(Status::InProgress)
            .created_at(now - Duration::hours(10))
            .reopened_at(now - Duration::hours(2))
            .build();

        let from_creation = resolution_hours(&ticket, now, ResolutionClock::FromCreation);
        let from_reopen = resolution_hours(&ticket, now, ResolutionClock::FromLastReopen);
        assert!((from_creation - 10.0).abs() < 1e-6);
        assert!((from_reopen - 2.0).abs() < 1e-6);

        ticket.reopened_at = None;
        let fallback = resolution_hours(&ticket, now, ResolutionClock::FromLastReopen);
        assert!((fallback - 10.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_missing_ticket() {
        let desk = TestDesk::new();
        let result = desk
            .engine
            .complete(&TicketId::new(), &Actor::system(), Status::Resolved, "x", None)
            .await;
        assert!(matches!(result, Err(ServiceDeskError::NotFound { .. })));
    }
}
