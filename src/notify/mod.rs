//! Notification triggers
//!
//! The engine emits a [`NotificationRequest`] once a change set has been
//! committed. Requests travel over an unbounded channel to a background
//! worker, which renders them with [`MessageTemplates`] and hands the result
//! to a [`NotificationDispatcher`]. Emitting never blocks and never fails an
//! engine call; delivery problems are logged and the message is dropped.

mod templates;

pub use templates::MessageTemplates;

use crate::core::{Technician, Ticket};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Who receives a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipientType {
    Customer,
    Technician,
}

impl fmt::Display for RecipientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Customer => f.write_str("CUSTOMER"),
            Self::Technician => f.write_str("TECHNICIAN"),
        }
    }
}

/// A rendered message, ready for the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub recipient_id: Uuid,
    pub recipient_type: RecipientType,
    pub title: String,
    pub message: String,
}

/// The events that produce a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// Customer: a ticket was opened
    TicketReceived,
    /// Customer: a technician picked up the ticket
    TicketAssigned,
    /// Technician: a ticket landed in their queue
    NewAssignment,
    /// Previous technician: the ticket moved to someone else
    TicketReassigned,
    TicketResolved,
    TicketClosed,
    /// Assignee: a resolved ticket came back
    TicketReopened,
}

impl NotificationKind {
    pub const ALL: [Self; 7] = [
        Self::TicketReceived,
        Self::TicketAssigned,
        Self::NewAssignment,
        Self::TicketReassigned,
        Self::TicketResolved,
        Self::TicketClosed,
        Self::TicketReopened,
    ];

    #[must_use]
    pub const fn template_name(self) -> &'static str {
        match self {
            Self::TicketReceived => "ticket_received",
            Self::TicketAssigned => "ticket_assigned",
            Self::NewAssignment => "new_assignment",
            Self::TicketReassigned => "ticket_reassigned",
            Self::TicketResolved => "ticket_resolved",
            Self::TicketClosed => "ticket_closed",
            Self::TicketReopened => "ticket_reopened",
        }
    }
}

/// Values available to message templates
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageContext {
    pub ticket_id: String,
    pub ticket_short: String,
    pub subject: String,
    pub status: String,
    pub priority: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technician_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl MessageContext {
    #[must_use]
    pub fn for_ticket(ticket: &Ticket) -> Self {
        Self {
            ticket_id: ticket.id.to_string(),
            ticket_short: ticket.id.short(),
            subject: ticket.subject.clone(),
            status: ticket.status.to_string(),
            priority: ticket.priority.to_string(),
            technician_name: None,
            notes: None,
        }
    }
}

/// An unrendered notification queued by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    pub kind: NotificationKind,
    pub recipient_id: Uuid,
    pub recipient_type: RecipientType,
    pub context: MessageContext,
}

impl NotificationRequest {
    /// Message for the customer who owns `ticket`
    #[must_use]
    pub fn to_customer(kind: NotificationKind, ticket: &Ticket) -> Self {
        Self {
            kind,
            recipient_id: *ticket.customer_id.as_uuid(),
            recipient_type: RecipientType::Customer,
            context: MessageContext::for_ticket(ticket),
        }
    }

    /// Message for `technician` about `ticket`
    #[must_use]
    pub fn to_technician(kind: NotificationKind, technician: &Technician, ticket: &Ticket) -> Self {
        Self {
            kind,
            recipient_id: *technician.id.as_uuid(),
            recipient_type: RecipientType::Technician,
            context: MessageContext::for_ticket(ticket),
        }
    }

    #[must_use]
    pub fn with_technician_name(mut self, name: impl Into<String>) -> Self {
        self.context.technician_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.context.notes = Some(notes.into());
        self
    }
}

/// Delivery collaborator; called once per message, never retried
#[cfg_attr(test, mockall::automock)]
pub trait NotificationDispatcher: Send + Sync {
    fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Dispatcher that writes every message to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatcher;

impl NotificationDispatcher for LogDispatcher {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        info!(
            recipient_id = %notification.recipient_id,
            recipient_type = %notification.recipient_type,
            "{}: {}",
            notification.title,
            notification.message
        );
        Ok(())
    }
}

/// Sending half of the notification outbox
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    sender: Option<mpsc::UnboundedSender<NotificationRequest>>,
}

impl Notifier {
    /// A notifier that discards everything
    #[must_use]
    pub const fn disabled() -> Self {
        Self { sender: None }
    }

    /// A notifier plus the receiving end, for callers that drain it themselves
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NotificationRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// Queue a request; failures are logged, never returned
    pub fn emit(&self, request: NotificationRequest) {
        let Some(sender) = &self.sender else {
            debug!("Notifications disabled, dropping {:?}", request.kind);
            return;
        };
        if let Err(e) = sender.send(request) {
            warn!(
                "Notification {:?} dropped: dispatcher has stopped",
                e.0.kind
            );
        }
    }

    pub fn emit_all(&self, requests: impl IntoIterator<Item = NotificationRequest>) {
        for request in requests {
            self.emit(request);
        }
    }
}

/// Handle on the background dispatcher task
#[derive(Debug)]
pub struct DispatchWorker {
    handle: JoinHandle<usize>,
}

impl DispatchWorker {
    /// Wait until every [`Notifier`] clone is dropped and the queue is
    /// drained; returns the number of delivered messages
    pub async fn finish(self) -> usize {
        match self.handle.await {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!("Notification dispatcher task failed: {}", e);
                0
            },
        }
    }
}

/// Start the dispatcher worker; must be called inside a tokio runtime
pub fn spawn_dispatcher(
    dispatcher: Arc<dyn NotificationDispatcher>,
    templates: MessageTemplates,
) -> (Notifier, DispatchWorker) {
    let (notifier, mut receiver) = Notifier::channel();

    let handle = tokio::spawn(async move {
        let mut delivered = 0;
        while let Some(request) = receiver.recv().await {
            let notification = match templates.render(&request) {
                Ok(notification) => notification,
                Err(e) => {
                    warn!("Failed to render {:?} notification: {}", request.kind, e);
                    continue;
                },
            };
            match dispatcher.deliver(&notification) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    "Failed to deliver notification to {}: {}",
                    notification.recipient_id, e
                ),
            }
        }
        debug!("Notification dispatcher stopped after {} deliveries", delivered);
        delivered
    });

    (notifier, DispatchWorker { handle })
}
