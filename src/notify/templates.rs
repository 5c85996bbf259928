//! Message templates
//!
//! Each [`NotificationKind`] has a title and a message template, rendered
//! with tera against the request's [`MessageContext`](super::MessageContext).

use super::{Notification, NotificationKind, NotificationRequest};
use crate::error::Result;
use tera::{Context, Tera};

/// `(kind, title, message)`
const BUILTIN: [(NotificationKind, &str, &str); 7] = [
    (
        NotificationKind::TicketReceived,
        "We received your ticket",
        r#"Your ticket "{{ subject }}" ({{ ticket_short }}) has been opened with {{ priority | lower }} priority."#,
    ),
    (
        NotificationKind::TicketAssigned,
        "Ticket assigned",
        r#"{{ technician_name | default(value="A technician") }} is now working on your ticket "{{ subject }}"."#,
    ),
    (
        NotificationKind::NewAssignment,
        "New assignment",
        r#"Ticket {{ ticket_short }} "{{ subject }}" ({{ priority | lower }} priority) has been assigned to you."#,
    ),
    (
        NotificationKind::TicketReassigned,
        "Ticket reassigned",
        r#"Ticket {{ ticket_short }} "{{ subject }}" was reassigned to {{ technician_name | default(value="another technician") }}."#,
    ),
    (
        NotificationKind::TicketResolved,
        "Your ticket has been resolved",
        r#"Ticket "{{ subject }}" was resolved.{% if notes %} Resolution: {{ notes }}{% endif %}"#,
    ),
    (
        NotificationKind::TicketClosed,
        "Your ticket has been closed",
        r#"Ticket "{{ subject }}" is now closed.{% if notes %} Notes: {{ notes }}{% endif %}"#,
    ),
    (
        NotificationKind::TicketReopened,
        "Ticket reopened",
        r#"Ticket {{ ticket_short }} "{{ subject }}" was reopened and is back in your queue."#,
    ),
];

/// Compiled set of notification templates
#[derive(Debug, Clone)]
pub struct MessageTemplates {
    tera: Tera,
}

impl MessageTemplates {
    /// Compile the built-in templates
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        for (kind, title, message) in BUILTIN {
            tera.add_raw_template(&title_name(kind), title)?;
            tera.add_raw_template(&message_name(kind), message)?;
        }
        Ok(Self { tera })
    }

    pub fn render(&self, request: &NotificationRequest) -> Result<Notification> {
        let context = Context::from_serialize(&request.context)?;
        Ok(Notification {
            recipient_id: request.recipient_id,
            recipient_type: request.recipient_type,
            title: self.tera.render(&title_name(request.kind), &context)?,
            message: self.tera.render(&message_name(request.kind), &context)?,
        })
    }
}

fn title_name(kind: NotificationKind) -> String {
    format!("{}.title", kind.template_name())
}

fn message_name(kind: NotificationKind) -> String {
    format!("{}.message", kind.template_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CustomerId, Priority, Technician, Ticket};

    fn ticket() -> Ticket {
        Ticket::new(CustomerId::new(), "Cannot print", Priority::Urgent)
    }

    #[test]
    fn test_every_kind_renders() {
        let templates = MessageTemplates::new().unwrap();
        let ticket = ticket();

        for kind in NotificationKind::ALL {
            let notification = templates
                .render(&NotificationRequest::to_customer(kind, &ticket))
                .unwrap();
            assert!(!notification.title.is_empty(), "{kind:?}");
            assert!(notification.message.contains("Cannot print"), "{kind:?}");
        }
    }

    #[test]
    fn test_assignment_names_technician() {
        let templates = MessageTemplates::new().unwrap();
        let request = NotificationRequest::to_customer(NotificationKind::TicketAssigned, &ticket())
            .with_technician_name("Linus");

        let notification = templates.render(&request).unwrap();
        assert_eq!(
            notification.message,
            r#"Linus is now working on your ticket "Cannot print"."#
        );
    }

    #[test]
    fn test_resolution_notes_are_optional() {
        let templates = MessageTemplates::new().unwrap();
        let ticket = ticket();

        let bare = templates
            .render(&NotificationRequest::to_customer(
                NotificationKind::TicketResolved,
                &ticket,
            ))
            .unwrap();
        assert_eq!(bare.message, r#"Ticket "Cannot print" was resolved."#);

        let with_notes = templates
            .render(
                &NotificationRequest::to_customer(NotificationKind::TicketResolved, &ticket)
                    .with_notes("Replaced toner"),
            )
            .unwrap();
        assert!(with_notes.message.ends_with("Resolution: Replaced toner"));
    }

    #[test]
    fn test_priority_is_lowercased() {
        let templates = MessageTemplates::new().unwrap();
        let technician = Technician::new("Barbara", 1);
        let notification = templates
            .render(&NotificationRequest::to_technician(
                NotificationKind::NewAssignment,
                &technician,
                &ticket(),
            ))
            .unwrap();
        assert!(notification.message.contains("(urgent priority)"));
    }
}
