//! Email notifications for request lifecycle events

mod mailer;
pub mod templates;

use std::sync::Arc;

pub use mailer::{Email, HttpMailer, LogMailer, MailError, Mailer, RecordingMailer};

use crate::requests::RequestView;
use crate::store::Collections;
use templates::Rendered;

/// Lifecycle events that produce an email to the requester
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestEvent {
    Submitted,
    Validated,
    Approved,
    Rejected,
}

impl RequestEvent {
    fn render(&self, view: &RequestView) -> Rendered {
        match self {
            RequestEvent::Submitted => templates::request_submitted(view),
            RequestEvent::Validated => templates::request_validated(view),
            RequestEvent::Approved => templates::request_approved(view),
            RequestEvent::Rejected => templates::request_rejected(view),
        }
    }
}

/// Sends lifecycle emails to the creator of a request.
///
/// Never fails: a missing address or a mail error is logged and dropped, the
/// transition that triggered it stays committed.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    collections: Collections,
    from: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, collections: Collections, from: impl Into<String>) -> Self {
        Self {
            mailer,
            collections,
            from: from.into(),
        }
    }

    pub async fn notify(&self, event: RequestEvent, view: &RequestView) {
        let recipient = match self.creator_email(view).await {
            Ok(Some(email)) => email,
            Ok(None) => {
                tracing::debug!(
                    request_code = %view.request_code,
                    event = ?event,
                    "Requester has no email address, skipping notification"
                );
                return;
            }
            Err(e) => {
                tracing::warn!(
                    request_code = %view.request_code,
                    error = %e,
                    "Failed to resolve requester email"
                );
                return;
            }
        };

        let rendered = event.render(view);
        let email = Email {
            from: self.from.clone(),
            to: recipient,
            subject: rendered.subject,
            body: rendered.body,
        };

        match self.mailer.send(email).await {
            Ok(()) => tracing::info!(
                request_code = %view.request_code,
                event = ?event,
                "Notification sent"
            ),
            Err(e) => tracing::warn!(
                request_code = %view.request_code,
                event = ?event,
                error = %e,
                "Notification failed"
            ),
        }
    }

    async fn creator_email(
        &self,
        view: &RequestView,
    ) -> Result<Option<String>, crate::store::StoreError> {
        let Some(creator) = view.created_by else {
            return Ok(None);
        };
        let Some(user) = self.collections.users.find_by_id(creator).await? else {
            return Ok(None);
        };

        Ok(self
            .collections
            .profiles
            .find_by_id(user.profile_id)
            .await?
            .and_then(|profile| profile.email)
            .filter(|email| !email.trim().is_empty()))
    }
}
