//! # Status Notifications
//!
//! Fire-and-forget notification dispatch. After a transition commits, the
//! handler hands a [`StatusNotification`] to the [`Notifier`], which
//! delivers it on a spawned task — the HTTP response never waits on
//! delivery, and a delivery failure never rolls back or fails the
//! transition.
//!
//! The default [`LogSink`] writes a structured log line. A mail gateway
//! implements [`NotificationSink`] to send real messages; delivery
//! semantics are otherwise out of scope here.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use credo_core::{ApplicationCode, ApplicationId, ApplicationStatus};

/// One status-change event handed to the notification collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct StatusNotification {
    /// The application whose status changed.
    pub application_id: ApplicationId,
    /// Human-readable application code.
    pub code: ApplicationCode,
    /// Applicant email address.
    pub applicant_email: String,
    /// Applicant full name.
    pub applicant_name: String,
    /// The status being left, when this was not the first status.
    pub from_status: Option<ApplicationStatus>,
    /// The status entered.
    pub to_status: ApplicationStatus,
    /// The note recorded with the transition.
    pub note: String,
}

/// Delivery seam for status notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    /// Deliver one notification. Errors are logged by the dispatcher,
    /// never propagated to the transition that produced the event.
    async fn deliver(&self, notification: StatusNotification) -> Result<(), String>;
}

/// Sink that records notifications as structured log lines. Default in
/// development and tests.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: StatusNotification) -> Result<(), String> {
        tracing::info!(
            application_id = %notification.application_id,
            code = %notification.code,
            to = %notification.to_status,
            from = notification.from_status.map(|s| s.as_str()),
            email = %notification.applicant_email,
            "status notification dispatched"
        );
        Ok(())
    }
}

/// Dispatches notifications without blocking the caller.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    /// Create a notifier over the given sink.
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Create a notifier that logs deliveries.
    pub fn log_sink() -> Self {
        Self::new(Arc::new(LogSink))
    }

    /// Hand a notification to the sink on a spawned task and return
    /// immediately. Failures are logged, never surfaced.
    pub fn dispatch(&self, notification: StatusNotification) {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            let application_id = notification.application_id;
            if let Err(reason) = sink.deliver(notification).await {
                tracing::warn!(
                    application_id = %application_id,
                    reason = %reason,
                    "status notification delivery failed"
                );
            }
        });
    }
}
