//! Out-of-band progress notifications.
//!
//! A tool call running on the stdio transport may emit progress events before
//! its final response. Events travel through an unbounded channel that the
//! stdio loop drains onto the same writer as responses, so every event for a
//! request is written before that request's reply.
//!
//! On the HTTP transport there is no push path: the reporter is disabled and
//! events are dropped without error.

use tokio::sync::mpsc;

use crate::docs::ProgressSink;
use crate::mcp::protocol::{OutgoingNotification, RequestId};

/// A single progress update for a pending request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// The request this event belongs to.
    pub request_id: RequestId,
    /// Completion percentage, 0 to 100.
    pub percentage: u8,
    /// Human-readable status.
    pub message: String,
}

impl ProgressEvent {
    /// Builds the `notifications/progress` frame for this event.
    #[must_use]
    pub fn to_notification(&self) -> OutgoingNotification {
        OutgoingNotification::progress(&self.request_id, self.percentage, &self.message)
    }
}

/// Sends progress events to the active transport, if it can carry them.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    /// Creates a reporter connected to a new channel.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sender: Some(tx) }, rx)
    }

    /// Creates a reporter that drops every event.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { sender: None }
    }

    /// Returns `true` if events have somewhere to go.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Sends a progress event. Percentages above 100 are clamped.
    pub fn report(&self, request_id: &RequestId, percentage: u8, message: impl Into<String>) {
        let Some(sender) = &self.sender else {
            return;
        };

        let event = ProgressEvent {
            request_id: request_id.clone(),
            percentage: percentage.min(100),
            message: message.into(),
        };

        tracing::debug!(
            request_id = %event.request_id,
            percentage = event.percentage,
            message = %event.message,
            "Progress"
        );

        if sender.send(event).is_err() {
            tracing::debug!(request_id = %request_id, "Progress receiver gone, dropping event");
        }
    }

    /// Binds this reporter to one request.
    #[must_use]
    pub fn for_request(&self, request_id: RequestId) -> RequestProgress {
        RequestProgress {
            reporter: self.clone(),
            request_id,
        }
    }
}

/// A progress reporter bound to a single request id.
#[derive(Debug, Clone)]
pub struct RequestProgress {
    reporter: ProgressReporter,
    request_id: RequestId,
}

impl RequestProgress {
    /// The request this reporter is bound to.
    #[must_use]
    pub const fn request_id(&self) -> &RequestId {
        &self.request_id
    }
}

impl ProgressSink for RequestProgress {
    fn report(&self, percentage: u8, message: &str) {
        self.reporter.report(&self.request_id, percentage, message);
    }
}
