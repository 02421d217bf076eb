//! Notification channel for conditions requiring human attention.
//!
//! The control loops are unattended background tasks: failures never
//! propagate to a caller. Progress goes to the operation log; orphan
//! reports, grouping-search failures and emptied-share alerts go through
//! this channel in addition.

/// Delivers a subject/body diagnostic to the configured recipients.
pub trait Notifier {
    /// Sends one notification.
    fn notify(&self, subject: &str, body: &str);
}

/// Default notifier writing to a dedicated log target.
///
/// Deployments with a mail transport plug their own [`Notifier`] in; the
/// log-based default makes sure diagnostics are never silently dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, subject: &str, body: &str) {
        tracing::warn!(target: "notify", subject, "{body}");
    }
}
