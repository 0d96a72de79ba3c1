//! Single-slot notification channel.
//!
//! The UI shows at most one transient message at a time; a new one replaces
//! whatever is showing. The slot lives in a `tokio::sync::watch` cell so the
//! presentation layer can either poll [`NotificationChannel::current`] or
//! subscribe via [`NotificationChannel::watch`].
//!
//! Every publish arms an auto-dismiss timer. Timers carry the sequence
//! number of the notification they were armed for and clear the slot only if
//! that notification is still showing, so a stale timer can never dismiss a
//! newer message.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

/// How long a notification stays up by default.
pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_secs(4);

/// How strongly a notification should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

/// A user-facing message with presentation severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

/// Contents of the notification cell.
///
/// The sequence number increments on every publish, which gives subscribers
/// a cheap way to tell "replaced by an identical message" from "unchanged".
#[derive(Debug, Clone, Default)]
pub struct Slot {
    seq: u64,
    current: Option<Notification>,
}

impl Slot {
    /// The notification currently showing, if any.
    #[must_use]
    pub const fn get(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    /// Publish sequence number of the last notification.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }
}

/// Handle to the notification slot; cheap to clone.
#[derive(Clone)]
pub struct NotificationChannel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    slot: watch::Sender<Slot>,
    dismiss_after: Duration,
    seq: AtomicU64,
}

impl NotificationChannel {
    /// Create a channel with the default dismiss delay.
    #[must_use]
    pub fn new() -> Self {
        Self::with_dismiss_after(DEFAULT_DISMISS_AFTER)
    }

    /// Create a channel with a custom dismiss delay.
    #[must_use]
    pub fn with_dismiss_after(dismiss_after: Duration) -> Self {
        let (slot, _) = watch::channel(Slot::default());
        Self {
            inner: Arc::new(ChannelInner {
                slot,
                dismiss_after,
                seq: AtomicU64::new(0),
            }),
        }
    }

    /// Replace whatever is showing with a new notification.
    ///
    /// Auto-dismiss needs a running tokio runtime; without one the message
    /// simply stays until replaced or dismissed.
    pub fn notify(&self, message: impl Into<String>, severity: Severity) {
        let message = message.into();
        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(%message, ?severity, seq, "publishing notification");

        self.inner.slot.send_replace(Slot {
            seq,
            current: Some(Notification { message, severity }),
        });

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let inner = Arc::clone(&self.inner);
            handle.spawn(async move {
                tokio::time::sleep(inner.dismiss_after).await;
                inner.slot.send_if_modified(|slot| {
                    if slot.seq == seq && slot.current.is_some() {
                        slot.current = None;
                        true
                    } else {
                        false
                    }
                });
            });
        }
    }

    /// Shorthand for [`Self::notify`] with [`Severity::Success`].
    pub fn success(&self, message: impl Into<String>) {
        self.notify(message, Severity::Success);
    }

    /// Shorthand for [`Self::notify`] with [`Severity::Error`].
    pub fn error(&self, message: impl Into<String>) {
        self.notify(message, Severity::Error);
    }

    /// Shorthand for [`Self::notify`] with [`Severity::Warning`].
    pub fn warning(&self, message: impl Into<String>) {
        self.notify(message, Severity::Warning);
    }

    /// Shorthand for [`Self::notify`] with [`Severity::Info`].
    pub fn info(&self, message: impl Into<String>) {
        self.notify(message, Severity::Info);
    }

    /// The notification currently showing, if any.
    #[must_use]
    pub fn current(&self) -> Option<Notification> {
        self.inner.slot.borrow().current.clone()
    }

    /// Clear the slot immediately.
    pub fn dismiss(&self) {
        self.inner.slot.send_if_modified(|slot| {
            if slot.current.is_some() {
                slot.current = None;
                true
            } else {
                false
            }
        });
    }

    /// Subscribe to slot changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Slot> {
        self.inner.slot.subscribe()
    }
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_last_write_wins() {
        let channel = NotificationChannel::new();
        channel.success("first");
        channel.error("second");

        let current = channel.current().unwrap();
        assert_eq!(current.message, "second");
        assert_eq!(current.severity, Severity::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_dismiss_after_delay() {
        let channel = NotificationChannel::new();
        channel.info("transient");
        assert!(channel.current().is_some());

        tokio::time::sleep(DEFAULT_DISMISS_AFTER + Duration::from_millis(50)).await;
        assert!(channel.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_cannot_dismiss_newer_message() {
        let channel = NotificationChannel::new();
        channel.info("old");
        tokio::time::sleep(Duration::from_secs(2)).await;
        channel.info("new");

        // Past the old timer's deadline but before the new one's.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(channel.current().unwrap().message, "new");

        // Past the new timer's deadline too.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(channel.current().is_none());
    }

    #[tokio::test]
    async fn test_manual_dismiss() {
        let channel = NotificationChannel::new();
        channel.warning("going away");
        channel.dismiss();
        assert!(channel.current().is_none());
    }

    #[tokio::test]
    async fn test_watch_sees_updates() {
        let channel = NotificationChannel::new();
        let mut rx = channel.watch();

        channel.success("done");
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().get().unwrap().message, "done");
    }

    #[tokio::test]
    async fn test_seq_increments_per_publish() {
        let channel = NotificationChannel::new();
        channel.info("a");
        let first = channel.watch().borrow().seq();
        channel.info("a");
        let second = channel.watch().borrow().seq();
        assert!(second > first);
    }

    #[test]
    fn test_without_runtime_message_stays() {
        // No tokio runtime here, so no auto-dismiss task is armed.
        let channel = NotificationChannel::new();
        channel.error("stuck");
        assert!(channel.current().is_some());
    }

    #[tokio::test]
    async fn test_severity_helpers() {
        let channel = NotificationChannel::new();
        channel.warning("careful");
        assert_eq!(channel.current().unwrap().severity, Severity::Warning);
        channel.info("fyi");
        assert_eq!(channel.current().unwrap().severity, Severity::Info);
    }
}
