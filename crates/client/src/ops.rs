//! Operator console calls: sold-unit listing and batch activation.
//!
//! Thin compared to the stores: results go straight back to the caller
//! instead of into a watched cell, since the console renders whatever it
//! last fetched. Gating and notifications follow the store conventions.

use std::sync::Arc;

use pagermart_core::{Credential, UnitId, UnitStatus};
use tokio::sync::watch;
use tracing::instrument;

use crate::api::types::{ActivationReport, SoldUnit};
use crate::api::{ApiClient, ApiError};
use crate::notify::NotificationChannel;
use crate::session::Identity;

const GATE: &str = "Please log in as an operator.";
const FALLBACK_UNITS: &str = "Failed to load sold units.";
const FALLBACK_ACTIVATE: &str = "Failed to activate units.";

/// Operator-only data operations.
///
/// Cloneable handle.
#[derive(Clone)]
pub struct OpsConsole {
    inner: Arc<OpsConsoleInner>,
}

struct OpsConsoleInner {
    api: ApiClient,
    notifier: NotificationChannel,
    identity: watch::Receiver<Identity>,
}

impl OpsConsole {
    pub(crate) fn new(
        api: ApiClient,
        identity: watch::Receiver<Identity>,
        notifier: NotificationChannel,
    ) -> Self {
        Self {
            inner: Arc::new(OpsConsoleInner {
                api,
                notifier,
                identity,
            }),
        }
    }

    fn operator_credential(&self) -> Option<Credential> {
        match &*self.inner.identity.borrow() {
            Identity::Operator(profile) => Some(profile.credential.clone()),
            Identity::Anonymous | Identity::Customer(_) => None,
        }
    }

    fn notify_error(&self, err: &ApiError, fallback: &str) {
        self.inner
            .notifier
            .error(err.server_message().unwrap_or(fallback));
    }

    /// Fetch sold units, optionally filtered by status.
    #[instrument(skip(self))]
    pub async fn sold_units(&self, status: Option<UnitStatus>) -> Option<Vec<SoldUnit>> {
        let Some(credential) = self.operator_credential() else {
            self.inner.notifier.warning(GATE);
            return None;
        };

        match self.inner.api.list_sold_units(status, &credential).await {
            Ok(units) => Some(units),
            Err(err) => {
                self.notify_error(&err, FALLBACK_UNITS);
                None
            }
        }
    }

    /// Activate a batch of sold units.
    ///
    /// Per-unit failures ride inside the returned report; only a failed
    /// request as a whole yields `None`.
    #[instrument(skip(self), fields(count = unit_ids.len()))]
    pub async fn activate(&self, unit_ids: &[UnitId]) -> Option<ActivationReport> {
        let Some(credential) = self.operator_credential() else {
            self.inner.notifier.warning(GATE);
            return None;
        };
        if unit_ids.is_empty() {
            self.inner.notifier.warning("No units selected.");
            return None;
        }

        match self.inner.api.activate_units(unit_ids, &credential).await {
            Ok(report) => {
                self.inner.notifier.success(report.message.clone());
                Some(report)
            }
            Err(err) => {
                self.notify_error(&err, FALLBACK_ACTIVATE);
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pagermart_core::OperatorId;

    use super::*;
    use crate::config::ClientConfig;
    use crate::notify::Severity;
    use crate::session::OperatorProfile;

    fn console_with_identity(identity: Identity) -> (OpsConsole, NotificationChannel) {
        let api = ApiClient::new(&ClientConfig::default()).unwrap();
        let notifier = NotificationChannel::new();
        let (_tx, rx) = watch::channel(identity);
        (OpsConsole::new(api, rx, notifier.clone()), notifier)
    }

    fn operator() -> Identity {
        Identity::Operator(OperatorProfile {
            id: OperatorId::new(1),
            username: "opal".to_owned(),
            credential: Credential::new("opal", "s3cr3t"),
        })
    }

    #[tokio::test]
    async fn test_anonymous_calls_warn_and_return_none() {
        let (console, notifier) = console_with_identity(Identity::Anonymous);

        assert!(console.sold_units(None).await.is_none());
        let note = notifier.current().unwrap();
        assert_eq!(note.severity, Severity::Warning);
        assert_eq!(note.message, GATE);

        let unit: UnitId = "b4c51b4e-9a5e-4f6e-bb1a-0d8c2f9d2e61".parse().unwrap();
        assert!(console.activate(&[unit]).await.is_none());
    }

    #[tokio::test]
    async fn test_empty_activation_short_circuits() {
        let (console, notifier) = console_with_identity(operator());

        assert!(console.activate(&[]).await.is_none());
        let note = notifier.current().unwrap();
        assert_eq!(note.severity, Severity::Warning);
        assert_eq!(note.message, "No units selected.");
    }
}
