//! Session identity state machine.
//!
//! One identity per process: `Anonymous`, a customer, or an operator. The
//! identity lives in a `tokio::sync::watch` cell whose only sender belongs
//! to [`AuthSession`], so every transition is atomic from a reader's point
//! of view - role and credential can never be observed disagreeing - and
//! nothing else in the crate can move the session.
//!
//! There is no `Customer <-> Operator` edge; a session must pass back
//! through `Anonymous`, which is also what clears the dependent stores.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pagermart_core::{Credential, CustomerId, Email, OperatorId};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::api::{ApiClient, ApiError};
use crate::cart::CartStore;
use crate::favorites::FavoritesStore;
use crate::notify::NotificationChannel;

const FALLBACK_LOGIN: &str = "Login failed. Please check your credentials.";
const FALLBACK_REGISTER: &str = "Registration failed. Please try again.";

/// Profile of a logged-in customer.
#[derive(Debug, Clone)]
pub struct CustomerProfile {
    pub id: CustomerId,
    pub username: String,
    pub email: Email,
    pub credential: Credential,
}

/// Profile of a logged-in operator.
#[derive(Debug, Clone)]
pub struct OperatorProfile {
    pub id: OperatorId,
    pub username: String,
    pub credential: Credential,
}

/// Who the session currently is.
#[derive(Debug, Clone, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    Customer(CustomerProfile),
    Operator(OperatorProfile),
}

impl Identity {
    /// True unless anonymous.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }

    /// True for a customer session.
    #[must_use]
    pub const fn is_customer(&self) -> bool {
        matches!(self, Self::Customer(_))
    }

    /// True for an operator session.
    #[must_use]
    pub const fn is_operator(&self) -> bool {
        matches!(self, Self::Operator(_))
    }

    /// The credential that signs requests for this identity, if any.
    #[must_use]
    pub const fn credential(&self) -> Option<&Credential> {
        match self {
            Self::Anonymous => None,
            Self::Customer(profile) => Some(&profile.credential),
            Self::Operator(profile) => Some(&profile.credential),
        }
    }

    /// Role label for logging.
    #[must_use]
    pub const fn role_name(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Customer(_) => "customer",
            Self::Operator(_) => "operator",
        }
    }
}

/// Which kind of account a login attempt targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginRole {
    Customer,
    Operator,
}

/// Owns the identity cell and drives every session transition.
///
/// Cloneable handle; all clones share one session.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<AuthSessionInner>,
}

struct AuthSessionInner {
    api: ApiClient,
    notifier: NotificationChannel,
    identity: watch::Sender<Identity>,
    busy: AtomicBool,
    cart: CartStore,
    favorites: FavoritesStore,
}

impl AuthSession {
    pub(crate) fn new(
        api: ApiClient,
        notifier: NotificationChannel,
        identity: watch::Sender<Identity>,
        cart: CartStore,
        favorites: FavoritesStore,
    ) -> Self {
        Self {
            inner: Arc::new(AuthSessionInner {
                api,
                notifier,
                identity,
                busy: AtomicBool::new(false),
                cart,
                favorites,
            }),
        }
    }

    /// Snapshot of the current identity.
    #[must_use]
    pub fn identity(&self) -> Identity {
        self.inner.identity.borrow().clone()
    }

    /// Subscribe to identity transitions.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Identity> {
        self.inner.identity.subscribe()
    }

    /// True while a login or register call is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Attempt to authenticate as a customer or an operator.
    ///
    /// On success the new identity is published, a success notification
    /// carries the server's message, favorites are cleared for the new
    /// account, and the cart is repopulated (customer) or forced empty
    /// (operator). On failure the session stays `Anonymous` and the error
    /// notification carries the server's text when the transport supplied
    /// one.
    #[instrument(skip_all, fields(identifier = %identifier, role = ?role))]
    pub async fn login(&self, identifier: &str, secret: &str, role: LoginRole) -> bool {
        let identifier = identifier.trim();
        if identifier.is_empty() || secret.is_empty() {
            self.inner
                .notifier
                .warning("Username and password are required.");
            return false;
        }
        if self.identity().is_authenticated() {
            // No direct Customer <-> Operator transition.
            self.inner
                .notifier
                .warning("Already signed in. Please log out first.");
            return false;
        }

        self.inner.busy.store(true, Ordering::Release);
        let outcome = match role {
            LoginRole::Customer => self.login_customer(identifier, secret).await,
            LoginRole::Operator => self.login_operator(identifier, secret).await,
        };
        self.inner.busy.store(false, Ordering::Release);

        match outcome {
            Ok((identity, message)) => {
                info!(role = identity.role_name(), "login succeeded");
                self.inner.identity.send_replace(identity);
                self.inner.notifier.success(message);
                self.inner.favorites.reset();
                match role {
                    LoginRole::Customer => {
                        // Pull the account's persisted cart into the mirror.
                        self.inner.cart.refresh().await;
                    }
                    LoginRole::Operator => self.inner.cart.reset(),
                }
                true
            }
            Err(err) => {
                warn!(error = %err, "login failed");
                self.inner.identity.send_replace(Identity::Anonymous);
                self.inner
                    .notifier
                    .error(err.server_message().unwrap_or(FALLBACK_LOGIN));
                false
            }
        }
    }

    async fn login_customer(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<(Identity, String), ApiError> {
        let reply = self.inner.api.login_customer(identifier, secret).await?;
        // The identifier may have been the email; sign subsequent requests
        // with the canonical username the server returned.
        let credential = Credential::new(reply.customer.username.clone(), secret);
        let profile = CustomerProfile {
            id: reply.customer.id,
            username: reply.customer.username,
            email: reply.customer.email,
            credential,
        };
        Ok((Identity::Customer(profile), reply.message))
    }

    async fn login_operator(
        &self,
        username: &str,
        secret: &str,
    ) -> Result<(Identity, String), ApiError> {
        let reply = self.inner.api.login_operator(username, secret).await?;
        let credential = Credential::new(reply.operator.username.clone(), secret);
        let profile = OperatorProfile {
            id: reply.operator.id,
            username: reply.operator.username,
            credential,
        };
        Ok((Identity::Operator(profile), reply.message))
    }

    /// Create a customer account. Never touches the current identity.
    ///
    /// Returns `true` when the account was created; the caller's cue to
    /// move to the login flow.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn register(&self, username: &str, email: &str, secret: &str) -> bool {
        let username = username.trim();
        if username.is_empty() || secret.is_empty() {
            self.inner
                .notifier
                .warning("Username, email, and password are required.");
            return false;
        }
        let email = match Email::parse(email.trim()) {
            Ok(email) => email,
            Err(err) => {
                self.inner.notifier.warning(err.to_string());
                return false;
            }
        };

        self.inner.busy.store(true, Ordering::Release);
        let outcome = self
            .inner
            .api
            .register(username, email.as_str(), secret)
            .await;
        self.inner.busy.store(false, Ordering::Release);

        match outcome {
            Ok(reply) => {
                info!(customer_id = %reply.customer.id, "registration succeeded");
                self.inner.notifier.success(reply.message);
                true
            }
            Err(err) => {
                warn!(error = %err, "registration failed");
                self.inner
                    .notifier
                    .error(err.server_message().unwrap_or(FALLBACK_REGISTER));
                false
            }
        }
    }

    /// Drop the session and all state derived from it.
    ///
    /// Purely local - the server keeps no session state, so logout never
    /// contacts it. Safe to call in any state.
    #[instrument(skip(self))]
    pub fn logout(&self) {
        self.inner.identity.send_replace(Identity::Anonymous);
        self.inner.cart.reset();
        self.inner.favorites.reset();
        self.inner.notifier.info("Logged out successfully.");
        info!("session cleared");
    }
}
