//! Login credential retained for request signing.
//!
//! The shop API authenticates every request with HTTP Basic, so the client
//! holds the secret for the lifetime of the session. The secret lives in a
//! [`SecretString`] and is only ever exposed inside
//! [`Credential::authorization_header`]; a move to token-based auth would
//! touch that one method and nothing else.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::{ExposeSecret, SecretString};

/// An authenticated account's username and secret.
///
/// Never serialized and never persisted; it exists only in process memory
/// for the duration of a session.
#[derive(Clone)]
pub struct Credential {
    username: String,
    secret: SecretString,
}

impl Credential {
    /// Build a credential from a username and its secret.
    #[must_use]
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    /// The account username the credential signs for.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The `Authorization` header value for HTTP Basic auth.
    ///
    /// This is the single place the secret leaves its wrapper.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        let raw = format!("{}:{}", self.username, self.secret.expose_secret());
        format!("Basic {}", BASE64.encode(raw))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
