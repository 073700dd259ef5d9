//! Verification plus identity resolution.

use std::sync::Arc;

use httpsig_auth::{AuthError, KeyEntry, Verifier};
use httpsig_core::UserId;
use tracing::{debug, info};

use crate::credentials::HttpsigCredentials;
use crate::error::LoginError;

/// Authenticates credentials with an injected verifier.
///
/// A `None` verifier means none is configured; every attempt then fails.
#[derive(Debug, Clone)]
pub struct HttpsigAuthentication {
    verifier: Option<Arc<Verifier>>,
}

impl HttpsigAuthentication {
    /// Create an authenticator.
    #[must_use]
    pub fn new(verifier: Option<Arc<Verifier>>) -> Self {
        Self { verifier }
    }

    /// Verify the credentials and return the owning user.
    ///
    /// # Errors
    /// - [`LoginError::NoVerifier`] when no verifier is configured
    /// - [`LoginError::Auth`] with the verification failure, or
    ///   [`AuthError::UnboundKey`] when the key verified but has no owner
    pub fn authenticate(&self, credentials: &HttpsigCredentials) -> Result<UserId, LoginError> {
        let verifier = self.verifier.as_deref().ok_or(LoginError::NoVerifier)?;
        let entry = verifier.try_verify(
            credentials.challenge(),
            credentials.content(),
            credentials.authorization(),
        )?;
        let user_id = resolve_identity(entry, credentials.authorization().key_id())?;
        info!(user = %user_id, "HTTP signature authenticated");
        Ok(user_id)
    }
}

/// The owner of a verified key.
///
/// # Errors
/// Returns [`AuthError::UnboundKey`] if the key has no owner.
pub fn resolve_identity(entry: &KeyEntry, key_id: &str) -> Result<UserId, AuthError> {
    entry.owner().cloned().ok_or_else(|| {
        debug!(key_id, "verified key is not bound to an identity");
        AuthError::UnboundKey(key_id.to_owned())
    })
}
