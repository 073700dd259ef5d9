//! Login adapter errors.

use httpsig_auth::AuthError;

/// Errors raised while authenticating a login attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    /// No verifier is configured.
    #[error("No verifier available")]
    NoVerifier,

    /// The request carried no HTTP Signature credentials.
    #[error("No HTTP Signature credentials")]
    NoCredentials,

    /// The module already ran a login attempt.
    #[error("Login attempt already finished")]
    AttemptFinished,

    /// Verification or identity resolution failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}
