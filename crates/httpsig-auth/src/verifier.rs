//! Key selection and signature verification.
//!
//! Verification runs its checks in a fixed order and stops at the first
//! failure, so cheap policy checks always precede the cryptographic one:
//!
//! 1. the claimed algorithm is accepted by the challenge
//! 2. a key matching `keyId` exists
//! 3. that key supports the claimed algorithm
//! 4. every challenge header is signed and every signed header is present
//! 5. a signed `date` lies within the skew window
//! 6. the signature verifies

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use httpsig_core::KeyIdScheme;
use tracing::debug;

use crate::authorization::Authorization;
use crate::canonical::build_signing_string;
use crate::challenge::Challenge;
use crate::clock::{Clock, SystemClock};
use crate::error::AuthError;
use crate::keychain::{KeyEntry, Keychain};
use crate::request::RequestContent;

/// Default maximum clock skew.
pub const DEFAULT_SKEW: Duration = Duration::from_secs(300);

/// Coarse verification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerifyStatus {
    /// The signature verified.
    Success,
    /// The signature did not verify.
    InvalidSignature,
    /// No usable key for the claimed id and algorithm.
    InvalidKey,
    /// The signed date is outside the skew window.
    Expired,
    /// A required or claimed header is missing.
    MissingHeaders,
    /// The request or authorization could not be interpreted.
    Malformed,
}

impl VerifyStatus {
    /// Upper-case status name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::InvalidKey => "INVALID_KEY",
            Self::Expired => "EXPIRED",
            Self::MissingHeaders => "MISSING_HEADERS",
            Self::Malformed => "MALFORMED",
        }
    }
}

impl fmt::Display for VerifyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`Verifier::verify_with_result`]; carries the key on success.
#[derive(Debug, Clone)]
pub struct VerifyResult {
    status: VerifyStatus,
    key: Option<KeyEntry>,
}

impl VerifyResult {
    /// The outcome.
    #[must_use]
    pub fn status(&self) -> VerifyStatus {
        self.status
    }

    /// The verified key, present only on success.
    #[must_use]
    pub fn key(&self) -> Option<&KeyEntry> {
        self.key.as_ref()
    }

    /// Whether verification succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == VerifyStatus::Success
    }
}

/// Verifies authorizations against an immutable keychain.
#[derive(Debug, Clone)]
pub struct Verifier {
    keychain: Arc<Keychain>,
    scheme: KeyIdScheme,
    skew: Duration,
    clock: Arc<dyn Clock>,
}

impl Verifier {
    /// Create a verifier with the default scheme, skew and system clock.
    pub fn new(keychain: Arc<Keychain>) -> Self {
        Self {
            keychain,
            scheme: KeyIdScheme::default(),
            skew: DEFAULT_SKEW,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use `scheme` to match `keyId`.
    #[must_use]
    pub fn with_scheme(mut self, scheme: KeyIdScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Use `skew` as the maximum clock skew.
    #[must_use]
    pub fn with_skew(mut self, skew: Duration) -> Self {
        self.skew = skew;
        self
    }

    /// Use `clock` as the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The keychain searched by this verifier.
    #[must_use]
    pub fn keychain(&self) -> &Arc<Keychain> {
        &self.keychain
    }

    /// The key id scheme.
    #[must_use]
    pub fn scheme(&self) -> KeyIdScheme {
        self.scheme
    }

    /// The maximum clock skew.
    #[must_use]
    pub fn skew(&self) -> Duration {
        self.skew
    }

    /// First keychain entry whose identifier equals the authorization's
    /// `keyId`.
    #[must_use]
    pub fn select_key(&self, authorization: &Authorization) -> Option<&KeyEntry> {
        self.keychain.find(self.scheme, authorization.key_id())
    }

    /// Verify and return the matching entry, or the precise failure.
    ///
    /// # Errors
    /// Returns the [`AuthError`] of the first check that fails.
    pub fn try_verify(
        &self,
        challenge: &Challenge,
        content: &RequestContent,
        authorization: &Authorization,
    ) -> Result<&KeyEntry, AuthError> {
        let algorithm = authorization.algorithm();
        if !challenge.algorithms().contains(algorithm) {
            return Err(AuthError::AlgorithmNotAccepted(algorithm));
        }

        let entry = self
            .select_key(authorization)
            .ok_or_else(|| AuthError::KeyNotFound(authorization.key_id().to_owned()))?;
        let key = entry.key();
        if !key.can_verify() || !key.algorithms().contains(algorithm) {
            return Err(AuthError::KeyAlgorithmMismatch(algorithm));
        }

        if let Some(missing) = challenge
            .required_headers()
            .iter()
            .find(|required| !authorization.covers(required))
        {
            return Err(AuthError::ChallengeNotSatisfied(missing.clone()));
        }
        let signing_string = build_signing_string(content, authorization.headers())?;
        debug!(
            key_id = authorization.key_id(),
            %algorithm,
            signing_string = %String::from_utf8_lossy(&signing_string),
            "built signing string"
        );

        if authorization.covers("date") {
            let date = content
                .date()?
                .ok_or_else(|| AuthError::MissingHeader("date".to_owned()))?;
            self.check_skew(date)?;
        }

        if key.verify(algorithm, &signing_string, authorization.signature()) {
            Ok(entry)
        } else {
            Err(AuthError::SignatureDoesNotMatch)
        }
    }

    /// Verify and report a [`VerifyResult`]. The failure detail is logged.
    #[must_use]
    pub fn verify_with_result(
        &self,
        challenge: &Challenge,
        content: &RequestContent,
        authorization: &Authorization,
    ) -> VerifyResult {
        match self.try_verify(challenge, content, authorization) {
            Ok(entry) => VerifyResult {
                status: VerifyStatus::Success,
                key: Some(entry.clone()),
            },
            Err(e) => {
                debug!(key_id = authorization.key_id(), error = %e, status = %e.status(), "signature verification failed");
                VerifyResult {
                    status: e.status(),
                    key: None,
                }
            }
        }
    }

    /// Whether the authorization verifies.
    #[must_use]
    pub fn verify(&self, challenge: &Challenge, content: &RequestContent, authorization: &Authorization) -> bool {
        self.verify_with_result(challenge, content, authorization).is_success()
    }

    fn check_skew(&self, date: DateTime<Utc>) -> Result<(), AuthError> {
        let now = self.clock.now();
        let max = TimeDelta::from_std(self.skew).unwrap_or(TimeDelta::MAX);
        let drift = (now - date).abs();
        if drift > max {
            debug!(%now, %date, drift_secs = drift.num_seconds(), "signed date outside skew window");
            return Err(AuthError::RequestExpired);
        }
        Ok(())
    }
}
