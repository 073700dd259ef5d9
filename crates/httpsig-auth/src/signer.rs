//! Client-side signing against a challenge.

use std::sync::Arc;

use httpsig_core::KeyIdScheme;
use tracing::{debug, warn};

use crate::algorithm::Algorithm;
use crate::authorization::Authorization;
use crate::canonical::build_signing_string;
use crate::challenge::Challenge;
use crate::error::AuthError;
use crate::keychain::{KeyEntry, Keychain};
use crate::request::RequestContent;

/// Signs requests with the first suitable key of a keychain.
#[derive(Debug, Clone)]
pub struct Signer {
    keychain: Arc<Keychain>,
    scheme: KeyIdScheme,
}

impl Signer {
    /// Create a signer addressing keys with `scheme`.
    pub fn new(keychain: Arc<Keychain>, scheme: KeyIdScheme) -> Self {
        Self { keychain, scheme }
    }

    /// First signing-capable entry and its preferred algorithm accepted by
    /// `challenge`.
    #[must_use]
    pub fn select(&self, challenge: &Challenge) -> Option<(&KeyEntry, Algorithm)> {
        self.keychain.iter().filter(|entry| entry.key().can_sign()).find_map(|entry| {
            Algorithm::ALL
                .into_iter()
                .find(|alg| challenge.algorithms().contains(*alg) && entry.key().algorithms().contains(*alg))
                .map(|alg| (entry, alg))
        })
    }

    /// Sign the challenge's required headers.
    ///
    /// # Errors
    /// See [`Signer::sign_headers`].
    pub fn sign(&self, challenge: &Challenge, content: &RequestContent) -> Result<Authorization, AuthError> {
        self.sign_headers(challenge, content, &[])
    }

    /// Sign `extra` headers followed by any required header not already
    /// listed.
    ///
    /// # Errors
    /// - [`AuthError::NoSigningKey`] if no key can satisfy the challenge
    /// - [`AuthError::MissingHeader`] if a header to sign is absent
    pub fn sign_headers(
        &self,
        challenge: &Challenge,
        content: &RequestContent,
        extra: &[&str],
    ) -> Result<Authorization, AuthError> {
        let (entry, algorithm) = self.select(challenge).ok_or(AuthError::NoSigningKey)?;

        let mut headers: Vec<String> = extra.iter().map(|h| h.to_ascii_lowercase()).collect();
        for required in challenge.required_headers() {
            if !headers.contains(required) {
                headers.push(required.clone());
            }
        }

        let signing_string = build_signing_string(content, headers.as_slice())?;
        let signature = entry
            .key()
            .sign(algorithm, &signing_string)
            .map_err(|e| {
                warn!(error = %e, "signing failed");
                AuthError::NoSigningKey
            })?;
        let key_id = entry.id_for(self.scheme);
        debug!(key_id = %key_id, %algorithm, "signed request");

        Ok(Authorization::new(key_id, algorithm, headers, signature))
    }
}
