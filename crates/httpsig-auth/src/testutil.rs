//! Fixture keys, requests and test doubles.
//!
//! Available to this crate's tests and, through the `testutil` feature, to
//! dependent crates.

#![allow(clippy::missing_panics_doc)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use httpsig_core::UserId;

use crate::algorithm::{Algorithm, AlgorithmSet};
use crate::authorization::Authorization;
use crate::canonical::build_signing_string;
use crate::error::KeyError;
use crate::key::{Ed25519Key, Key, RsaKey};
use crate::request::{RequestContent, http_date};

/// Alice's RSA private key (PKCS#8 PEM).
pub const ALICE_RSA_PEM: &str = include_str!("../testdata/alice_rsa.pem");
/// The key Alice rotates to.
pub const ALICE_RSA_ROTATED_PEM: &str = include_str!("../testdata/alice_rsa_rotated.pem");

/// Alice's RSA signing key.
#[must_use]
pub fn alice_rsa() -> RsaKey {
    RsaKey::from_pem(ALICE_RSA_PEM).expect("fixture key must parse")
}

/// Alice's replacement RSA signing key.
#[must_use]
pub fn alice_rsa_rotated() -> RsaKey {
    RsaKey::from_pem(ALICE_RSA_ROTATED_PEM).expect("fixture key must parse")
}

/// A deterministic Ed25519 signing key.
#[must_use]
pub fn ed25519_key(seed: u8) -> Ed25519Key {
    Ed25519Key::from_seed(&[seed; 32])
}

/// Build a user id.
#[must_use]
pub fn user(name: &str) -> UserId {
    UserId::new(name).expect("fixture user id must be valid")
}

/// A fixed reference instant.
#[must_use]
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0)
        .single()
        .expect("valid fixture instant")
}

/// A request with `host` and `date` headers.
#[must_use]
pub fn request_at(method: &str, path: &str, date: DateTime<Utc>) -> RequestContent {
    RequestContent::builder(method, path)
        .header("Host", "localhost:4567")
        .header("Date", http_date(date))
        .build()
}

/// Sign `content` over `headers` and return the authorization.
#[must_use]
pub fn sign_request(
    key: &dyn Key,
    key_id: &str,
    algorithm: Algorithm,
    headers: &[&str],
    content: &RequestContent,
) -> Authorization {
    let signing_string = build_signing_string(content, headers).expect("headers must be present");
    let signature = key
        .sign(algorithm, &signing_string)
        .expect("fixture key must sign");
    Authorization::new(key_id, algorithm, headers.iter().copied(), signature)
}

/// A key wrapper that counts verification calls.
#[derive(Debug)]
pub struct CountingKey {
    inner: Arc<dyn Key>,
    verify_calls: AtomicUsize,
}

impl CountingKey {
    /// Wrap `inner`.
    pub fn new(inner: Arc<dyn Key>) -> Self {
        Self {
            inner,
            verify_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `verify` calls so far.
    #[must_use]
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

impl Key for CountingKey {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn fingerprint(&self) -> &str {
        self.inner.fingerprint()
    }

    fn algorithms(&self) -> &AlgorithmSet {
        self.inner.algorithms()
    }

    fn can_verify(&self) -> bool {
        self.inner.can_verify()
    }

    fn can_sign(&self) -> bool {
        self.inner.can_sign()
    }

    fn verify(&self, algorithm: Algorithm, content: &[u8], signature: &[u8]) -> bool {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(algorithm, content, signature)
    }

    fn sign(&self, algorithm: Algorithm, content: &[u8]) -> Result<Vec<u8>, KeyError> {
        self.inner.sign(algorithm, content)
    }
}
