//! HTTP Signature request verification.
//!
//! Verifies the `Authorization: Signature ...` header of an incoming request
//! against a keychain of public keys and resolves the key that signed it.
//!
//! # Overview
//!
//! A server advertises a [`Challenge`] (realm, headers that must be signed,
//! accepted algorithms). A client signs a canonical string built from the
//! listed request headers and sends an [`Authorization`]. The [`Verifier`]
//! selects the claimed key from its [`Keychain`], rebuilds the signing string
//! from the [`RequestContent`], checks the `date` skew and verifies the
//! signature.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use httpsig_auth::{Algorithm, AlgorithmSet, Challenge, Ed25519Key, Keychain, RequestContent, Signer, Verifier};
//! use httpsig_core::{KeyIdScheme, UserId};
//!
//! let mut keychain = Keychain::new();
//! keychain.push_identity(UserId::new("alice").unwrap(), Arc::new(Ed25519Key::from_seed(&[7; 32])));
//! let keychain = Arc::new(keychain);
//!
//! let challenge = Challenge::new("demo", ["host"], AlgorithmSet::from([Algorithm::Ed25519]));
//! let content = RequestContent::builder("GET", "/").header("Host", "example.com").build();
//!
//! let auth = Signer::new(Arc::clone(&keychain), KeyIdScheme::UserFingerprint)
//!     .sign(&challenge, &content)
//!     .unwrap();
//! assert!(Verifier::new(keychain).verify(&challenge, &content, &auth));
//! ```
//!
//! # Modules
//!
//! - [`algorithm`] - Algorithm names and sets
//! - [`key`] - Key capability trait and RSA, Ed25519, HMAC keys
//! - [`keychain`] - Ordered key collections and identity binding
//! - [`authorized_keys`] - OpenSSH authorized-keys parsing
//! - [`challenge`] / [`authorization`] - Header models
//! - [`request`] / [`canonical`] - Request snapshot and signing string
//! - [`verifier`] / [`signer`] - Verification and signing

pub mod algorithm;
pub mod authorization;
pub mod authorized_keys;
pub mod canonical;
pub mod challenge;
pub mod clock;
pub mod error;
pub mod key;
pub mod keychain;
pub mod request;
pub mod signer;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
pub mod verifier;

pub use algorithm::{Algorithm, AlgorithmSet};
pub use authorization::Authorization;
pub use authorized_keys::load_authorized_keys;
pub use challenge::Challenge;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AuthError, KeyError};
pub use key::{Ed25519Key, HmacKey, Key, RsaKey};
pub use keychain::{IdentityKey, KeyEntry, Keychain};
pub use request::RequestContent;
pub use signer::Signer;
pub use verifier::{DEFAULT_SKEW, Verifier, VerifyResult, VerifyStatus};
