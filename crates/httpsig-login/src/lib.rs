//! Login adapter for HTTP Signature authentication.
//!
//! Connects the verification engine in [`httpsig_auth`] to a host login
//! framework:
//!
//! - [`HttpsigConfiguration`] activates an [`httpsig_core::HttpsigConfig`],
//!   loading every user's authorized-keys file and publishing the challenge
//!   and verifier as one atomically swapped [`Snapshot`]
//! - [`HttpsigCredentials`] carries a request's challenge, authorization and
//!   content into the login flow
//! - [`HttpsigAuthentication`] verifies credentials and resolves the owning
//!   user
//! - [`HttpsigLoginModule`] runs one login attempt and commits the
//!   resulting [`AuthInfo`] and principals to a [`Subject`]

pub mod authentication;
pub mod configuration;
pub mod credentials;
pub mod error;
pub mod login;
pub mod subject;

pub use authentication::{HttpsigAuthentication, resolve_identity};
pub use configuration::{HttpsigConfiguration, Snapshot, load_keychain};
pub use credentials::HttpsigCredentials;
pub use error::LoginError;
pub use login::{HttpsigLoginModule, LoginState};
pub use subject::{AuthInfo, Principal, Subject};
