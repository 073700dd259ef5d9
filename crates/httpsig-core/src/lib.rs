//! Core types and configuration for HTTP Signature login.
//!
//! This crate provides the building blocks shared by the verification engine
//! and the login adapter: the validated [`UserId`] identity type, the
//! [`KeyIdScheme`] that decides how keychain entries are addressed, and the
//! [`HttpsigConfig`] activation surface.

mod config;
mod error;
mod types;

pub use config::{
    HttpsigConfig, PARAM_HEADERS, PARAM_KEY_ID, PARAM_PREFIX_SSHKEYS, PARAM_REALM, PARAM_SKEW,
};
pub use error::ConfigError;
pub use types::{KeyIdScheme, UserId};
