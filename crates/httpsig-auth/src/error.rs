//! Error types for HTTP Signature authentication.
//!
//! Per-request failures are represented by [`AuthError`]. Each variant maps to
//! one coarse [`VerifyStatus`] through [`AuthError::status`], which is what the
//! login layer reports. Failures while loading key material are [`KeyError`].

use crate::algorithm::Algorithm;
use crate::verifier::VerifyStatus;

/// Errors that can occur while authenticating a signed request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The `Authorization` header is missing from the request.
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    /// The `Authorization` (or `WWW-Authenticate`) header could not be parsed.
    #[error("Invalid Signature header format")]
    InvalidAuthHeader,

    /// The `signature` parameter is not valid base64.
    #[error("Invalid signature encoding")]
    InvalidSignatureEncoding,

    /// The signed `date` header is not a valid HTTP date.
    #[error("Invalid date header: {0}")]
    InvalidDate(String),

    /// A header listed as signed is missing from the request.
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// A header required by the challenge is not covered by the signature.
    #[error("Challenge requires header to be signed: {0}")]
    ChallengeNotSatisfied(String),

    /// The algorithm name is not known.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The algorithm is known but not accepted by the challenge.
    #[error("Algorithm not accepted: {0}")]
    AlgorithmNotAccepted(Algorithm),

    /// No key in the keychain matches the `keyId`.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// The selected key does not support the claimed algorithm.
    #[error("Key does not support algorithm: {0}")]
    KeyAlgorithmMismatch(Algorithm),

    /// The `date` header is outside the permitted skew window.
    #[error("Request has expired")]
    RequestExpired,

    /// The signature does not verify against the selected key.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,

    /// The signature verified but the key is not bound to any identity.
    #[error("Key is not bound to an identity: {0}")]
    UnboundKey(String),

    /// No key in the keychain can sign with an accepted algorithm.
    #[error("No signing key available")]
    NoSigningKey,
}

impl AuthError {
    /// The coarse verification outcome this error corresponds to.
    #[must_use]
    pub fn status(&self) -> VerifyStatus {
        match self {
            Self::MissingAuthHeader
            | Self::InvalidAuthHeader
            | Self::InvalidSignatureEncoding
            | Self::InvalidDate(_) => VerifyStatus::Malformed,
            Self::MissingHeader(_) | Self::ChallengeNotSatisfied(_) => VerifyStatus::MissingHeaders,
            Self::UnsupportedAlgorithm(_)
            | Self::AlgorithmNotAccepted(_)
            | Self::KeyNotFound(_)
            | Self::KeyAlgorithmMismatch(_)
            | Self::UnboundKey(_)
            | Self::NoSigningKey => VerifyStatus::InvalidKey,
            Self::RequestExpired => VerifyStatus::Expired,
            Self::SignatureDoesNotMatch => VerifyStatus::InvalidSignature,
        }
    }
}

/// Errors raised while loading or using key material.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// The key file could not be read.
    #[error("Failed to read key file {path}: {source}")]
    Io {
        /// The file that failed.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The key data could not be decoded.
    #[error("Failed to parse key: {0}")]
    Parse(String),

    /// The key type is not supported.
    #[error("Unsupported key type: {0}")]
    Unsupported(String),

    /// The key cannot perform the requested operation.
    #[error("Key cannot {operation} with {algorithm}")]
    Capability {
        /// `"sign"` or `"verify"`.
        operation: &'static str,
        /// The requested algorithm.
        algorithm: Algorithm,
    },

    /// The cryptographic backend failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),
}
