//! Signature algorithm names.
//!
//! The wire names follow the HTTP Signatures draft (`rsa-sha256`,
//! `hmac-sha256`, ...). Parsing is case-insensitive, display is always the
//! lower-case wire name.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::AuthError;

/// A signature algorithm a key may support and an authorization may claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Algorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-1.
    RsaSha1,
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    RsaSha256,
    /// RSASSA-PKCS1-v1_5 with SHA-512.
    RsaSha512,
    /// HMAC with SHA-1.
    HmacSha1,
    /// HMAC with SHA-256.
    HmacSha256,
    /// HMAC with SHA-512.
    HmacSha512,
    /// Ed25519 (pure EdDSA).
    Ed25519,
}

impl Algorithm {
    /// All supported algorithms, in preference order.
    pub const ALL: [Self; 7] = [
        Self::RsaSha256,
        Self::RsaSha512,
        Self::RsaSha1,
        Self::Ed25519,
        Self::HmacSha256,
        Self::HmacSha512,
        Self::HmacSha1,
    ];

    /// The wire name of this algorithm.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RsaSha1 => "rsa-sha1",
            Self::RsaSha256 => "rsa-sha256",
            Self::RsaSha512 => "rsa-sha512",
            Self::HmacSha1 => "hmac-sha1",
            Self::HmacSha256 => "hmac-sha256",
            Self::HmacSha512 => "hmac-sha512",
            Self::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AuthError::UnsupportedAlgorithm(s.to_owned()))
    }
}

/// An ordered set of algorithms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlgorithmSet(BTreeSet<Algorithm>);

impl AlgorithmSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the set contains `algorithm`.
    #[must_use]
    pub fn contains(&self, algorithm: Algorithm) -> bool {
        self.0.contains(&algorithm)
    }

    /// Add an algorithm.
    pub fn insert(&mut self, algorithm: Algorithm) {
        self.0.insert(algorithm);
    }

    /// Add every algorithm of `other`.
    pub fn extend_from(&mut self, other: &Self) {
        self.0.extend(other.0.iter().copied());
    }

    /// Iterate in order.
    pub fn iter(&self) -> impl Iterator<Item = Algorithm> + '_ {
        self.0.iter().copied()
    }

    /// Number of algorithms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a space separated list of wire names.
    ///
    /// # Errors
    /// Returns [`AuthError::UnsupportedAlgorithm`] for the first unknown name.
    pub fn parse_list(raw: &str) -> Result<Self, AuthError> {
        raw.split_whitespace().map(str::parse::<Algorithm>).collect()
    }
}

impl FromIterator<Algorithm> for AlgorithmSet {
    fn from_iter<T: IntoIterator<Item = Algorithm>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Algorithm; N]> for AlgorithmSet {
    fn from(algorithms: [Algorithm; N]) -> Self {
        algorithms.into_iter().collect()
    }
}

impl fmt::Display for AlgorithmSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for alg in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(alg.as_str())?;
            first = false;
        }
        Ok(())
    }
}
