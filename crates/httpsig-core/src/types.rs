//! Identity and key addressing types shared across crates.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// The identity a key is bound to (a login user name).
///
/// Always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a new user id.
    ///
    /// # Errors
    /// Returns [`ConfigError::EmptyUserId`] if the id is empty or only whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, ConfigError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ConfigError::EmptyUserId);
        }
        Ok(Self(id))
    }

    /// Get the user id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for UserId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

/// How the verifier derives the identifier it matches against an
/// authorization's `keyId`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyIdScheme {
    /// The key's own identifier.
    KeyId,
    /// The key fingerprint (`aa:bb:...`).
    Fingerprint,
    /// `/{user}/keys/{fingerprint}` for identity keys, the bare fingerprint
    /// for keys without an owner.
    #[default]
    UserFingerprint,
}

impl KeyIdScheme {
    /// The configuration name of this scheme.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeyId => "key-id",
            Self::Fingerprint => "fingerprint",
            Self::UserFingerprint => "user-fingerprint",
        }
    }
}

impl fmt::Display for KeyIdScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyIdScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "key-id" | "keyid" | "id" => Ok(Self::KeyId),
            "fingerprint" => Ok(Self::Fingerprint),
            "user-fingerprint" | "userfingerprint" => Ok(Self::UserFingerprint),
            _ => Err(ConfigError::UnknownKeyIdScheme(s.to_owned())),
        }
    }
}
