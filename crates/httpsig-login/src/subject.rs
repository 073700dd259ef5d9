//! The authenticated identity handed to the session layer.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use httpsig_core::UserId;
use serde::Serialize;

use crate::credentials::HttpsigCredentials;

/// A named principal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Create a principal.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The principal name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&UserId> for Principal {
    fn from(user_id: &UserId) -> Self {
        Self(user_id.as_str().to_owned())
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authentication result attached to a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthInfo {
    user_id: UserId,
    attributes: BTreeMap<String, String>,
    principals: BTreeSet<Principal>,
}

impl AuthInfo {
    /// Create auth info with an empty attribute map.
    #[must_use]
    pub fn new(user_id: UserId, principals: BTreeSet<Principal>) -> Self {
        Self {
            user_id,
            attributes: BTreeMap::new(),
            principals,
        }
    }

    /// The authenticated user.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Extra attributes.
    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Principals of the user.
    #[must_use]
    pub fn principals(&self) -> &BTreeSet<Principal> {
        &self.principals
    }
}

/// Principals and credentials accumulated by a login.
#[derive(Debug, Default)]
pub struct Subject {
    principals: BTreeSet<Principal>,
    public_credentials: Vec<HttpsigCredentials>,
    auth_info: Option<AuthInfo>,
    read_only: bool,
}

impl Subject {
    /// Create an empty, writable subject.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze the subject; later commits leave it untouched.
    pub fn set_read_only(&mut self) {
        self.read_only = true;
    }

    /// Whether the subject is frozen.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Principals.
    #[must_use]
    pub fn principals(&self) -> &BTreeSet<Principal> {
        &self.principals
    }

    /// Public credentials.
    #[must_use]
    pub fn public_credentials(&self) -> &[HttpsigCredentials] {
        &self.public_credentials
    }

    /// Attached auth info.
    #[must_use]
    pub fn auth_info(&self) -> Option<&AuthInfo> {
        self.auth_info.as_ref()
    }

    pub(crate) fn add(&mut self, principals: &BTreeSet<Principal>, credentials: HttpsigCredentials, auth_info: AuthInfo) {
        self.principals.extend(principals.iter().cloned());
        self.public_credentials.push(credentials);
        self.auth_info = Some(auth_info);
    }

    pub(crate) fn remove(&mut self, principals: &BTreeSet<Principal>) {
        self.principals.retain(|p| !principals.contains(p));
        self.public_credentials.clear();
        self.auth_info = None;
    }
}
