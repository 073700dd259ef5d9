//! Ordered key collections and identity binding.

use std::fmt;
use std::sync::Arc;

use httpsig_core::{KeyIdScheme, UserId};

use crate::algorithm::AlgorithmSet;
use crate::key::Key;

/// A key bound to the user it authenticates.
#[derive(Debug, Clone)]
pub struct IdentityKey {
    user_id: UserId,
    key: Arc<dyn Key>,
}

impl IdentityKey {
    /// Bind `key` to `user_id`.
    pub fn new(user_id: UserId, key: Arc<dyn Key>) -> Self {
        Self { user_id, key }
    }

    /// The owning user.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// The wrapped key.
    #[must_use]
    pub fn key(&self) -> &Arc<dyn Key> {
        &self.key
    }
}

/// One keychain element.
///
/// Only [`KeyEntry::Identity`] entries can complete a login; an unbound key
/// may still verify signatures.
#[derive(Debug, Clone)]
pub enum KeyEntry {
    /// A key with no owner.
    Unbound(Arc<dyn Key>),
    /// A key bound to a user.
    Identity(IdentityKey),
}

impl KeyEntry {
    /// The key used for cryptographic operations.
    #[must_use]
    pub fn key(&self) -> &Arc<dyn Key> {
        match self {
            Self::Unbound(key) => key,
            Self::Identity(identity) => identity.key(),
        }
    }

    /// The owning user, if any.
    #[must_use]
    pub fn owner(&self) -> Option<&UserId> {
        match self {
            Self::Unbound(_) => None,
            Self::Identity(identity) => Some(identity.user_id()),
        }
    }

    /// The identifier this entry is addressed by under `scheme`.
    #[must_use]
    pub fn id_for(&self, scheme: KeyIdScheme) -> String {
        match (scheme, self) {
            (KeyIdScheme::KeyId, _) => self.key().id().to_owned(),
            (KeyIdScheme::Fingerprint, _) | (KeyIdScheme::UserFingerprint, Self::Unbound(_)) => {
                self.key().fingerprint().to_owned()
            }
            (KeyIdScheme::UserFingerprint, Self::Identity(identity)) => {
                format!("/{}/keys/{}", identity.user_id(), identity.key().fingerprint())
            }
        }
    }

    fn matches(&self, scheme: KeyIdScheme, key_id: &str) -> bool {
        match (scheme, self) {
            (KeyIdScheme::KeyId, _) => self.key().id() == key_id,
            (KeyIdScheme::Fingerprint, _) | (KeyIdScheme::UserFingerprint, Self::Unbound(_)) => {
                self.key().fingerprint() == key_id
            }
            (KeyIdScheme::UserFingerprint, Self::Identity(_)) => self.id_for(scheme) == key_id,
        }
    }
}

impl From<IdentityKey> for KeyEntry {
    fn from(identity: IdentityKey) -> Self {
        Self::Identity(identity)
    }
}

/// An ordered collection of keys. Insertion order is search order.
#[derive(Clone, Default)]
pub struct Keychain {
    entries: Vec<KeyEntry>,
}

impl Keychain {
    /// Create an empty keychain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, entry: impl Into<KeyEntry>) {
        self.entries.push(entry.into());
    }

    /// Append a key with no owner.
    pub fn push_unbound(&mut self, key: Arc<dyn Key>) {
        self.entries.push(KeyEntry::Unbound(key));
    }

    /// Append a key owned by `user_id`.
    pub fn push_identity(&mut self, user_id: UserId, key: Arc<dyn Key>) {
        self.entries.push(KeyEntry::Identity(IdentityKey::new(user_id, key)));
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, KeyEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the keychain has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union of every entry's algorithms.
    #[must_use]
    pub fn algorithms(&self) -> AlgorithmSet {
        let mut set = AlgorithmSet::new();
        for entry in &self.entries {
            set.extend_from(entry.key().algorithms());
        }
        set
    }

    /// First entry whose identifier under `scheme` equals `key_id`.
    #[must_use]
    pub fn find(&self, scheme: KeyIdScheme, key_id: &str) -> Option<&KeyEntry> {
        self.entries.iter().find(|entry| entry.matches(scheme, key_id))
    }
}

impl fmt::Debug for Keychain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keychain")
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl<'a> IntoIterator for &'a Keychain {
    type Item = &'a KeyEntry;
    type IntoIter = std::slice::Iter<'a, KeyEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<KeyEntry> for Keychain {
    fn from_iter<T: IntoIterator<Item = KeyEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
