//! Key capability trait and the per-family key implementations.
//!
//! A [`Key`] declares the algorithms it supports and whether it can sign,
//! verify, or both. Verification under an algorithm outside that set always
//! fails; there is no fallback to a weaker algorithm.
//!
//! - [`RsaKey`] - RSASSA-PKCS1-v1_5 with SHA-1, SHA-256 or SHA-512
//! - [`Ed25519Key`] - Ed25519
//! - [`HmacKey`] - shared-secret HMAC with SHA-1, SHA-256 or SHA-512

use std::fmt;

use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey};
use hmac::{Hmac, Mac};
use md5::Md5;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use signature::{SignatureEncoding, Signer, Verifier};
use subtle::ConstantTimeEq;

use crate::algorithm::{Algorithm, AlgorithmSet};
use crate::authorized_keys::{encode_ed25519_blob, encode_rsa_blob};
use crate::error::KeyError;

/// A public (and possibly private) key usable for HTTP signatures.
pub trait Key: fmt::Debug + Send + Sync {
    /// Stable identifier of the key material.
    fn id(&self) -> &str;

    /// Fingerprint used in key ids: colon separated MD5 hex for SSH keys,
    /// the configured id for shared secrets.
    fn fingerprint(&self) -> &str;

    /// Algorithms this key supports.
    fn algorithms(&self) -> &AlgorithmSet;

    /// Whether the key can verify signatures.
    fn can_verify(&self) -> bool;

    /// Whether the key can produce signatures.
    fn can_sign(&self) -> bool;

    /// Verify `signature` over `content` using `algorithm`.
    ///
    /// Returns `false` for any algorithm outside [`Key::algorithms`].
    fn verify(&self, algorithm: Algorithm, content: &[u8], signature: &[u8]) -> bool;

    /// Sign `content` using `algorithm`.
    fn sign(&self, algorithm: Algorithm, content: &[u8]) -> Result<Vec<u8>, KeyError>;
}

/// Render a digest as `aa:bb:cc:...`.
fn colon_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| hex::encode([*b]))
        .collect::<Vec<_>>()
        .join(":")
}

/// OpenSSH legacy MD5 fingerprint of a public key wire blob.
#[must_use]
pub fn ssh_fingerprint(blob: &[u8]) -> String {
    colon_hex(&Md5::digest(blob))
}

// ---------------------------------------------------------------------------
// RSA
// ---------------------------------------------------------------------------

/// An RSA key, optionally holding the private half.
#[derive(Clone)]
pub struct RsaKey {
    fingerprint: String,
    public: RsaPublicKey,
    private: Option<RsaPrivateKey>,
    algorithms: AlgorithmSet,
}

impl RsaKey {
    /// Create a verify-only key from a public key.
    #[must_use]
    pub fn from_public(public: RsaPublicKey) -> Self {
        Self {
            fingerprint: ssh_fingerprint(&encode_rsa_blob(&public)),
            public,
            private: None,
            algorithms: AlgorithmSet::from([
                Algorithm::RsaSha1,
                Algorithm::RsaSha256,
                Algorithm::RsaSha512,
            ]),
        }
    }

    /// Create a signing key from a private key.
    #[must_use]
    pub fn from_private(private: RsaPrivateKey) -> Self {
        let mut key = Self::from_public(private.to_public_key());
        key.private = Some(private);
        key
    }

    /// Decode a PEM private key (PKCS#8 `PRIVATE KEY` or PKCS#1 `RSA PRIVATE KEY`).
    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        let private = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| KeyError::Parse(e.to_string()))?;
        Ok(Self::from_private(private))
    }

    /// The public half.
    #[must_use]
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// A copy of this key without private material.
    #[must_use]
    pub fn to_public(&self) -> Self {
        Self::from_public(self.public.clone())
    }

    fn verify_with<D>(&self, content: &[u8], signature: &[u8]) -> bool
    where
        D: Digest + rsa::pkcs8::AssociatedOid,
    {
        let Ok(signature) = rsa::pkcs1v15::Signature::try_from(signature) else {
            return false;
        };
        rsa::pkcs1v15::VerifyingKey::<D>::new(self.public.clone())
            .verify(content, &signature)
            .is_ok()
    }

    fn sign_with<D>(private: &RsaPrivateKey, content: &[u8]) -> Result<Vec<u8>, KeyError>
    where
        D: Digest + rsa::pkcs8::AssociatedOid,
    {
        rsa::pkcs1v15::SigningKey::<D>::new(private.clone())
            .try_sign(content)
            .map(|sig| sig.to_vec())
            .map_err(|e| KeyError::Crypto(e.to_string()))
    }
}

impl fmt::Debug for RsaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKey")
            .field("fingerprint", &self.fingerprint)
            .field("private", &self.private.is_some())
            .finish()
    }
}

impl Key for RsaKey {
    fn id(&self) -> &str {
        &self.fingerprint
    }

    fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn algorithms(&self) -> &AlgorithmSet {
        &self.algorithms
    }

    fn can_verify(&self) -> bool {
        true
    }

    fn can_sign(&self) -> bool {
        self.private.is_some()
    }

    fn verify(&self, algorithm: Algorithm, content: &[u8], signature: &[u8]) -> bool {
        match algorithm {
            Algorithm::RsaSha1 => self.verify_with::<Sha1>(content, signature),
            Algorithm::RsaSha256 => self.verify_with::<Sha256>(content, signature),
            Algorithm::RsaSha512 => self.verify_with::<Sha512>(content, signature),
            _ => false,
        }
    }

    fn sign(&self, algorithm: Algorithm, content: &[u8]) -> Result<Vec<u8>, KeyError> {
        let private = self.private.as_ref().ok_or(KeyError::Capability {
            operation: "sign",
            algorithm,
        })?;
        match algorithm {
            Algorithm::RsaSha1 => Self::sign_with::<Sha1>(private, content),
            Algorithm::RsaSha256 => Self::sign_with::<Sha256>(private, content),
            Algorithm::RsaSha512 => Self::sign_with::<Sha512>(private, content),
            _ => Err(KeyError::Capability {
                operation: "sign",
                algorithm,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Ed25519
// ---------------------------------------------------------------------------

/// An Ed25519 key, optionally holding the signing half.
#[derive(Clone)]
pub struct Ed25519Key {
    fingerprint: String,
    verifying: Ed25519VerifyingKey,
    signing: Option<Ed25519SigningKey>,
    algorithms: AlgorithmSet,
}

impl Ed25519Key {
    /// Create a verify-only key from raw public key bytes.
    pub fn from_public_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let bytes: &[u8; 32] = bytes
            .try_into()
            .map_err(|_| KeyError::Parse(format!("ed25519 key must be 32 bytes, got {}", bytes.len())))?;
        let verifying =
            Ed25519VerifyingKey::from_bytes(bytes).map_err(|e| KeyError::Parse(e.to_string()))?;
        Ok(Self::from_verifying(verifying))
    }

    /// Create a signing key from a 32-byte seed.
    #[must_use]
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing = Ed25519SigningKey::from_bytes(seed);
        let mut key = Self::from_verifying(signing.verifying_key());
        key.signing = Some(signing);
        key
    }

    fn from_verifying(verifying: Ed25519VerifyingKey) -> Self {
        Self {
            fingerprint: ssh_fingerprint(&encode_ed25519_blob(&verifying)),
            verifying,
            signing: None,
            algorithms: AlgorithmSet::from([Algorithm::Ed25519]),
        }
    }

    /// The public half.
    #[must_use]
    pub fn verifying_key(&self) -> &Ed25519VerifyingKey {
        &self.verifying
    }

    /// A copy of this key without private material.
    #[must_use]
    pub fn to_public(&self) -> Self {
        Self::from_verifying(self.verifying)
    }
}

impl fmt::Debug for Ed25519Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519Key")
            .field("fingerprint", &self.fingerprint)
            .field("private", &self.signing.is_some())
            .finish()
    }
}

impl Key for Ed25519Key {
    fn id(&self) -> &str {
        &self.fingerprint
    }

    fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn algorithms(&self) -> &AlgorithmSet {
        &self.algorithms
    }

    fn can_verify(&self) -> bool {
        true
    }

    fn can_sign(&self) -> bool {
        self.signing.is_some()
    }

    fn verify(&self, algorithm: Algorithm, content: &[u8], signature: &[u8]) -> bool {
        if algorithm != Algorithm::Ed25519 {
            return false;
        }
        let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
            return false;
        };
        self.verifying.verify_strict(content, &signature).is_ok()
    }

    fn sign(&self, algorithm: Algorithm, content: &[u8]) -> Result<Vec<u8>, KeyError> {
        match (&self.signing, algorithm) {
            (Some(signing), Algorithm::Ed25519) => Ok(signing.sign(content).to_bytes().to_vec()),
            _ => Err(KeyError::Capability {
                operation: "sign",
                algorithm,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// HMAC
// ---------------------------------------------------------------------------

/// A shared-secret HMAC key.
///
/// HMAC keys cannot be loaded from authorized-keys files; they are built
/// programmatically with an explicit id. The fingerprint is that id: any
/// digest of the secret would let a key id be brute-forced offline.
#[derive(Clone)]
pub struct HmacKey {
    id: String,
    secret: Vec<u8>,
    algorithms: AlgorithmSet,
}

impl HmacKey {
    /// Create a key supporting `hmac-sha1`, `hmac-sha256` and `hmac-sha512`.
    pub fn new(id: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
            algorithms: AlgorithmSet::from([
                Algorithm::HmacSha1,
                Algorithm::HmacSha256,
                Algorithm::HmacSha512,
            ]),
        }
    }

    fn mac(&self, algorithm: Algorithm, content: &[u8]) -> Option<Vec<u8>> {
        fn compute<M: Mac + hmac::digest::KeyInit>(secret: &[u8], content: &[u8]) -> Vec<u8> {
            let mut mac = <M as hmac::digest::KeyInit>::new_from_slice(secret)
                .expect("HMAC can accept any key length");
            mac.update(content);
            mac.finalize().into_bytes().to_vec()
        }

        match algorithm {
            Algorithm::HmacSha1 => Some(compute::<Hmac<Sha1>>(&self.secret, content)),
            Algorithm::HmacSha256 => Some(compute::<Hmac<Sha256>>(&self.secret, content)),
            Algorithm::HmacSha512 => Some(compute::<Hmac<Sha512>>(&self.secret, content)),
            _ => None,
        }
    }
}

impl fmt::Debug for HmacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacKey")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Key for HmacKey {
    fn id(&self) -> &str {
        &self.id
    }

    fn fingerprint(&self) -> &str {
        &self.id
    }

    fn algorithms(&self) -> &AlgorithmSet {
        &self.algorithms
    }

    fn can_verify(&self) -> bool {
        true
    }

    fn can_sign(&self) -> bool {
        true
    }

    fn verify(&self, algorithm: Algorithm, content: &[u8], signature: &[u8]) -> bool {
        self.mac(algorithm, content)
            .is_some_and(|expected| bool::from(expected.as_slice().ct_eq(signature)))
    }

    fn sign(&self, algorithm: Algorithm, content: &[u8]) -> Result<Vec<u8>, KeyError> {
        self.mac(algorithm, content).ok_or(KeyError::Capability {
            operation: "sign",
            algorithm,
        })
    }
}
