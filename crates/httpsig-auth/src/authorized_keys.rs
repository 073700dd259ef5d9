//! OpenSSH `authorized_keys` parsing and encoding.
//!
//! Each non-empty, non-comment line has the form
//! `[options] <type> <base64-blob> [comment]`. Only `ssh-rsa` and
//! `ssh-ed25519` are supported; every other line is skipped on its own so
//! that one bad entry never hides the rest of the file.

use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::VerifyingKey as Ed25519VerifyingKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use tracing::debug;

use crate::error::KeyError;
use crate::key::{Ed25519Key, Key, RsaKey};

const SSH_RSA: &str = "ssh-rsa";
const SSH_ED25519: &str = "ssh-ed25519";

/// Read an authorized-keys file and return every key it could parse.
///
/// # Errors
/// Returns [`KeyError::Io`] if the file cannot be read. Unparseable lines are
/// skipped, not reported.
pub fn load_authorized_keys(path: &Path) -> Result<Vec<Arc<dyn Key>>, KeyError> {
    let text = std::fs::read_to_string(path).map_err(|source| KeyError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_authorized_keys(&text))
}

/// Parse authorized-keys text, skipping lines that fail to parse.
#[must_use]
pub fn parse_authorized_keys(text: &str) -> Vec<Arc<dyn Key>> {
    let mut keys = Vec::new();
    for (index, line) in text.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(key)) => keys.push(key),
            Ok(None) => {}
            Err(e) => debug!(line = index + 1, error = %e, "skipping authorized key line"),
        }
    }
    keys
}

/// Parse a single line. Blank lines and `#` comments yield `Ok(None)`.
///
/// # Errors
/// Returns [`KeyError::Parse`] or [`KeyError::Unsupported`] for a line that
/// holds no usable key.
pub fn parse_line(line: &str) -> Result<Option<Arc<dyn Key>>, KeyError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut tokens = line.split_whitespace();
    let key_type = tokens
        .by_ref()
        .find(|t| is_key_type(t))
        .ok_or_else(|| KeyError::Parse("no key type found".to_owned()))?;
    let encoded = tokens
        .next()
        .ok_or_else(|| KeyError::Parse(format!("{key_type} entry has no key data")))?;
    let blob = BASE64
        .decode(encoded)
        .map_err(|e| KeyError::Parse(format!("invalid base64 key data: {e}")))?;

    decode_blob(key_type, &blob).map(Some)
}

fn is_key_type(token: &str) -> bool {
    token.starts_with("ssh-") || token.starts_with("ecdsa-sha2-") || token.starts_with("sk-")
}

fn decode_blob(key_type: &str, blob: &[u8]) -> Result<Arc<dyn Key>, KeyError> {
    let mut reader = WireReader::new(blob);
    let inner_type = reader.read_string()?;
    if inner_type != key_type.as_bytes() {
        return Err(KeyError::Parse(format!(
            "key type {key_type} does not match encoded type {}",
            String::from_utf8_lossy(inner_type)
        )));
    }

    match key_type {
        SSH_RSA => {
            let e = BigUint::from_bytes_be(reader.read_string()?);
            let n = BigUint::from_bytes_be(reader.read_string()?);
            let public = RsaPublicKey::new(n, e).map_err(|e| KeyError::Parse(e.to_string()))?;
            Ok(Arc::new(RsaKey::from_public(public)))
        }
        SSH_ED25519 => {
            let raw = reader.read_string()?;
            Ok(Arc::new(Ed25519Key::from_public_bytes(raw)?))
        }
        other => Err(KeyError::Unsupported(other.to_owned())),
    }
}

/// Encode an RSA public key as an SSH wire blob.
pub(crate) fn encode_rsa_blob(public: &RsaPublicKey) -> Vec<u8> {
    let mut blob = Vec::new();
    write_string(&mut blob, SSH_RSA.as_bytes());
    write_mpint(&mut blob, &public.e().to_bytes_be());
    write_mpint(&mut blob, &public.n().to_bytes_be());
    blob
}

/// Encode an Ed25519 public key as an SSH wire blob.
pub(crate) fn encode_ed25519_blob(public: &Ed25519VerifyingKey) -> Vec<u8> {
    let mut blob = Vec::new();
    write_string(&mut blob, SSH_ED25519.as_bytes());
    write_string(&mut blob, public.as_bytes());
    blob
}

/// Render an RSA key as an authorized-keys line.
#[must_use]
pub fn format_rsa_line(key: &RsaKey, comment: &str) -> String {
    format_line(SSH_RSA, &encode_rsa_blob(key.public_key()), comment)
}

/// Render an Ed25519 key as an authorized-keys line.
#[must_use]
pub fn format_ed25519_line(key: &Ed25519Key, comment: &str) -> String {
    format_line(SSH_ED25519, &encode_ed25519_blob(key.verifying_key()), comment)
}

fn format_line(key_type: &str, blob: &[u8], comment: &str) -> String {
    let encoded = BASE64.encode(blob);
    if comment.is_empty() {
        format!("{key_type} {encoded}")
    } else {
        format!("{key_type} {encoded} {comment}")
    }
}

#[allow(clippy::cast_possible_truncation)]
fn write_string(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
}

fn write_mpint(out: &mut Vec<u8>, magnitude: &[u8]) {
    let start = magnitude.iter().position(|b| *b != 0).unwrap_or(magnitude.len());
    let magnitude = &magnitude[start..];
    if magnitude.first().is_some_and(|b| b & 0x80 != 0) {
        let mut padded = Vec::with_capacity(magnitude.len() + 1);
        padded.push(0);
        padded.extend_from_slice(magnitude);
        write_string(out, &padded);
    } else {
        write_string(out, magnitude);
    }
}

/// Cursor over SSH wire-format length-prefixed fields.
struct WireReader<'a> {
    data: &'a [u8],
}

impl<'a> WireReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn read_string(&mut self) -> Result<&'a [u8], KeyError> {
        let truncated = || KeyError::Parse("truncated key data".to_owned());
        let (len, rest) = self.data.split_first_chunk::<4>().ok_or_else(truncated)?;
        let len = u32::from_be_bytes(*len) as usize;
        if rest.len() < len {
            return Err(truncated());
        }
        let (value, rest) = rest.split_at(len);
        self.data = rest;
        Ok(value)
    }
}
