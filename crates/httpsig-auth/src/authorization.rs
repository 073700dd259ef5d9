//! Parsing of the client `Authorization: Signature ...` header.
//!
//! ```text
//! Authorization: Signature keyId="/alice/keys/aa:bb:...",algorithm="rsa-sha256",
//!                headers="(request-target) date",signature="<base64>"
//! ```
//!
//! Parameter order is free. A missing `headers` parameter means `date`.
//! Parsing either produces a complete [`Authorization`] or fails.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use http::HeaderMap;

use crate::algorithm::Algorithm;
use crate::challenge::DEFAULT_HEADERS;
use crate::error::AuthError;

const SCHEME: &str = "Signature";

/// Client-supplied description of how a request was signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    key_id: String,
    algorithm: Algorithm,
    headers: Vec<String>,
    signature: Vec<u8>,
}

impl Authorization {
    /// Create an authorization. Header names are lower-cased.
    pub fn new<I, S>(key_id: impl Into<String>, algorithm: Algorithm, headers: I, signature: Vec<u8>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            key_id: key_id.into(),
            algorithm,
            headers: headers
                .into_iter()
                .map(|h| h.as_ref().to_ascii_lowercase())
                .collect(),
            signature,
        }
    }

    /// The claimed key identifier.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The claimed algorithm.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Signed header names, in signing order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Raw signature bytes.
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Whether `name` is among the signed headers.
    #[must_use]
    pub fn covers(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h.eq_ignore_ascii_case(name))
    }

    /// Extract and parse the `Authorization` header of a request.
    ///
    /// # Errors
    /// Returns [`AuthError::MissingAuthHeader`] if the header is absent,
    /// otherwise the errors of [`Authorization::parse`].
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let value = headers
            .get(http::header::AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;
        Self::parse(value)
    }

    /// Parse a `Signature ...` header value.
    ///
    /// # Errors
    /// - [`AuthError::InvalidAuthHeader`] for a wrong scheme, malformed or
    ///   duplicate parameters, a missing required parameter, or an empty
    ///   `headers` list
    /// - [`AuthError::UnsupportedAlgorithm`] for an unknown algorithm
    /// - [`AuthError::InvalidSignatureEncoding`] for bad base64
    pub fn parse(value: &str) -> Result<Self, AuthError> {
        let params = parse_signature_params(value)?;

        let key_id = required_param(&params, "keyId")?;
        let algorithm: Algorithm = required_param(&params, "algorithm")?.parse()?;
        let encoded = required_param(&params, "signature")?;

        let headers: Vec<&str> = match params.iter().find(|(name, _)| *name == "headers") {
            Some((_, raw)) => raw.split_whitespace().collect(),
            None => DEFAULT_HEADERS.to_vec(),
        };
        if headers.is_empty() {
            return Err(AuthError::InvalidAuthHeader);
        }

        let signature = BASE64
            .decode(encoded)
            .map_err(|_| AuthError::InvalidSignatureEncoding)?;
        if signature.is_empty() {
            return Err(AuthError::InvalidSignatureEncoding);
        }

        Ok(Self::new(key_id, algorithm, headers, signature))
    }

    /// Render as an `Authorization` header value.
    #[must_use]
    pub fn to_header_value(&self) -> String {
        format!(
            "{SCHEME} keyId=\"{}\",algorithm=\"{}\",headers=\"{}\",signature=\"{}\"",
            self.key_id,
            self.algorithm,
            self.headers.join(" "),
            BASE64.encode(&self.signature)
        )
    }
}

impl fmt::Display for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}

/// Split `Signature name="value",name="value"` into its parameters.
///
/// Parameter names are case-sensitive. Values must be quoted and may not
/// contain `"`. Duplicates are rejected.
pub(crate) fn parse_signature_params(value: &str) -> Result<Vec<(&str, &str)>, AuthError> {
    let (scheme, mut rest) = value
        .trim()
        .split_once(char::is_whitespace)
        .ok_or(AuthError::InvalidAuthHeader)?;
    if !scheme.eq_ignore_ascii_case(SCHEME) {
        return Err(AuthError::InvalidAuthHeader);
    }

    let mut params: Vec<(&str, &str)> = Vec::new();
    rest = rest.trim();
    while !rest.is_empty() {
        let (name, after) = rest.split_once('=').ok_or(AuthError::InvalidAuthHeader)?;
        let name = name.trim();
        if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == ',' || c == '"') {
            return Err(AuthError::InvalidAuthHeader);
        }
        let quoted = after
            .trim_start()
            .strip_prefix('"')
            .ok_or(AuthError::InvalidAuthHeader)?;
        let (param_value, after) = quoted.split_once('"').ok_or(AuthError::InvalidAuthHeader)?;
        if params.iter().any(|(existing, _)| *existing == name) {
            return Err(AuthError::InvalidAuthHeader);
        }
        params.push((name, param_value));

        let after = after.trim_start();
        rest = match after.strip_prefix(',') {
            Some(next) => next.trim_start(),
            None if after.is_empty() => after,
            None => return Err(AuthError::InvalidAuthHeader),
        };
    }

    if params.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(params)
}

pub(crate) fn required_param<'a>(params: &[(&str, &'a str)], name: &str) -> Result<&'a str, AuthError> {
    params
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| *v)
        .ok_or(AuthError::InvalidAuthHeader)
}
