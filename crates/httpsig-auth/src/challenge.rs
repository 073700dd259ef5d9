//! Server verification policy advertised in `WWW-Authenticate`.

use std::fmt;

use crate::algorithm::AlgorithmSet;
use crate::authorization::{parse_signature_params, required_param};
use crate::error::AuthError;

/// Default header list when a challenge or authorization names none.
pub const DEFAULT_HEADERS: &[&str] = &["date"];

/// The realm, required signed headers and accepted algorithms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    realm: String,
    required_headers: Vec<String>,
    algorithms: AlgorithmSet,
}

impl Challenge {
    /// Create a challenge. Header names are lower-cased.
    pub fn new<I, S>(realm: impl Into<String>, required_headers: I, algorithms: AlgorithmSet) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            realm: realm.into(),
            required_headers: required_headers
                .into_iter()
                .map(|h| h.as_ref().to_ascii_lowercase())
                .collect(),
            algorithms,
        }
    }

    /// Realm name.
    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Headers every authorization must sign, in order.
    #[must_use]
    pub fn required_headers(&self) -> &[String] {
        &self.required_headers
    }

    /// Accepted algorithms.
    #[must_use]
    pub fn algorithms(&self) -> &AlgorithmSet {
        &self.algorithms
    }

    /// Render as a `WWW-Authenticate` value.
    #[must_use]
    pub fn to_header_value(&self) -> String {
        format!(
            "Signature realm=\"{}\",headers=\"{}\",algorithms=\"{}\"",
            self.realm,
            self.required_headers.join(" "),
            self.algorithms
        )
    }

    /// Parse a `WWW-Authenticate: Signature ...` value.
    ///
    /// A missing `headers` parameter defaults to `date`.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidAuthHeader`] for malformed input and
    /// [`AuthError::UnsupportedAlgorithm`] for an unknown algorithm name.
    pub fn parse(value: &str) -> Result<Self, AuthError> {
        let params = parse_signature_params(value)?;
        let realm = required_param(&params, "realm")?;
        let algorithms = AlgorithmSet::parse_list(required_param(&params, "algorithms")?)?;
        let headers: Vec<&str> = match params.iter().find(|(name, _)| *name == "headers") {
            Some((_, raw)) => raw.split_whitespace().collect(),
            None => DEFAULT_HEADERS.to_vec(),
        };
        Ok(Self::new(realm, headers, algorithms))
    }
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}
