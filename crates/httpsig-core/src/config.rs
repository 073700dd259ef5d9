//! Activation configuration for HTTP Signature login.
//!
//! Provides [`HttpsigConfig`], the set of values consumed when the login
//! configuration is activated: realm name, clock-skew tolerance, per-user key
//! files, required signed headers and the key id scheme. Values can come from
//! environment variables ([`HttpsigConfig::from_env`]) or from an OSGi-style
//! property map ([`HttpsigConfig::from_properties`]).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use typed_builder::TypedBuilder;

use crate::error::ConfigError;
use crate::types::{KeyIdScheme, UserId};

/// Property key for the realm name.
pub const PARAM_REALM: &str = "jaas.realmName";
/// Property key for the skew tolerance in milliseconds.
pub const PARAM_SKEW: &str = "httpsig.skew";
/// Property key prefix for per-user key files (`httpsig.sshkeys.<user>`).
pub const PARAM_PREFIX_SSHKEYS: &str = "httpsig.sshkeys.";
/// Property key for the space separated required header list.
pub const PARAM_HEADERS: &str = "httpsig.headers";
/// Property key for the key id scheme.
pub const PARAM_KEY_ID: &str = "httpsig.keyid";

/// HTTP Signature login configuration.
///
/// # Examples
///
/// ```
/// use httpsig_core::HttpsigConfig;
///
/// let config = HttpsigConfig::default();
/// assert_eq!(config.realm, "httpsig");
/// assert_eq!(config.skew().as_secs(), 300);
/// assert_eq!(config.required_headers, vec!["date".to_owned()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct HttpsigConfig {
    /// Realm advertised in the challenge.
    #[builder(default = String::from("httpsig"), setter(into))]
    pub realm: String,

    /// Maximum clock skew, in milliseconds, between the signed `date` header
    /// and the verifier clock.
    #[builder(default = 300_000)]
    pub skew_ms: u64,

    /// Authorized-keys file per user.
    #[builder(default)]
    pub key_files: BTreeMap<UserId, PathBuf>,

    /// Header names every authorization must cover.
    #[builder(default = vec![String::from("date")])]
    pub required_headers: Vec<String>,

    /// How keychain entries are addressed by `keyId`.
    #[builder(default)]
    pub key_id_scheme: KeyIdScheme,

    /// Bind address for the demo gateway.
    #[builder(default = String::from("0.0.0.0:4567"), setter(into))]
    pub gateway_listen: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"), setter(into))]
    pub log_level: String,
}

impl Default for HttpsigConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl HttpsigConfig {
    /// The skew tolerance as a [`Duration`].
    #[must_use]
    pub fn skew(&self) -> Duration {
        Duration::from_millis(self.skew_ms)
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `HTTPSIG_REALM` | `httpsig` |
    /// | `HTTPSIG_SKEW` | `300000` (ms) |
    /// | `HTTPSIG_SSHKEYS` | *(empty)*, `user=path,user=path` |
    /// | `HTTPSIG_HEADERS` | `date` |
    /// | `HTTPSIG_KEY_ID` | `user-fingerprint` |
    /// | `GATEWAY_LISTEN` | `0.0.0.0:4567` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// Invalid values are logged and the default is kept.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("HTTPSIG_REALM") {
            config.realm = v;
        }
        if let Ok(v) = std::env::var("HTTPSIG_SKEW") {
            match v.trim().parse() {
                Ok(ms) => config.skew_ms = ms,
                Err(_) => warn!(value = %v, "ignoring invalid HTTPSIG_SKEW"),
            }
        }
        if let Ok(v) = std::env::var("HTTPSIG_SSHKEYS") {
            config.key_files = parse_key_file_list(&v);
        }
        if let Ok(v) = std::env::var("HTTPSIG_HEADERS") {
            let headers = parse_header_list(&v);
            if !headers.is_empty() {
                config.required_headers = headers;
            }
        }
        if let Ok(v) = std::env::var("HTTPSIG_KEY_ID") {
            match v.parse() {
                Ok(scheme) => config.key_id_scheme = scheme,
                Err(_) => warn!(value = %v, "ignoring invalid HTTPSIG_KEY_ID"),
            }
        }
        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Build a configuration from an activation property map.
    ///
    /// Recognized keys are `jaas.realmName`, `httpsig.skew` (milliseconds),
    /// `httpsig.headers`, `httpsig.keyid` and `httpsig.sshkeys.<user>`.
    /// Unrecognized keys are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use httpsig_core::HttpsigConfig;
    ///
    /// let config = HttpsigConfig::from_properties([
    ///     ("jaas.realmName", "repo"),
    ///     ("httpsig.sshkeys.alice", "/etc/httpsig/alice.keys"),
    /// ])
    /// .unwrap();
    /// assert_eq!(config.realm, "repo");
    /// assert_eq!(config.key_files.len(), 1);
    /// ```
    pub fn from_properties<I, K, V>(properties: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();

        for (key, value) in properties {
            let (key, value) = (key.as_ref(), value.as_ref());
            if let Some(user) = key.strip_prefix(PARAM_PREFIX_SSHKEYS) {
                config
                    .key_files
                    .insert(UserId::new(user)?, PathBuf::from(value));
                continue;
            }
            match key {
                PARAM_REALM => config.realm = value.to_owned(),
                PARAM_SKEW => {
                    config.skew_ms = value.trim().parse().map_err(|_| invalid(key, value))?;
                }
                PARAM_HEADERS => {
                    let headers = parse_header_list(value);
                    if headers.is_empty() {
                        return Err(invalid(key, value));
                    }
                    config.required_headers = headers;
                }
                PARAM_KEY_ID => config.key_id_scheme = value.parse()?,
                _ => {}
            }
        }

        Ok(config)
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
    }
}

/// Parse a space separated header list into lower-case names.
fn parse_header_list(raw: &str) -> Vec<String> {
    raw.split_whitespace()
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Parse `user=path,user=path`. Malformed entries are skipped with a warning.
fn parse_key_file_list(raw: &str) -> BTreeMap<UserId, PathBuf> {
    let mut files = BTreeMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((user, path)) = entry.split_once('=') else {
            warn!(entry, "ignoring HTTPSIG_SSHKEYS entry without '='");
            continue;
        };
        match UserId::new(user.trim()) {
            Ok(user) => {
                files.insert(user, PathBuf::from(path.trim()));
            }
            Err(e) => warn!(entry, error = %e, "ignoring HTTPSIG_SSHKEYS entry"),
        }
    }
    files
}
