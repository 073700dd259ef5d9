//! End-to-end tests for HTTP Signature login.
//!
//! Each test writes authorized-keys files to a temporary directory, activates
//! a configuration from them and drives signed requests through the login
//! module, exactly as a host login framework would.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Once};

use httpsig_auth::authorized_keys::format_rsa_line;
use httpsig_auth::testutil::{epoch, sign_request, user};
use httpsig_auth::{Algorithm, FixedClock, Key, RequestContent, RsaKey};
use httpsig_core::HttpsigConfig;
use httpsig_login::{HttpsigConfiguration, HttpsigLoginModule, Subject};
use tempfile::TempDir;

static INIT: Once = Once::new();

/// Headers signed by every fixture request.
pub const SIGNED_HEADERS: &[&str] = &["(request-target)", "host", "date"];

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A directory of per-user authorized-keys files.
#[derive(Debug)]
pub struct KeyDir {
    dir: TempDir,
    files: BTreeMap<String, PathBuf>,
}

impl KeyDir {
    /// Create an empty key directory.
    #[must_use]
    pub fn new() -> Self {
        init_tracing();
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
            files: BTreeMap::new(),
        }
    }

    /// Replace `user`'s key file with the public halves of `keys`.
    pub fn write(&mut self, user: &str, keys: &[&RsaKey]) {
        let path = self.dir.path().join(format!("{user}.keys"));
        let mut file = std::fs::File::create(&path).expect("create key file");
        writeln!(file, "# keys for {user}").expect("write key file");
        for key in keys {
            writeln!(file, "{}", format_rsa_line(&key.to_public(), user)).expect("write key file");
        }
        self.files.insert(user.to_owned(), path);
    }

    /// A configuration pointing at every written key file.
    #[must_use]
    pub fn config(&self) -> HttpsigConfig {
        let key_files = self
            .files
            .iter()
            .map(|(name, path)| (user(name), path.clone()))
            .collect();
        HttpsigConfig::builder()
            .realm("integration")
            .required_headers(vec!["(request-target)".to_owned(), "date".to_owned()])
            .key_files(key_files)
            .build()
    }

    /// Activate the written configuration with the clock fixed at [`epoch`].
    #[must_use]
    pub fn activate(&self) -> Arc<HttpsigConfiguration> {
        Arc::new(HttpsigConfiguration::with_clock(
            &self.config(),
            Arc::new(FixedClock(epoch())),
        ))
    }
}

impl Default for KeyDir {
    fn default() -> Self {
        Self::new()
    }
}

/// The `user-fingerprint` key id of `key` for `user`.
#[must_use]
pub fn key_id(user: &str, key: &dyn Key) -> String {
    format!("/{user}/keys/{}", key.fingerprint())
}

/// A `GET` request for `path` with `host` and `date` headers.
#[must_use]
pub fn request(path: &str, date: chrono::DateTime<chrono::Utc>) -> http::request::Parts {
    let (parts, ()) = http::Request::builder()
        .method("GET")
        .uri(path)
        .header("Host", "localhost:4567")
        .header("Date", httpsig_auth::request::http_date(date))
        .body(())
        .expect("valid request")
        .into_parts();
    parts
}

/// Sign `parts` in place with rsa-sha256 over [`SIGNED_HEADERS`].
pub fn sign(parts: &mut http::request::Parts, key: &RsaKey, key_id: &str) {
    let content = RequestContent::from_parts(parts);
    let authorization = sign_request(key, key_id, Algorithm::RsaSha256, SIGNED_HEADERS, &content);
    parts.headers.insert(
        http::header::AUTHORIZATION,
        authorization
            .to_header_value()
            .parse()
            .expect("valid header value"),
    );
}

/// Run one login attempt against the current snapshot and commit it into a
/// fresh subject.
#[must_use]
pub fn login(configuration: &HttpsigConfiguration, parts: &http::request::Parts) -> (HttpsigLoginModule, Subject) {
    let snapshot = configuration.snapshot();
    let mut module = snapshot.login_module();
    let credentials = snapshot.credentials_from_parts(parts).ok();
    let mut subject = Subject::new();
    let authenticated = module.login(credentials).expect("first attempt");
    if authenticated {
        assert!(module.commit(&mut subject));
    }
    (module, subject)
}

mod test_concurrency;
mod test_login;
mod test_reconfigure;
