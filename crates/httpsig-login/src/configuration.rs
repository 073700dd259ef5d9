//! Configuration activation and the swappable verification snapshot.
//!
//! Activation loads every user's key file into a fresh [`Keychain`], derives
//! the [`Challenge`] from it and publishes both as one [`Snapshot`]. Readers
//! clone the current `Arc<Snapshot>` once and take both halves from it, so
//! an in-flight verification keeps the pair it started with while a
//! reactivation swaps in the next one.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use http::request::Parts;
use httpsig_auth::{AuthError, Challenge, Clock, Keychain, SystemClock, Verifier, load_authorized_keys};
use httpsig_core::{HttpsigConfig, UserId};
use parking_lot::RwLock;
use tracing::{debug, error, info};

use crate::credentials::HttpsigCredentials;
use crate::login::HttpsigLoginModule;

/// Load each user's authorized-keys file into one keychain.
///
/// A user whose file cannot be read contributes no keys; the others are
/// still loaded.
#[must_use]
pub fn load_keychain(key_files: &BTreeMap<UserId, PathBuf>) -> Keychain {
    let mut keychain = Keychain::new();
    for (user_id, path) in key_files {
        match load_authorized_keys(path) {
            Ok(keys) => {
                let mut loaded = 0usize;
                for key in keys.into_iter().filter(|key| key.can_verify()) {
                    keychain.push_identity(user_id.clone(), key);
                    loaded += 1;
                }
                debug!(user = %user_id, path = %path.display(), keys = loaded, "loaded authorized keys");
            }
            Err(e) => error!(user = %user_id, error = %e, "failed to load authorized keys"),
        }
    }
    keychain
}

/// An immutable challenge and verifier pair.
#[derive(Debug)]
pub struct Snapshot {
    challenge: Arc<Challenge>,
    verifier: Arc<Verifier>,
    generation: u64,
}

impl Snapshot {
    /// The challenge in force.
    #[must_use]
    pub fn challenge(&self) -> &Arc<Challenge> {
        &self.challenge
    }

    /// The verifier in force.
    #[must_use]
    pub fn verifier(&self) -> &Arc<Verifier> {
        &self.verifier
    }

    /// Activation counter, starting at 1.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A login module bound to this snapshot's verifier.
    #[must_use]
    pub fn login_module(&self) -> HttpsigLoginModule {
        HttpsigLoginModule::new(Some(Arc::clone(&self.verifier)))
    }

    /// Capture credentials from request parts against this snapshot's
    /// challenge.
    ///
    /// # Errors
    /// See [`HttpsigCredentials::from_parts`].
    pub fn credentials_from_parts(&self, parts: &Parts) -> Result<HttpsigCredentials, AuthError> {
        HttpsigCredentials::from_parts(Arc::clone(&self.challenge), parts)
    }
}

/// Owner of the current [`Snapshot`].
#[derive(Debug)]
pub struct HttpsigConfiguration {
    snapshot: RwLock<Arc<Snapshot>>,
    generation: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl HttpsigConfiguration {
    /// Activate `config` with the system clock.
    #[must_use]
    pub fn new(config: &HttpsigConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Activate `config` with a custom clock for every verifier it builds.
    #[must_use]
    pub fn with_clock(config: &HttpsigConfig, clock: Arc<dyn Clock>) -> Self {
        let snapshot = build_snapshot(config, &clock, 1);
        Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            generation: AtomicU64::new(1),
            clock,
        }
    }

    /// Rebuild keychain and challenge from `config` and swap them in.
    pub fn activate(&self, config: &HttpsigConfig) -> Arc<Snapshot> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let next = Arc::new(build_snapshot(config, &self.clock, generation));
        *self.snapshot.write() = Arc::clone(&next);
        next
    }

    /// The current snapshot. Take the challenge and the verifier of one
    /// request from the same snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }
}

fn build_snapshot(config: &HttpsigConfig, clock: &Arc<dyn Clock>, generation: u64) -> Snapshot {
    let keychain = load_keychain(&config.key_files);
    let challenge = Challenge::new(
        config.realm.clone(),
        &config.required_headers,
        keychain.algorithms(),
    );
    info!(
        realm = %config.realm,
        users = config.key_files.len(),
        keys = keychain.len(),
        algorithms = %challenge.algorithms(),
        generation,
        "activated HTTP signature configuration"
    );
    let verifier = Verifier::new(Arc::new(keychain))
        .with_scheme(config.key_id_scheme)
        .with_skew(config.skew())
        .with_clock(Arc::clone(clock));

    Snapshot {
        challenge: Arc::new(challenge),
        verifier: Arc::new(verifier),
        generation,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use httpsig_auth::authorized_keys::format_ed25519_line;
    use httpsig_auth::testutil::{ed25519_key, epoch, request_at, sign_request, user};
    use httpsig_auth::{Algorithm, FixedClock, Key, VerifyStatus};
    use tempfile::NamedTempFile;

    use super::*;

    fn key_file(lines: &[String]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn test_should_isolate_unreadable_key_file() {
        let alice = ed25519_key(1);
        let file = key_file(&[format_ed25519_line(&alice, "alice")]);
        let dir = tempfile::tempdir().unwrap();

        let key_files = BTreeMap::from([
            (user("alice"), file.path().to_path_buf()),
            (user("bob"), dir.path().join("missing")),
        ]);
        let keychain = load_keychain(&key_files);

        assert_eq!(keychain.len(), 1);
        let entry = keychain.iter().next().unwrap();
        assert_eq!(entry.owner().unwrap().as_str(), "alice");
        assert_eq!(entry.key().fingerprint(), alice.fingerprint());
    }

    #[test]
    fn test_should_build_challenge_from_keychain_and_config() {
        let file = key_file(&[format_ed25519_line(&ed25519_key(1), "")]);
        let config = HttpsigConfig::builder()
            .realm("repo")
            .required_headers(vec!["(request-target)".to_owned(), "date".to_owned()])
            .key_files(BTreeMap::from([(user("alice"), file.path().to_path_buf())]))
            .build();

        let configuration = HttpsigConfiguration::new(&config);
        let snapshot = configuration.snapshot();
        let challenge = snapshot.challenge();
        assert_eq!(challenge.realm(), "repo");
        assert_eq!(challenge.required_headers(), ["(request-target)", "date"]);
        assert_eq!(challenge.algorithms().to_string(), "ed25519");
        assert_eq!(snapshot.generation(), 1);
    }

    #[test]
    fn test_should_swap_snapshot_on_activation() {
        let old_key = ed25519_key(1);
        let new_key = ed25519_key(2);
        let file = key_file(&[format_ed25519_line(&old_key, "")]);
        let config = HttpsigConfig::builder()
            .key_files(BTreeMap::from([(user("alice"), file.path().to_path_buf())]))
            .build();
        let configuration = HttpsigConfiguration::with_clock(&config, Arc::new(FixedClock(epoch())));

        let content = request_at("GET", "/", epoch());
        let sign = |key: &dyn Key| {
            let key_id = format!("/alice/keys/{}", key.fingerprint());
            sign_request(key, &key_id, Algorithm::Ed25519, &["date"], &content)
        };
        let old_auth = sign(&old_key);
        let new_auth = sign(&new_key);

        let before = configuration.snapshot();
        let status = |snapshot: &Snapshot, auth| {
            snapshot
                .verifier()
                .verify_with_result(snapshot.challenge(), &content, auth)
                .status()
        };
        assert_eq!(status(&before, &old_auth), VerifyStatus::Success);
        assert_eq!(status(&before, &new_auth), VerifyStatus::InvalidKey);

        std::fs::write(file.path(), format!("{}\n", format_ed25519_line(&new_key, ""))).unwrap();
        let after = configuration.activate(&config);

        assert_eq!(after.generation(), 2);
        assert_eq!(status(&after, &old_auth), VerifyStatus::InvalidKey);
        assert_eq!(status(&after, &new_auth), VerifyStatus::Success);
        assert_eq!(status(&before, &old_auth), VerifyStatus::Success);
    }

    #[test]
    fn test_should_login_against_one_snapshot_across_activation() {
        let ed_key = ed25519_key(1);
        let empty = key_file(&[]);
        let file = key_file(&[format_ed25519_line(&ed_key, "")]);
        let config = HttpsigConfig::builder()
            .key_files(BTreeMap::from([(user("alice"), file.path().to_path_buf())]))
            .build();
        let configuration = HttpsigConfiguration::with_clock(&config, Arc::new(FixedClock(epoch())));

        let content = request_at("GET", "/", epoch());
        let key_id = format!("/alice/keys/{}", ed_key.fingerprint());
        let auth = sign_request(&ed_key, &key_id, Algorithm::Ed25519, &["date"], &content);
        let (mut parts, ()) = http::Request::builder()
            .uri("/")
            .header("Host", "localhost:4567")
            .header("Date", httpsig_auth::request::http_date(epoch()))
            .body(())
            .unwrap()
            .into_parts();
        parts
            .headers
            .insert(http::header::AUTHORIZATION, auth.to_header_value().parse().unwrap());

        let snapshot = configuration.snapshot();
        let mut module = snapshot.login_module();
        configuration.activate(
            &HttpsigConfig::builder()
                .key_files(BTreeMap::from([(user("alice"), empty.path().to_path_buf())]))
                .build(),
        );
        let credentials = snapshot.credentials_from_parts(&parts).unwrap();

        assert!(module.login(Some(credentials)).unwrap());
        assert!(configuration.snapshot().challenge().algorithms().is_empty());
    }
}
