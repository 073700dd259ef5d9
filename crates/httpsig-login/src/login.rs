//! Two-phase login module.
//!
//! A module instance handles exactly one attempt:
//!
//! ```text
//! New -> VerifierResolved -> KeySelected -> StringBuilt -> SkewChecked
//!     -> CryptoVerified -> IdentityResolved
//! ```
//!
//! Any failure ends the attempt in [`LoginState::Rejected`], recording the
//! last stage reached. `login` decides; `commit` publishes the identity to a
//! [`Subject`]; `abort` and `logout` discard it.

use std::collections::BTreeSet;
use std::sync::Arc;

use httpsig_auth::{AuthError, Verifier};
use httpsig_core::UserId;
use tracing::{debug, info};

use crate::authentication::HttpsigAuthentication;
use crate::credentials::HttpsigCredentials;
use crate::error::LoginError;
use crate::subject::{AuthInfo, Principal, Subject};

/// Progress of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    /// Nothing attempted yet.
    New,
    /// A verifier is available.
    VerifierResolved,
    /// A key matching `keyId` supports the claimed algorithm.
    KeySelected,
    /// The signing string was rebuilt.
    StringBuilt,
    /// The signed date is within the skew window.
    SkewChecked,
    /// The signature verified.
    CryptoVerified,
    /// The key's owner is known. Terminal.
    IdentityResolved,
    /// The attempt failed. Terminal.
    Rejected {
        /// Last stage reached before the failure.
        after: Box<LoginState>,
        /// Why it failed.
        reason: LoginError,
    },
}

const STAGES: [LoginState; 7] = [
    LoginState::New,
    LoginState::VerifierResolved,
    LoginState::KeySelected,
    LoginState::StringBuilt,
    LoginState::SkewChecked,
    LoginState::CryptoVerified,
    LoginState::IdentityResolved,
];

impl LoginState {
    /// Whether the attempt is over.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::IdentityResolved | Self::Rejected { .. })
    }

    /// The stage a failure happened after.
    fn reached_before(error: &LoginError) -> Self {
        match error {
            LoginError::NoVerifier | LoginError::NoCredentials | LoginError::AttemptFinished => Self::New,
            LoginError::Auth(auth) => match auth {
                AuthError::MissingHeader(_) | AuthError::ChallengeNotSatisfied(_) => Self::KeySelected,
                AuthError::InvalidDate(_) | AuthError::RequestExpired => Self::StringBuilt,
                AuthError::SignatureDoesNotMatch => Self::SkewChecked,
                AuthError::UnboundKey(_) => Self::CryptoVerified,
                _ => Self::VerifierResolved,
            },
        }
    }
}

/// Login module bound to one optional verifier.
#[derive(Debug)]
pub struct HttpsigLoginModule {
    authentication: HttpsigAuthentication,
    state: LoginState,
    transitions: Vec<LoginState>,
    credentials: Option<HttpsigCredentials>,
    user_id: Option<UserId>,
}

impl HttpsigLoginModule {
    /// Create a module. `None` means no verifier is available.
    #[must_use]
    pub fn new(verifier: Option<Arc<Verifier>>) -> Self {
        Self {
            authentication: HttpsigAuthentication::new(verifier),
            state: LoginState::New,
            transitions: vec![LoginState::New],
            credentials: None,
            user_id: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &LoginState {
        &self.state
    }

    /// Every state entered so far, in order.
    #[must_use]
    pub fn transitions(&self) -> &[LoginState] {
        &self.transitions
    }

    /// The authenticated user after a successful login.
    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    /// Run the attempt. Returns whether the user authenticated.
    ///
    /// Failures are recorded in [`HttpsigLoginModule::state`]; they are not
    /// errors.
    ///
    /// # Errors
    /// Returns [`LoginError::AttemptFinished`] if this module already ran.
    pub fn login(&mut self, credentials: Option<HttpsigCredentials>) -> Result<bool, LoginError> {
        if self.state != LoginState::New {
            return Err(LoginError::AttemptFinished);
        }

        let outcome = credentials
            .ok_or(LoginError::NoCredentials)
            .and_then(|credentials| {
                let user_id = self.authentication.authenticate(&credentials)?;
                Ok((credentials, user_id))
            });

        match outcome {
            Ok((credentials, user_id)) => {
                self.advance_to(&LoginState::IdentityResolved);
                self.credentials = Some(credentials);
                self.user_id = Some(user_id);
                Ok(true)
            }
            Err(reason) => {
                let after = LoginState::reached_before(&reason);
                self.advance_to(&after);
                debug!(after = ?after, reason = %reason, "HTTP signature login rejected");
                self.enter(LoginState::Rejected {
                    after: Box::new(after),
                    reason,
                });
                Ok(false)
            }
        }
    }

    /// Publish the identity to `subject`. Returns `false` if login did not
    /// succeed. A read-only subject is left untouched.
    pub fn commit(&mut self, subject: &mut Subject) -> bool {
        let (Some(user_id), Some(credentials)) = (self.user_id.clone(), self.credentials.take()) else {
            self.clear_state();
            return false;
        };

        if subject.is_read_only() {
            debug!(user = %user_id, "subject is read-only, not updating");
        } else {
            let principals = BTreeSet::from([Principal::from(&user_id)]);
            let auth_info = AuthInfo::new(user_id.clone(), principals.clone());
            subject.add(&principals, credentials, auth_info);
            info!(user = %user_id, "login committed");
        }
        true
    }

    /// Discard the attempt. Returns `false` if there was nothing to discard.
    pub fn abort(&mut self) -> bool {
        let attempted = self.state != LoginState::New;
        self.clear_state();
        attempted
    }

    /// Remove this module's principals from `subject` and discard state.
    pub fn logout(&mut self, subject: &mut Subject) -> bool {
        if let Some(user_id) = &self.user_id {
            if !subject.is_read_only() {
                subject.remove(&BTreeSet::from([Principal::from(user_id)]));
            }
        }
        self.clear_state();
        true
    }

    fn advance_to(&mut self, target: &LoginState) {
        let end = STAGES.iter().position(|s| s == target).unwrap_or(0);
        for stage in &STAGES[1..=end] {
            self.enter(stage.clone());
        }
    }

    fn enter(&mut self, state: LoginState) {
        self.transitions.push(state.clone());
        self.state = state;
    }

    fn clear_state(&mut self) {
        self.credentials = None;
        self.user_id = None;
    }
}

#[cfg(test)]
mod tests {
    use httpsig_auth::testutil::{ed25519_key, epoch, request_at, sign_request, user};
    use httpsig_auth::{Algorithm, AlgorithmSet, Challenge, FixedClock, Key, Keychain};
    use httpsig_core::KeyIdScheme;

    use super::*;

    const HEADERS: &[&str] = &["(request-target)", "date"];

    fn fixture(bound: bool) -> (Arc<Verifier>, HttpsigCredentials) {
        let key = ed25519_key(11);
        let mut keychain = Keychain::new();
        if bound {
            keychain.push_identity(user("alice"), Arc::new(key.to_public()));
        } else {
            keychain.push_unbound(Arc::new(key.to_public()));
        }
        let verifier = Verifier::new(Arc::new(keychain))
            .with_scheme(KeyIdScheme::Fingerprint)
            .with_clock(Arc::new(FixedClock(epoch())));

        let challenge = Arc::new(Challenge::new("test", ["date"], AlgorithmSet::from([Algorithm::Ed25519])));
        let content = request_at("GET", "/", epoch());
        let auth = sign_request(&key, key.fingerprint(), Algorithm::Ed25519, HEADERS, &content);
        (Arc::new(verifier), HttpsigCredentials::new(challenge, auth, content))
    }

    #[test]
    fn test_should_walk_every_stage_on_success() {
        let (verifier, credentials) = fixture(true);
        let mut module = HttpsigLoginModule::new(Some(verifier));

        assert!(module.login(Some(credentials)).unwrap());
        assert_eq!(module.transitions(), STAGES);
        assert_eq!(module.user_id().map(UserId::as_str), Some("alice"));

        let mut subject = Subject::new();
        assert!(module.commit(&mut subject));
        assert!(subject.principals().contains(&Principal::new("alice")));
        assert_eq!(subject.public_credentials().len(), 1);
        let info = subject.auth_info().unwrap();
        assert_eq!(info.user_id().as_str(), "alice");
        assert!(info.attributes().is_empty());
        assert_eq!(info.principals().len(), 1);
    }

    #[test]
    fn test_should_reject_after_crypto_for_unbound_key() {
        let (verifier, credentials) = fixture(false);
        let mut module = HttpsigLoginModule::new(Some(verifier));

        assert!(!module.login(Some(credentials)).unwrap());
        match module.state() {
            LoginState::Rejected { after, reason } => {
                assert_eq!(**after, LoginState::CryptoVerified);
                assert!(matches!(reason, LoginError::Auth(AuthError::UnboundKey(_))));
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert!(!module.commit(&mut Subject::new()));
    }

    #[test]
    fn test_should_reject_before_key_selection_without_verifier() {
        let (_, credentials) = fixture(true);
        let mut module = HttpsigLoginModule::new(None);

        assert!(!module.login(Some(credentials)).unwrap());
        assert_eq!(
            module.state(),
            &LoginState::Rejected {
                after: Box::new(LoginState::New),
                reason: LoginError::NoVerifier,
            }
        );
        assert_eq!(module.transitions().len(), 2);
    }

    #[test]
    fn test_should_record_stage_of_signature_failure() {
        let (verifier, credentials) = fixture(true);
        let auth = credentials.authorization();
        let mut signature = auth.signature().to_vec();
        signature[0] ^= 0x01;
        let tampered = HttpsigCredentials::new(
            Arc::new(credentials.challenge().clone()),
            httpsig_auth::Authorization::new(auth.key_id(), auth.algorithm(), auth.headers(), signature),
            credentials.content().clone(),
        );

        let mut module = HttpsigLoginModule::new(Some(verifier));
        assert!(!module.login(Some(tampered)).unwrap());
        assert!(matches!(
            module.state(),
            LoginState::Rejected { after, reason: LoginError::Auth(AuthError::SignatureDoesNotMatch) }
                if **after == LoginState::SkewChecked
        ));
    }

    #[test]
    fn test_should_refuse_second_attempt() {
        let (verifier, credentials) = fixture(true);
        let mut module = HttpsigLoginModule::new(Some(verifier));
        assert!(module.login(Some(credentials.clone())).unwrap());
        assert_eq!(module.login(Some(credentials)), Err(LoginError::AttemptFinished));
    }

    #[test]
    fn test_should_leave_read_only_subject_untouched() {
        let (verifier, credentials) = fixture(true);
        let mut module = HttpsigLoginModule::new(Some(verifier));
        assert!(module.login(Some(credentials)).unwrap());

        let mut subject = Subject::new();
        subject.set_read_only();
        assert!(module.commit(&mut subject));
        assert!(subject.principals().is_empty());
        assert!(subject.auth_info().is_none());
    }

    #[test]
    fn test_should_clear_state_on_abort_and_logout() {
        let (verifier, credentials) = fixture(true);
        let mut module = HttpsigLoginModule::new(Some(Arc::clone(&verifier)));
        assert!(!module.abort());
        assert!(module.login(Some(credentials.clone())).unwrap());
        assert!(module.abort());
        assert!(module.user_id().is_none());
        assert!(!module.commit(&mut Subject::new()));

        let mut module = HttpsigLoginModule::new(Some(verifier));
        let mut subject = Subject::new();
        assert!(module.login(Some(credentials)).unwrap());
        assert!(module.commit(&mut subject));
        assert!(module.logout(&mut subject));
        assert!(subject.principals().is_empty());
        assert!(subject.auth_info().is_none());
    }

    #[test]
    fn test_should_reject_missing_credentials() {
        let (verifier, _) = fixture(true);
        let mut module = HttpsigLoginModule::new(Some(verifier));
        assert!(!module.login(None).unwrap());
        assert!(module.state().is_terminal());
    }
}
