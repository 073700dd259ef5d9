//! Login flow tests against key files on disk.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeDelta;
    use httpsig_auth::testutil::{CountingKey, alice_rsa, alice_rsa_rotated, epoch, request_at, sign_request, user};
    use httpsig_auth::{Algorithm, AuthError, Challenge, FixedClock, Key, Keychain, Verifier, VerifyStatus};
    use httpsig_core::KeyIdScheme;
    use httpsig_login::{HttpsigCredentials, HttpsigLoginModule, LoginError, LoginState, Principal, Subject};

    use crate::{KeyDir, SIGNED_HEADERS, key_id, login, request, sign};

    fn rejection(module: &HttpsigLoginModule) -> &LoginError {
        match module.state() {
            LoginState::Rejected { reason, .. } => reason,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_should_log_in_alice_with_rsa_key() {
        let alice = alice_rsa();
        let mut keys = KeyDir::new();
        keys.write("alice", &[&alice]);
        let configuration = keys.activate();

        let mut parts = request("/repos/demo", epoch());
        sign(&mut parts, &alice, &key_id("alice", &alice));
        let (module, subject) = login(&configuration, &parts);

        assert_eq!(module.state(), &LoginState::IdentityResolved);
        assert_eq!(module.user_id().unwrap().as_str(), "alice");
        assert!(subject.principals().contains(&Principal::new("alice")));
        assert_eq!(subject.auth_info().unwrap().user_id().as_str(), "alice");
        assert_eq!(subject.public_credentials().len(), 1);
    }

    #[test]
    fn test_should_ignore_unsigned_obs_text_header() {
        let alice = alice_rsa();
        let mut keys = KeyDir::new();
        keys.write("alice", &[&alice]);
        let configuration = keys.activate();

        let mut parts = request("/repos/demo", epoch());
        sign(&mut parts, &alice, &key_id("alice", &alice));
        parts.headers.insert(
            "x-legacy",
            http::HeaderValue::from_bytes(b"caf\xe9").unwrap(),
        );
        let (module, subject) = login(&configuration, &parts);

        assert_eq!(module.state(), &LoginState::IdentityResolved);
        assert_eq!(subject.auth_info().unwrap().user_id().as_str(), "alice");
    }

    #[test]
    fn test_should_reject_request_whose_date_changed_after_signing() {
        let alice = alice_rsa();
        let mut keys = KeyDir::new();
        keys.write("alice", &[&alice]);
        let configuration = keys.activate();

        let mut parts = request("/repos/demo", epoch());
        sign(&mut parts, &alice, &key_id("alice", &alice));
        let later = httpsig_auth::request::http_date(epoch() + TimeDelta::seconds(1));
        parts.headers.insert(http::header::DATE, later.parse().unwrap());

        let (module, subject) = login(&configuration, &parts);
        assert_eq!(
            rejection(&module),
            &LoginError::Auth(AuthError::SignatureDoesNotMatch)
        );
        assert!(subject.auth_info().is_none());

        let snapshot = configuration.snapshot();
        let credentials = snapshot.credentials_from_parts(&parts).unwrap();
        let status = snapshot
            .verifier()
            .verify_with_result(
                credentials.challenge(),
                credentials.content(),
                credentials.authorization(),
            )
            .status();
        assert_eq!(status, VerifyStatus::InvalidSignature);
    }

    #[test]
    fn test_should_reject_expired_request() {
        let alice = alice_rsa();
        let mut keys = KeyDir::new();
        keys.write("alice", &[&alice]);
        let configuration = keys.activate();

        let mut parts = request("/", epoch() - TimeDelta::minutes(10));
        sign(&mut parts, &alice, &key_id("alice", &alice));
        let (module, _) = login(&configuration, &parts);

        assert_eq!(rejection(&module), &LoginError::Auth(AuthError::RequestExpired));
    }

    #[test]
    fn test_should_reject_key_of_another_user() {
        let alice = alice_rsa();
        let bob = alice_rsa_rotated();
        let mut keys = KeyDir::new();
        keys.write("alice", &[&alice]);
        keys.write("bob", &[&bob]);
        let configuration = keys.activate();

        let mut parts = request("/", epoch());
        sign(&mut parts, &bob, &key_id("alice", &bob));
        let (module, subject) = login(&configuration, &parts);

        assert!(matches!(
            rejection(&module),
            LoginError::Auth(AuthError::KeyNotFound(_))
        ));
        assert!(subject.principals().is_empty());
    }

    #[test]
    fn test_should_not_run_crypto_for_unknown_key() {
        let counting = Arc::new(CountingKey::new(Arc::new(alice_rsa().to_public())));
        let mut keychain = Keychain::new();
        keychain.push_identity(user("alice"), counting.clone());
        let verifier = Verifier::new(Arc::new(keychain));
        let challenge = Challenge::new("integration", ["date"], verifier.keychain().algorithms());

        let content = request_at("GET", "/", epoch());
        let authorization = sign_request(
            &alice_rsa(),
            "/alice/keys/00:11:22",
            Algorithm::RsaSha256,
            SIGNED_HEADERS,
            &content,
        );

        let result = verifier.verify_with_result(&challenge, &content, &authorization);
        assert_eq!(result.status(), VerifyStatus::InvalidKey);
        assert!(result.key().is_none());
        assert_eq!(counting.verify_calls(), 0);
    }

    #[test]
    fn test_should_fail_identity_resolution_for_unbound_key() {
        let alice = alice_rsa();
        let mut keychain = Keychain::new();
        keychain.push_unbound(Arc::new(alice.to_public()));
        let verifier = Arc::new(
            Verifier::new(Arc::new(keychain))
                .with_scheme(KeyIdScheme::Fingerprint)
                .with_clock(Arc::new(FixedClock(epoch()))),
        );
        let challenge = Arc::new(Challenge::new(
            "integration",
            ["date"],
            verifier.keychain().algorithms(),
        ));

        let content = request_at("GET", "/", epoch());
        let authorization = sign_request(
            &alice,
            alice.fingerprint(),
            Algorithm::RsaSha256,
            SIGNED_HEADERS,
            &content,
        );
        assert!(verifier.verify(&challenge, &content, &authorization));

        let mut module = HttpsigLoginModule::new(Some(verifier));
        let credentials = HttpsigCredentials::new(challenge, authorization, content);
        assert!(!module.login(Some(credentials)).unwrap());
        assert!(matches!(
            rejection(&module),
            LoginError::Auth(AuthError::UnboundKey(_))
        ));

        let mut subject = Subject::new();
        assert!(!module.commit(&mut subject));
        assert!(subject.auth_info().is_none());
    }

    #[test]
    fn test_should_challenge_request_without_authorization() {
        let alice = alice_rsa();
        let mut keys = KeyDir::new();
        keys.write("alice", &[&alice]);
        let configuration = keys.activate();

        let parts = request("/", epoch());
        let (module, _) = login(&configuration, &parts);

        assert_eq!(rejection(&module), &LoginError::NoCredentials);
        let snapshot = configuration.snapshot();
        let challenge = snapshot.challenge();
        assert_eq!(challenge.realm(), "integration");
        assert!(challenge.algorithms().contains(Algorithm::RsaSha256));
        assert!(!challenge.algorithms().contains(Algorithm::Ed25519));
    }
}
