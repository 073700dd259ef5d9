//! Key rotation through reactivation.

#[cfg(test)]
mod tests {
    use httpsig_auth::testutil::{alice_rsa, alice_rsa_rotated, epoch};
    use httpsig_auth::{Key, VerifyStatus};
    use httpsig_login::LoginState;

    use crate::{KeyDir, key_id, login, request, sign};

    #[test]
    fn test_should_accept_only_rotated_key_after_reactivation() {
        let old_key = alice_rsa();
        let new_key = alice_rsa_rotated();
        let mut keys = KeyDir::new();
        keys.write("alice", &[&old_key]);
        let configuration = keys.activate();

        let mut old_request = request("/", epoch());
        sign(&mut old_request, &old_key, &key_id("alice", &old_key));
        let mut new_request = request("/", epoch());
        sign(&mut new_request, &new_key, &key_id("alice", &new_key));

        assert_eq!(login(&configuration, &old_request).0.state(), &LoginState::IdentityResolved);
        assert!(login(&configuration, &new_request).1.auth_info().is_none());

        keys.write("alice", &[&new_key]);
        let snapshot = configuration.activate(&keys.config());
        assert_eq!(snapshot.generation(), 2);

        assert!(login(&configuration, &old_request).1.auth_info().is_none());
        let (module, subject) = login(&configuration, &new_request);
        assert_eq!(module.state(), &LoginState::IdentityResolved);
        assert_eq!(subject.auth_info().unwrap().user_id().as_str(), "alice");
    }

    #[test]
    fn test_should_keep_snapshot_taken_before_reactivation() {
        let old_key = alice_rsa();
        let mut keys = KeyDir::new();
        keys.write("alice", &[&old_key]);
        let configuration = keys.activate();

        let mut parts = request("/", epoch());
        sign(&mut parts, &old_key, &key_id("alice", &old_key));
        let in_flight = configuration.snapshot();
        let credentials = in_flight.credentials_from_parts(&parts).unwrap();

        keys.write("alice", &[&alice_rsa_rotated()]);
        configuration.activate(&keys.config());

        let status = in_flight
            .verifier()
            .verify_with_result(
                credentials.challenge(),
                credentials.content(),
                credentials.authorization(),
            )
            .status();
        assert_eq!(status, VerifyStatus::Success);
        assert_ne!(
            configuration.snapshot().verifier().keychain().iter().next().unwrap().key().fingerprint(),
            old_key.fingerprint()
        );
    }

    #[test]
    fn test_should_accept_either_key_during_overlap() {
        let old_key = alice_rsa();
        let new_key = alice_rsa_rotated();
        let mut keys = KeyDir::new();
        keys.write("alice", &[&old_key, &new_key]);
        let configuration = keys.activate();

        for key in [&old_key, &new_key] {
            let mut parts = request("/", epoch());
            sign(&mut parts, key, &key_id("alice", key));
            let (module, _) = login(&configuration, &parts);
            assert_eq!(module.state(), &LoginState::IdentityResolved);
        }
    }
}
