//! Concurrent verification while the configuration is swapped.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use httpsig_auth::testutil::{alice_rsa, alice_rsa_rotated, epoch};
    use httpsig_auth::{Key, VerifyStatus};

    use crate::{KeyDir, key_id, request, sign};

    #[test]
    fn test_should_verify_against_consistent_snapshot_during_swaps() {
        let old_key = alice_rsa();
        let new_key = alice_rsa_rotated();
        let mut keys = KeyDir::new();
        keys.write("alice", &[&old_key]);
        let old_config = keys.config();
        let configuration = keys.activate();

        let mut new_dir = KeyDir::new();
        new_dir.write("alice", &[&new_key]);
        let new_config = new_dir.config();

        let mut signed = request("/", epoch());
        sign(&mut signed, &old_key, &key_id("alice", &old_key));
        let authorization = signed.headers[http::header::AUTHORIZATION].clone();
        let old_fingerprint = old_key.fingerprint().to_owned();

        let done = Arc::new(AtomicBool::new(false));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let configuration = Arc::clone(&configuration);
                let authorization = authorization.clone();
                let done = Arc::clone(&done);
                let old_fingerprint = old_fingerprint.clone();
                thread::spawn(move || {
                    let mut parts = request("/", epoch());
                    parts.headers.insert(http::header::AUTHORIZATION, authorization);
                    let mut checked = 0usize;
                    while !done.load(Ordering::SeqCst) || checked == 0 {
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
                        let holds_old_key = snapshot
                            .verifier()
                            .keychain()
                            .iter()
                            .any(|entry| entry.key().fingerprint() == old_fingerprint);
                        let expected = if holds_old_key {
                            VerifyStatus::Success
                        } else {
                            VerifyStatus::InvalidKey
                        };
                        assert_eq!(status, expected, "generation {}", snapshot.generation());
                        checked += 1;
                    }
                    checked
                })
            })
            .collect();

        for round in 0..20 {
            let config = if round % 2 == 0 { &new_config } else { &old_config };
            configuration.activate(config);
        }
        done.store(true, Ordering::SeqCst);

        for reader in readers {
            assert!(reader.join().unwrap() > 0);
        }
        assert_eq!(configuration.snapshot().generation(), 21);
    }
}
