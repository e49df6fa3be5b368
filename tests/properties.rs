use std::thread;
use std::time::{Duration, Instant};

use bcrypt_kit::{
    hash, hash_with_rng, hash_with_salt, verify, BcryptError, Cost, Digest, HashParts, Prefix, Salt,
    DIGEST_LEN,
};
use rand::{CryptoRng, RngCore};

const PREFIXES: [Prefix; 5] = [Prefix::V2, Prefix::V2a, Prefix::V2b, Prefix::V2x, Prefix::V2y];

struct BrokenRng;

impl RngCore for BrokenRng {
    fn next_u32(&mut self) -> u32 {
        unreachable!()
    }

    fn next_u64(&mut self) -> u64 {
        unreachable!()
    }

    fn fill_bytes(&mut self, _dest: &mut [u8]) {
        unreachable!()
    }

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
        Err(rand::Error::new("entropy source unavailable"))
    }
}

impl CryptoRng for BrokenRng {}

#[test]
fn round_trip_every_prefix() -> Result<(), BcryptError> {
    let passwords: [&[u8]; 4] = [b"password", b"\xc3\xa9t\xc3\xa9", b"\xff\xfe\x80", b"with\0nul"];
    for prefix in PREFIXES {
        for password in passwords {
            let hashed = hash(password, 4, prefix)?;
            assert!(hashed.starts_with(&format!("${}$04$", prefix)));
            assert!(verify(password, &hashed)?);
        }
    }
    Ok(())
}

#[test]
fn wrong_password_does_not_match() -> Result<(), BcryptError> {
    for prefix in PREFIXES {
        let hashed = hash(b"correct horse", 4, prefix)?;
        assert!(!verify(b"correct horsf", &hashed)?);
        assert!(!verify(b"correct hors", &hashed)?);
        assert!(!verify(b"", &hashed)?);
    }
    Ok(())
}

#[test]
fn empty_password_is_legal_with_nul_terminated_prefixes() -> Result<(), BcryptError> {
    let salt = Salt::from_bytes(core::array::from_fn(|i| i as u8));
    let parts = hash_with_salt(b"", Cost::new(4)?, Prefix::V2b, salt)?;
    assert_eq!(
        parts.encode(),
        "$2b$04$..CA.uOD/eaGAOmJB.yMBuq1wbVgYezarXi1FgOYk1qMNtxVndjJm"
    );
    assert_eq!(hash(b"", 4, Prefix::V2), Err(BcryptError::EmptyKey));
    Ok(())
}

#[test]
fn fresh_salt_per_hash() -> Result<(), BcryptError> {
    let first = hash(b"same input", 4, Prefix::V2b)?;
    let second = hash(b"same input", 4, Prefix::V2b)?;
    assert_ne!(first, second);
    assert_ne!(first[7..29], second[7..29]);
    Ok(())
}

#[test]
fn bytes_past_72_are_ignored() -> Result<(), BcryptError> {
    let salt = Salt::from_bytes(core::array::from_fn(|i| i as u8));
    let cost = Cost::new(4)?;
    let expected = "$2b$04$..CA.uOD/eaGAOmJB.yMBuIbwKfymVuMfASrmYBUytUgog5Nvtojy";

    assert_eq!(hash_with_salt(&[b'a'; 72], cost, Prefix::V2b, salt)?.encode(), expected);
    assert_eq!(hash_with_salt(&[b'a'; 100], cost, Prefix::V2b, salt)?.encode(), expected);

    let mut long = vec![b'a'; 72];
    long.extend_from_slice(b"anything at all");
    let hashed = hash(&long, 4, Prefix::V2b)?;
    assert!(verify(&[b'a'; 72], &hashed)?);
    assert!(verify(&[b'a'; 500], &hashed)?);
    // the NUL terminator still counts at 71 bytes
    assert!(!verify(&[b'a'; 71], &hashed)?);
    Ok(())
}

#[test]
fn verification_reads_cost_from_the_hash() -> Result<(), BcryptError> {
    let hashed = hash(b"pw", 5, Prefix::V2a)?;
    let parts: HashParts = hashed.parse()?;
    assert_eq!(parts.cost.get(), 5);
    assert!(verify(b"pw", &hashed)?);

    let mut relabelled = hashed.clone();
    relabelled.replace_range(4..6, "04");
    assert!(!verify(b"pw", &relabelled)?);
    Ok(())
}

#[test]
fn malformed_hashes_are_errors_not_mismatches() {
    let bad = [
        "",
        "not a hash",
        "$3a$04$..CA.uOD/eaGAOmJB.yMBufJvSTjTdkBYlZeYThHDpJ4wbwLwg8EG",
        "$2b$4$..CA.uOD/eaGAOmJB.yMBufJvSTjTdkBYlZeYThHDpJ4wbwLwg8EG",
        "$2b$04$..CA.uOD/eaGAOmJB.yMB",
        "$2b$04$..CA.uOD/eaGAOmJB.yMBufJvSTjTdkBYlZeYThHDpJ4wbwLwg8E",
        "$2b$04$..CA.uOD/eaGAOmJB.yMBufJvSTjTdkBYlZeYThHDpJ4wbwLwg8E!",
    ];
    for encoded in bad {
        match verify(b"abc", encoded) {
            Err(BcryptError::MalformedHash(_)) => {}
            other => panic!("{:?} gave {:?}", encoded, other),
        }
    }
}

#[test]
fn every_digest_byte_matters() -> Result<(), BcryptError> {
    let hashed = hash(b"pw", 4, Prefix::V2b)?;
    let parts: HashParts = hashed.parse()?;

    for offset in 0..DIGEST_LEN {
        let mut bytes = *parts.digest.as_bytes();
        bytes[offset] ^= 0x01;
        let tampered = HashParts {
            digest: Digest::from_bytes(bytes),
            ..parts.clone()
        };
        assert!(!verify(b"pw", &tampered.encode())?, "offset {}", offset);
    }
    Ok(())
}

#[test]
fn random_source_failure_is_propagated() {
    match hash_with_rng(b"pw", 4, Prefix::V2b, &mut BrokenRng) {
        Err(BcryptError::RandomSourceFailure(msg)) => assert!(msg.contains("entropy source unavailable")),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn hashing_from_many_threads() {
    thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                s.spawn(move || {
                    let password = format!("password-{}", i);
                    let hashed = hash(password.as_bytes(), 4, Prefix::V2b).unwrap();
                    (password, hashed)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for (password, hashed) in &results {
            assert!(verify(password.as_bytes(), hashed).unwrap());
        }
        for (i, (_, a)) in results.iter().enumerate() {
            for (_, b) in &results[i + 1..] {
                assert_ne!(a, b);
            }
        }
    });
}

fn time_hash(cost: u32) -> Duration {
    let started = Instant::now();
    hash(b"timing", cost, Prefix::V2b).unwrap();
    started.elapsed()
}

#[test]
#[ignore = "timing-sensitive; run with --ignored on a quiet machine"]
fn one_more_cost_roughly_doubles_time() {
    let _ = time_hash(6);
    let base = time_hash(8);
    let next = time_hash(9);
    let ratio = next.as_secs_f64() / base.as_secs_f64();
    assert!(ratio > 1.5 && ratio < 2.8, "ratio was {}", ratio);
}

#[test]
#[ignore = "timing-sensitive; run with --ignored on a quiet machine"]
fn verify_time_does_not_depend_on_mismatch_offset() {
    let hashed = hash(b"pw", 6, Prefix::V2b).unwrap();
    let parts: HashParts = hashed.parse().unwrap();

    let mut per_offset = Vec::new();
    for offset in [0, DIGEST_LEN / 2, DIGEST_LEN - 1] {
        let mut bytes = *parts.digest.as_bytes();
        bytes[offset] ^= 0x80;
        let tampered = HashParts {
            digest: Digest::from_bytes(bytes),
            ..parts.clone()
        }
        .encode();

        let mut samples: Vec<Duration> = (0..25)
            .map(|_| {
                let started = Instant::now();
                assert!(!verify(b"pw", &tampered).unwrap());
                started.elapsed()
            })
            .collect();
        samples.sort();
        per_offset.push(samples[samples.len() / 2].as_secs_f64());
    }

    let min = per_offset.iter().cloned().fold(f64::MAX, f64::min);
    let max = per_offset.iter().cloned().fold(0.0, f64::max);
    assert!(max / min < 1.25, "median times {:?}", per_offset);
}
