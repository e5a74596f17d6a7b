//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::path::PathBuf;

use common::crypto::{Decryptor, Encryptor};

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// The fixture key pair, loaded from disk the way a client and the server would
pub fn fixture_pair() -> (Encryptor, Decryptor) {
    let encryptor = Encryptor::load(fixture("public.pem")).unwrap();
    let decryptor = Decryptor::load(fixture("private.pem")).unwrap();
    (encryptor, decryptor)
}

/// Deterministic filler bytes of the given length
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}
