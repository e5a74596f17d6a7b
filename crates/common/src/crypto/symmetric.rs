//! Password-derived secret encryption using AES-256-GCM
//!
//! Secret payloads are sealed on the client before they ever reach the server, under a
//! key derived from the user's own password. The server stores the result as opaque bytes.
//!
//! Two nonce strategies exist:
//! - **Random** (default): a fresh 12-byte nonce per call, prepended to the ciphertext.
//!   Output is `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
//! - **Derived**: the nonce is the last 12 bytes of the derived key, so every encryption
//!   under one password reuses the same nonce. Output is `ciphertext || tag (16 bytes)`.
//!   This is the scheme older clients wrote with. Nonce reuse under a fixed GCM key leaks
//!   the XOR of plaintexts and allows tag forgery, so it is kept only to read and write
//!   data interchangeably with those clients.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Size of the AES-256 key in bytes
pub const KEY_SIZE: usize = 32;
/// Size of the AES-GCM nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of the AES-GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Errors that can occur during secret encryption/decryption
#[derive(Debug, thiserror::Error)]
pub enum SymmetricError {
    /// The authentication tag did not verify: tampered ciphertext or wrong password.
    #[error("integrity check failed: ciphertext was altered or the password is wrong")]
    Integrity,
    #[error("ciphertext too short: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("encryption failed")]
    Encrypt,
    #[error("failed to gather nonce randomness: {0}")]
    Rng(#[from] rand::Error),
}

/// How the per-message nonce is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonceMode {
    /// Fresh random nonce per message, carried in front of the ciphertext
    #[default]
    Random,
    /// Nonce taken from the derived key. Reuses one nonce per password; see module docs.
    Derived,
}

/// Derive the 256-bit cipher key for a password
///
/// The key is the SHA-256 digest of the UTF-8 password bytes.
pub fn derive_key(password: &str) -> Zeroizing<[u8; KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    key.copy_from_slice(&Sha256::digest(password.as_bytes()));
    key
}

/// AES-256-GCM cipher keyed from a user password
///
/// # Examples
///
/// ```ignore
/// let cipher = SymmetricCipher::new("s3cret", NonceMode::Random);
/// let sealed = cipher.encrypt(b"hello")?;
/// assert_eq!(cipher.decrypt(&sealed)?, b"hello");
/// ```
pub struct SymmetricCipher {
    key: Zeroizing<[u8; KEY_SIZE]>,
    mode: NonceMode,
}

impl std::fmt::Debug for SymmetricCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricCipher")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl SymmetricCipher {
    pub fn new(password: &str, mode: NonceMode) -> Self {
        Self {
            key: derive_key(password),
            mode,
        }
    }

    pub fn mode(&self) -> NonceMode {
        self.mode
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.key.as_ref()))
    }

    fn derived_nonce(&self) -> &[u8] {
        &self.key[KEY_SIZE - NONCE_SIZE..]
    }

    /// Encrypt a payload
    ///
    /// # Errors
    ///
    /// Fails only if the system RNG is unavailable (random mode) or the AEAD refuses
    /// the input length.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, SymmetricError> {
        let cipher = self.cipher();
        match self.mode {
            NonceMode::Derived => cipher
                .encrypt(Nonce::from_slice(self.derived_nonce()), plaintext)
                .map_err(|_| SymmetricError::Encrypt),
            NonceMode::Random => {
                let mut nonce_bytes = [0u8; NONCE_SIZE];
                OsRng.try_fill_bytes(&mut nonce_bytes)?;

                let sealed = cipher
                    .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
                    .map_err(|_| SymmetricError::Encrypt)?;

                let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
                out.extend_from_slice(&nonce_bytes);
                out.extend_from_slice(&sealed);
                Ok(out)
            }
        }
    }

    /// Decrypt a payload produced by [`SymmetricCipher::encrypt`] under the same password and mode
    ///
    /// # Errors
    ///
    /// Returns [`SymmetricError::Truncated`] when the input cannot even hold a tag (and
    /// nonce, in random mode), and [`SymmetricError::Integrity`] when the tag does not
    /// verify. No plaintext is returned on failure.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, SymmetricError> {
        let cipher = self.cipher();
        let (nonce, sealed) = match self.mode {
            NonceMode::Derived => (self.derived_nonce(), ciphertext),
            NonceMode::Random => {
                if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
                    return Err(SymmetricError::Truncated {
                        expected: NONCE_SIZE + TAG_SIZE,
                        actual: ciphertext.len(),
                    });
                }
                ciphertext.split_at(NONCE_SIZE)
            }
        };

        if sealed.len() < TAG_SIZE {
            return Err(SymmetricError::Truncated {
                expected: TAG_SIZE,
                actual: sealed.len(),
            });
        }

        cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| SymmetricError::Integrity)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_derive_key_is_sha256_of_password() {
        let key = derive_key("s3cret");
        assert_eq!(
            hex::encode(key.as_ref()),
            hex::encode(Sha256::digest(b"s3cret"))
        );
        assert_eq!(derive_key("s3cret").as_ref(), key.as_ref());
        assert_ne!(derive_key("other").as_ref(), key.as_ref());
    }

    #[test]
    fn test_round_trip_both_modes() {
        for mode in [NonceMode::Random, NonceMode::Derived] {
            let cipher = SymmetricCipher::new("s3cret", mode);
            for len in [0usize, 1, 15, 16, 17, 1024] {
                let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
                let sealed = cipher.encrypt(&data).unwrap();
                assert_eq!(cipher.decrypt(&sealed).unwrap(), data, "mode {mode:?} len {len}");
            }
        }
    }

    #[test]
    fn test_output_layout() {
        let data = b"hello";

        let derived = SymmetricCipher::new("pw", NonceMode::Derived)
            .encrypt(data)
            .unwrap();
        assert_eq!(derived.len(), data.len() + TAG_SIZE);

        let random = SymmetricCipher::new("pw", NonceMode::Random)
            .encrypt(data)
            .unwrap();
        assert_eq!(random.len(), NONCE_SIZE + data.len() + TAG_SIZE);
    }

    #[test]
    fn test_derived_mode_is_deterministic() {
        // the reused nonce is the known weakness of this mode
        let cipher = SymmetricCipher::new("pw", NonceMode::Derived);
        assert_eq!(
            cipher.encrypt(b"same").unwrap(),
            cipher.encrypt(b"same").unwrap()
        );
    }

    #[test]
    fn test_random_mode_uses_fresh_nonces() {
        let cipher = SymmetricCipher::new("pw", NonceMode::Random);
        let a = cipher.encrypt(b"same").unwrap();
        let b = cipher.encrypt(b"same").unwrap();
        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_every_single_byte_mutation_fails_integrity() {
        for mode in [NonceMode::Random, NonceMode::Derived] {
            let cipher = SymmetricCipher::new("s3cret", mode);
            let sealed = cipher.encrypt(b"hello world").unwrap();

            for i in 0..sealed.len() {
                let mut tampered = sealed.clone();
                tampered[i] ^= 0x01;
                assert!(
                    matches!(cipher.decrypt(&tampered), Err(SymmetricError::Integrity)),
                    "mutation at byte {i} in mode {mode:?} was not detected"
                );
            }
        }
    }

    #[test]
    fn test_wrong_password_fails_integrity() {
        let sealed = SymmetricCipher::new("right", NonceMode::Random)
            .encrypt(b"hello")
            .unwrap();
        let result = SymmetricCipher::new("wrong", NonceMode::Random).decrypt(&sealed);
        assert!(matches!(result, Err(SymmetricError::Integrity)));
    }

    #[test]
    fn test_truncated_input() {
        let cipher = SymmetricCipher::new("pw", NonceMode::Random);
        assert!(matches!(
            cipher.decrypt(&[0u8; NONCE_SIZE]),
            Err(SymmetricError::Truncated { .. })
        ));

        let cipher = SymmetricCipher::new("pw", NonceMode::Derived);
        assert!(matches!(
            cipher.decrypt(&[0u8; TAG_SIZE - 1]),
            Err(SymmetricError::Truncated { .. })
        ));
    }
}
