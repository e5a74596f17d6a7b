//! Chunked RSA-OAEP envelope for credentials in transit
//!
//! Login payloads are sealed by the client with the server's public key and opened
//! by the server with its private key. RSA-OAEP bounds the plaintext per operation to
//! `k - 2 * hLen - 2` bytes (`k` is the modulus size in bytes, `hLen` the SHA-512 output
//! size), so messages are split into chunks of that size, each chunk is encrypted on
//! its own, and the `k`-byte ciphertext blocks are concatenated in order.
//!
//! The block layout carries no framing: the decrypting side must use a key of the same
//! size as the encrypting side to find the block boundaries. Both halves come from one
//! configured key pair, which is what keeps this consistent.
//!
//! Keys are PKCS#1 DER wrapped in PEM (`RSA PUBLIC KEY` / `RSA PRIVATE KEY`).

use std::path::Path;

use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha512;

/// Size of the SHA-512 digest used for OAEP padding, in bytes
pub const OAEP_HASH_SIZE: usize = 64;
/// Bytes of OAEP overhead per block
pub const OAEP_OVERHEAD: usize = 2 * OAEP_HASH_SIZE + 2;
/// Modulus size used when generating new key pairs
pub const DEFAULT_KEY_BITS: usize = 2048;

pub const PUBLIC_KEY_PEM_TAG: &str = "RSA PUBLIC KEY";
pub const PRIVATE_KEY_PEM_TAG: &str = "RSA PRIVATE KEY";

/// Errors that can occur while loading keys or sealing/opening envelopes
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("key format error: {0}")]
    KeyFormat(String),
    #[error("crypto error: {0}")]
    Crypto(String),
    #[error("failed to read key file: {0}")]
    Io(#[from] std::io::Error),
}

fn pem_contents(pem_str: &str, expected_tag: &str) -> Result<Vec<u8>, EnvelopeError> {
    let pem = pem::parse(pem_str)
        .map_err(|e| EnvelopeError::KeyFormat(format!("no PEM block found: {}", e)))?;

    if pem.tag() != expected_tag {
        return Err(EnvelopeError::KeyFormat(format!(
            "invalid PEM tag, expected {}, got {}",
            expected_tag,
            pem.tag()
        )));
    }

    Ok(pem.into_contents())
}

fn chunk_limit_for(key_size: usize) -> Result<usize, EnvelopeError> {
    key_size
        .checked_sub(OAEP_OVERHEAD)
        .filter(|limit| *limit > 0)
        .ok_or_else(|| {
            EnvelopeError::KeyFormat(format!(
                "a {}-bit key is too small for OAEP with SHA-512",
                key_size * 8
            ))
        })
}

/// Public half of the envelope, held by clients
#[derive(Debug, Clone)]
pub struct Encryptor {
    key: RsaPublicKey,
    chunk_limit: usize,
}

impl TryFrom<RsaPublicKey> for Encryptor {
    type Error = EnvelopeError;

    fn try_from(key: RsaPublicKey) -> Result<Self, Self::Error> {
        let chunk_limit = chunk_limit_for(key.size())?;
        Ok(Self { key, chunk_limit })
    }
}

impl Encryptor {
    /// Parse a PKCS#1 public key from PEM text
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::KeyFormat`] if no PEM block is present, the tag is not
    /// `RSA PUBLIC KEY`, or the DER payload is not an RSA public key.
    pub fn from_pem(pem_str: &str) -> Result<Self, EnvelopeError> {
        let der = pem_contents(pem_str, PUBLIC_KEY_PEM_TAG)?;
        let key = RsaPublicKey::from_pkcs1_der(&der)
            .map_err(|e| EnvelopeError::KeyFormat(format!("cannot parse public key: {}", e)))?;
        key.try_into()
    }

    /// Load a PKCS#1 public key from a PEM file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EnvelopeError> {
        let pem_str = std::fs::read_to_string(path)?;
        Self::from_pem(&pem_str)
    }

    /// Encode the public key as PEM text
    pub fn to_pem(&self) -> Result<String, EnvelopeError> {
        let der = self
            .key
            .to_pkcs1_der()
            .map_err(|e| EnvelopeError::KeyFormat(e.to_string()))?;
        Ok(pem::encode(&pem::Pem::new(PUBLIC_KEY_PEM_TAG, der.as_bytes())))
    }

    /// Modulus size in bytes; also the size of every ciphertext block
    pub fn key_size(&self) -> usize {
        self.key.size()
    }

    /// Largest plaintext chunk a single block can carry
    pub fn chunk_limit(&self) -> usize {
        self.chunk_limit
    }

    /// Seal an arbitrarily long message
    ///
    /// The output length is `ceil(len / chunk_limit) * key_size`; an empty message
    /// seals to an empty ciphertext.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        let blocks = plaintext.len().div_ceil(self.chunk_limit);
        let mut sealed = Vec::with_capacity(blocks * self.key_size());

        for chunk in plaintext.chunks(self.chunk_limit) {
            let block = self
                .key
                .encrypt(&mut OsRng, Oaep::new::<Sha512>(), chunk)
                .map_err(|e| EnvelopeError::Crypto(format!("encrypt block failed: {}", e)))?;
            sealed.extend_from_slice(&block);
        }

        Ok(sealed)
    }
}

/// Private half of the envelope, held only by the server
#[derive(Clone)]
pub struct Decryptor {
    key: RsaPrivateKey,
}

impl std::fmt::Debug for Decryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decryptor")
            .field("key_bits", &(self.key.size() * 8))
            .finish_non_exhaustive()
    }
}

impl TryFrom<RsaPrivateKey> for Decryptor {
    type Error = EnvelopeError;

    fn try_from(key: RsaPrivateKey) -> Result<Self, Self::Error> {
        chunk_limit_for(key.size())?;
        Ok(Self { key })
    }
}

impl Decryptor {
    /// Parse a PKCS#1 private key from PEM text
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::KeyFormat`] if no PEM block is present, the tag is not
    /// `RSA PRIVATE KEY`, or the DER payload is not an RSA private key.
    pub fn from_pem(pem_str: &str) -> Result<Self, EnvelopeError> {
        let der = zeroize::Zeroizing::new(pem_contents(pem_str, PRIVATE_KEY_PEM_TAG)?);
        let key = RsaPrivateKey::from_pkcs1_der(&der)
            .map_err(|e| EnvelopeError::KeyFormat(format!("cannot parse private key: {}", e)))?;
        key.try_into()
    }

    /// Load a PKCS#1 private key from a PEM file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EnvelopeError> {
        let pem_str = zeroize::Zeroizing::new(std::fs::read_to_string(path)?);
        Self::from_pem(&pem_str)
    }

    /// Generate a fresh key pair of the given modulus size
    pub fn generate(bits: usize) -> Result<Self, EnvelopeError> {
        let key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| EnvelopeError::Crypto(format!("key generation failed: {}", e)))?;
        key.try_into()
    }

    /// Encode the private key as PEM text
    pub fn to_pem(&self) -> Result<zeroize::Zeroizing<String>, EnvelopeError> {
        let der = self
            .key
            .to_pkcs1_der()
            .map_err(|e| EnvelopeError::KeyFormat(e.to_string()))?;
        Ok(zeroize::Zeroizing::new(pem::encode(&pem::Pem::new(
            PRIVATE_KEY_PEM_TAG,
            der.as_bytes(),
        ))))
    }

    /// The matching public half
    pub fn encryptor(&self) -> Encryptor {
        let key = RsaPublicKey::from(&self.key);
        let chunk_limit = self.chunk_limit();
        Encryptor { key, chunk_limit }
    }

    pub fn key_size(&self) -> usize {
        self.key.size()
    }

    pub fn chunk_limit(&self) -> usize {
        self.key.size() - OAEP_OVERHEAD
    }

    /// Open a message sealed by the matching [`Encryptor`]
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Crypto`] if the input is not a whole number of blocks or
    /// any block fails to decrypt (corruption, or a different key). Nothing is returned
    /// for the blocks that did decrypt.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        let block_size = self.key_size();
        if ciphertext.len() % block_size != 0 {
            return Err(EnvelopeError::Crypto(format!(
                "ciphertext length {} is not a multiple of the {}-byte block size",
                ciphertext.len(),
                block_size
            )));
        }

        let mut opened = Vec::with_capacity(ciphertext.len() / block_size * self.chunk_limit());
        for (index, block) in ciphertext.chunks(block_size).enumerate() {
            let chunk = self
                .key
                .decrypt_blinded(&mut OsRng, Oaep::new::<Sha512>(), block)
                .map_err(|e| {
                    EnvelopeError::Crypto(format!("decrypt block {} failed: {}", index, e))
                })?;
            opened.extend_from_slice(&chunk);
        }

        Ok(opened)
    }
}
