//! Cryptographic primitives for Keeper
//!
//! - **Envelope**: chunked RSA-OAEP (SHA-512) protecting login credentials on their
//!   way to the server. Clients hold the public half, the server the private half.
//! - **Symmetric**: AES-256-GCM keyed from the user's password, protecting secret
//!   payloads. Only clients ever hold the password, so the server stores ciphertext.

mod envelope;
mod symmetric;

pub use envelope::{
    Decryptor, EnvelopeError, Encryptor, DEFAULT_KEY_BITS, OAEP_OVERHEAD, PRIVATE_KEY_PEM_TAG,
    PUBLIC_KEY_PEM_TAG,
};
pub use symmetric::{
    derive_key, NonceMode, SymmetricCipher, SymmetricError, KEY_SIZE, NONCE_SIZE, TAG_SIZE,
};
