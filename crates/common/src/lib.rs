/**
 * Bearer token issuance and verification.
 */
pub mod auth;
/**
 * Login credentials: validation and
 *  password hashing.
 */
pub mod credential;
/**
 * Cryptographic types and operations.
 *  - RSA envelope for credentials in transit
 *  - Password-derived cipher for secrets
 */
pub mod crypto;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::auth::{TokenError, TokenIssuer};
    pub use crate::credential::{Credential, CredentialError, HashedCredential};
    pub use crate::crypto::{
        Decryptor, Encryptor, EnvelopeError, NonceMode, SymmetricCipher, SymmetricError,
    };
    pub use crate::version::{build_info, BuildInfo};
}
