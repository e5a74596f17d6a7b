//! Login credentials and password hashing
//!
//! Passwords are hashed with Argon2id into a PHC string that carries its own salt and
//! parameters. The work factor is kept low on purpose: every register and login pays
//! for one hash on the request path, inside the request deadline.

use argon2::password_hash::SaltString;
use argon2::{
    password_hash, Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier,
    Version,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

const MEMORY_COST_KIB: u32 = 4 * 1024;
const TIME_COST: u32 = 1;
const PARALLELISM: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("validation failed: {0}")]
    Validation(&'static str),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

fn argon2_config() -> Result<Argon2<'static>, password_hash::Error> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None)?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// A login/password pair as sent by a client
///
/// The password is wiped from memory when the value is dropped and never shows up
/// in `Debug` output.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    pub login: String,
    pub password: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A credential whose password has been replaced by its hash, ready for storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedCredential {
    pub login: String,
    pub password_hash: String,
}

impl Credential {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    /// Reject credentials with an empty login or password
    pub fn validate(&self) -> Result<(), CredentialError> {
        if self.login.is_empty() {
            return Err(CredentialError::Validation("login must not be empty"));
        }
        if self.password.is_empty() {
            return Err(CredentialError::Validation("password must not be empty"));
        }
        Ok(())
    }

    /// Hash the password with a fresh random salt
    ///
    /// Two calls on the same credential produce different hashes; both verify.
    pub fn hash_password(&self) -> Result<HashedCredential, CredentialError> {
        if self.password.is_empty() {
            return Err(CredentialError::Hashing("password must not be empty".into()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = argon2_config().map_err(|e| CredentialError::Hashing(e.to_string()))?;
        let password_hash = argon2
            .hash_password(self.password.as_bytes(), &salt)
            .map_err(|e| CredentialError::Hashing(e.to_string()))?
            .to_string();

        Ok(HashedCredential {
            login: self.login.clone(),
            password_hash,
        })
    }

    /// Check the password against a stored hash
    ///
    /// Returns `false` for a mismatch and for a stored hash that does not parse.
    pub fn check_password(&self, stored_hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(stored_hash) {
            Ok(hash) => hash,
            Err(_) => return false,
        };

        match argon2_config() {
            Ok(argon2) => argon2
                .verify_password(self.password.as_bytes(), &parsed_hash)
                .is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(Credential::new("alice", "s3cret").validate().is_ok());
        assert!(matches!(
            Credential::new("", "s3cret").validate(),
            Err(CredentialError::Validation(_))
        ));
        assert!(matches!(
            Credential::new("alice", "").validate(),
            Err(CredentialError::Validation(_))
        ));
    }

    #[test]
    fn test_hash_and_check() {
        let credential = Credential::new("alice", "s3cret");
        let hashed = credential.hash_password().unwrap();

        assert_eq!(hashed.login, "alice");
        assert!(!hashed.password_hash.contains("s3cret"));
        assert!(hashed.password_hash.starts_with("$argon2id$"));
        assert!(credential.check_password(&hashed.password_hash));
        assert!(!Credential::new("alice", "wrong").check_password(&hashed.password_hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let credential = Credential::new("alice", "s3cret");
        let first = credential.hash_password().unwrap();
        let second = credential.hash_password().unwrap();

        assert_ne!(first.password_hash, second.password_hash);
        assert!(credential.check_password(&first.password_hash));
        assert!(credential.check_password(&second.password_hash));
    }

    #[test]
    fn test_empty_password_cannot_be_hashed() {
        assert!(matches!(
            Credential::new("alice", "").hash_password(),
            Err(CredentialError::Hashing(_))
        ));
    }

    #[test]
    fn test_garbage_stored_hash() {
        let credential = Credential::new("alice", "s3cret");
        assert!(!credential.check_password(""));
        assert!(!credential.check_password("s3cret"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", Credential::new("alice", "s3cret"));
        assert!(debug.contains("alice"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn test_json_shape() {
        let credential: Credential =
            serde_json::from_str(r#"{"login":"alice","password":"s3cret"}"#).unwrap();
        assert_eq!(credential.login, "alice");
        assert_eq!(credential.password, "s3cret");
    }
}
