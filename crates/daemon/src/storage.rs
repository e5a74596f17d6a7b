use async_trait::async_trait;
use uuid::Uuid;

use common::credential::HashedCredential;

/// Persistence for users and their secrets
///
/// Implementations own their pooling; callers share one instance across requests.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn user_exists(&self, login: &str) -> Result<bool, StorageError>;

    /// Store a new user. Fails with [`StorageError::Conflict`] if the login is taken.
    async fn create_user(&self, credential: &HashedCredential) -> Result<Uuid, StorageError>;

    /// Look up the id and stored password hash for a login
    async fn find_user_for_login(&self, login: &str) -> Result<(Uuid, String), StorageError>;

    /// Store a secret, replacing any previous value under the same id
    async fn put_secret(
        &self,
        user_id: Uuid,
        secret_id: &str,
        ciphertext: &[u8],
    ) -> Result<(), StorageError>;

    async fn get_secret(&self, user_id: Uuid, secret_id: &str) -> Result<Vec<u8>, StorageError>;

    async fn delete_secret(&self, user_id: Uuid, secret_id: &str) -> Result<(), StorageError>;

    /// Cheap round trip used by readiness checks
    async fn ping(&self) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
