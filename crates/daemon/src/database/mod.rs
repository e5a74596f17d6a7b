mod secret_queries;
mod sqlite;
mod types;
mod user_queries;

use std::ops::Deref;

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use common::credential::HashedCredential;

use crate::storage::{SecretStore, StorageError};

#[derive(Clone, Debug)]
pub struct Database(SqlitePool);

impl Database {
    pub async fn connect(database_url: &url::Url) -> Result<Self, DatabaseSetupError> {
        if database_url.scheme() == "sqlite" {
            let db = sqlite::connect_sqlite(database_url).await?;
            sqlite::migrate_sqlite(&db).await?;
            return Ok(Database::new(db));
        }

        Err(DatabaseSetupError::UnknownDbType(
            database_url.scheme().to_string(),
        ))
    }

    /// Fresh, migrated in-memory database
    pub async fn in_memory() -> Result<Self, DatabaseSetupError> {
        let url = url::Url::parse("sqlite::memory:")
            .map_err(|e| DatabaseSetupError::InvalidUrl(e.to_string()))?;
        Self::connect(&url).await
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self(pool)
    }
}

impl Deref for Database {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl SecretStore for Database {
    async fn user_exists(&self, login: &str) -> Result<bool, StorageError> {
        Ok(self.login_exists(login).await?)
    }

    async fn create_user(&self, credential: &HashedCredential) -> Result<Uuid, StorageError> {
        self.insert_user(credential).await.map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Conflict
            } else {
                StorageError::Database(e)
            }
        })
    }

    async fn find_user_for_login(&self, login: &str) -> Result<(Uuid, String), StorageError> {
        self.user_by_login(login)
            .await?
            .ok_or(StorageError::NotFound)
    }

    async fn put_secret(
        &self,
        user_id: Uuid,
        secret_id: &str,
        ciphertext: &[u8],
    ) -> Result<(), StorageError> {
        Ok(self.upsert_secret(user_id, secret_id, ciphertext).await?)
    }

    async fn get_secret(&self, user_id: Uuid, secret_id: &str) -> Result<Vec<u8>, StorageError> {
        self.secret_data(user_id, secret_id)
            .await?
            .ok_or(StorageError::NotFound)
    }

    async fn delete_secret(&self, user_id: Uuid, secret_id: &str) -> Result<(), StorageError> {
        match self.remove_secret(user_id, secret_id).await? {
            0 => Err(StorageError::NotFound),
            _ => Ok(()),
        }
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&**self).await?;
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseSetupError {
    #[error("error occurred while attempting database migration: {0}")]
    MigrationFailed(sqlx::migrate::MigrateError),

    #[error("unable to perform initial connection and check of the database: {0}")]
    Unavailable(sqlx::Error),

    #[error("requested database type was not recognized: {0}")]
    UnknownDbType(String),

    #[error("invalid database url: {0}")]
    InvalidUrl(String),
}
