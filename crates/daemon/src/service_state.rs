use std::sync::Arc;

use url::Url;

use common::auth::{TokenError, TokenIssuer};
use common::crypto::{Decryptor, EnvelopeError};

use crate::database::{Database, DatabaseSetupError};
use crate::storage::SecretStore;
use crate::ServiceConfig;

/// Main service state, built once at startup and shared read-only by every request
#[derive(Clone)]
pub struct State {
    store: Arc<dyn SecretStore>,
    decryptor: Arc<Decryptor>,
    tokens: Arc<TokenIssuer>,
}

impl State {
    pub async fn from_config(config: &ServiceConfig) -> Result<Self, StateSetupError> {
        // 1. Setup database
        let sqlite_database_url = match config.sqlite_path {
            Some(ref path) => {
                // check that the path exists
                if !path.exists() {
                    return Err(StateSetupError::DatabasePathDoesNotExist);
                }
                Url::parse(&format!("sqlite://{}", path.display()))
                    .map_err(|_| StateSetupError::InvalidDatabaseUrl)
            }
            // otherwise just set up an in-memory database
            None => Url::parse("sqlite::memory:").map_err(|_| StateSetupError::InvalidDatabaseUrl),
        }?;
        tracing::info!("Database URL: {}", sqlite_database_url);
        let database = Database::connect(&sqlite_database_url).await?;

        // 2. Load the envelope key; a bad key is fatal
        let decryptor = Decryptor::load(&config.private_key_path)?;
        tracing::info!(
            path = %config.private_key_path.display(),
            key_bits = decryptor.key_size() * 8,
            "loaded envelope private key"
        );

        // 3. Token issuer
        if config.signing_key.is_empty() {
            return Err(StateSetupError::MissingSigningKey);
        }
        let tokens = TokenIssuer::new(config.signing_key.as_bytes().to_vec(), config.token_ttl);
        // refuse a TTL that would make every login fail
        tokens.expiry_at(time::OffsetDateTime::now_utc())?;

        Ok(Self::new(Arc::new(database), decryptor, tokens))
    }

    pub fn new(store: Arc<dyn SecretStore>, decryptor: Decryptor, tokens: TokenIssuer) -> Self {
        Self {
            store,
            decryptor: Arc::new(decryptor),
            tokens: Arc::new(tokens),
        }
    }

    pub fn store(&self) -> &Arc<dyn SecretStore> {
        &self.store
    }

    pub fn decryptor(&self) -> &Arc<Decryptor> {
        &self.decryptor
    }

    pub fn tokens(&self) -> &Arc<TokenIssuer> {
        &self.tokens
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("Database path does not exist")]
    DatabasePathDoesNotExist,
    #[error("Database setup error: {0}")]
    DatabaseSetupError(#[from] DatabaseSetupError),
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,
    #[error("Envelope key error: {0}")]
    EnvelopeKey(#[from] EnvelopeError),
    #[error("Token signing key is empty")]
    MissingSigningKey,
    #[error("Invalid token TTL: {0}")]
    TokenTtl(#[from] TokenError),
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use zeroize::Zeroizing;

    use super::*;

    fn config(token_ttl: Duration) -> ServiceConfig {
        ServiceConfig {
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            sqlite_path: None,
            private_key_path: PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("tests")
                .join("fixtures")
                .join("private.pem"),
            signing_key: Zeroizing::new("test-signing-key".to_string()),
            token_ttl,
            log_level: tracing::Level::INFO,
            log_dir: None,
        }
    }

    #[tokio::test]
    async fn test_from_config() {
        let state = State::from_config(&config(Duration::from_secs(3600)))
            .await
            .unwrap();
        assert_eq!(state.tokens().validity(), Duration::from_secs(3600));
        state.store().ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_unrepresentable_token_ttl() {
        let result = State::from_config(&config(Duration::from_secs(u64::MAX / 4))).await;
        assert!(matches!(
            result,
            Err(StateSetupError::TokenTtl(TokenError::Validity(_)))
        ));
    }

    #[tokio::test]
    async fn test_rejects_empty_signing_key() {
        let mut config = config(Duration::from_secs(3600));
        config.signing_key = Zeroizing::new(String::new());
        let result = State::from_config(&config).await;
        assert!(matches!(result, Err(StateSetupError::MissingSigningKey)));
    }
}
