//! Client-side session against a Keeper server
//!
//! A [`Session`] seals credentials with the server's public key, keeps the bearer
//! token and a password-derived cipher after a successful register or login, and
//! encrypts secrets before they leave the process. Nothing here is persisted.

use common::credential::Credential;
use common::crypto::{Encryptor, EnvelopeError, NonceMode, SymmetricCipher, SymmetricError};

use crate::http_server::api::client::{ApiClient, ApiError};
use crate::http_server::api::data::add::AddDataRequest;
use crate::http_server::api::data::delete::DeleteDataRequest;
use crate::http_server::api::data::get::GetDataRequest;
use crate::http_server::api::user::login::LoginRequest;
use crate::http_server::api::user::register::RegisterRequest;
use crate::http_server::api::user::{AuthToken, SealedCredential};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("bad auth data, try login")]
    NotAuthenticated,
    #[error("invalid credential: {0}")]
    Credential(#[from] common::credential::CredentialError),
    #[error("cannot seal credentials: {0}")]
    Envelope(#[from] EnvelopeError),
    #[error("cannot process secret: {0}")]
    Symmetric(#[from] SymmetricError),
    #[error("request failed: {0}")]
    Api(#[from] ApiError),
}

/// What a successful register/login leaves behind
struct EncryptionContext {
    token: AuthToken,
    cipher: SymmetricCipher,
}

pub struct Session {
    client: ApiClient,
    encryptor: Encryptor,
    nonce_mode: NonceMode,
    context: Option<EncryptionContext>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("remote", &self.client.base_url().as_str())
            .field("nonce_mode", &self.nonce_mode)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl Session {
    pub fn new(client: ApiClient, encryptor: Encryptor, nonce_mode: NonceMode) -> Self {
        Self {
            client,
            encryptor,
            nonce_mode,
            context: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.context.is_some()
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn register(&mut self, login: &str, password: &str) -> Result<(), SessionError> {
        let credential = self.seal(login, password)?;
        let token = self.client.call(RegisterRequest { credential }).await?;
        self.establish(token, password);
        Ok(())
    }

    pub async fn login(&mut self, login: &str, password: &str) -> Result<(), SessionError> {
        let credential = self.seal(login, password)?;
        let token = self.client.call(LoginRequest { credential }).await?;
        self.establish(token, password);
        Ok(())
    }

    /// Forget the token and the derived key
    pub fn logout(&mut self) {
        self.context = None;
    }

    pub async fn add_data(&self, id: &str, plaintext: &[u8]) -> Result<(), SessionError> {
        let context = self.context()?;
        let ciphertext = context.cipher.encrypt(plaintext)?;
        self.client
            .call(AddDataRequest {
                id: id.to_string(),
                ciphertext,
                token: context.token.0.clone(),
            })
            .await?;
        Ok(())
    }

    pub async fn get_data(&self, id: &str) -> Result<Vec<u8>, SessionError> {
        let context = self.context()?;
        let ciphertext = self
            .client
            .call(GetDataRequest {
                id: id.to_string(),
                token: context.token.0.clone(),
            })
            .await?;
        Ok(context.cipher.decrypt(&ciphertext)?)
    }

    pub async fn delete_data(&self, id: &str) -> Result<(), SessionError> {
        let context = self.context()?;
        self.client
            .call(DeleteDataRequest {
                id: id.to_string(),
                token: context.token.0.clone(),
            })
            .await?;
        Ok(())
    }

    fn seal(&self, login: &str, password: &str) -> Result<SealedCredential, SessionError> {
        let credential = Credential::new(login, password);
        credential.validate()?;
        Ok(SealedCredential::seal(&credential, &self.encryptor)?)
    }

    fn establish(&mut self, token: AuthToken, password: &str) {
        self.context = Some(EncryptionContext {
            token,
            cipher: SymmetricCipher::new(password, self.nonce_mode),
        });
    }

    fn context(&self) -> Result<&EncryptionContext, SessionError> {
        self.context.as_ref().ok_or(SessionError::NotAuthenticated)
    }
}
