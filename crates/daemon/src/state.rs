use std::time::Duration;
use std::{fs, path::PathBuf};

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use common::crypto::{Decryptor, EnvelopeError};

pub const APP_NAME: &str = "keeper";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "db.sqlite";
pub const PRIVATE_KEY_FILE_NAME: &str = "private.pem";
pub const PUBLIC_KEY_FILE_NAME: &str = "public.pem";

const SIGNING_KEY_BYTES: usize = 32;

#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the API server
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// How long issued tokens stay valid, e.g. "60m"
    #[serde(default = "default_token_ttl", with = "humantime_serde_compat")]
    pub token_ttl: Duration,
    /// Secret used to sign bearer tokens
    pub signing_key: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_port", &self.api_port)
            .field("token_ttl", &self.token_ttl)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

pub fn default_api_port() -> u16 {
    8088
}

fn default_token_ttl() -> Duration {
    Duration::from_secs(60 * 60)
}

/// Durations in config.toml are written the human way ("60m", "1h 30m")
mod humantime_serde_compat {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

impl AppConfig {
    /// Default config with a freshly generated signing key
    pub fn generate() -> Self {
        let mut key = [0u8; SIGNING_KEY_BYTES];
        OsRng.fill_bytes(&mut key);
        Self {
            api_port: default_api_port(),
            token_ttl: default_token_ttl(),
            signing_key: hex::encode(key),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the keeper directory (~/.keeper)
    pub keeper_dir: PathBuf,
    /// Path to the SQLite database
    pub db_path: PathBuf,
    /// Path to the envelope private key
    pub private_key_path: PathBuf,
    /// Path to the envelope public key handed to clients
    pub public_key_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the keeper directory path (custom or default ~/.keeper)
    pub fn keeper_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new keeper state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
        key_bits: usize,
    ) -> Result<Self, StateError> {
        let keeper_dir = Self::keeper_dir(custom_path)?;

        if keeper_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        // generate before touching the disk so a failure leaves nothing behind
        let decryptor = Decryptor::generate(key_bits)?;
        let private_pem = decryptor.to_pem()?;
        let public_pem = decryptor.encryptor().to_pem()?;

        fs::create_dir_all(&keeper_dir)?;

        let private_key_path = keeper_dir.join(PRIVATE_KEY_FILE_NAME);
        write_private(&private_key_path, private_pem.as_bytes())?;
        let public_key_path = keeper_dir.join(PUBLIC_KEY_FILE_NAME);
        fs::write(&public_key_path, public_pem)?;

        let config = config.unwrap_or_else(AppConfig::generate);
        let config_path = keeper_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        write_private(&config_path, config_toml.as_bytes())?;

        // Create empty database (just touch the file, it will be initialized by the service)
        let db_path = keeper_dir.join(DB_FILE_NAME);
        fs::write(&db_path, "")?;

        Ok(Self {
            keeper_dir,
            db_path,
            private_key_path,
            public_key_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the keeper directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let keeper_dir = Self::keeper_dir(custom_path)?;

        if !keeper_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let db_path = keeper_dir.join(DB_FILE_NAME);
        let private_key_path = keeper_dir.join(PRIVATE_KEY_FILE_NAME);
        let public_key_path = keeper_dir.join(PUBLIC_KEY_FILE_NAME);
        let config_path = keeper_dir.join(CONFIG_FILE_NAME);

        for (path, name) in [
            (&db_path, DB_FILE_NAME),
            (&private_key_path, PRIVATE_KEY_FILE_NAME),
            (&config_path, CONFIG_FILE_NAME),
        ] {
            if !path.exists() {
                return Err(StateError::MissingFile(name.to_string()));
            }
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            keeper_dir,
            db_path,
            private_key_path,
            public_key_path,
            config_path,
            config,
        })
    }
}

#[cfg(unix)]
fn write_private(path: &std::path::Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &std::path::Path, contents: &[u8]) -> std::io::Result<()> {
    fs::write(path, contents)
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("keeper directory not initialized. Run 'keeper init' first")]
    NotInitialized,

    #[error("keeper directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("key error: {0}")]
    Key(#[from] EnvelopeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
