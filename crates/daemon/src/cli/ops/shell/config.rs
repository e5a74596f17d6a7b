use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Used when neither the JSON file nor a flag sets one
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read json config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse json config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bad json param 'poll_interval': {0}")]
    PollInterval(#[from] humantime::DurationError),
}

/// Optional `--config` file for the client shell
#[derive(Debug, Default, Deserialize)]
pub struct ClientConfig {
    pub address: Option<String>,
    /// Duration string, e.g. "10s"
    pub poll_interval: Option<String>,
    /// Path to the server's public key
    pub crypto_key: Option<PathBuf>,
}

impl ClientConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Flags the shell was started with
#[derive(Debug, Default)]
pub struct Overrides {
    /// Set when `--remote` was given explicitly
    pub remote_explicit: bool,
    pub public_key: Option<PathBuf>,
}

/// What the shell runs with after merging flags, the JSON file and defaults
#[derive(Debug, PartialEq, Eq)]
pub struct Settings {
    /// Replacement server address; `None` keeps the remote already resolved
    pub address: Option<String>,
    pub public_key: PathBuf,
    pub poll_interval: Duration,
}

impl Settings {
    /// Explicit flags win; the file only fills what flags left unset
    pub fn merge(
        overrides: Overrides,
        file: Option<ClientConfig>,
        default_public_key: PathBuf,
    ) -> Result<Self, ConfigError> {
        let file = file.unwrap_or_default();

        let address = if overrides.remote_explicit {
            None
        } else {
            file.address
        };
        let public_key = overrides
            .public_key
            .or(file.crypto_key)
            .unwrap_or(default_public_key);
        let poll_interval = match file.poll_interval {
            Some(text) => humantime::parse_duration(&text)?,
            None => DEFAULT_POLL_INTERVAL,
        };

        Ok(Self {
            address,
            public_key,
            poll_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> ClientConfig {
        ClientConfig::parse(
            r#"{"address": "vault.internal:8088", "poll_interval": "2s", "crypto_key": "/etc/keeper/public.pem"}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_file_fills_unset_values() {
        let settings =
            Settings::merge(Overrides::default(), Some(file()), "public.pem".into()).unwrap();
        assert_eq!(settings.address.as_deref(), Some("vault.internal:8088"));
        assert_eq!(settings.public_key, PathBuf::from("/etc/keeper/public.pem"));
        assert_eq!(settings.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_flags_win_over_file() {
        let overrides = Overrides {
            remote_explicit: true,
            public_key: Some("mine.pem".into()),
        };
        let settings = Settings::merge(overrides, Some(file()), "public.pem".into()).unwrap();
        assert_eq!(settings.address, None);
        assert_eq!(settings.public_key, PathBuf::from("mine.pem"));
    }

    #[test]
    fn test_defaults_without_file() {
        let settings =
            Settings::merge(Overrides::default(), None, "state/public.pem".into()).unwrap();
        assert_eq!(
            settings,
            Settings {
                address: None,
                public_key: "state/public.pem".into(),
                poll_interval: DEFAULT_POLL_INTERVAL,
            }
        );
    }

    #[test]
    fn test_bad_values_rejected() {
        let bad = ClientConfig::parse(r#"{"poll_interval": "soon"}"#).unwrap();
        let result = Settings::merge(Overrides::default(), Some(bad), "public.pem".into());
        assert!(matches!(result, Err(ConfigError::PollInterval(_))));

        assert!(matches!(
            ClientConfig::parse("{not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
