use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use zeroize::Zeroizing;

/// Everything the service needs at startup, resolved from the state directory and flags
pub struct Config {
    // http server configuration
    /// address for the API server to listen on
    pub listen_addr: SocketAddr,

    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,

    // key material
    /// PEM file holding the PKCS#1 private key that opens login envelopes
    pub private_key_path: PathBuf,
    /// secret used to sign bearer tokens
    pub signing_key: Zeroizing<String>,
    /// how long an issued token stays valid
    pub token_ttl: Duration,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("listen_addr", &self.listen_addr)
            .field("sqlite_path", &self.sqlite_path)
            .field("private_key_path", &self.private_key_path)
            .field("signing_key", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("log_level", &self.log_level)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_signing_key() {
        let config = Config {
            listen_addr: "127.0.0.1:8088".parse().unwrap(),
            sqlite_path: None,
            private_key_path: PathBuf::from("private.pem"),
            signing_key: Zeroizing::new("super-secret-signing-key".to_string()),
            token_ttl: Duration::from_secs(60 * 60),
            log_level: tracing::Level::INFO,
            log_dir: None,
        };

        let debug = format!("{:?}", config);
        assert!(debug.contains("127.0.0.1:8088"));
        assert!(!debug.contains("super-secret-signing-key"));
    }
}
