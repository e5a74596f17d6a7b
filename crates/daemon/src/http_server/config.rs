use std::net::SocketAddr;

/// Settings `run_api` needs beyond the shared service state
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// Level the trace layer logs completed requests at
    pub log_level: tracing::Level,
}

impl Config {
    pub fn new(listen_addr: SocketAddr, log_level: tracing::Level) -> Self {
        Self {
            listen_addr,
            log_level,
        }
    }
}

impl From<&crate::ServiceConfig> for Config {
    fn from(service: &crate::ServiceConfig) -> Self {
        Self::new(service.listen_addr, service.log_level)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use zeroize::Zeroizing;

    use super::*;

    #[test]
    fn test_from_service_config() {
        let service = crate::ServiceConfig {
            listen_addr: "0.0.0.0:8088".parse().unwrap(),
            sqlite_path: None,
            private_key_path: PathBuf::from("private.pem"),
            signing_key: Zeroizing::new("k".to_string()),
            token_ttl: Duration::from_secs(60),
            log_level: tracing::Level::DEBUG,
            log_dir: None,
        };
        let config = Config::from(&service);
        assert_eq!(config.listen_addr.port(), 8088);
        assert_eq!(config.log_level, tracing::Level::DEBUG);
    }
}
