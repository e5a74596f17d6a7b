use std::net::SocketAddr;
use std::time::Duration;

use clap::Args;
use zeroize::Zeroizing;

use keeper_daemon::state::AppState;
use keeper_daemon::{spawn_service, ServiceConfig};

#[derive(Args, Clone)]
pub struct Daemon {
    /// Override API server port (default from config)
    #[arg(long, env = "KEEPER_API_PORT")]
    pub api_port: Option<u16>,

    /// Override token lifetime (default from config), e.g. "60m"
    #[arg(long, env = "KEEPER_TOKEN_TTL", value_parser = humantime::parse_duration)]
    pub token_ttl: Option<Duration>,

    /// Override the token signing secret (default from config)
    #[arg(long, env = "KEEPER_SIGNING_KEY", hide_env_values = true)]
    pub signing_key: Option<String>,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<std::path::PathBuf>,

    /// Default log level, RUST_LOG still takes precedence
    #[arg(long, default_value_t = tracing::Level::INFO)]
    pub log_level: tracing::Level,
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("api_port", &self.api_port)
            .field("token_ttl", &self.token_ttl)
            .field("signing_key", &self.signing_key.as_ref().map(|_| "<redacted>"))
            .field("log_dir", &self.log_dir)
            .field("log_level", &self.log_level)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("state error: {0}")]
    StateError(#[from] keeper_daemon::state::StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        // Load state from config path (or default ~/.keeper)
        let state = AppState::load(ctx.config_path.clone())?;

        // Flags and env win over config.toml
        let api_port = self.api_port.unwrap_or(state.config.api_port);
        let token_ttl = self.token_ttl.unwrap_or(state.config.token_ttl);
        let signing_key = self
            .signing_key
            .clone()
            .unwrap_or_else(|| state.config.signing_key.clone());

        let config = ServiceConfig {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], api_port)),
            sqlite_path: Some(state.db_path),
            private_key_path: state.private_key_path,
            signing_key: Zeroizing::new(signing_key),
            token_ttl,
            log_level: self.log_level,
            log_dir: self.log_dir.clone(),
        };

        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}
