use std::time::Duration;

use clap::Args;

use common::crypto::DEFAULT_KEY_BITS;
use keeper_daemon::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Port the API server listens on
    #[arg(long)]
    pub api_port: Option<u16>,

    /// How long issued tokens stay valid (e.g. "60m", "2h")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub token_ttl: Option<Duration>,

    /// Size of the generated envelope key pair
    #[arg(long, default_value_t = DEFAULT_KEY_BITS)]
    pub key_bits: usize,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = StateError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = AppConfig::generate();
        if let Some(port) = self.api_port {
            config.api_port = port;
        }
        if let Some(ttl) = self.token_ttl {
            config.token_ttl = ttl;
        }

        let config_path = ctx.config_path.clone();
        let key_bits = self.key_bits;
        // RSA key generation takes a while at 2048+ bits
        let state = tokio::task::spawn_blocking(move || {
            AppState::init(config_path, Some(config), key_bits)
        })
        .await
        .map_err(|e| StateError::Io(std::io::Error::other(e)))??;

        let mut output = String::new();
        output.push_str(&format!(
            "Initialized keeper directory at: {}\n",
            state.keeper_dir.display()
        ));
        output.push_str(&format!("  - Config: {}\n", state.config_path.display()));
        output.push_str(&format!("  - Database: {}\n", state.db_path.display()));
        output.push_str(&format!(
            "  - Private key: {}\n",
            state.private_key_path.display()
        ));
        output.push_str(&format!(
            "  - Public key: {} (hand this one to clients)\n",
            state.public_key_path.display()
        ));
        output.push_str(&format!("  - API port: {}\n", state.config.api_port));
        output.push_str(&format!(
            "  - Token TTL: {}",
            humantime::format_duration(state.config.token_ttl)
        ));

        Ok(output)
    }
}
