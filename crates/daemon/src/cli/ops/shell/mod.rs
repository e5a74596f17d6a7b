mod command;
mod config;

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use common::crypto::{Encryptor, EnvelopeError, NonceMode};
use keeper_daemon::http_server::api::client::{ApiClient, ApiError};
use keeper_daemon::state::{AppState, PUBLIC_KEY_FILE_NAME};
use keeper_daemon::Session;

use self::command::{ShellCommand, USAGE};
use self::config::{ClientConfig, ConfigError, Overrides, Settings};

const PROMPT: &[u8] = b"> ";
/// Liveness probes before the shell gives up waiting for the server
const STARTUP_PROBES: usize = 3;

#[derive(Args, Debug, Clone)]
pub struct Shell {
    /// Server public key used to seal credentials (default: public.pem in the state directory)
    #[arg(long)]
    pub public_key: Option<PathBuf>,

    /// JSON file with `address`, `poll_interval` and `crypto_key`; flags win over it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Derive nonces from the key, needed to read data written by older clients
    #[arg(long)]
    pub legacy_nonce: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot load server public key: {0}")]
    PublicKey(#[from] EnvelopeError),
    #[error("bad server address: {0}")]
    Address(#[from] ApiError),
    #[error("terminal error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Shell {
    type Error = ShellError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let file = match &self.config {
            Some(path) => Some(ClientConfig::load(path)?),
            None => None,
        };
        let default_public_key = AppState::keeper_dir(ctx.config_path.clone())
            .map(|dir| dir.join(PUBLIC_KEY_FILE_NAME))
            .unwrap_or_else(|_| PathBuf::from(PUBLIC_KEY_FILE_NAME));
        let overrides = Overrides {
            remote_explicit: ctx.remote_explicit,
            public_key: self.public_key.clone(),
        };
        let settings = Settings::merge(overrides, file, default_public_key)?;

        let client = match &settings.address {
            Some(address) => ApiClient::from_address(address)?,
            None => ctx.client.clone(),
        };
        let encryptor = Encryptor::load(&settings.public_key)?;
        let nonce_mode = if self.legacy_nonce {
            NonceMode::Derived
        } else {
            NonceMode::Random
        };

        let mut stdout = tokio::io::stdout();
        if !wait_for_server(&client, settings.poll_interval).await {
            stdout
                .write_all(
                    format!(
                        "warning: {} is not answering, commands may fail\n",
                        client.base_url()
                    )
                    .as_bytes(),
                )
                .await?;
        }
        stdout
            .write_all(
                format!(
                    "connected to {}, type 'help' for commands\n",
                    client.base_url()
                )
                .as_bytes(),
            )
            .await?;

        let mut session = Session::new(client, encryptor, nonce_mode);
        let stdin = BufReader::new(tokio::io::stdin());
        run(&mut session, stdin, stdout).await?;

        Ok("bye".to_string())
    }
}

/// Probe liveness a few times, `poll_interval` apart
async fn wait_for_server(client: &ApiClient, poll_interval: Duration) -> bool {
    let url = format!(
        "{}/_status/livez",
        client.base_url().as_str().trim_end_matches('/')
    );
    for attempt in 1..=STARTUP_PROBES {
        match client.http_client().get(&url).send().await {
            Ok(resp) if resp.status().is_success() => return true,
            _ if attempt < STARTUP_PROBES => tokio::time::sleep(poll_interval).await,
            _ => {}
        }
    }
    false
}

/// Read commands until `exit` or end of input. The session and everything it holds
/// lives only as long as this loop.
pub async fn run<R, W>(session: &mut Session, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    output.write_all(PROMPT).await?;
    output.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let reply = match command::parse(&line) {
            Ok(None) => None,
            Ok(Some(ShellCommand::Exit)) => break,
            Ok(Some(command)) => Some(dispatch(session, command).await),
            Err(e) => Some(format!("{}\n{}", e.to_string().trim_end(), USAGE)),
        };
        if let Some(reply) = reply {
            output.write_all(reply.as_bytes()).await?;
            output.write_all(b"\n").await?;
        }
        output.write_all(PROMPT).await?;
        output.flush().await?;
    }

    output.flush().await
}

async fn dispatch(session: &mut Session, command: ShellCommand) -> String {
    let result = match command {
        ShellCommand::Register { login, password } => session
            .register(&login, &password)
            .await
            .map(|_| format!("registered, logged in as {}", login)),
        ShellCommand::Login { login, password } => session
            .login(&login, &password)
            .await
            .map(|_| format!("logged in as {}", login)),
        ShellCommand::AddData { id, text } => session
            .add_data(&id, text.join(" ").as_bytes())
            .await
            .map(|_| format!("stored {}", id)),
        ShellCommand::GetData { id } => session
            .get_data(&id)
            .await
            .map(|data| String::from_utf8_lossy(&data).into_owned()),
        ShellCommand::DeleteData { id } => session
            .delete_data(&id)
            .await
            .map(|_| format!("deleted {}", id)),
        ShellCommand::Logout => {
            session.logout();
            Ok("logged out".to_string())
        }
        ShellCommand::Help => Ok(USAGE.to_string()),
        // handled by the loop
        ShellCommand::Exit => Ok(String::new()),
    };

    result.unwrap_or_else(|e| format!("error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBLIC_PEM: &str = include_str!("../../../../tests/fixtures/public.pem");

    fn session() -> Session {
        // nothing listens here; none of these commands reach the network
        let client = ApiClient::from_address("127.0.0.1:9").unwrap();
        Session::new(
            client,
            Encryptor::from_pem(PUBLIC_PEM).unwrap(),
            NonceMode::Random,
        )
    }

    async fn run_script(script: &str) -> String {
        let mut session = session();
        let mut output = Vec::new();
        run(&mut session, script.as_bytes(), &mut output)
            .await
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn test_data_commands_before_login() {
        let output = run_script("add-data 42 hello\nget-data 42\ndelete-data 42\n").await;
        assert_eq!(output.matches("error: bad auth data, try login").count(), 3);
    }

    #[tokio::test]
    async fn test_help_and_unknown_commands() {
        let output = run_script("help\nfrobnicate\n").await;
        assert_eq!(output.matches("add-data <id> <text...>").count(), 2);
    }

    #[tokio::test]
    async fn test_exit_stops_reading() {
        let output = run_script("logout\nexit\nhelp\n").await;
        assert!(output.contains("logged out"));
        assert!(!output.contains("commands:"));
    }
}
