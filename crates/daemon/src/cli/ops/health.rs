use clap::Args;

use keeper_daemon::state::AppState;

#[derive(Args, Debug, Clone)]
pub struct Health;

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("Health check failed: {0}")]
    Failed(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = HealthError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut lines = Vec::new();

        // 1. Check config directory
        lines.push("Config:".to_string());
        match AppState::load(ctx.config_path.clone()) {
            Ok(state) => {
                lines.push(format!("  directory:    {}", state.keeper_dir.display()));
                lines.push("  config.toml:  OK".to_string());
                lines.push("  db.sqlite:    OK".to_string());
                lines.push("  private.pem:  OK".to_string());
                let public = if state.public_key_path.exists() {
                    "OK"
                } else {
                    "MISSING"
                };
                lines.push(format!("  public.pem:   {}", public));
                lines.push(format!("  api_port:     {}", state.config.api_port));
                lines.push(format!(
                    "  token_ttl:    {}",
                    humantime::format_duration(state.config.token_ttl)
                ));
            }
            Err(e) => {
                lines.push(format!("  error: {}", e));
            }
        }

        // 2. Check daemon liveness and readiness
        let base = ctx.client.base_url();
        let client = ctx.client.http_client();

        lines.push(String::new());
        lines.push(format!("Daemon ({}):", base));

        for (label, path) in [("livez: ", "livez"), ("readyz:", "readyz")] {
            let url = format!("{}/_status/{}", base.as_str().trim_end_matches('/'), path);
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    lines.push(format!("  {} OK", label));
                }
                Ok(resp) => {
                    lines.push(format!("  {} UNHEALTHY ({})", label, resp.status()));
                }
                Err(_) => {
                    lines.push(format!("  {} NOT REACHABLE", label));
                }
            }
        }

        Ok(lines.join("\n"))
    }
}
