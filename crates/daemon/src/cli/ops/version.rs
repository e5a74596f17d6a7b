use clap::Args;

use common::build_info;
use common::version::BuildInfo;

#[derive(Args, Debug, Clone)]
pub struct Version {
    /// Print the build metadata as JSON, the same shape `/_status/version` serves
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("cannot encode build info: {0}")]
    Encode(#[from] serde_json::Error),
}

fn render(info: &BuildInfo, json: bool) -> Result<String, VersionError> {
    if json {
        return Ok(serde_json::to_string_pretty(info)?);
    }
    let mut line = format!("keeper {}", info);
    if let Some(rust) = info.rust_version {
        line.push_str(&format!(" ({})", rust));
    }
    Ok(line)
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Version {
    type Error = VersionError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        render(&build_info!(), self.json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> BuildInfo {
        BuildInfo {
            version: "0.1.0",
            repo_version: Some("abc1234"),
            build_profile: Some("release"),
            build_features: None,
            rust_version: Some("rustc 1.80.0"),
        }
    }

    #[test]
    fn test_render_text() {
        assert_eq!(
            render(&info(), false).unwrap(),
            "keeper 0.1.0 (abc1234) [release] (rustc 1.80.0)"
        );
    }

    #[test]
    fn test_render_json() {
        let value: serde_json::Value =
            serde_json::from_str(&render(&info(), true).unwrap()).unwrap();
        assert_eq!(value["version"], "0.1.0");
        assert_eq!(value["repo_version"], "abc1234");
        assert!(value["build_features"].is_null());
    }
}
