use serde::Serialize;

/// Build metadata captured at compile time
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub repo_version: Option<&'static str>,
    pub build_profile: Option<&'static str>,
    pub build_features: Option<&'static str>,
    pub rust_version: Option<&'static str>,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.version)?;
        if let Some(repo) = self.repo_version {
            write!(f, " ({})", repo)?;
        }
        if let Some(profile) = self.build_profile {
            write!(f, " [{}]", profile)?;
        }
        if let Some(features) = self.build_features {
            write!(f, " features: {}", features)?;
        }
        Ok(())
    }
}

/// Collect build info for the crate the macro is expanded in.
///
/// The optional fields are filled from environment variables a build script sets
/// (`REPO_VERSION`, `BUILD_PROFILE`, `BUILD_FEATURES`, `RUST_VERSION`).
#[macro_export]
macro_rules! build_info {
    () => {
        $crate::version::BuildInfo {
            version: env!("CARGO_PKG_VERSION"),
            repo_version: option_env!("REPO_VERSION"),
            build_profile: option_env!("BUILD_PROFILE"),
            build_features: option_env!("BUILD_FEATURES"),
            rust_version: option_env!("RUST_VERSION"),
        }
    };
}

/// Build info for this library
pub fn build_info() -> BuildInfo {
    build_info!()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display_starts_with_version() {
        let info = build_info();
        assert!(info.to_string().starts_with(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_serializes() {
        let value = serde_json::to_value(build_info()).unwrap();
        assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
    }
}
