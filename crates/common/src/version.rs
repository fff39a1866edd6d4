use std::fmt;

use serde::Serialize;

/// Build metadata captured by `build.rs` at compile time
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub build_profile: &'static str,
    pub build_features: &'static str,
    pub build_timestamp: &'static str,
    pub version: &'static str,
    pub package_version: &'static str,
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "blobdrop {} ({}, profile={}, features={}, built={})",
            self.package_version,
            self.version,
            self.build_profile,
            self.build_features,
            self.build_timestamp
        )
    }
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        build_profile: env!("BUILD_PROFILE"),
        build_features: env!("BUILD_FEATURES"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
        version: env!("REPO_VERSION"),
        package_version: env!("CARGO_PKG_VERSION"),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_build_info_display() {
        let info = build_info();
        let rendered = info.to_string();
        assert!(rendered.starts_with("blobdrop "));
        assert!(rendered.contains(env!("CARGO_PKG_VERSION")));
    }
}
