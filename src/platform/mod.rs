//! Host platform as installation methods name it.

use std::fmt;

/// The operating system, spelled the way the mod catalog spells it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
}

impl Platform {
    pub fn new(os: impl Into<String>) -> Self {
        Self { os: os.into() }
    }

    /// Detect the current platform
    pub fn detect() -> Self {
        Self::new(Self::detect_os())
    }

    fn detect_os() -> &'static str {
        #[cfg(target_os = "macos")]
        {
            "darwin"
        }
        #[cfg(not(target_os = "macos"))]
        {
            std::env::consts::OS
        }
    }

    /// Whether a method restricted to `platform` may run here.
    pub fn matches(&self, platform: &str) -> bool {
        self.os.eq_ignore_ascii_case(platform)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.os)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_detect() {
        let platform = Platform::detect();
        assert!(!platform.os.is_empty());
        assert_ne!(platform.os, "macos");
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_detect_linux() {
        assert_eq!(Platform::detect().os, "linux");
    }

    #[test]
    fn test_matches() {
        let platform = Platform::new("windows");
        assert!(platform.matches("windows"));
        assert!(platform.matches("Windows"));
        assert!(!platform.matches("darwin"));
        assert_eq!(platform.to_string(), "windows");
    }
}
