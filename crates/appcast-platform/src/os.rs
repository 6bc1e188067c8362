use std::fmt;

use serde::{Deserialize, Serialize};

/// Operating system an update artifact targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    Windows,
    MacOs,
    Linux,
}

impl OperatingSystem {
    /// The operating system this binary was compiled for.
    ///
    /// Unknown unix flavours are treated as Linux.
    #[must_use]
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Linux
        }
    }

    /// Lower-case tags that identify this OS in a manifest's `os` field.
    #[must_use]
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Windows => &["win", "windows"],
            Self::MacOs => &["mac", "macos", "osx"],
            Self::Linux => &["linux"],
        }
    }

    /// Canonical manifest tag for this OS.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::MacOs => "macos",
            Self::Linux => "linux",
        }
    }

    #[must_use]
    pub fn matches_tag(self, tag: &str) -> bool {
        let tag = tag.trim();
        self.aliases()
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(tag))
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::MacOs => "macOS",
            Self::Linux => "Linux",
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::OperatingSystem;

    #[test]
    fn matches_tag_is_case_insensitive() {
        assert!(OperatingSystem::Windows.matches_tag("WIN"));
        assert!(OperatingSystem::Windows.matches_tag("Windows"));
        assert!(OperatingSystem::MacOs.matches_tag("OSX"));
        assert!(OperatingSystem::MacOs.matches_tag(" macos "));
        assert!(OperatingSystem::Linux.matches_tag("Linux"));
    }

    #[test]
    fn matches_tag_rejects_other_platforms() {
        assert!(!OperatingSystem::Windows.matches_tag("mac"));
        assert!(!OperatingSystem::MacOs.matches_tag("linux"));
        assert!(!OperatingSystem::Linux.matches_tag("windows"));
        assert!(!OperatingSystem::Linux.matches_tag(""));
    }

    #[test]
    fn canonical_tag_matches_own_aliases() {
        for os in [
            OperatingSystem::Windows,
            OperatingSystem::MacOs,
            OperatingSystem::Linux,
        ] {
            assert!(os.matches_tag(os.tag()));
        }
    }

    #[test]
    fn current_matches_compile_target() {
        let current = OperatingSystem::current();
        if cfg!(target_os = "windows") {
            assert_eq!(current, OperatingSystem::Windows);
        } else if cfg!(target_os = "macos") {
            assert_eq!(current, OperatingSystem::MacOs);
        } else {
            assert_eq!(current, OperatingSystem::Linux);
        }
    }
}
