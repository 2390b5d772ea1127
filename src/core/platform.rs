//! Build platform detection and matching
//!
//! Components and individual steps may declare the platforms they apply to.
//! The build platform is detected from the compile target plus, on Linux,
//! `/etc/os-release` (`ID` and `ID_LIKE`), and can be overridden with the
//! `--platform` CLI flag for planning builds targeting another host.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating system of the build host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Macos,
    Windows,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Macos => write!(f, "macos"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// Linux distribution family, derived from os-release identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Debian,
    Rhel,
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debian => write!(f, "debian"),
            Self::Rhel => write!(f, "rhel"),
        }
    }
}

impl OsFamily {
    /// Classify an os-release document into a distribution family.
    ///
    /// Looks at `ID` first, then `ID_LIKE`. Unrecognized distributions
    /// yield `None`; they simply match no family selector.
    pub fn from_os_release(content: &str) -> Option<Self> {
        let mut id = None;
        let mut id_like = None;
        for line in content.lines() {
            if let Some(value) = line.strip_prefix("ID=") {
                id = Some(value.trim_matches('"').to_lowercase());
            } else if let Some(value) = line.strip_prefix("ID_LIKE=") {
                id_like = Some(value.trim_matches('"').to_lowercase());
            }
        }

        let mut candidates: Vec<String> = Vec::new();
        if let Some(id) = id {
            candidates.push(id);
        }
        if let Some(like) = id_like {
            candidates.extend(like.split_whitespace().map(String::from));
        }

        for candidate in &candidates {
            match candidate.as_str() {
                "debian" | "ubuntu" => return Some(Self::Debian),
                "rhel" | "centos" | "fedora" | "rocky" | "almalinux" | "amzn" => {
                    return Some(Self::Rhel);
                }
                _ => {}
            }
        }
        None
    }
}

/// A single platform selector as written in a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformSelector {
    /// Any Linux host
    Linux,
    /// Any macOS host
    Macos,
    /// Any Windows host
    Windows,
    /// Linux hosts of the Debian family (Debian, Ubuntu, ...)
    Debian,
    /// Linux hosts of the RHEL family (RHEL, CentOS, Fedora, ...)
    Rhel,
}

impl PlatformSelector {
    /// Parse a selector keyword from descriptor text
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linux" => Some(Self::Linux),
            "macos" => Some(Self::Macos),
            "windows" => Some(Self::Windows),
            "debian" => Some(Self::Debian),
            "rhel" => Some(Self::Rhel),
            _ => None,
        }
    }

    /// Keyword form used in descriptors and diagnostics
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::Windows => "windows",
            Self::Debian => "debian",
            Self::Rhel => "rhel",
        }
    }
}

impl fmt::Display for PlatformSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An ordered list of selectors; matches when any selector matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformGuard(pub Vec<PlatformSelector>);

impl PlatformGuard {
    /// True when any selector in the guard matches `platform`
    pub fn matches(&self, platform: &BuildPlatform) -> bool {
        self.0.iter().any(|selector| platform.matches(*selector))
    }
}

/// The platform a build runs on (or is planned for)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlatform {
    /// Operating system
    pub os: Os,

    /// Linux distribution family, when one could be determined
    #[serde(default)]
    pub family: Option<OsFamily>,
}

impl BuildPlatform {
    /// Detect the platform of the current host
    pub fn detect() -> Self {
        let os = if cfg!(target_os = "macos") {
            Os::Macos
        } else if cfg!(target_os = "windows") {
            Os::Windows
        } else {
            Os::Linux
        };

        let family = if os == Os::Linux {
            std::fs::read_to_string("/etc/os-release")
                .ok()
                .and_then(|content| OsFamily::from_os_release(&content))
        } else {
            None
        };

        Self { os, family }
    }

    /// Parse a `--platform` override.
    ///
    /// Family keywords imply Linux, so `--platform debian` plans a build
    /// for a Debian-family Linux host.
    pub fn parse(s: &str) -> Option<Self> {
        match PlatformSelector::parse(s)? {
            PlatformSelector::Linux => Some(Self {
                os: Os::Linux,
                family: None,
            }),
            PlatformSelector::Macos => Some(Self {
                os: Os::Macos,
                family: None,
            }),
            PlatformSelector::Windows => Some(Self {
                os: Os::Windows,
                family: None,
            }),
            PlatformSelector::Debian => Some(Self {
                os: Os::Linux,
                family: Some(OsFamily::Debian),
            }),
            PlatformSelector::Rhel => Some(Self {
                os: Os::Linux,
                family: Some(OsFamily::Rhel),
            }),
        }
    }

    /// True when this platform satisfies a single selector
    pub fn matches(&self, selector: PlatformSelector) -> bool {
        match selector {
            PlatformSelector::Linux => self.os == Os::Linux,
            PlatformSelector::Macos => self.os == Os::Macos,
            PlatformSelector::Windows => self.os == Os::Windows,
            PlatformSelector::Debian => {
                self.os == Os::Linux && self.family == Some(OsFamily::Debian)
            }
            PlatformSelector::Rhel => self.os == Os::Linux && self.family == Some(OsFamily::Rhel),
        }
    }

    /// Value of the `platform_family` context variable
    pub fn family_label(&self) -> String {
        match self.family {
            Some(family) => family.to_string(),
            None => self.os.to_string(),
        }
    }
}

impl fmt::Display for BuildPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.family {
            Some(family) => write!(f, "{} ({family})", self.os),
            None => write!(f, "{}", self.os),
        }
    }
}
