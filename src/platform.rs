//! Target platform identity: family, distribution name and version.
use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::error::PlatformError;

/// Operating system family a target host belongs to.
///
/// Every per-platform rule in the resolver is keyed on this closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformFamily {
    /// Debian-like distributions (Debian, Ubuntu, Mint, Raspbian).
    Debian,
    /// RHEL-like distributions (CentOS, RHEL, Scientific, Oracle, Amazon, Fedora).
    Rhel,
    /// Joyent SmartOS.
    SmartOs,
    /// Other illumos distributions (OmniOS).
    Illumos,
}

impl PlatformFamily {
    /// Map a platform name as reported by host inspection to its family.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Unsupported`] for names outside the supported
    /// families.
    pub fn from_platform_name(name: &str) -> Result<Self, PlatformError> {
        match name.to_ascii_lowercase().as_str() {
            "debian" | "ubuntu" | "linuxmint" | "raspbian" => Ok(Self::Debian),
            "centos" | "redhat" | "rhel" | "scientific" | "oracle" | "amazon" | "fedora"
            | "almalinux" | "rocky" => Ok(Self::Rhel),
            "smartos" => Ok(Self::SmartOs),
            "omnios" => Ok(Self::Illumos),
            _ => Err(PlatformError::Unsupported {
                platform: name.to_string(),
            }),
        }
    }

    /// Whether this family manages services through SMF.
    #[must_use]
    pub const fn uses_smf(self) -> bool {
        matches!(self, Self::SmartOs | Self::Illumos)
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debian => write!(f, "debian"),
            Self::Rhel => write!(f, "rhel"),
            Self::SmartOs => write!(f, "smartos"),
            Self::Illumos => write!(f, "illumos"),
        }
    }
}

/// A dotted numeric platform version such as `16.04`, `5.11` or `151018`.
///
/// Ordering compares components numerically, with missing trailing
/// components treated as zero (`6` == `6.0`).
#[derive(Debug, Clone, Eq, Serialize)]
#[serde(into = "String")]
pub struct PlatformVersion {
    raw: String,
    components: Vec<u64>,
}

impl PlatformVersion {
    /// Parse a version token.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::InvalidVersion`] if the token is empty or any
    /// dot-separated component is not a decimal number.
    pub fn parse(token: &str) -> Result<Self, PlatformError> {
        let trimmed = token.trim();
        let invalid = || PlatformError::InvalidVersion {
            version: token.to_string(),
        };
        if trimmed.is_empty() {
            return Err(invalid());
        }
        let components = trimmed
            .split('.')
            .map(|part| part.parse::<u64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            raw: trimmed.to_string(),
            components,
        })
    }

    /// Leading version component (`6` for `6.9`).
    #[must_use]
    pub fn major(&self) -> u64 {
        self.components.first().copied().unwrap_or(0)
    }

    /// The version exactly as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for PlatformVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for PlatformVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PlatformVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| {
                let a = self.components.get(i).copied().unwrap_or(0);
                let b = other.components.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<PlatformVersion> for String {
    fn from(version: PlatformVersion) -> Self {
        version.raw
    }
}

/// Platform names whose version numbers follow Red Hat Enterprise Linux
/// releases. Amazon Linux and Fedora number their releases independently.
const RHEL_VERSIONED: &[&str] = &[
    "centos",
    "redhat",
    "rhel",
    "scientific",
    "oracle",
    "almalinux",
    "rocky",
];

/// Identity of the host being converged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformProfile {
    /// Family the platform belongs to.
    pub family: PlatformFamily,
    /// Platform name as reported by the host (e.g. `ubuntu`, `centos`).
    pub name: String,
    /// Platform version.
    pub version: PlatformVersion,
}

impl PlatformProfile {
    /// Build a profile from a platform name and version token.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform name is not supported or the version
    /// cannot be parsed.
    pub fn new(name: &str, version: &str) -> Result<Self, PlatformError> {
        Ok(Self {
            family: PlatformFamily::from_platform_name(name)?,
            name: name.to_ascii_lowercase(),
            version: PlatformVersion::parse(version)?,
        })
    }

    /// Major component of the platform version.
    #[must_use]
    pub fn major_version(&self) -> u64 {
        self.version.major()
    }

    /// Major RHEL release this platform tracks, or `None` when its version
    /// is not a RHEL release number (non-RHEL families, Amazon, Fedora).
    #[must_use]
    pub fn rhel_release(&self) -> Option<u64> {
        (self.family == PlatformFamily::Rhel && RHEL_VERSIONED.contains(&self.name.as_str()))
            .then(|| self.major_version())
    }
}

impl fmt::Display for PlatformProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.name, self.version, self.family)
    }
}
