//! Raw rsyslog attributes as supplied by the user.
//!
//! [`ConfigInput`] mirrors the `node['rsyslog'][...]` attribute namespace.
//! It is assembled once per run from defaults, an optional TOML attribute
//! file and `--set` overrides (see [`load`]), and is consumed unchanged by
//! the resolver.
pub mod overrides;
pub mod toml_loader;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;

pub use overrides::Override;

/// Syntax used for rsyslog directives in generated drop-in files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigStyle {
    /// Pre-v6 `$Directive value` syntax.
    Legacy,
    /// RainerScript `module(load="...")` syntax.
    Rainer,
}

impl fmt::Display for ConfigStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Rainer => write!(f, "rainer"),
        }
    }
}

/// User-supplied rsyslog attributes before validation.
///
/// # Examples
///
/// ```
/// use rsyslog_cookbook::config::ConfigInput;
///
/// let input = ConfigInput::default();
/// assert_eq!(input.protocol, "tcp");
/// assert!(!input.enable_tls);
/// assert!(input.config_style.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigInput {
    /// Install RELP support and load `imrelp`.
    pub use_relp: bool,
    /// Enable TLS for network transport.
    pub enable_tls: bool,
    /// CA certificate used to verify TLS peers.
    pub tls_ca_file: Option<PathBuf>,
    /// Client certificate presented to TLS peers.
    pub tls_certificate_file: Option<PathBuf>,
    /// Private key matching `tls_certificate_file`.
    pub tls_key_file: Option<PathBuf>,
    /// Netstream driver authentication mode.
    #[serde(deserialize_with = "scalar_string")]
    pub tls_auth_mode: String,
    /// Transport protocol (`tcp` or `udp`), validated by the resolver.
    #[serde(deserialize_with = "scalar_string")]
    pub protocol: String,
    /// Render the `imfile` drop-in.
    pub use_imfile: bool,
    /// `imfile` module parameters (e.g. `PollingInterval`).
    #[serde(rename = "imfile", deserialize_with = "scalar_map")]
    pub imfile_options: BTreeMap<String, String>,
    /// Explicit directive style; `None` lets the platform decide.
    pub config_style: Option<ConfigStyle>,
    /// Load `imklog` on Linux platforms.
    pub enable_imklog: bool,
    /// `$MaxMessageSize`.
    #[serde(deserialize_with = "scalar_string")]
    pub max_message_size: String,
    /// `$PreserveFQDN`.
    pub preserve_fqdn: bool,
    /// Use RFC 3339 timestamps instead of the traditional format.
    pub high_precision_timestamps: bool,
    /// `$RepeatedMsgReduction`.
    pub repeated_msg_reduction: bool,
    /// `$SystemLogRateLimitInterval` for `imuxsock`.
    pub rate_limit_interval: Option<u32>,
    /// `$SystemLogRateLimitBurst` for `imuxsock`.
    pub rate_limit_burst: Option<u32>,
    /// Drop privileges to `user`/`group` after startup.
    pub priv_separation: bool,
    /// Daemon user; owns the spool directory.
    #[serde(deserialize_with = "scalar_string")]
    pub user: String,
    /// Daemon group; owns the spool directory.
    #[serde(deserialize_with = "scalar_string")]
    pub group: String,
    /// Directory local log files are written to.
    pub default_log_dir: PathBuf,
    /// Extra `$Key value` directives appended to the main config.
    #[serde(deserialize_with = "scalar_map")]
    pub additional_directives: BTreeMap<String, String>,
}

impl Default for ConfigInput {
    fn default() -> Self {
        Self {
            use_relp: false,
            enable_tls: false,
            tls_ca_file: None,
            tls_certificate_file: None,
            tls_key_file: None,
            tls_auth_mode: "anon".to_string(),
            protocol: "tcp".to_string(),
            use_imfile: false,
            imfile_options: BTreeMap::new(),
            config_style: None,
            enable_imklog: true,
            max_message_size: "2k".to_string(),
            preserve_fqdn: false,
            high_precision_timestamps: false,
            repeated_msg_reduction: true,
            rate_limit_interval: None,
            rate_limit_burst: None,
            priv_separation: false,
            user: "syslog".to_string(),
            group: "adm".to_string(),
            default_log_dir: PathBuf::from("/var/log"),
            additional_directives: BTreeMap::new(),
        }
    }
}

/// A TOML scalar accepted as a module parameter or directive value.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", if *b { "on" } else { "off" }),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Deserialize a single scalar into a string, so `max_message_size = 4096`
/// and `user = 1000` are accepted.
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Scalar::deserialize(deserializer).map(|v| v.to_string())
}

/// Deserialize a table of scalars into strings, so `PollingInterval = 10`
/// and `PollingInterval = "10"` are equivalent.
fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, Scalar> = BTreeMap::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(k, v)| (k, v.to_string())).collect())
}

/// Assemble the attributes for one run.
///
/// Reads the `[rsyslog]` table of the TOML file at `path` (if given and
/// present), applies `overrides` on top, and fills every remaining field
/// from [`ConfigInput::default`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or the merged attributes do
/// not deserialize.
pub fn load(path: Option<&Path>, overrides: &[Override]) -> Result<ConfigInput, ConfigError> {
    let mut document = match path {
        Some(p) => toml_loader::load_table(p)?,
        None => toml::Table::new(),
    };

    let mut attributes = match document.remove("rsyslog") {
        Some(toml::Value::Table(table)) => table,
        Some(_) => {
            return Err(ConfigError::InvalidSyntax {
                file: source_label(path),
                message: "[rsyslog] must be a table".to_string(),
            });
        }
        None => toml::Table::new(),
    };

    for o in overrides {
        tracing::debug!("override {} = {}", o.key, o.value);
        o.apply(&mut attributes)?;
    }

    toml::Value::Table(attributes)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::InvalidSyntax {
            file: source_label(path),
            message: e.message().to_string(),
        })
}

fn source_label(path: Option<&Path>) -> String {
    path.map_or_else(|| "<overrides>".to_string(), |p| p.display().to_string())
}

/// Shared helpers for config unit tests.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub mod test_helpers {
    use std::path::PathBuf;

    /// Write `content` to a temporary TOML file and return the directory
    /// guard together with the file path.
    #[must_use]
    pub fn write_temp_toml(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("attributes.toml");
        std::fs::write(&path, content).expect("write attributes");
        (dir, path)
    }
}
