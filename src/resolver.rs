//! Attribute resolution: raw attributes + platform -> validated configuration.
//!
//! [`resolve`] is a pure function. Everything that differs between platforms
//! (paths, module list, service names, default routing rules) comes from the
//! [`FamilyRules`] table keyed on [`PlatformFamily`]; the only fatal check is
//! the TLS/protocol combination.
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{ConfigInput, ConfigStyle};
use crate::error::ValidationError;
use crate::platform::{PlatformFamily, PlatformProfile};

/// Spool directory used for queue files on every platform.
pub const SPOOL_DIR: &str = "/var/spool/rsyslog";

/// Package providing the daemon.
pub const RSYSLOG_PACKAGE: &str = "rsyslog";

/// Package providing the RELP input/output modules.
pub const RELP_PACKAGE: &str = "rsyslog-relp";

/// Package providing the GnuTLS netstream driver.
pub const TLS_PACKAGE: &str = "rsyslog-gnutls";

/// Location of the custom SMF manifest on OmniOS.
pub const SMF_MANIFEST: &str = "/var/svc/manifest/system/rsyslogd.xml";

/// Network transport for forwarded messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Stream transport; required for TLS.
    Tcp,
    /// Datagram transport.
    Udp,
}

impl Protocol {
    /// Parse a protocol attribute value (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnsupportedProtocol`] for anything other
    /// than `tcp` or `udp`.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            _ => Err(ValidationError::UnsupportedProtocol(value.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
        }
    }
}

/// Which boilerplate routing rules go into `50-default.conf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultRules {
    /// Debian layout (`/var/log/syslog`, `mail.log`, ...).
    Debian,
    /// RHEL layout (`/var/log/messages`, `maillog`, ...).
    Rhel,
    /// Solaris-style layout routing to `/var/adm/messages`.
    Solaris,
}

/// What to do with a syslog daemon that rsyslog replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Displacement {
    /// Stop the service, then disable it.
    StopAndDisable,
    /// Disable the service (SMF disable also stops it).
    Disable,
}

/// A pre-existing service that must be shut off so rsyslog owns the log socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplacedService {
    /// Service name.
    pub name: String,
    /// Actions to take on it.
    pub displacement: Displacement,
}

/// TLS netstream settings, present only when TLS is fully configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TlsSettings {
    /// CA certificate file.
    pub ca_file: PathBuf,
    /// Client certificate file.
    pub certificate_file: Option<PathBuf>,
    /// Client key file.
    pub key_file: Option<PathBuf>,
    /// Netstream driver authentication mode.
    pub auth_mode: String,
}

/// Global daemon directives rendered into the main config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalDirectives {
    /// `$MaxMessageSize`.
    pub max_message_size: String,
    /// `$PreserveFQDN`.
    pub preserve_fqdn: bool,
    /// RFC 3339 timestamps.
    pub high_precision_timestamps: bool,
    /// `$RepeatedMsgReduction`.
    pub repeated_msg_reduction: bool,
    /// `$SystemLogRateLimitInterval`.
    pub rate_limit_interval: Option<u32>,
    /// `$SystemLogRateLimitBurst`.
    pub rate_limit_burst: Option<u32>,
    /// Drop privileges to this user/group after startup.
    pub priv_drop: Option<PrivDrop>,
    /// Additional `$Key value` directives.
    pub additional: BTreeMap<String, String>,
}

/// Target identity for `$PrivDropToUser` / `$PrivDropToGroup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrivDrop {
    /// User name.
    pub user: String,
    /// Group name.
    pub group: String,
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    /// Target platform.
    pub platform: PlatformProfile,
    /// Daemon package.
    pub package: String,
    /// Drop-in directory.
    pub conf_dir: PathBuf,
    /// Main config file.
    pub conf_file: PathBuf,
    /// `50-default.conf` drop-in.
    pub default_conf_file: PathBuf,
    /// `35-imfile.conf` drop-in.
    pub imfile_conf_file: PathBuf,
    /// Work/queue directory.
    pub spool_dir: PathBuf,
    /// Owner of the spool directory.
    pub spool_owner: String,
    /// Group of the spool directory.
    pub spool_group: String,
    /// Primary service managed by this run.
    pub service_name: String,
    /// Services rsyslog replaces.
    pub displaced_services: Vec<DisplacedService>,
    /// Modules loaded by the main config, in directive order.
    pub modules: Vec<String>,
    /// TLS driver package, when TLS is fully configured.
    pub tls_package: Option<String>,
    /// RELP package, when RELP is enabled.
    pub relp_package: Option<String>,
    /// Directive style attribute after platform defaulting; `None` when
    /// neither the user nor the platform picked one.
    pub config_style: Option<ConfigStyle>,
    /// Effective style for the `imfile` drop-in.
    pub imfile_style: ConfigStyle,
    /// Whether the `imfile` drop-in is rendered.
    pub use_imfile: bool,
    /// `imfile` module parameters.
    pub imfile_options: BTreeMap<String, String>,
    /// Network transport.
    pub protocol: Protocol,
    /// TLS settings.
    pub tls: Option<TlsSettings>,
    /// Custom SMF manifest path (OmniOS only).
    pub smf_manifest: Option<PathBuf>,
    /// Variant of the default routing rules.
    pub default_rules: DefaultRules,
    /// Directory local log files are written to.
    pub default_log_dir: PathBuf,
    /// Global daemon directives.
    pub globals: GlobalDirectives,
}

/// Per-family rule table entry.
#[derive(Debug)]
struct FamilyRules {
    /// Prefix under which `rsyslog.conf` and `rsyslog.d` live.
    conf_prefix: &'static str,
    /// Modules always loaded by the main config.
    modules: &'static [&'static str],
    /// Whether `imklog` belongs to the module list (kernel log on Linux).
    kernel_log: bool,
    service_name: &'static str,
    default_rules: DefaultRules,
    /// Pre-existing SMF service to disable.
    smf_system_log: bool,
    smf_manifest: bool,
}

const LINUX_MODULES: &[&str] = &["imuxsock", "imklog"];
const SOLARIS_MODULES: &[&str] = &["immark", "imsolaris", "imtcp", "imudp"];

const DEBIAN_RULES: FamilyRules = FamilyRules {
    conf_prefix: "/etc",
    modules: LINUX_MODULES,
    kernel_log: true,
    service_name: "rsyslog",
    default_rules: DefaultRules::Debian,
    smf_system_log: false,
    smf_manifest: false,
};

const RHEL_RULES: FamilyRules = FamilyRules {
    default_rules: DefaultRules::Rhel,
    ..DEBIAN_RULES
};

const SMARTOS_RULES: FamilyRules = FamilyRules {
    conf_prefix: "/opt/local/etc",
    modules: SOLARIS_MODULES,
    kernel_log: false,
    service_name: "rsyslog",
    default_rules: DefaultRules::Solaris,
    smf_system_log: true,
    smf_manifest: false,
};

const ILLUMOS_RULES: FamilyRules = FamilyRules {
    service_name: "system/rsyslogd",
    smf_manifest: true,
    ..SMARTOS_RULES
};

const fn rules_for(family: PlatformFamily) -> &'static FamilyRules {
    match family {
        PlatformFamily::Debian => &DEBIAN_RULES,
        PlatformFamily::Rhel => &RHEL_RULES,
        PlatformFamily::SmartOs => &SMARTOS_RULES,
        PlatformFamily::Illumos => &ILLUMOS_RULES,
    }
}

/// Platform default for the `config_style` attribute.
///
/// RHEL 6 and older ship rsyslog 5, which predates RainerScript module
/// parameters. Only platforms versioned by RHEL release are affected.
#[must_use]
pub fn default_config_style(platform: &PlatformProfile) -> Option<ConfigStyle> {
    platform
        .rhel_release()
        .is_some_and(|major| major <= 6)
        .then_some(ConfigStyle::Legacy)
}

/// Resolve raw attributes for `platform` into a validated configuration.
///
/// # Errors
///
/// - [`ValidationError::UnsupportedProtocol`] if `protocol` is not `tcp`/`udp`.
/// - [`ValidationError::IncompatibleProtocol`] if TLS is enabled with a CA
///   file while the protocol is not `tcp`.
///
/// # Examples
///
/// ```
/// use rsyslog_cookbook::config::ConfigInput;
/// use rsyslog_cookbook::platform::PlatformProfile;
/// use rsyslog_cookbook::resolver::resolve;
///
/// let ubuntu = PlatformProfile::new("ubuntu", "16.04").unwrap();
/// let resolved = resolve(&ConfigInput::default(), &ubuntu).unwrap();
/// assert_eq!(resolved.conf_dir.to_str(), Some("/etc/rsyslog.d"));
/// assert_eq!(resolved.modules, ["imuxsock", "imklog"]);
/// ```
pub fn resolve(
    input: &ConfigInput,
    platform: &PlatformProfile,
) -> Result<ResolvedConfig, ValidationError> {
    let protocol = Protocol::parse(&input.protocol)?;
    let tls = resolve_tls(input, protocol)?;
    let rules = rules_for(platform.family);

    let conf_prefix = Path::new(rules.conf_prefix);
    let conf_dir = conf_prefix.join("rsyslog.d");

    let config_style = input.config_style.or_else(|| default_config_style(platform));
    let imfile_style = config_style.unwrap_or(ConfigStyle::Rainer);
    tracing::debug!(
        "config_style={} imfile_style={imfile_style}",
        config_style.map_or_else(|| "nil".to_string(), |s| s.to_string())
    );

    let resolved = ResolvedConfig {
        platform: platform.clone(),
        package: RSYSLOG_PACKAGE.to_string(),
        conf_file: conf_prefix.join("rsyslog.conf"),
        default_conf_file: conf_dir.join("50-default.conf"),
        imfile_conf_file: conf_dir.join("35-imfile.conf"),
        conf_dir,
        spool_dir: PathBuf::from(SPOOL_DIR),
        spool_owner: input.user.clone(),
        spool_group: input.group.clone(),
        service_name: rules.service_name.to_string(),
        displaced_services: displaced_services(platform, rules),
        modules: modules(input, rules),
        tls_package: tls.as_ref().map(|_| TLS_PACKAGE.to_string()),
        relp_package: input.use_relp.then(|| RELP_PACKAGE.to_string()),
        config_style,
        imfile_style,
        use_imfile: input.use_imfile,
        imfile_options: input.imfile_options.clone(),
        protocol,
        tls,
        smf_manifest: rules.smf_manifest.then(|| PathBuf::from(SMF_MANIFEST)),
        default_rules: rules.default_rules,
        default_log_dir: input.default_log_dir.clone(),
        globals: GlobalDirectives {
            max_message_size: input.max_message_size.clone(),
            preserve_fqdn: input.preserve_fqdn,
            high_precision_timestamps: input.high_precision_timestamps,
            repeated_msg_reduction: input.repeated_msg_reduction,
            rate_limit_interval: input.rate_limit_interval,
            rate_limit_burst: input.rate_limit_burst,
            priv_drop: input.priv_separation.then(|| PrivDrop {
                user: input.user.clone(),
                group: input.group.clone(),
            }),
            additional: input.additional_directives.clone(),
        },
    };

    tracing::debug!(
        "resolved {} for {platform}: {} module(s), service {}",
        resolved.conf_file.display(),
        resolved.modules.len(),
        resolved.service_name
    );
    Ok(resolved)
}

/// Apply the TLS rules: a CA file is what turns TLS on, and TLS needs TCP.
fn resolve_tls(
    input: &ConfigInput,
    protocol: Protocol,
) -> Result<Option<TlsSettings>, ValidationError> {
    if !input.enable_tls {
        return Ok(None);
    }

    let ca_file = match &input.tls_ca_file {
        Some(p) if p.as_os_str().is_empty() => {
            tracing::warn!("tls_ca_file is empty; treating it as unset");
            None
        }
        other => other.clone(),
    };

    let Some(ca_file) = ca_file else {
        tracing::debug!("enable_tls is set without tls_ca_file; TLS driver not configured");
        return Ok(None);
    };

    if protocol != Protocol::Tcp {
        return Err(ValidationError::IncompatibleProtocol {
            protocol: protocol.to_string(),
            ca_file,
        });
    }

    Ok(Some(TlsSettings {
        ca_file,
        certificate_file: input.tls_certificate_file.clone(),
        key_file: input.tls_key_file.clone(),
        auth_mode: input.tls_auth_mode.clone(),
    }))
}

fn modules(input: &ConfigInput, rules: &FamilyRules) -> Vec<String> {
    let mut modules: Vec<String> = rules
        .modules
        .iter()
        .filter(|m| !(rules.kernel_log && **m == "imklog" && !input.enable_imklog))
        .map(ToString::to_string)
        .collect();
    if input.use_relp {
        modules.push("imrelp".to_string());
    }
    modules
}

fn displaced_services(platform: &PlatformProfile, rules: &FamilyRules) -> Vec<DisplacedService> {
    let mut services = Vec::new();
    if platform.rhel_release() == Some(5) {
        services.push(DisplacedService {
            name: "syslog".to_string(),
            displacement: Displacement::StopAndDisable,
        });
    }
    if rules.smf_system_log {
        services.push(DisplacedService {
            name: "system-log".to_string(),
            displacement: Displacement::Disable,
        });
    }
    services
}
