//! Subcommand orchestration.
pub mod converge;
pub mod plan;
pub mod render;
pub mod version;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CookbookError;
use crate::logging::Logger;
use crate::platform::PlatformProfile;
use crate::resolver::{self, ResolvedConfig};

/// Shared state produced by the common command setup sequence.
///
/// Identifies the platform, loads attributes and resolves them, so each
/// command starts from a validated [`ResolvedConfig`].
#[derive(Debug)]
pub struct CommandSetup {
    /// Target platform.
    pub platform: PlatformProfile,
    /// Resolved configuration.
    pub config: ResolvedConfig,
}

impl CommandSetup {
    /// Identify the platform, load attributes and resolve them.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform is unsupported, the attribute file
    /// cannot be loaded, or the attributes fail validation.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        log.stage("Identifying target platform");
        let platform = PlatformProfile::new(&global.platform, &global.platform_version)
            .context("identifying target platform")?;
        log.info(&format!("platform: {platform}"));

        log.stage("Loading attributes");
        let input = config::load(global.attributes.as_deref(), &global.overrides)
            .context("loading attributes")?;
        if let Some(path) = &global.attributes {
            log.debug(&format!("attribute file: {}", path.display()));
        }
        log.debug(&format!("{} override(s)", global.overrides.len()));

        log.stage("Resolving attributes");
        let config = resolver::resolve(&input, &platform).map_err(CookbookError::from)?;
        log.info(&format!(
            "{} module(s), service {}",
            config.modules.len(),
            config.service_name
        ));
        if let Some(style) = config.config_style {
            log.debug(&format!("config style: {style}"));
        }

        Ok(Self { platform, config })
    }
}
