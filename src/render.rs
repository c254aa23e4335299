//! Config file rendering through embedded handlebars templates.
use std::collections::BTreeMap;
use std::fmt;

use handlebars::Handlebars;
use serde::Serialize;

use crate::config::ConfigStyle;
use crate::error::RenderError;
use crate::resolver::{DefaultRules, ResolvedConfig};

const MAIN_CONFIG: &str = include_str!("../templates/rsyslog.conf.hbs");
const DEFAULT_DEBIAN: &str = include_str!("../templates/50-default.conf.debian.hbs");
const DEFAULT_RHEL: &str = include_str!("../templates/50-default.conf.rhel.hbs");
const DEFAULT_SOLARIS: &str = include_str!("../templates/50-default.conf.solaris.hbs");
const IMFILE: &str = include_str!("../templates/35-imfile.conf.hbs");
const SMF_MANIFEST: &str = include_str!("../templates/rsyslogd.xml.hbs");

/// A template shipped with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// Main `rsyslog.conf`.
    MainConfig,
    /// `50-default.conf` routing rules for the given layout.
    DefaultRules(DefaultRules),
    /// `35-imfile.conf` drop-in.
    Imfile,
    /// OmniOS SMF manifest.
    SmfManifest,
}

impl Template {
    /// Every template, in registration order.
    pub const ALL: [Self; 6] = [
        Self::MainConfig,
        Self::DefaultRules(DefaultRules::Debian),
        Self::DefaultRules(DefaultRules::Rhel),
        Self::DefaultRules(DefaultRules::Solaris),
        Self::Imfile,
        Self::SmfManifest,
    ];

    /// Registry name of the template.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MainConfig => "rsyslog.conf",
            Self::DefaultRules(DefaultRules::Debian) => "50-default.conf.debian",
            Self::DefaultRules(DefaultRules::Rhel) => "50-default.conf.rhel",
            Self::DefaultRules(DefaultRules::Solaris) => "50-default.conf.solaris",
            Self::Imfile => "35-imfile.conf",
            Self::SmfManifest => "rsyslogd.xml",
        }
    }

    const fn source(self) -> &'static str {
        match self {
            Self::MainConfig => MAIN_CONFIG,
            Self::DefaultRules(DefaultRules::Debian) => DEFAULT_DEBIAN,
            Self::DefaultRules(DefaultRules::Rhel) => DEFAULT_RHEL,
            Self::DefaultRules(DefaultRules::Solaris) => DEFAULT_SOLARIS,
            Self::Imfile => IMFILE,
            Self::SmfManifest => SMF_MANIFEST,
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Data handed to templates: the resolved configuration plus a few values
/// that handlebars cannot derive on its own.
#[derive(Debug, Serialize)]
struct TemplateContext<'a> {
    #[serde(flatten)]
    config: &'a ResolvedConfig,
    legacy_style: bool,
    /// `imfile` parameters with values escaped for RainerScript strings.
    imfile_params: BTreeMap<&'a str, String>,
    // Stringified so that an interval of 0 still renders.
    rate_limit_interval: Option<String>,
    rate_limit_burst: Option<String>,
}

impl<'a> TemplateContext<'a> {
    fn new(config: &'a ResolvedConfig) -> Self {
        Self {
            config,
            legacy_style: config.imfile_style == ConfigStyle::Legacy,
            imfile_params: config
                .imfile_options
                .iter()
                .map(|(k, v)| (k.as_str(), rainer_string(v)))
                .collect(),
            rate_limit_interval: config.globals.rate_limit_interval.map(|v| v.to_string()),
            rate_limit_burst: config.globals.rate_limit_burst.map(|v| v.to_string()),
        }
    }
}

/// Escape `value` for use inside a double-quoted RainerScript string.
fn rainer_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '"') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Template registry with every embedded template compiled.
pub struct Renderer {
    registry: Handlebars<'static>,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("templates", &Template::ALL.len())
            .finish()
    }
}

impl Renderer {
    /// Compile all embedded templates.
    ///
    /// Output is config text, not HTML, so escaping is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Template`] if a template fails to compile.
    pub fn new() -> Result<Self, RenderError> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        for template in Template::ALL {
            registry
                .register_template_string(template.name(), template.source())
                .map_err(|e| RenderError::Template {
                    name: template.name().to_string(),
                    source: Box::new(e),
                })?;
        }
        Ok(Self { registry })
    }

    /// Render `template` against `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Render`] if rendering fails.
    pub fn render(&self, template: Template, config: &ResolvedConfig) -> Result<String, RenderError> {
        self.registry
            .render(template.name(), &TemplateContext::new(config))
            .map_err(|e| RenderError::Render {
                name: template.name().to_string(),
                source: Box::new(e),
            })
    }
}
