//! Domain-specific error types for the rsyslog cookbook engine.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Library modules return typed errors (e.g., [`ValidationError`],
//! [`PlanError`]) while command handlers at the CLI boundary convert them to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! CookbookError
//! ├── Config(ConfigError)         : attribute file I/O and parsing, overrides
//! ├── Platform(PlatformError)     : unknown platform name or version token
//! ├── Validation(ValidationError) : fatal attribute combinations
//! ├── Render(RenderError)         : template registration and rendering
//! ├── Plan(PlanError)             : resource graph invariant violations
//! └── Apply(ApplyError)           : provider failures during convergence
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the cookbook engine.
///
/// Aggregates the per-layer errors and is convertible to [`anyhow::Error`]
/// for use at CLI command boundaries.
#[derive(Error, Debug)]
pub enum CookbookError {
    /// Attribute loading error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Platform identification error.
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Attribute validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Template rendering error.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Resource plan construction error.
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    /// Convergence error reported by a provider.
    #[error("Apply error: {0}")]
    Apply(#[from] ApplyError),
}

/// Errors that arise while loading attributes.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading the attribute file.
    #[error("IO error reading attribute file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The attribute file is not valid TOML or has fields of the wrong type.
    #[error("Invalid attributes in {file}: {message}")]
    InvalidSyntax {
        /// File (or override) that failed to parse.
        file: String,
        /// Parser message.
        message: String,
    },

    /// A `--set` override is not of the form `key=value`.
    #[error("Invalid override '{0}': expected key=value")]
    InvalidOverride(String),
}

/// Errors that arise when identifying the target platform.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The platform name is not part of any supported family.
    #[error("Platform '{platform}' is not supported")]
    Unsupported {
        /// Platform name as given.
        platform: String,
    },

    /// The platform version is not a dotted numeric token.
    #[error("Invalid platform version '{version}'")]
    InvalidVersion {
        /// Version token as given.
        version: String,
    },
}

/// Fatal attribute combinations detected before any resource is built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// TLS with a CA file was requested over a transport other than TCP.
    #[error(
        "TLS is enabled with CA file {} but protocol is '{protocol}'; TLS transport requires protocol 'tcp'",
        ca_file.display()
    )]
    IncompatibleProtocol {
        /// The configured (non-TCP) protocol.
        protocol: String,
        /// The configured CA file.
        ca_file: PathBuf,
    },

    /// The protocol attribute is neither `tcp` nor `udp`.
    #[error("Unsupported protocol '{0}': must be one of tcp, udp")]
    UnsupportedProtocol(String),
}

/// Errors raised by the template engine.
#[derive(Error, Debug)]
pub enum RenderError {
    /// An embedded template failed to compile.
    #[error("Template '{name}' is invalid: {source}")]
    Template {
        /// Template name.
        name: String,
        /// Underlying template error.
        source: Box<handlebars::TemplateError>,
    },

    /// Rendering a template against the resolved configuration failed.
    #[error("Rendering '{name}' failed: {source}")]
    Render {
        /// Template name.
        name: String,
        /// Underlying render error.
        source: Box<handlebars::RenderError>,
    },
}

/// Violations of the resource plan invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Two actions share the same identifier.
    #[error("Duplicate action '{0}'")]
    DuplicateAction(String),

    /// A notification edge references an action that is not in the plan.
    #[error("Notification from '{source_id}' references unknown action '{target}'")]
    UnknownAction {
        /// Identifier of the notifying action.
        source_id: String,
        /// Identifier that could not be found.
        target: String,
    },

    /// A notification edge targets an action listed before its source.
    #[error("Notification from '{source_id}' targets earlier action '{target}'")]
    BackwardEdge {
        /// Identifier of the notifying action.
        source_id: String,
        /// Identifier of the earlier target.
        target: String,
    },

    /// The notification graph contains a cycle.
    #[error("Notification cycle detected")]
    Cycle,

    /// A rendered file could not be produced.
    #[error("Could not render {path}: {reason}")]
    Render {
        /// Destination path of the file.
        path: String,
        /// Rendering failure.
        reason: String,
    },
}

/// Failures reported while applying a plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// The provider could not bring an action to its desired state.
    #[error("Action '{action}' failed: {reason}")]
    ActionFailed {
        /// Identifier of the failing action.
        action: String,
        /// Provider message.
        reason: String,
    },

    /// A notification verb is not meaningful for the notified action.
    #[error("Action '{action}' cannot be notified to {verb}")]
    UnsupportedNotification {
        /// Identifier of the notified action.
        action: String,
        /// Requested verb.
        verb: String,
    },
}
