//! rsyslog cookbook engine.
//!
//! Decides how the rsyslog daemon is installed, configured and managed on
//! Debian-like, RHEL-like, SmartOS and OmniOS hosts, and converges a host
//! to that decision.
//!
//! The public API is organised into layers:
//!
//! - **[`platform`]**: target platform identity (family, name, version)
//! - **[`config`]**: raw attributes from defaults, a TOML file and overrides
//! - **[`resolver`]**: attributes + platform -> validated [`resolver::ResolvedConfig`]
//! - **[`render`]**: embedded handlebars templates for every managed file
//! - **[`plan`]**: ordered resource actions and notification edges
//! - **[`converge`]**: apply a plan through a [`converge::Provider`]
//! - **[`commands`]**: top-level subcommand orchestration (`plan`, `render`, `converge`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod converge;
pub mod error;
pub mod logging;
pub mod plan;
pub mod platform;
pub mod render;
pub mod resolver;
