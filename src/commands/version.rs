//! Command: print version information.
use std::io::Write;

use anyhow::Result;

/// Version string: `RSYSLOG_COOKBOOK_VERSION` at build time, or the crate
/// version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("RSYSLOG_COOKBOOK_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the version to `out`.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn run(out: &mut dyn Write) -> Result<()> {
    writeln!(out, "rsyslog-cookbook {}", version())?;
    Ok(())
}
