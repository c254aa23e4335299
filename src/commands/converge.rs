//! Command: converge a simulated host.
use std::io::Write;

use anyhow::{Context as _, Result};

use super::CommandSetup;
use crate::cli::{ConvergeOpts, GlobalOpts};
use crate::converge::{SimulatedHost, converge};
use crate::logging::Logger;
use crate::plan;

/// Run the converge command.
///
/// Builds the plan once and applies it `--passes` times to a fixture host
/// for the target platform, printing each pass report. Passes after the
/// first are expected to change nothing; a warning is logged if they do.
///
/// # Errors
///
/// Returns an error if resolution or plan construction fails, or an action
/// fails to apply.
pub fn run(
    global: &GlobalOpts,
    opts: &ConvergeOpts,
    log: &Logger,
    out: &mut dyn Write,
) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let plan = plan::build(&setup.config)?;
    let mut host = SimulatedHost::fixture(&setup.platform);

    for pass in 1..=opts.passes {
        log.stage(&format!("Converge pass {pass}"));
        let report =
            converge(&plan, &mut host).with_context(|| format!("convergence pass {pass}"))?;
        writeln!(out, "pass {pass}:")?;
        writeln!(out, "{report}")?;
        if pass > 1 && !report.is_noop() {
            log.warn(&format!("pass {pass} was not idempotent: {}", report.summary()));
        } else {
            log.info(&report.summary());
        }
    }
    Ok(())
}
