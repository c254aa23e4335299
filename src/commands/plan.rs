//! Command: print the resource plan.
use std::io::Write;

use anyhow::{Context as _, Result};

use super::CommandSetup;
use crate::cli::{GlobalOpts, OutputFormat, PlanOpts};
use crate::logging::Logger;
use crate::plan::{self, ActionPayload, ResourcePlan};

/// Run the plan command.
///
/// # Errors
///
/// Returns an error if resolution or plan construction fails, or output
/// cannot be written.
pub fn run(global: &GlobalOpts, opts: &PlanOpts, log: &Logger, out: &mut dyn Write) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;

    log.stage("Building resource plan");
    let plan = plan::build(&setup.config)?;
    log.info(&format!(
        "{} action(s), {} notification edge(s)",
        plan.actions.len(),
        plan.edges.len()
    ));

    match opts.format {
        OutputFormat::Text => write_text(&plan, out)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &plan).context("serializing plan")?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Human-readable listing: one line per action, then one per edge.
fn write_text(plan: &ResourcePlan, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "Actions:")?;
    for (i, action) in plan.actions.iter().enumerate() {
        let detail = match &action.payload {
            ActionPayload::Directory { spec } | ActionPayload::RenderFile { spec, .. } => {
                format!(" {} {}:{}", spec.mode_string(), spec.owner, spec.group)
            }
            ActionPayload::Execute {
                command,
                on_notify_only,
                ..
            } => {
                let when = if *on_notify_only { " (on notify)" } else { "" };
                format!(" `{command}`{when}")
            }
            _ => String::new(),
        };
        writeln!(out, "  {:>2}. {}{detail}", i + 1, action.id)?;
    }
    writeln!(out, "Notifications:")?;
    if plan.edges.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for edge in &plan.edges {
        writeln!(out, "  {edge}")?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::commands::test_helpers::global;

    fn plan_output(platform: &str, version: &str, format: OutputFormat) -> String {
        let mut out = Vec::new();
        run(
            &global(platform, version, &[]),
            &PlanOpts { format },
            &Logger::default(),
            &mut out,
        )
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn text_lists_actions_and_edges() {
        let text = plan_output("ubuntu", "16.04", OutputFormat::Text);
        assert!(text.contains("   1. package[rsyslog]"));
        assert!(text.contains("directory[/var/spool/rsyslog] 0700 syslog:adm"));
        assert!(text.contains(
            "template[/etc/rsyslog.conf] -> service_start[rsyslog] (restart, delayed)"
        ));
    }

    #[test]
    fn text_shows_notify_only_execute() {
        let text = plan_output("omnios", "151018", OutputFormat::Text);
        assert!(text.contains(
            "execute[import rsyslog manifest] `svccfg import /var/svc/manifest/system/rsyslogd.xml` (on notify)"
        ));
    }

    #[test]
    fn json_is_machine_readable() {
        let json = plan_output("centos", "5.11", OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let ids: Vec<&str> = value["actions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["id"].as_str().unwrap())
            .collect();
        assert!(ids.contains(&"service_stop[syslog]"));
        assert_eq!(value["edges"][0]["verb"], "restart");
    }
}
