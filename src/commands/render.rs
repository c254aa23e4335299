//! Command: write rendered files under an output directory.
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context as _, Result};

use super::CommandSetup;
use crate::cli::{GlobalOpts, RenderOpts};
use crate::logging::Logger;
use crate::plan::{self, ActionPayload};

/// Map an absolute host path to its location under `root`.
fn staged_path(root: &Path, path: &Path) -> PathBuf {
    let relative: PathBuf = path
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    root.join(relative)
}

/// Run the render command.
///
/// Every file the plan renders is written under `--output`, mirroring its
/// absolute path (`/etc/rsyslog.conf` -> `<output>/etc/rsyslog.conf`).
///
/// # Errors
///
/// Returns an error if resolution or plan construction fails, or a file
/// cannot be written.
pub fn run(
    global: &GlobalOpts,
    opts: &RenderOpts,
    log: &Logger,
    out: &mut dyn Write,
) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let plan = plan::build(&setup.config)?;

    log.stage(&format!("Rendering into {}", opts.output.display()));
    let mut written = 0usize;
    for action in &plan.actions {
        let ActionPayload::RenderFile { spec, content, .. } = &action.payload else {
            continue;
        };
        let target = staged_path(&opts.output, &spec.path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(&target, content)
            .with_context(|| format!("writing {}", target.display()))?;
        log.debug(&format!("{} ({} bytes)", spec.path.display(), content.len()));
        writeln!(out, "{}", target.display())?;
        written += 1;
    }
    log.info(&format!("{written} file(s) written"));
    Ok(())
}
