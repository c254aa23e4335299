//! `rsyslog-cookbook` command-line entry point.
use std::io::Write;

use anyhow::Result;
use clap::Parser;

use rsyslog_cookbook::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    logging::init_subscriber(args.verbose);
    let log = logging::Logger::new();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = match &args.command {
        cli::Command::Plan(opts) => commands::plan::run(&args.global, opts, &log, &mut out),
        cli::Command::Render(opts) => commands::render::run(&args.global, opts, &log, &mut out),
        cli::Command::Converge(opts) => {
            commands::converge::run(&args.global, opts, &log, &mut out)
        }
        cli::Command::Version => commands::version::run(&mut out),
    };
    out.flush()?;

    if let Err(e) = result {
        log.error(&format!("{e:#}"));
        std::process::exit(1);
    }
    Ok(())
}
