//! moddeps - dependency installer for git-hosted mods
//!
//! Resolves the mods a workspace requires in mod.yaml, installs them into
//! .mods/ and records the resolved tree in mod.lock.

use clap::Parser;
use console::Style;
use miette::Diagnostic;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::Session;
use moddeps::error::ModError;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "moddeps=debug" } else { "moddeps=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Print an error with its help text and, for aggregated failures, each cause
fn report_error(error: &ModError) {
    eprintln!("{} {error}", Style::new().red().bold().apply_to("Error:"));
    print_details(error, "  ");
}

fn print_details(error: &dyn Diagnostic, indent: &str) {
    if let Some(help) = error.help() {
        for line in help.to_string().lines() {
            eprintln!("{indent}{}", Style::new().dim().apply_to(line));
        }
    }
    if let Some(related) = error.related() {
        for cause in related {
            eprintln!("{indent}- {cause}");
            print_details(cause, &format!("{indent}  "));
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let session = Session {
        workspace: cli.workspace,
        verbose: cli.verbose,
        ..Session::default()
    };
    let cancel = session.cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
        tracing::warn!(error = %e, "cannot install Ctrl-C handler");
    }

    let result = match cli.command {
        Commands::Install(args) => commands::install::run(&session, args),
        Commands::Update(args) => commands::update::run(&session, args),
        Commands::Uninstall(args) => commands::uninstall::run(&session, args),
        Commands::Prune => commands::prune::run(&session),
        Commands::Completions(args) => commands::completions::run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(ModError::Cancelled) => {
            eprintln!("{}", Style::new().yellow().apply_to("Cancelled, nothing was changed"));
            ExitCode::from(130)
        }
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}
