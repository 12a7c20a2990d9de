//! UI/Progress presentation layer
//!
//! This module handles:
//! - Progress reporting while dependencies are resolved and fetched
//! - Rendering the summary of a finished run (see [`display`])
//!
//! All progress reporting goes through the ProgressReporter trait, so dry
//! runs, verbose runs and non-terminal output can stay silent.

pub mod display;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub use display::render_summary;

/// Progress reporter trait for long-running operations
pub trait ProgressReporter {
    /// Show what is currently being worked on
    fn set_message(&mut self, message: &str);

    /// Clear the progress display after success
    fn finish(&mut self);

    /// Leave the progress display as-is after an error
    fn abandon(&mut self);
}

/// Spinner shown while a run resolves and fetches mods
pub struct InteractiveProgressReporter {
    spinner: ProgressBar,
}

impl InteractiveProgressReporter {
    pub fn new(message: &str) -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self { spinner }
    }
}

impl ProgressReporter for InteractiveProgressReporter {
    fn set_message(&mut self, message: &str) {
        self.spinner.set_message(message.to_string());
    }

    fn finish(&mut self) {
        self.spinner.finish_and_clear();
    }

    fn abandon(&mut self) {
        self.spinner.abandon();
    }
}

/// No-op reporter for verbose logging or non-terminal output
#[derive(Default)]
pub struct SilentProgressReporter;

impl ProgressReporter for SilentProgressReporter {
    fn set_message(&mut self, _message: &str) {}

    fn finish(&mut self) {}

    fn abandon(&mut self) {}
}

/// Reporter for the current terminal: a spinner on a TTY unless `quiet`
pub fn progress_reporter(message: &str, quiet: bool) -> Box<dyn ProgressReporter> {
    if quiet || !console::Term::stderr().is_term() {
        Box::new(SilentProgressReporter)
    } else {
        Box::new(InteractiveProgressReporter::new(message))
    }
}
