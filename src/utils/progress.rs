//! Progress reporting over feed entries.
//!
//! Wraps an `indicatif` bar on stderr. A quiet reporter still counts, so the
//! pipeline can use the same calls whether or not anything is drawn.
//!
//! While a drawn bar is active, log lines written through
//! [`ProgressAwareStderr`] are printed above it instead of through it.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

static ACTIVE_BAR: Mutex<Option<ProgressBar>> = Mutex::new(None);

fn set_active_bar(bar: Option<ProgressBar>) {
    if let Ok(mut active) = ACTIVE_BAR.lock() {
        *active = bar;
    }
}

fn active_bar() -> Option<ProgressBar> {
    ACTIVE_BAR.lock().ok().and_then(|active| active.clone())
}

const TEMPLATE: &str = "{spinner:.cyan} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}";

/// Progress reporter with optional terminal output
#[derive(Clone)]
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("position", &self.bar.position())
            .field("length", &self.bar.length())
            .finish()
    }
}

impl ProgressReporter {
    /// Create a reporter that draws to stderr
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::with_template(TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.enable_steady_tick(Duration::from_millis(120));
        set_active_bar(Some(bar.clone()));
        Self { bar }
    }

    /// Create a quiet reporter that doesn't output anything
    pub fn quiet(total: usize) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total as u64);
        Self { bar }
    }

    /// Show what is being worked on
    pub fn set_message(&self, message: &str) {
        let mut message = message.to_string();
        if message.chars().count() > 60 {
            message = message.chars().take(57).collect::<String>() + "...";
        }
        self.bar.set_message(message);
    }

    /// Increment progress by one unit
    pub fn inc(&self) {
        self.bar.inc(1);
    }

    /// Get the current progress count
    pub fn current(&self) -> u64 {
        self.bar.position()
    }

    /// Remove the bar from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
        set_active_bar(None);
    }
}

/// `tracing` writer for stderr that suspends the active progress bar
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressAwareStderr;

impl<'a> MakeWriter<'a> for ProgressAwareStderr {
    type Writer = ProgressAwareWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ProgressAwareWriter { buf: Vec::new() }
    }
}

/// Buffers one formatted event and emits it on drop
#[derive(Debug)]
pub struct ProgressAwareWriter {
    buf: Vec<u8>,
}

impl Write for ProgressAwareWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ProgressAwareWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let emit = || {
            let _ = io::stderr().lock().write_all(&self.buf);
        };
        match active_bar() {
            Some(bar) => bar.suspend(emit),
            None => emit(),
        }
    }
}
