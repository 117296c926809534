//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::time::Duration;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    /// Create an idle spinner; nothing shows until `start`
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner; plain mode prints nothing until it stops
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        }
    }

    /// Stop with a success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if self.interactive {
            println!("{} {}", style("✓").green(), message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with an error message on stderr
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else if self.interactive {
            eprintln!("{} {}", style("✗").red(), message);
        } else {
            eprintln!("{} {}", style("[FAIL]").red(), message);
        }
    }

    /// Clear the spinner without any message
    pub fn clear(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.clear();
        }
    }
}

/// Spinner for a single upload of known size.
///
/// The transport sends the body in one piece, so this shows the payload
/// size and elapsed time rather than a byte-level bar.
pub struct UploadProgress {
    bar: Option<ProgressBar>,
}

impl UploadProgress {
    /// Start showing `label` and its size (prints one line in plain mode)
    pub fn new(ctx: &UiContext, label: &str, bytes: u64) -> Self {
        let size = HumanBytes(bytes).to_string();
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner()
                .template("  {spinner:.blue} Uploading {prefix} {msg:.dim}  {elapsed:.dim}")
            {
                bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
            }
            bar.set_prefix(label.to_string());
            bar.set_message(size);
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            println!("Uploading {} ({})...", label, size);
            None
        };
        Self { bar }
    }

    /// Clear the spinner; also runs on drop
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

impl Drop for UploadProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
