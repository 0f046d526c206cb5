//! Terminal progress display.

use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tilebreak::progress::{NotifyLevel, ProgressSink};

const BAR_TEMPLATE: &str =
    "{msg:12} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} windows ({eta})";

/// [`ProgressSink`] drawing one bar per tile.
///
/// When stdout is not a terminal the bar is hidden and notices are printed
/// as plain lines.
pub struct BarProgress {
    bar: ProgressBar,
    interactive: bool,
}

impl BarProgress {
    pub fn new() -> Self {
        let interactive = atty::is(atty::Stream::Stdout);
        let bar = ProgressBar::new(0);
        if !interactive {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);

        Self { bar, interactive }
    }

    /// Stop drawing, leaving the last bar on screen.
    pub fn finish(&self) {
        self.bar.finish();
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn reset(&self, total: usize, label: &str) {
        self.bar.reset();
        self.bar.set_length(total as u64);
        self.bar.set_message(label.to_string());
    }

    fn increment(&self) {
        self.bar.inc(1);
    }

    fn notify(&self, message: &str, level: NotifyLevel) {
        let line = match level {
            NotifyLevel::Info => style(message).dim().to_string(),
            NotifyLevel::Success => style(message).green().bold().to_string(),
            NotifyLevel::Warning => format!("{} {}", style("warning:").yellow().bold(), message),
            NotifyLevel::Error => format!("{} {}", style("error:").red().bold(), message),
        };

        if self.interactive {
            self.bar.println(line);
        } else {
            println!("{}", line);
        }
    }
}
