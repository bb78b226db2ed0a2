use std::sync::Mutex;
use std::time::Duration;

use console::style;
use harvester::collect::CollectProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Bars currently on screen.
#[derive(Default)]
struct ProgressState {
    /// Spinner of the star bracket being paged.
    bracket_bar: Option<ProgressBar>,
    /// Spinner of the code-search string being paged.
    search_bar: Option<ProgressBar>,
    /// Bar of the details run.
    details_bar: Option<ProgressBar>,
}

/// Interactive progress reporter using indicatif.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self::with_multi(MultiProgress::new())
    }

    /// A reporter that draws nothing.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self::with_multi(MultiProgress::with_draw_target(
            indicatif::ProgressDrawTarget::hidden(),
        ))
    }

    fn with_multi(multi: MultiProgress) -> Self {
        Self {
            multi,
            state: Mutex::new(ProgressState::default()),
        }
    }

    fn spinner(&self, prefix: String) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(Self::spinner_style());
        bar.set_prefix(prefix);
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }

    /// Print above the bars.
    pub fn println(&self, message: &str) {
        self.multi.println(message).ok();
    }

    fn warn(&self, message: String) {
        self.println(&format!("{} {message}", style("!").yellow().bold()));
    }

    pub fn handle(&self, event: CollectProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            CollectProgress::BracketStarted {
                min_stars,
                max_stars,
                filter,
            } => {
                if let Some(bar) = state.bracket_bar.take()
                    && !bar.is_finished()
                {
                    bar.finish_and_clear();
                }
                let range = match max_stars {
                    Some(max) => format!("{min_stars}..{max}"),
                    None => format!(">={min_stars}"),
                };
                let bar = self.spinner(format!("{:>12}", range));
                bar.set_message(filter);
                state.bracket_bar = Some(bar);
            }

            CollectProgress::Requesting {
                page_size,
                high_water,
            } => {
                if let Some(ref bar) = state.bracket_bar {
                    bar.set_message(format!(
                        "Requesting {page_size} repos from {high_water} stars..."
                    ));
                }
            }

            CollectProgress::PageMerged {
                count,
                stored,
                total,
                at,
            } => {
                if let Some(ref bar) = state.bracket_bar {
                    bar.set_message(format!(
                        "{stored} stored, {total} matching, last page {count} at {}",
                        at.format("%H:%M:%S")
                    ));
                }
            }

            CollectProgress::Throttled {
                page_size,
                increment,
            } => {
                self.warn(format!(
                    "Server timed out, page size cut to {page_size} (increment {increment})"
                ));
            }

            CollectProgress::RateLimited { wait } => {
                if let Some(ref bar) = state.bracket_bar {
                    bar.set_message(format!("Rate limited, waiting {}s...", wait.as_secs()));
                }
            }

            CollectProgress::MalformedResponse { status, reason } => {
                self.warn(format!("Unreadable reply ({status} {reason}), retrying"));
            }

            CollectProgress::TransportFailed { error } => {
                self.warn(format!("Request failed ({error}), retrying"));
            }

            CollectProgress::CapRestart {
                min_stars,
                max_stars,
            } => {
                let range = match max_stars {
                    Some(max) => format!("{min_stars}..{max}"),
                    None => format!(">={min_stars}"),
                };
                if let Some(ref bar) = state.bracket_bar {
                    bar.set_prefix(format!("{:>12}", range));
                }
                self.println(&format!(
                    "{} Result cap reached, restarting at stars {range}",
                    style("↻").cyan()
                ));
            }

            CollectProgress::BracketDone {
                min_stars,
                collected,
            } => {
                if let Some(bar) = state.bracket_bar.take() {
                    bar.set_style(Self::done_style());
                    bar.finish_with_message(format!(
                        "{collected} repos collected from {min_stars} stars"
                    ));
                }
            }

            CollectProgress::BracketFailed { min_stars, error } => {
                if let Some(bar) = state.bracket_bar.take() {
                    bar.abandon_with_message(format!("Failed: {error}"));
                } else {
                    self.warn(format!("Bracket at {min_stars} stars failed: {error}"));
                }
            }

            CollectProgress::Recovering { wait } => {
                self.println(&format!("Waiting {}s before the next bracket", wait.as_secs()));
            }

            CollectProgress::Aborted { error } => {
                if let Some(bar) = state.bracket_bar.take() {
                    bar.abandon_with_message(format!("Aborted: {error}"));
                }
                self.println(&format!("{} {error}", style("✗").red().bold()));
            }

            CollectProgress::Flushed { path, rows } => {
                self.println(&format!(
                    "{} Saved {rows} rows to {}",
                    style("✓").green(),
                    path.display()
                ));
            }

            CollectProgress::CodeSearchPage {
                search_string,
                page,
                items,
                repositories,
            } => {
                if state.search_bar.is_none() {
                    state.search_bar = Some(self.spinner(format!("{:>12}", "Code search")));
                }
                if let Some(ref bar) = state.search_bar {
                    bar.set_message(format!(
                        "{search_string}: page {page} ({items} hits, {repositories} repos)"
                    ));
                }
            }

            CollectProgress::CodeSearchRateLimited {
                search_string,
                page,
                wait,
            } => {
                if let Some(ref bar) = state.search_bar {
                    bar.set_message(format!(
                        "{search_string}: rate limited on page {page}, waiting {}s...",
                        wait.as_secs()
                    ));
                }
            }

            CollectProgress::CodeSearchDone {
                search_string,
                pages,
            } => {
                if let Some(bar) = state.search_bar.take() {
                    bar.finish_and_clear();
                }
                self.println(&format!(
                    "{} {search_string}: {pages} pages",
                    style("✓").green()
                ));
            }

            CollectProgress::DetailsFetched {
                repository,
                done,
                total,
            } => {
                let bar = state.details_bar.get_or_insert_with(|| {
                    let bar = self.multi.add(ProgressBar::new(total as u64));
                    bar.set_style(Self::bar_style());
                    bar.set_prefix(format!("{:>12}", "Details"));
                    bar
                });
                bar.set_position(done as u64);
                bar.set_message(repository);
                if done == total {
                    bar.finish();
                }
            }

            CollectProgress::DetailsFailed { repository, error } => {
                self.warn(format!("{repository}: {error}"));
            }

            CollectProgress::RateLimitBackoff {
                repository,
                retry_after_ms,
                attempt,
            } => {
                if let Some(ref bar) = state.details_bar {
                    bar.set_message(format!(
                        "{repository}: rate limited, retry {attempt} in {retry_after_ms}ms"
                    ));
                }
            }

            _ => {}
        }
    }

    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for bar in [&state.bracket_bar, &state.search_bar, &state.details_bar]
            .into_iter()
            .flatten()
        {
            if !bar.is_finished() {
                bar.finish();
            }
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .expect("Invalid template")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn done_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {msg}")
            .expect("Invalid template")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>4}/{len:4} {msg}")
            .expect("Invalid template")
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
