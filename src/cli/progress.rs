//! Real-time progress display for synchronization runs
//!
//! Renders the bootstrapper's progress snapshots with indicatif: one overall
//! bar plus one bar per category. When stderr is not a terminal the display
//! falls back to periodic log lines.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ddragon_cache::app::Bootstrapper;
//! use ddragon_cache::cli::{ProgressConfig, ProgressDisplay};
//!
//! # async fn example(bootstrapper: Bootstrapper) -> Result<(), Box<dyn std::error::Error>> {
//! let display = Arc::new(ProgressDisplay::new(
//!     ProgressConfig::default(),
//!     &bootstrapper.config().ordered_categories(),
//! ));
//! let subscription = display.attach(&bootstrapper);
//!
//! let summary = bootstrapper.start().await?;
//! bootstrapper.unsubscribe(subscription);
//! display.finish(&summary);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::debug;

use crate::app::coordinator::{format_duration, ProgressSnapshot, RunSummary, SubscriptionId};
use crate::app::{Bootstrapper, Category, Stage};

/// Configuration for progress display
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Enable visual progress bars
    pub enable_progress_bars: bool,
    /// Interval between text-mode reports
    pub text_report_interval: Duration,
    /// Maximum width for asset names in display
    pub max_asset_width: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enable_progress_bars: true,
            text_report_interval: Duration::from_secs(10),
            max_asset_width: 40,
        }
    }
}

struct TextState {
    stage: Stage,
    last_report: Instant,
}

/// Progress renderer fed by [`Bootstrapper::on_progress`]
pub struct ProgressDisplay {
    config: ProgressConfig,
    multi: MultiProgress,
    overall: ProgressBar,
    categories: BTreeMap<Category, ProgressBar>,
    bars_enabled: bool,
    text: Mutex<TextState>,
}

impl ProgressDisplay {
    /// Create the bars for `categories`
    pub fn new(config: ProgressConfig, categories: &[Category]) -> Self {
        let bars_enabled = config.enable_progress_bars && atty::is(atty::Stream::Stderr);
        let multi = if bars_enabled {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let overall = multi.add(ProgressBar::new(0));
        overall.set_style(overall_style());
        overall.set_message(Stage::Idle.as_str());

        let categories = categories
            .iter()
            .map(|&category| {
                let bar = multi.add(ProgressBar::new(0));
                bar.set_style(category_style());
                bar.set_prefix(format!("{:>9}", category.as_str()));
                (category, bar)
            })
            .collect();

        Self {
            config,
            multi,
            overall,
            categories,
            bars_enabled,
            text: Mutex::new(TextState {
                stage: Stage::Idle,
                last_report: Instant::now(),
            }),
        }
    }

    /// Subscribe to a bootstrapper's progress snapshots
    pub fn attach(self: &Arc<Self>, bootstrapper: &Bootstrapper) -> SubscriptionId {
        let display = Arc::clone(self);
        bootstrapper.on_progress(move |snapshot| display.render(snapshot))
    }

    /// Render one snapshot
    pub fn render(&self, snapshot: &ProgressSnapshot) {
        if self.bars_enabled {
            self.render_bars(snapshot);
        } else {
            self.render_text(snapshot);
        }
    }

    fn render_bars(&self, snapshot: &ProgressSnapshot) {
        self.overall.set_length(snapshot.overall.total_assets as u64);
        self.overall
            .set_position(snapshot.overall.completed_assets as u64);
        self.overall.set_message(format!(
            "{} {:.1}%",
            snapshot.stage, snapshot.overall.percentage
        ));

        for status in &snapshot.categories {
            let Some(bar) = self.categories.get(&status.category) else {
                continue;
            };
            bar.set_length(status.total as u64);
            bar.set_position(status.current.min(status.total) as u64);

            let asset = match (snapshot.category, &snapshot.current_asset) {
                (Some(category), Some(asset)) if category == status.category => {
                    truncate(asset, self.config.max_asset_width)
                }
                _ => String::new(),
            };
            bar.set_message(format!("{} {}", status.stage, asset));
        }
    }

    fn render_text(&self, snapshot: &ProgressSnapshot) {
        let mut text = self.text.lock().unwrap_or_else(|p| p.into_inner());
        let stage_changed = text.stage != snapshot.stage;
        if !stage_changed && text.last_report.elapsed() < self.config.text_report_interval {
            return;
        }

        text.stage = snapshot.stage;
        text.last_report = Instant::now();
        eprintln!(
            "[{}] {}/{} items ({:.1}%), {} files downloaded, {} failed",
            snapshot.stage,
            snapshot.overall.completed_assets,
            snapshot.overall.total_assets,
            snapshot.overall.percentage,
            snapshot.downloaded_files,
            snapshot.failed_files
        );
    }

    /// Finish the bars and print the run summary
    pub fn finish(&self, summary: &RunSummary) {
        debug!("Finishing progress display");
        for (category, bar) in &self.categories {
            let outcome = summary.categories.iter().find(|c| c.category == *category);
            match outcome {
                Some(outcome) if outcome.stage == Stage::Error => bar.abandon_with_message(
                    format!("error: {}", outcome.error.as_deref().unwrap_or("failed")),
                ),
                _ => bar.finish_with_message(summary.stage.as_str()),
            }
        }
        self.overall.finish_with_message(summary.stage.as_str());
        if let Err(e) = self.multi.clear() {
            debug!("Failed to clear progress bars: {}", e);
        }

        eprintln!("\nSync summary (version {}):", summary.version);
        for outcome in &summary.categories {
            match &outcome.error {
                Some(error) => eprintln!("   {:<9} error: {}", outcome.category.as_str(), error),
                None => eprintln!(
                    "   {:<9} {}/{} items, {} files downloaded, {} failed",
                    outcome.category.as_str(),
                    outcome.completed_items,
                    outcome.total_items,
                    outcome.downloaded_files,
                    outcome.failed_files
                ),
            }
        }
        eprintln!("   Duration: {}", format_duration(summary.duration));

        if summary.cancelled {
            eprintln!("Run was cancelled; the next sync resumes where it stopped.");
        } else if summary.failed_files > 0 {
            eprintln!("Some files failed to download. Check logs for details.");
        }
    }
}

fn overall_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

fn category_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {prefix} [{bar:30.green/white}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

/// Keep the tail of long asset keys
fn truncate(asset: &str, width: usize) -> String {
    let count = asset.chars().count();
    if count <= width {
        asset.to_string()
    } else {
        let tail: String = asset.chars().skip(count - width.saturating_sub(3)).collect();
        format!("...{}", tail)
    }
}
