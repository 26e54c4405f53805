use anyhow::{Context, Result};
use calsync_core::config::SyncConfig;
use calsync_core::engine::{CategoryOutcome, Progress, Reconciler, RunOptions};
use calsync_core::record::group_by_category;
use calsync_core::schedule::Schedule;
use indicatif::ProgressBar;
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Duration;

use crate::render::{Render, pluralize};
use crate::utils::tui;

pub struct SyncArgs {
    pub filter: Option<String>,
    pub pause: Option<Duration>,
    pub budget: Option<u64>,
    pub delete_existing: bool,
    pub dry_run: bool,
    pub trust_store: bool,
}

/// Prints one block per category as the engine reports it.
#[derive(Default)]
struct TerminalProgress {
    spinner: Option<ProgressBar>,
}

impl TerminalProgress {
    fn clear_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl Progress for TerminalProgress {
    fn category_started(&mut self, index: usize, total: usize, name: &str) {
        self.clear_spinner();
        self.spinner = Some(tui::create_spinner(format!("[{}/{}] {}", index, total, name)));
    }

    fn category_finished(&mut self, outcome: &CategoryOutcome) {
        self.clear_spinner();
        println!("{}\n", outcome.render());
    }

    fn calendar_deleted(&mut self, name: &str) {
        println!("{} {}", "-".red(), format!("deleted calendar {}", name).red());
    }

    fn pausing(&mut self, duration: Duration) {
        self.clear_spinner();
        self.spinner = Some(tui::create_spinner(
            format!("Pausing {} before the next category", humantime::format_duration(duration))
                .dimmed()
                .to_string(),
        ));
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        self.clear_spinner();
    }
}

pub async fn run(config: &SyncConfig, csv: &Path, args: SyncArgs) -> Result<()> {
    let schedule = Schedule::load(csv, &config.category_separators)?;
    if !schedule.skipped.is_empty() {
        println!(
            "{}",
            format!(
                "Skipped {} unreadable {} (see `calsync audit`)",
                schedule.skipped.len(),
                pluralize("row", schedule.skipped.len())
            )
            .yellow()
        );
    }

    let groups = group_by_category(schedule.records);
    println!(
        "{} {} in {}\n",
        groups.len(),
        pluralize("category", groups.len()),
        csv.display()
    );

    let tz = config.tz()?;
    let store = super::open_store(config)?;
    let remote = config.remote();
    let executor = super::executor(config, args.budget);

    let options = RunOptions {
        filter: args.filter,
        delete_existing: args.delete_existing,
        dry_run: args.dry_run,
        trust_store: args.trust_store,
        pause_between_categories: args.pause.unwrap_or(config.pause_between_categories),
        post_create_delay: config.post_create_delay,
    };

    let mut progress = TerminalProgress::default();
    let report = Reconciler::new(&remote, &store, &executor, tz)
        .run(groups, &options, &mut progress)
        .await
        .with_context(|| format!("Could not reach {} calendars", remote.provider.name()))?;
    drop(progress);

    println!("{}", report.render());

    if executor.quota().is_over_budget() {
        println!(
            "{}",
            "API call budget used up; remaining work resumes on the next run.".yellow()
        );
    }

    Ok(())
}
