use anyhow::Result;
use calsync_core::config::SyncConfig;
use calsync_core::date_range::DateRange;
use calsync_core::dedupe::DuplicateScanner;
use calsync_core::resolver::CalendarFilter;

use crate::render::Render;
use crate::utils::tui;

pub async fn run(
    config: &SyncConfig,
    pattern: Option<String>,
    range: DateRange,
    dry_run: bool,
) -> Result<()> {
    let filter = CalendarFilter::new(pattern.as_deref())?;
    let tz = config.tz()?;
    let remote = config.remote();
    let executor = super::executor(config, None);

    let scanner = DuplicateScanner::new(&remote, &executor, tz, &config.protected_keywords);

    let spinner = tui::create_spinner("Scanning calendars for duplicates".to_string());
    let result = scanner.scan(&filter, &range, dry_run).await;
    spinner.finish_and_clear();

    let report = result?;
    println!("{}", report.render());

    Ok(())
}
