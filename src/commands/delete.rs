use anyhow::Result;
use calsync_core::config::SyncConfig;
use calsync_core::engine::delete_calendars;
use calsync_core::remote::{RemoteCalendar, fetch_all_calendars};
use calsync_core::resolver::CalendarFilter;
use owo_colors::OwoColorize;

use crate::render::pluralize;
use crate::utils::tui;

pub async fn run(config: &SyncConfig, pattern: &str, yes: bool) -> Result<()> {
    let filter = CalendarFilter::new(Some(pattern))?;
    let remote = config.remote();
    let executor = super::executor(config, None);

    let mut matches: Vec<RemoteCalendar> = fetch_all_calendars(&remote, &executor)
        .await?
        .into_iter()
        .filter(|c| filter.matches(&c.name))
        .collect();
    matches.sort_by(|a, b| a.name.cmp(&b.name));

    if matches.is_empty() {
        println!("No calendars match '{}'.", pattern);
        return Ok(());
    }

    for calendar in &matches {
        println!("   {} {}", "-".red(), calendar.name.red());
    }

    if !yes {
        tui::confirm_hint(&format!(
            "delete these {} {}",
            matches.len(),
            pluralize("calendar", matches.len())
        ));
        return Ok(());
    }

    let store = super::open_store(config)?;
    let spinner = tui::create_spinner("Deleting calendars".to_string());
    let result = delete_calendars(&remote, &executor, &store, &matches).await;
    spinner.finish_and_clear();

    let deleted = result?;
    println!(
        "\nDeleted {} of {} {}.",
        deleted.len(),
        matches.len(),
        pluralize("calendar", matches.len())
    );

    Ok(())
}
