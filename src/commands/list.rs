use anyhow::Result;
use calsync_core::config::SyncConfig;
use calsync_core::remote::fetch_all_calendars;
use owo_colors::OwoColorize;

use crate::utils::tui;

pub async fn run(config: &SyncConfig) -> Result<()> {
    let remote = config.remote();
    let executor = super::executor(config, None);

    let spinner = tui::create_spinner("Fetching calendars".to_string());
    let result = fetch_all_calendars(&remote, &executor).await;
    spinner.finish_and_clear();

    let mut calendars = result?;
    calendars.sort_by(|a, b| a.name.cmp(&b.name));

    for calendar in &calendars {
        println!("📅 {} {}", calendar.name, calendar.id.dimmed());
    }
    println!("\n{} calendars", calendars.len());

    Ok(())
}
