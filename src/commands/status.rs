use anyhow::Result;
use calsync_core::config::SyncConfig;

use crate::render::Render;

pub fn run(config: &SyncConfig) -> Result<()> {
    let store = super::open_store(config)?;
    let states = store.list_calendar_states()?;

    if states.is_empty() {
        println!("No calendars synced yet. Run `calsync sync` first.");
        return Ok(());
    }

    for state in &states {
        println!("{}", state.render());
    }

    let complete = states.iter().filter(|s| s.complete).count();
    println!("\n{}/{} calendars complete", complete, states.len());

    Ok(())
}
