use anyhow::Result;
use calsync_core::config::SyncConfig;

use crate::utils::tui;

pub fn run(config: &SyncConfig, name: Option<String>, yes: bool) -> Result<()> {
    let store = super::open_store(config)?;

    match name {
        Some(name) => {
            if store.get_calendar_state(&name)?.is_none() {
                println!("No local state for '{}'.", name);
                return Ok(());
            }
            if !yes {
                println!("Would clear local state for '{}'.", name);
                tui::confirm_hint("clear it");
                return Ok(());
            }
            store.delete_calendar(&name)?;
            tracing::info!(calendar = %name, "Cleared local state");
            println!("Cleared local state for '{}'.", name);
        }
        None => {
            let count = store.list_calendar_states()?.len();
            if !yes {
                println!("Would clear local state for {} calendars.", count);
                tui::confirm_hint("clear it");
                return Ok(());
            }
            store.reset()?;
            tracing::info!(calendars = count, "Cleared all local state");
            println!("Cleared local state for {} calendars.", count);
        }
    }

    Ok(())
}
