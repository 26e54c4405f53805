use anyhow::Result;
use calsync_core::config::SyncConfig;
use calsync_core::schedule::Schedule;
use std::path::Path;

use crate::render::Render;

pub fn run(config: &SyncConfig, csv: &Path) -> Result<()> {
    let schedule = Schedule::load(csv, &config.category_separators)?;
    let audit = schedule.audit();

    tracing::info!(
        rows = schedule.records.len(),
        categories = audit.by_category.len(),
        issues = audit.issue_count(),
        "Audited schedule"
    );

    println!("{}\n", csv.display());
    println!("{}", audit.render());

    Ok(())
}
