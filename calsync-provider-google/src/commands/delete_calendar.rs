use anyhow::{Context, Result};
use calsync_core::remote::protocol::DeleteCalendar;

use super::authed_api;

pub async fn handle(cmd: DeleteCalendar) -> Result<()> {
    let api = authed_api(&cmd.remote_config).await?;

    api.delete_calendar(&cmd.calendar_id)
        .await
        .with_context(|| format!("Failed to delete calendar: {}", cmd.calendar_id))
}
