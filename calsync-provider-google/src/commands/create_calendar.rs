use anyhow::{Context, Result};
use calsync_core::remote::RemoteCalendar;
use calsync_core::remote::protocol::CreateCalendar;

use super::authed_api;

pub async fn handle(cmd: CreateCalendar) -> Result<RemoteCalendar> {
    let api = authed_api(&cmd.remote_config).await?;

    let calendar = api
        .create_calendar(&cmd.name, &cmd.time_zone)
        .await
        .with_context(|| format!("Failed to create calendar: {}", cmd.name))?;

    Ok(calendar)
}
