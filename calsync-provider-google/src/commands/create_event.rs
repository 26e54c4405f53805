use anyhow::{Context, Result};
use calsync_core::remote::RemoteEvent;
use calsync_core::remote::protocol::CreateEvent;

use super::authed_api;

pub async fn handle(cmd: CreateEvent) -> Result<RemoteEvent> {
    let api = authed_api(&cmd.remote_config).await?;

    let created = api
        .create_event(&cmd.calendar_id, &cmd.event)
        .await
        .with_context(|| format!("Failed to create event: {}", cmd.event.summary))?;

    Ok(created)
}
