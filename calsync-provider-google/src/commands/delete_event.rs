use anyhow::{Context, Result};
use calsync_core::remote::protocol::DeleteEvent;
use reqwest::StatusCode;

use super::authed_api;

pub async fn handle(cmd: DeleteEvent) -> Result<()> {
    let api = authed_api(&cmd.remote_config).await?;

    match api.delete_event(&cmd.calendar_id, &cmd.event_id).await {
        Ok(()) => Ok(()),
        // Already deleted
        Err(e) if e.status == Some(StatusCode::GONE) => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to delete event: {}", cmd.event_id)),
    }
}
