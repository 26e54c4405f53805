use anyhow::{Context, Result};
use calsync_core::remote::protocol::ListEvents;
use calsync_core::remote::{Page, RemoteEvent};

use super::authed_api;

pub async fn handle(cmd: ListEvents) -> Result<Page<RemoteEvent>> {
    let api = authed_api(&cmd.remote_config).await?;

    let page = api
        .list_events(
            &cmd.calendar_id,
            &cmd.from,
            &cmd.to,
            cmd.page_token.as_deref(),
        )
        .await
        .with_context(|| format!("Failed to fetch events of {}", cmd.calendar_id))?;

    Ok(page)
}
