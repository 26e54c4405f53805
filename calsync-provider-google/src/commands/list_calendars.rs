use anyhow::{Context, Result};
use calsync_core::remote::protocol::ListCalendars;
use calsync_core::remote::{Page, RemoteCalendar};

use super::authed_api;

pub async fn handle(cmd: ListCalendars) -> Result<Page<RemoteCalendar>> {
    let api = authed_api(&cmd.remote_config).await?;

    let page = api
        .list_calendars(cmd.page_token.as_deref())
        .await
        .context("Failed to fetch calendars")?;

    Ok(page)
}
