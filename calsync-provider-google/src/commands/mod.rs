pub mod authenticate;
pub mod create_calendar;
pub mod create_event;
pub mod delete_calendar;
pub mod delete_event;
pub mod list_calendars;
pub mod list_events;

use anyhow::Result;

use crate::api::GoogleApi;
use crate::remote_config::GoogleRemoteConfig;
use crate::session::Session;

/// API client for the account named in the request's remote config.
pub async fn authed_api(
    remote_config: &serde_json::Map<String, serde_json::Value>,
) -> Result<GoogleApi> {
    let config = GoogleRemoteConfig::try_from(remote_config)?;
    let session = Session::load_valid(&config.google_account).await?;
    Ok(GoogleApi::new(session.access_token())?)
}
