//! Remote calendar operations via a provider binary.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::date_range::DateRange;
use crate::remote::protocol::{
    CreateCalendar, CreateEvent, DeleteCalendar, DeleteEvent, ListCalendars, ListEvents,
};
use crate::remote::provider::Provider;
use crate::remote::types::{NewEvent, Page, RemoteCalendar, RemoteEvent};
use crate::remote::{CalendarService, RemoteError};

/// Provider-specific settings from the `[remote]` config table.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RemoteConfig(pub HashMap<String, toml::Value>);

impl From<&RemoteConfig> for serde_json::Map<String, serde_json::Value> {
    fn from(config: &RemoteConfig) -> Self {
        config
            .0
            .iter()
            .filter_map(|(k, v)| serde_json::to_value(v).ok().map(|v| (k.clone(), v)))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Remote {
    pub provider: Provider,
    pub config: RemoteConfig,
}

impl Remote {
    pub fn new(provider: Provider, config: RemoteConfig) -> Self {
        Remote { provider, config }
    }

    pub fn remote_config(&self) -> serde_json::Map<String, serde_json::Value> {
        serde_json::Map::from(&self.config)
    }

    /// The `{provider}_account` entry (e.g. `google_account`), if configured.
    pub fn account_identifier(&self) -> Option<&str> {
        let key = format!("{}_account", self.provider.name());
        self.config.0.get(&key).and_then(|v| v.as_str())
    }

    pub async fn authenticate(&self) -> Result<String, RemoteError> {
        Ok(self.provider.authenticate(self.remote_config()).await?)
    }
}

impl CalendarService for Remote {
    async fn list_calendars(
        &self,
        page_token: Option<&str>,
    ) -> Result<Page<RemoteCalendar>, RemoteError> {
        Ok(self
            .provider
            .call(ListCalendars {
                remote_config: self.remote_config(),
                page_token: page_token.map(str::to_string),
            })
            .await?)
    }

    async fn create_calendar(
        &self,
        name: &str,
        time_zone: &str,
    ) -> Result<RemoteCalendar, RemoteError> {
        Ok(self
            .provider
            .call(CreateCalendar {
                remote_config: self.remote_config(),
                name: name.to_string(),
                time_zone: time_zone.to_string(),
            })
            .await?)
    }

    async fn delete_calendar(&self, calendar_id: &str) -> Result<(), RemoteError> {
        Ok(self
            .provider
            .call(DeleteCalendar {
                remote_config: self.remote_config(),
                calendar_id: calendar_id.to_string(),
            })
            .await?)
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        range: &DateRange,
        page_token: Option<&str>,
    ) -> Result<Page<RemoteEvent>, RemoteError> {
        Ok(self
            .provider
            .call(ListEvents {
                remote_config: self.remote_config(),
                calendar_id: calendar_id.to_string(),
                from: range.from_rfc3339(),
                to: range.to_rfc3339(),
                page_token: page_token.map(str::to_string),
            })
            .await?)
    }

    async fn create_event(
        &self,
        calendar_id: &str,
        event: &NewEvent,
    ) -> Result<RemoteEvent, RemoteError> {
        Ok(self
            .provider
            .call(CreateEvent {
                remote_config: self.remote_config(),
                calendar_id: calendar_id.to_string(),
                event: event.clone(),
            })
            .await?)
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), RemoteError> {
        Ok(self
            .provider
            .call(DeleteEvent {
                remote_config: self.remote_config(),
                calendar_id: calendar_id.to_string(),
                event_id: event_id.to_string(),
            })
            .await?)
    }
}
