//! The remote calendar service seen from the engine.
//!
//! [`CalendarService`] is the narrow interface every remote mutation and
//! listing goes through. [`Remote`] implements it by talking to a provider
//! binary; tests implement it in memory.

pub mod client;
pub mod protocol;
pub mod provider;
pub mod types;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::date_range::DateRange;
use crate::error::{CalSyncError, CalSyncResult};
use crate::retry::Executor;

pub use client::{Remote, RemoteConfig};
pub use provider::Provider;
pub use types::{NewEvent, Page, RemoteCalendar, RemoteEvent, RemoteTime};

/// Coarse classification of a failed remote call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    QuotaExceeded,
    NotFound,
    BadRequest,
    Unauthorized,
    Transport,
    #[default]
    Other,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        RemoteError {
            kind,
            message: message.into(),
        }
    }

    pub fn quota(message: impl Into<String>) -> Self {
        RemoteError::new(RemoteErrorKind::QuotaExceeded, message)
    }

    /// Transient quota/rate-limit failure that should be retried later.
    ///
    /// Providers that report a structured kind are trusted; otherwise the
    /// message is searched for "quota" or "limits exceeded" so that plain
    /// text errors from older providers keep being retried.
    pub fn is_quota_exceeded(&self) -> bool {
        if self.kind == RemoteErrorKind::QuotaExceeded {
            return true;
        }
        let message = self.message.to_lowercase();
        message.contains("quota") || message.contains("limits exceeded")
    }
}

impl From<CalSyncError> for RemoteError {
    fn from(err: CalSyncError) -> Self {
        match err {
            CalSyncError::Remote(e) => e,
            CalSyncError::ProviderTimeout(_) | CalSyncError::Io(_) => {
                RemoteError::new(RemoteErrorKind::Transport, err.to_string())
            }
            other => RemoteError::new(RemoteErrorKind::Other, other.to_string()),
        }
    }
}

/// Paginated list/create/delete on calendars and events.
#[allow(async_fn_in_trait)]
pub trait CalendarService {
    async fn list_calendars(
        &self,
        page_token: Option<&str>,
    ) -> Result<Page<RemoteCalendar>, RemoteError>;

    async fn create_calendar(
        &self,
        name: &str,
        time_zone: &str,
    ) -> Result<RemoteCalendar, RemoteError>;

    async fn delete_calendar(&self, calendar_id: &str) -> Result<(), RemoteError>;

    async fn list_events(
        &self,
        calendar_id: &str,
        range: &DateRange,
        page_token: Option<&str>,
    ) -> Result<Page<RemoteEvent>, RemoteError>;

    async fn create_event(
        &self,
        calendar_id: &str,
        event: &NewEvent,
    ) -> Result<RemoteEvent, RemoteError>;

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), RemoteError>;
}

/// Every calendar on the account, following continuation tokens.
pub async fn fetch_all_calendars<S: CalendarService>(
    service: &S,
    executor: &Executor,
) -> CalSyncResult<Vec<RemoteCalendar>> {
    let mut calendars = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let token = page_token.as_deref();
        let page = executor
            .execute("list calendars", move || service.list_calendars(token))
            .await?;
        calendars.extend(page.items);

        match page.next_page_token {
            Some(next) => page_token = Some(next),
            None => break,
        }
    }

    Ok(calendars)
}

/// Every event of `calendar_id` inside `range`, following continuation tokens.
pub async fn fetch_all_events<S: CalendarService>(
    service: &S,
    executor: &Executor,
    calendar_id: &str,
    range: &DateRange,
) -> CalSyncResult<Vec<RemoteEvent>> {
    let mut events = Vec::new();
    let mut page_token: Option<String> = None;
    let label = format!("list events of {calendar_id}");

    loop {
        let token = page_token.as_deref();
        let page = executor
            .execute(&label, move || service.list_events(calendar_id, range, token))
            .await?;
        events.extend(page.items);

        match page.next_page_token {
            Some(next) => page_token = Some(next),
            None => break,
        }
    }

    Ok(events)
}
