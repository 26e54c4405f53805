//! Mapping category names to remote calendars.

use regex::{Regex, RegexBuilder};

use crate::error::{CalSyncError, CalSyncResult};
use crate::remote::{CalendarService, RemoteCalendar, fetch_all_calendars};
use crate::retry::Executor;

/// Finds a calendar by exact name, creating it when absent.
///
/// Identity is the calendar name: resolving the same name twice finds the
/// calendar created the first time instead of creating another.
pub struct CalendarResolver<'a, S> {
    service: &'a S,
    executor: &'a Executor,
    time_zone: &'a str,
}

impl<'a, S: CalendarService> CalendarResolver<'a, S> {
    pub fn new(service: &'a S, executor: &'a Executor, time_zone: &'a str) -> Self {
        CalendarResolver {
            service,
            executor,
            time_zone,
        }
    }

    /// First calendar named exactly `name`, if any.
    pub async fn find(&self, name: &str) -> CalSyncResult<Option<RemoteCalendar>> {
        let calendars = fetch_all_calendars(self.service, self.executor).await?;
        Ok(calendars.into_iter().find(|c| c.name == name))
    }

    /// Returns the calendar id and whether it had to be created.
    pub async fn resolve(&self, name: &str) -> CalSyncResult<(String, bool)> {
        if let Some(calendar) = self.find(name).await? {
            tracing::debug!(calendar = name, id = %calendar.id, "Using existing calendar");
            return Ok((calendar.id, false));
        }

        let (service, time_zone) = (self.service, self.time_zone);
        let created = self
            .executor
            .execute(&format!("create calendar {name}"), move || {
                service.create_calendar(name, time_zone)
            })
            .await?;

        tracing::info!(calendar = name, id = %created.id, "Created calendar");
        Ok((created.id, true))
    }
}

/// Case-insensitive regex over calendar names; no pattern matches all.
#[derive(Debug, Clone, Default)]
pub struct CalendarFilter {
    pattern: Option<Regex>,
}

impl CalendarFilter {
    pub fn new(pattern: Option<&str>) -> CalSyncResult<Self> {
        let pattern = match pattern {
            None | Some("all") => None,
            Some(p) => Some(
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| CalSyncError::Config(format!("Invalid pattern '{p}': {e}")))?,
            ),
        };
        Ok(CalendarFilter { pattern })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.pattern.as_ref().is_none_or(|re| re.is_match(name))
    }
}
