//! Remote calendar and event shapes.
//!
//! These mirror the Calendar v3 JSON closely enough that the Google provider
//! can pass them through unchanged, while staying provider-neutral for the
//! engine.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::record::{EventRecord, EventTime, Signature};

const WALL_CLOCK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// A calendar from the account's calendar list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCalendar {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Start or end bound as the remote service expresses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteTime {
    Date {
        date: NaiveDate,
    },
    DateTime {
        #[serde(rename = "dateTime")]
        date_time: String,
        #[serde(rename = "timeZone", default, skip_serializing_if = "Option::is_none")]
        time_zone: Option<String>,
    },
}

impl RemoteTime {
    pub fn from_event_time(time: &EventTime, tz: Tz) -> Self {
        match time {
            EventTime::Date(d) => RemoteTime::Date { date: *d },
            EventTime::DateTime(dt) => RemoteTime::DateTime {
                date_time: dt.format(WALL_CLOCK_FORMAT).to_string(),
                time_zone: Some(tz.name().to_string()),
            },
        }
    }

    /// Wall-clock time in `tz`, or None if the remote value is unparseable.
    ///
    /// Offset-carrying values are converted into `tz`; bare wall times are
    /// taken as already being in `tz`.
    pub fn to_event_time(&self, tz: Tz) -> Option<EventTime> {
        match self {
            RemoteTime::Date { date } => Some(EventTime::Date(*date)),
            RemoteTime::DateTime { date_time, .. } => {
                if let Ok(dt) = DateTime::parse_from_rfc3339(date_time) {
                    return Some(EventTime::DateTime(dt.with_timezone(&tz).naive_local()));
                }
                NaiveDateTime::parse_from_str(date_time, WALL_CLOCK_FORMAT)
                    .ok()
                    .map(EventTime::DateTime)
            }
        }
    }
}

/// An event as listed from (or returned by) the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEvent {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: RemoteTime,
    pub end: RemoteTime,
}

impl RemoteEvent {
    /// A date-only `end` is exclusive remotely and inclusive in records, so
    /// it is moved back one day.
    pub fn signature(&self, tz: Tz) -> Option<Signature> {
        let start = self.start.to_event_time(tz)?;
        let end = match &self.end {
            RemoteTime::Date { date } => EventTime::Date(date.checked_sub_days(Days::new(1))?),
            other => other.to_event_time(tz)?,
        };
        Some(Signature::new(&self.summary, &start, &end))
    }
}

/// Payload for creating an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub start: RemoteTime,
    pub end: RemoteTime,
}

impl NewEvent {
    /// All-day records carry date-only bounds with an exclusive end date;
    /// timed records carry date-times in the configured zone.
    pub fn from_record(record: &EventRecord, tz: Tz) -> Self {
        let (start, end) = if record.all_day {
            let last_day = date_of(&record.end);
            (
                RemoteTime::Date {
                    date: date_of(&record.start),
                },
                RemoteTime::Date {
                    date: last_day.checked_add_days(Days::new(1)).unwrap_or(last_day),
                },
            )
        } else {
            (
                RemoteTime::from_event_time(&record.start, tz),
                RemoteTime::from_event_time(&record.end, tz),
            )
        };

        NewEvent {
            summary: record.subject.clone(),
            description: record.description.clone(),
            start,
            end,
        }
    }
}

fn date_of(time: &EventTime) -> NaiveDate {
    match time {
        EventTime::Date(d) => *d,
        EventTime::DateTime(dt) => dt.date(),
    }
}
