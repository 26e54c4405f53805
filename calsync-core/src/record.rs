//! Desired event records and their identity signature.
//!
//! An [`EventRecord`] is one event the schedule says should exist remotely.
//! Its [`Signature`] is the `(subject, start, end)` triple used everywhere
//! duplicates must be detected, both for desired records and for events
//! discovered on the remote calendar.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants::UNKNOWN_CATEGORY;
use crate::date_range::DateRange;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Start or end of an event, as wall-clock time in the configured zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventTime {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl EventTime {
    /// Canonical text form used inside signatures and the state store.
    pub fn normalized(&self) -> String {
        match self {
            EventTime::Date(d) => d.format(DATE_FORMAT).to_string(),
            EventTime::DateTime(dt) => dt.format(DATE_TIME_FORMAT).to_string(),
        }
    }

    /// Resolve to an absolute instant in `tz`.
    ///
    /// Dates resolve to local midnight. Wall times that fall in a DST gap
    /// fall back to interpreting them as UTC.
    pub fn to_utc(&self, tz: Tz) -> DateTime<chrono::Utc> {
        let naive = match self {
            EventTime::Date(d) => d.and_time(chrono::NaiveTime::MIN),
            EventTime::DateTime(dt) => *dt,
        };
        tz.from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|| naive.and_utc())
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized())
    }
}

/// Identity of a logical event: trimmed subject plus normalized bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Signature {
    pub subject: String,
    pub start: String,
    pub end: String,
}

impl Signature {
    pub fn new(subject: &str, start: &EventTime, end: &EventTime) -> Self {
        Signature {
            subject: subject.trim().to_string(),
            start: start.normalized(),
            end: end.normalized(),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} → {}]", self.subject, self.start, self.end)
    }
}

/// Grouping key that maps 1:1 to a remote calendar.
///
/// Computed once at ingestion and carried with each record, so downstream
/// code never re-derives it from display strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryKey(String);

impl CategoryKey {
    /// Cut `subject` at the first separator found, trying them in order.
    pub fn from_subject<S: AsRef<str>>(subject: &str, separators: &[S]) -> Self {
        let subject = subject.trim();
        if subject.is_empty() {
            return CategoryKey(UNKNOWN_CATEGORY.to_string());
        }

        for sep in separators {
            if let Some((head, _)) = subject.split_once(sep.as_ref()) {
                let head = head.trim();
                if !head.is_empty() {
                    return CategoryKey(head.to_string());
                }
            }
        }

        CategoryKey(subject.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One desired event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub subject: String,
    pub start: EventTime,
    pub end: EventTime,
    pub all_day: bool,
    pub description: String,
    pub category: CategoryKey,
}

impl EventRecord {
    pub fn signature(&self) -> Signature {
        Signature::new(&self.subject, &self.start, &self.end)
    }
}

/// All desired records for one category, in source order.
#[derive(Debug, Clone)]
pub struct CategoryGroup {
    pub key: CategoryKey,
    pub records: Vec<EventRecord>,
}

impl CategoryGroup {
    /// Distinct signatures of the desired records.
    pub fn signatures(&self) -> HashSet<Signature> {
        self.records.iter().map(EventRecord::signature).collect()
    }

    /// Time span from the earliest start to the latest end, if any records.
    pub fn span(&self, tz: Tz) -> Option<DateRange> {
        let from = self.records.iter().map(|r| r.start.to_utc(tz)).min()?;
        let to = self
            .records
            .iter()
            .map(|r| match r.end {
                // All-day end dates are inclusive; cover the whole last day.
                EventTime::Date(d) => EventTime::Date(d.succ_opt().unwrap_or(d)).to_utc(tz),
                EventTime::DateTime(_) => r.end.to_utc(tz),
            })
            .max()?;
        Some(DateRange {
            from: Some(from),
            to: Some(to),
        })
    }
}

/// Partition records by category, ordered lexically by category key.
pub fn group_by_category(records: Vec<EventRecord>) -> Vec<CategoryGroup> {
    let mut groups: BTreeMap<CategoryKey, Vec<EventRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.category.clone()).or_default().push(record);
    }
    groups
        .into_iter()
        .map(|(key, records)| CategoryGroup { key, records })
        .collect()
}
