//! In-memory calendar service for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use calsync_core::constants::DEFAULT_CATEGORY_SEPARATORS;
use calsync_core::date_range::DateRange;
use calsync_core::quota::QuotaTracker;
use calsync_core::record::{CategoryKey, EventRecord, EventTime};
use calsync_core::remote::{
    CalendarService, NewEvent, Page, RemoteCalendar, RemoteError, RemoteErrorKind, RemoteEvent,
    RemoteTime,
};
use calsync_core::retry::{Executor, RetryPolicy};
use chrono::NaiveDateTime;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub list_calendars: u32,
    pub create_calendar: u32,
    pub delete_calendar: u32,
    pub list_events: u32,
    pub create_event: u32,
    pub delete_event: u32,
}

#[derive(Default)]
struct State {
    calendars: Vec<RemoteCalendar>,
    events: HashMap<String, Vec<RemoteEvent>>,
    next_id: u64,
    /// Upcoming create_event calls that fail with a quota error.
    create_quota_failures: u32,
    /// Upcoming delete_calendar calls that fail with a quota error.
    delete_quota_failures: u32,
    /// Window of every list_events call, in call order.
    listed_ranges: Vec<DateRange>,
    /// Subjects whose creation is rejected permanently.
    rejected_subjects: HashSet<String>,
    calls: Calls,
}

pub struct FakeCalendar {
    state: Mutex<State>,
    page_size: usize,
}

impl FakeCalendar {
    pub fn new() -> Self {
        FakeCalendar {
            state: Mutex::new(State::default()),
            page_size: 2,
        }
    }

    pub fn add_calendar(&self, name: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("cal-{}", state.next_id);
        state.calendars.push(RemoteCalendar {
            id: id.clone(),
            name: name.to_string(),
        });
        state.events.entry(id.clone()).or_default();
        id
    }

    pub fn add_event(&self, calendar_id: &str, summary: &str, start: &str, end: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("ev-{}", state.next_id);
        let event = RemoteEvent {
            id: id.clone(),
            summary: summary.to_string(),
            description: None,
            start: remote_time(start),
            end: remote_time(end),
        };
        state
            .events
            .entry(calendar_id.to_string())
            .or_default()
            .push(event);
        id
    }

    pub fn fail_creates_with_quota(&self, n: u32) {
        self.state.lock().unwrap().create_quota_failures = n;
    }

    pub fn fail_calendar_deletes_with_quota(&self, n: u32) {
        self.state.lock().unwrap().delete_quota_failures = n;
    }

    pub fn listed_ranges(&self) -> Vec<DateRange> {
        self.state.lock().unwrap().listed_ranges.clone()
    }

    pub fn reject_subject(&self, subject: &str) {
        self.state
            .lock()
            .unwrap()
            .rejected_subjects
            .insert(subject.to_string());
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls
    }

    pub fn calendar_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.calendars.iter().map(|c| c.name.clone()).collect()
    }

    pub fn calendar_id(&self, name: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .calendars
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id.clone())
    }

    pub fn events(&self, calendar_id: &str) -> Vec<RemoteEvent> {
        let state = self.state.lock().unwrap();
        state.events.get(calendar_id).cloned().unwrap_or_default()
    }

    fn page<T: Clone>(&self, items: &[T], page_token: Option<&str>) -> Page<T> {
        let start: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (start + self.page_size).min(items.len());
        Page {
            items: items[start.min(end)..end].to_vec(),
            next_page_token: (end < items.len()).then(|| end.to_string()),
        }
    }
}

impl CalendarService for FakeCalendar {
    async fn list_calendars(
        &self,
        page_token: Option<&str>,
    ) -> Result<Page<RemoteCalendar>, RemoteError> {
        let calendars = {
            let mut state = self.state.lock().unwrap();
            state.calls.list_calendars += 1;
            state.calendars.clone()
        };
        Ok(self.page(&calendars, page_token))
    }

    async fn create_calendar(
        &self,
        name: &str,
        _time_zone: &str,
    ) -> Result<RemoteCalendar, RemoteError> {
        self.state.lock().unwrap().calls.create_calendar += 1;
        let id = self.add_calendar(name);
        Ok(RemoteCalendar {
            id,
            name: name.to_string(),
        })
    }

    async fn delete_calendar(&self, calendar_id: &str) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.delete_calendar += 1;
        if state.delete_quota_failures > 0 {
            state.delete_quota_failures -= 1;
            return Err(RemoteError::quota("Rate Limit Exceeded"));
        }
        let before = state.calendars.len();
        state.calendars.retain(|c| c.id != calendar_id);
        state.events.remove(calendar_id);
        if state.calendars.len() == before {
            return Err(RemoteError::new(RemoteErrorKind::NotFound, "Not Found"));
        }
        Ok(())
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        range: &DateRange,
        page_token: Option<&str>,
    ) -> Result<Page<RemoteEvent>, RemoteError> {
        let events = {
            let mut state = self.state.lock().unwrap();
            state.calls.list_events += 1;
            if page_token.is_none() {
                state.listed_ranges.push(range.clone());
            }
            match state.events.get(calendar_id) {
                Some(events) => events.clone(),
                None => return Err(RemoteError::new(RemoteErrorKind::NotFound, "Not Found")),
            }
        };
        Ok(self.page(&events, page_token))
    }

    async fn create_event(
        &self,
        calendar_id: &str,
        event: &NewEvent,
    ) -> Result<RemoteEvent, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.create_event += 1;

        if state.create_quota_failures > 0 {
            state.create_quota_failures -= 1;
            return Err(RemoteError::quota("Rate Limit Exceeded"));
        }
        if state.rejected_subjects.contains(&event.summary) {
            return Err(RemoteError::new(RemoteErrorKind::BadRequest, "Invalid event"));
        }

        state.next_id += 1;
        let created = RemoteEvent {
            id: format!("ev-{}", state.next_id),
            summary: event.summary.clone(),
            description: Some(event.description.clone()),
            start: event.start.clone(),
            end: event.end.clone(),
        };
        match state.events.get_mut(calendar_id) {
            Some(events) => events.push(created.clone()),
            None => return Err(RemoteError::new(RemoteErrorKind::NotFound, "Not Found")),
        }
        Ok(created)
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.delete_event += 1;
        let events = state
            .events
            .get_mut(calendar_id)
            .ok_or_else(|| RemoteError::new(RemoteErrorKind::NotFound, "Not Found"))?;
        events.retain(|e| e.id != event_id);
        Ok(())
    }
}

/// `"2026-03-02 08:30"` as a wall-clock remote time in Europe/Paris.
pub fn remote_time(s: &str) -> RemoteTime {
    RemoteTime::DateTime {
        date_time: naive(s).format("%Y-%m-%dT%H:%M:%S").to_string(),
        time_zone: Some("Europe/Paris".to_string()),
    }
}

pub fn naive(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

pub fn record(subject: &str, start: &str, end: &str) -> EventRecord {
    EventRecord {
        subject: subject.to_string(),
        start: EventTime::DateTime(naive(start)),
        end: EventTime::DateTime(naive(end)),
        all_day: false,
        description: String::new(),
        category: CategoryKey::from_subject(subject, DEFAULT_CATEGORY_SEPARATORS),
    }
}

/// `n` weekly sessions of `subject`, starting Monday 2 March 2026.
pub fn weekly(subject: &str, n: u32) -> Vec<EventRecord> {
    (0..n)
        .map(|week| {
            let day = 2 + 7 * week;
            let (month, day) = if day > 31 { (4, day - 31) } else { (3, day) };
            record(
                subject,
                &format!("2026-{month:02}-{day:02} 08:30"),
                &format!("2026-{month:02}-{day:02} 10:30"),
            )
        })
        .collect()
}

pub fn executor() -> Executor {
    Executor::new(
        RetryPolicy::default(),
        Arc::new(QuotaTracker::unlimited()),
        CancellationToken::new(),
    )
}
