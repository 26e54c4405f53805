//! Duplicate scanner/pruner for remote calendars.
//!
//! Independent of the reconciliation engine: it only lists and deletes
//! remote events. Within each matching calendar, events sharing a
//! signature are grouped in listing order; every event after the first is a
//! duplicate.

use std::collections::HashSet;

use chrono_tz::Tz;

use crate::date_range::DateRange;
use crate::error::{CalSyncError, CalSyncResult};
use crate::record::Signature;
use crate::remote::{CalendarService, RemoteCalendar, RemoteEvent, fetch_all_calendars, fetch_all_events};
use crate::resolver::CalendarFilter;
use crate::retry::Executor;

#[derive(Debug, Clone, PartialEq)]
pub struct Duplicate {
    pub event_id: String,
    pub signature: Signature,
}

#[derive(Debug, Clone, Default)]
pub struct CalendarDedupe {
    pub name: String,
    pub calendar_id: String,
    pub scanned: usize,
    /// Events exempted by a protected keyword.
    pub protected: usize,
    pub duplicates: Vec<Duplicate>,
    pub deleted: usize,
    pub failed: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DedupeReport {
    pub calendars: Vec<CalendarDedupe>,
    /// Calendars not scanned because their name is protected.
    pub protected_calendars: Vec<String>,
    pub dry_run: bool,
}

impl DedupeReport {
    pub fn duplicates_found(&self) -> usize {
        self.calendars.iter().map(|c| c.duplicates.len()).sum()
    }

    pub fn deleted(&self) -> usize {
        self.calendars.iter().map(|c| c.deleted).sum()
    }
}

pub struct DuplicateScanner<'a, S> {
    service: &'a S,
    executor: &'a Executor,
    tz: Tz,
    protected_keywords: Vec<String>,
}

impl<'a, S: CalendarService> DuplicateScanner<'a, S> {
    pub fn new<K: AsRef<str>>(
        service: &'a S,
        executor: &'a Executor,
        tz: Tz,
        protected_keywords: &[K],
    ) -> Self {
        DuplicateScanner {
            service,
            executor,
            tz,
            protected_keywords: protected_keywords
                .iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Case-insensitive substring match against the protected keywords.
    pub fn is_protected(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.protected_keywords.iter().any(|k| text.contains(k.as_str()))
    }

    pub async fn scan(
        &self,
        filter: &CalendarFilter,
        range: &DateRange,
        dry_run: bool,
    ) -> CalSyncResult<DedupeReport> {
        let mut report = DedupeReport {
            dry_run,
            ..DedupeReport::default()
        };

        let mut calendars: Vec<RemoteCalendar> = fetch_all_calendars(self.service, self.executor)
            .await?
            .into_iter()
            .filter(|c| filter.matches(&c.name))
            .collect();
        calendars.sort_by(|a, b| a.name.cmp(&b.name));

        for calendar in calendars {
            if self.is_protected(&calendar.name) {
                tracing::debug!(calendar = %calendar.name, "Skipping protected calendar");
                report.protected_calendars.push(calendar.name);
                continue;
            }

            let mut result = CalendarDedupe {
                name: calendar.name.clone(),
                calendar_id: calendar.id.clone(),
                ..CalendarDedupe::default()
            };

            match self.prune_calendar(&calendar, range, dry_run, &mut result).await {
                Ok(()) => {}
                Err(CalSyncError::Cancelled) => return Err(CalSyncError::Cancelled),
                Err(e) => {
                    tracing::error!(calendar = %calendar.name, error = %e, "Dedupe failed");
                    result.error = Some(e.to_string());
                }
            }

            report.calendars.push(result);
        }

        tracing::info!(
            duplicates = report.duplicates_found(),
            deleted = report.deleted(),
            dry_run,
            "Dedupe finished"
        );
        Ok(report)
    }

    async fn prune_calendar(
        &self,
        calendar: &RemoteCalendar,
        range: &DateRange,
        dry_run: bool,
        result: &mut CalendarDedupe,
    ) -> CalSyncResult<()> {
        let events = fetch_all_events(self.service, self.executor, &calendar.id, range).await?;
        result.scanned = events.len();
        result.duplicates = self.find_duplicates(&events, &mut result.protected);

        if dry_run {
            return Ok(());
        }

        let service = self.service;
        let calendar_id = calendar.id.as_str();
        for duplicate in &result.duplicates {
            let event_id = duplicate.event_id.as_str();
            let deleted = self
                .executor
                .execute(&format!("delete duplicate {}", duplicate.signature), move || {
                    service.delete_event(calendar_id, event_id)
                })
                .await;

            match deleted {
                Ok(()) => result.deleted += 1,
                Err(err @ (CalSyncError::SyncExhausted { .. } | CalSyncError::Cancelled)) => {
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(calendar = %calendar.name, event_id, error = %err, "Delete failed");
                    result.failed += 1;
                }
            }
        }

        Ok(())
    }

    /// Every event beyond the first per signature, in listing order.
    fn find_duplicates(&self, events: &[RemoteEvent], protected: &mut usize) -> Vec<Duplicate> {
        let mut seen: HashSet<Signature> = HashSet::new();
        let mut duplicates = Vec::new();

        for event in events {
            if self.is_protected(&event.summary) {
                *protected += 1;
                continue;
            }
            let Some(signature) = event.signature(self.tz) else {
                tracing::debug!(event_id = %event.id, "Skipping event with unreadable times");
                continue;
            };
            if seen.contains(&signature) {
                duplicates.push(Duplicate {
                    event_id: event.id.clone(),
                    signature,
                });
            } else {
                seen.insert(signature);
            }
        }

        duplicates
    }
}
