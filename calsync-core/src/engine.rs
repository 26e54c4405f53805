//! Reconciliation of desired category groups against remote calendars.
//!
//! Categories are processed one at a time in lexical order, with a pause
//! between them. Each category moves through
//! [`Phase::Resolving`] → [`Phase::Refreshing`] → [`Phase::Diffing`] →
//! [`Phase::Uploading`] → [`Phase::Settled`], or ends in [`Phase::Failed`].

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use chrono_tz::Tz;

use crate::constants::EMPTY_REFRESH_DAYS;
use crate::date_range::DateRange;
use crate::error::{CalSyncError, CalSyncResult};
use crate::record::{CategoryGroup, EventRecord, Signature};
use crate::remote::{CalendarService, NewEvent, RemoteCalendar, fetch_all_calendars, fetch_all_events};
use crate::resolver::CalendarResolver;
use crate::retry::Executor;
use crate::store::{CalendarSyncState, SyncStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resolving,
    Refreshing,
    Diffing,
    Uploading,
    Settled,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Resolving => "resolving",
            Phase::Refreshing => "refreshing",
            Phase::Diffing => "diffing",
            Phase::Uploading => "uploading",
            Phase::Settled => "settled",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Operator controls for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Only categories whose key contains this substring.
    pub filter: Option<String>,
    /// Delete matching remote calendars and their stored rows first.
    pub delete_existing: bool,
    /// Report what would change without touching remote or store.
    pub dry_run: bool,
    /// Skip categories the store already marks complete for the same
    /// desired set.
    pub trust_store: bool,
    pub pause_between_categories: Duration,
    pub post_create_delay: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            filter: None,
            delete_existing: false,
            dry_run: false,
            trust_store: false,
            pause_between_categories: Duration::from_secs(300),
            post_create_delay: Duration::from_millis(500),
        }
    }
}

/// What happened to one category.
#[derive(Debug, Clone)]
pub struct CategoryOutcome {
    pub name: String,
    pub calendar_id: Option<String>,
    pub calendar_created: bool,
    pub phase: Phase,
    /// Distinct desired signatures.
    pub expected: usize,
    /// Schedule rows dropped because their signature repeats.
    pub duplicate_rows: usize,
    /// Desired signatures already present before uploading.
    pub already_present: usize,
    pub created: usize,
    pub failed_events: usize,
    pub synced: usize,
    pub complete: bool,
    /// Settled from the store without touching the remote.
    pub trusted: bool,
    pub error: Option<String>,
}

impl CategoryOutcome {
    fn new(name: &str) -> Self {
        CategoryOutcome {
            name: name.to_string(),
            calendar_id: None,
            calendar_created: false,
            phase: Phase::Resolving,
            expected: 0,
            duplicate_rows: 0,
            already_present: 0,
            created: 0,
            failed_events: 0,
            synced: 0,
            complete: false,
            trusted: false,
            error: None,
        }
    }

    /// Events still missing after this pass (or, in a dry run, to create).
    pub fn missing(&self) -> usize {
        self.expected.saturating_sub(self.synced)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub categories: Vec<CategoryOutcome>,
    pub deleted_calendars: Vec<String>,
    pub dry_run: bool,
    pub cancelled: bool,
    pub api_calls: u64,
    pub api_calls_remaining: Option<u64>,
}

impl SyncReport {
    pub fn calendars_created(&self) -> usize {
        self.categories.iter().filter(|c| c.calendar_created).count()
    }

    pub fn events_created(&self) -> usize {
        self.categories.iter().map(|c| c.created).sum()
    }

    pub fn duplicates_skipped(&self) -> usize {
        self.categories
            .iter()
            .map(|c| c.duplicate_rows + c.already_present)
            .sum()
    }

    pub fn incomplete(&self) -> impl Iterator<Item = &CategoryOutcome> {
        self.categories.iter().filter(|c| !c.complete)
    }

    pub fn failed(&self) -> impl Iterator<Item = &CategoryOutcome> {
        self.categories.iter().filter(|c| c.phase == Phase::Failed)
    }
}

/// Hooks for presenting progress; all methods default to doing nothing.
pub trait Progress {
    fn category_started(&mut self, _index: usize, _total: usize, _name: &str) {}
    fn category_finished(&mut self, _outcome: &CategoryOutcome) {}
    fn calendar_deleted(&mut self, _name: &str) {}
    fn pausing(&mut self, _duration: Duration) {}
}

impl Progress for () {}

pub struct Reconciler<'a, S> {
    service: &'a S,
    store: &'a SyncStore,
    executor: &'a Executor,
    tz: Tz,
}

impl<'a, S: CalendarService> Reconciler<'a, S> {
    pub fn new(service: &'a S, store: &'a SyncStore, executor: &'a Executor, tz: Tz) -> Self {
        Reconciler {
            service,
            store,
            executor,
            tz,
        }
    }

    fn resolver(&self) -> CalendarResolver<'a, S> {
        CalendarResolver::new(self.service, self.executor, self.tz.name())
    }

    /// Reconcile every group, in order, sequentially.
    ///
    /// Only the initial calendar listing and local store failures can fail
    /// the whole run; per-category failures are recorded in the report.
    pub async fn run<P: Progress>(
        &self,
        groups: Vec<CategoryGroup>,
        options: &RunOptions,
        progress: &mut P,
    ) -> CalSyncResult<SyncReport> {
        let mut groups: Vec<CategoryGroup> = match &options.filter {
            Some(filter) => groups
                .into_iter()
                .filter(|g| g.key.as_str().contains(filter.as_str()))
                .collect(),
            None => groups,
        };
        groups.sort_by(|a, b| a.key.cmp(&b.key));

        let mut report = SyncReport {
            dry_run: options.dry_run,
            ..SyncReport::default()
        };

        let calendars = fetch_all_calendars(self.service, self.executor).await?;
        tracing::info!(
            categories = groups.len(),
            remote_calendars = calendars.len(),
            dry_run = options.dry_run,
            "Starting sync"
        );

        if options.delete_existing {
            let desired: HashSet<&str> = groups.iter().map(|g| g.key.as_str()).collect();
            let doomed: Vec<RemoteCalendar> = calendars
                .into_iter()
                .filter(|c| desired.contains(c.name.as_str()))
                .collect();

            if options.dry_run {
                report.deleted_calendars = doomed.into_iter().map(|c| c.name).collect();
            } else {
                match delete_calendars(self.service, self.executor, self.store, &doomed).await {
                    Ok(deleted) => {
                        for name in &deleted {
                            progress.calendar_deleted(name);
                        }
                        report.deleted_calendars = deleted;
                    }
                    Err(CalSyncError::Cancelled) => {
                        report.cancelled = true;
                        self.finish(&mut report);
                        return Ok(report);
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "Calendar deletion stopped, skipping all categories");
                        report.categories = groups
                            .iter()
                            .map(|group| skipped_outcome(group, &err))
                            .collect();
                        self.finish(&mut report);
                        return Ok(report);
                    }
                }
                for name in &desired {
                    self.store.delete_calendar(name)?;
                }
            }
        }

        let total = groups.len();
        for (index, group) in groups.iter().enumerate() {
            progress.category_started(index + 1, total, group.key.as_str());

            match self.sync_category(group, options).await {
                Ok(outcome) => {
                    progress.category_finished(&outcome);
                    report.categories.push(outcome);
                }
                Err(CalSyncError::Cancelled) => {
                    report.cancelled = true;
                    break;
                }
                Err(e) => return Err(e),
            }

            if index + 1 < total && !options.dry_run {
                progress.pausing(options.pause_between_categories);
                if self
                    .executor
                    .sleep(options.pause_between_categories)
                    .await
                    .is_err()
                {
                    report.cancelled = true;
                    break;
                }
            }
        }

        self.finish(&mut report);
        tracing::info!(
            calendars_created = report.calendars_created(),
            events_created = report.events_created(),
            incomplete = report.incomplete().count(),
            cancelled = report.cancelled,
            api_calls = report.api_calls,
            "Sync finished"
        );
        Ok(report)
    }

    fn finish(&self, report: &mut SyncReport) {
        report.api_calls = self.executor.quota().used();
        report.api_calls_remaining = self.executor.quota().remaining();
    }

    /// Drive one category to Settled or Failed.
    ///
    /// Only cancellation is returned as an error; every other failure is
    /// recorded on the outcome after persisting what was confirmed so far.
    pub async fn sync_category(
        &self,
        group: &CategoryGroup,
        options: &RunOptions,
    ) -> CalSyncResult<CategoryOutcome> {
        let name = group.key.as_str();
        let mut outcome = CategoryOutcome::new(name);
        let desired = unique_records(&group.records);
        outcome.expected = desired.len();
        outcome.duplicate_rows = group.records.len() - desired.len();

        let result = if options.dry_run {
            self.plan_category(group, &desired, options, &mut outcome).await
        } else {
            self.reconcile_category(group, &desired, options, &mut outcome)
                .await
        };

        match result {
            Ok(()) => Ok(outcome),
            Err(err) => {
                let cancelled = matches!(err, CalSyncError::Cancelled);
                if !cancelled {
                    tracing::error!(category = name, phase = %outcome.phase, error = %err, "Category failed");
                    outcome.error = Some(err.to_string());
                    outcome.phase = Phase::Failed;
                }
                if !options.dry_run {
                    self.persist_progress(&desired, &mut outcome);
                }
                if cancelled { Err(err) } else { Ok(outcome) }
            }
        }
    }

    async fn reconcile_category(
        &self,
        group: &CategoryGroup,
        desired: &[&EventRecord],
        options: &RunOptions,
        outcome: &mut CategoryOutcome,
    ) -> CalSyncResult<()> {
        let name = group.key.as_str();
        let wanted: HashSet<Signature> = desired.iter().map(|r| r.signature()).collect();

        if options.trust_store && self.store_says_complete(name, &wanted)? {
            tracing::info!(category = name, "Store marks category complete, skipping");
            outcome.trusted = true;
            outcome.complete = true;
            outcome.synced = outcome.expected;
            outcome.already_present = outcome.expected;
            outcome.phase = Phase::Settled;
            return Ok(());
        }

        outcome.phase = Phase::Resolving;
        let (calendar_id, created) = self.resolver().resolve(name).await?;
        outcome.calendar_id = Some(calendar_id.clone());
        outcome.calendar_created = created;
        self.store.upsert_calendar_state(&CalendarSyncState::resolved(
            name,
            &calendar_id,
            outcome.expected as u64,
        ))?;

        outcome.phase = Phase::Refreshing;
        let range = self.refresh_range(group);
        let remote = fetch_all_events(self.service, self.executor, &calendar_id, &range).await?;
        let discovered = self.store.record_events(
            &calendar_id,
            name,
            remote
                .iter()
                .filter_map(|ev| ev.signature(self.tz).map(|sig| (sig, Some(ev.id.as_str())))),
        )?;
        tracing::debug!(category = name, listed = remote.len(), discovered, "Refreshed remote events");

        outcome.phase = Phase::Diffing;
        let existing = self.store.existing_signatures(&calendar_id)?;
        let missing: Vec<&EventRecord> = desired
            .iter()
            .copied()
            .filter(|r| !existing.contains(&r.signature()))
            .collect();
        outcome.already_present = desired.len() - missing.len();
        tracing::info!(
            category = name,
            expected = desired.len(),
            missing = missing.len(),
            "Computed missing events"
        );

        if !missing.is_empty() {
            outcome.phase = Phase::Uploading;
            self.upload(name, &calendar_id, &missing, options, outcome)
                .await?;
        }

        self.settle(name, &calendar_id, &wanted, outcome)?;
        outcome.phase = Phase::Settled;
        Ok(())
    }

    async fn upload(
        &self,
        name: &str,
        calendar_id: &str,
        missing: &[&EventRecord],
        options: &RunOptions,
        outcome: &mut CategoryOutcome,
    ) -> CalSyncResult<()> {
        let service = self.service;

        for record in missing {
            if self.executor.is_cancelled() {
                return Err(CalSyncError::Cancelled);
            }

            let payload = NewEvent::from_record(record, self.tz);
            let label = format!("insert {}", record.subject.trim());
            let payload_ref = &payload;
            let result = self
                .executor
                .execute(&label, move || service.create_event(calendar_id, payload_ref))
                .await;

            match result {
                Ok(created) => {
                    self.store.record_event(
                        calendar_id,
                        name,
                        &record.signature(),
                        Some(created.id.as_str()),
                    )?;
                    outcome.created += 1;
                    self.executor.sleep(options.post_create_delay).await?;
                }
                Err(err @ (CalSyncError::SyncExhausted { .. } | CalSyncError::Cancelled)) => {
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(
                        category = name,
                        event = %record.signature(),
                        error = %err,
                        "Event create failed, skipping"
                    );
                    outcome.failed_events += 1;
                }
            }
        }

        Ok(())
    }

    /// Dry run: compare against a fresh listing, write nothing.
    async fn plan_category(
        &self,
        group: &CategoryGroup,
        desired: &[&EventRecord],
        options: &RunOptions,
        outcome: &mut CategoryOutcome,
    ) -> CalSyncResult<()> {
        let name = group.key.as_str();

        outcome.phase = Phase::Resolving;
        // A calendar named after the category would be deleted first.
        let calendar = if options.delete_existing {
            None
        } else {
            self.resolver().find(name).await?
        };
        let Some(calendar) = calendar else {
            outcome.calendar_created = true;
            outcome.phase = Phase::Settled;
            return Ok(());
        };
        outcome.calendar_id = Some(calendar.id.clone());

        outcome.phase = Phase::Refreshing;
        let range = self.refresh_range(group);
        let remote = fetch_all_events(self.service, self.executor, &calendar.id, &range).await?;
        let existing: HashSet<Signature> = remote.iter().filter_map(|ev| ev.signature(self.tz)).collect();

        outcome.phase = Phase::Diffing;
        outcome.already_present = desired
            .iter()
            .filter(|r| existing.contains(&r.signature()))
            .count();
        outcome.synced = outcome.already_present;
        outcome.complete = outcome.synced == outcome.expected;
        outcome.phase = Phase::Settled;
        Ok(())
    }

    fn refresh_range(&self, group: &CategoryGroup) -> DateRange {
        group.span(self.tz).unwrap_or_else(|| {
            let now = Utc::now();
            DateRange {
                from: Some(now),
                to: Some(now + ChronoDuration::days(EMPTY_REFRESH_DAYS)),
            }
        })
    }

    fn store_says_complete(&self, name: &str, wanted: &HashSet<Signature>) -> CalSyncResult<bool> {
        let Some(state) = self.store.get_calendar_state(name)? else {
            return Ok(false);
        };
        if !state.complete || state.expected_count != wanted.len() as u64 {
            return Ok(false);
        }
        let existing = self.store.existing_signatures(&state.calendar_id)?;
        Ok(wanted.is_subset(&existing))
    }

    fn settle(
        &self,
        name: &str,
        calendar_id: &str,
        wanted: &HashSet<Signature>,
        outcome: &mut CategoryOutcome,
    ) -> CalSyncResult<()> {
        let existing = self.store.existing_signatures(calendar_id)?;
        outcome.synced = wanted.intersection(&existing).count();
        outcome.complete = outcome.synced == wanted.len();

        self.store.upsert_calendar_state(&CalendarSyncState {
            name: name.to_string(),
            calendar_id: calendar_id.to_string(),
            expected_count: wanted.len() as u64,
            synced_count: outcome.synced as u64,
            complete: outcome.complete,
            last_sync: Some(Utc::now()),
        })?;

        tracing::info!(
            category = name,
            created = outcome.created,
            synced = outcome.synced,
            expected = wanted.len(),
            complete = outcome.complete,
            "Category settled"
        );
        Ok(())
    }

    /// Record what was confirmed before an abort, marked incomplete.
    fn persist_progress(&self, desired: &[&EventRecord], outcome: &mut CategoryOutcome) {
        let Some(calendar_id) = outcome.calendar_id.clone() else {
            return;
        };
        let wanted: HashSet<Signature> = desired.iter().map(|r| r.signature()).collect();

        let result = self.store.existing_signatures(&calendar_id).and_then(|existing| {
            outcome.synced = wanted.intersection(&existing).count();
            outcome.complete = false;
            self.store.upsert_calendar_state(&CalendarSyncState {
                name: outcome.name.clone(),
                calendar_id: calendar_id.clone(),
                expected_count: wanted.len() as u64,
                synced_count: outcome.synced as u64,
                complete: false,
                last_sync: Some(Utc::now()),
            })
        });

        if let Err(e) = result {
            tracing::error!(category = %outcome.name, error = %e, "Could not persist partial progress");
        }
    }
}

/// Delete remote calendars and clear their stored rows.
///
/// Permanent failures are logged and skipped; quota exhaustion and
/// cancellation stop the loop. Returns the names actually deleted.
pub async fn delete_calendars<S: CalendarService>(
    service: &S,
    executor: &Executor,
    store: &SyncStore,
    calendars: &[RemoteCalendar],
) -> CalSyncResult<Vec<String>> {
    let mut deleted = Vec::new();

    for calendar in calendars {
        let calendar_id = calendar.id.as_str();
        let result = executor
            .execute(&format!("delete calendar {}", calendar.name), move || {
                service.delete_calendar(calendar_id)
            })
            .await;

        match result {
            Ok(()) => {
                store.delete_calendar(&calendar.name)?;
                tracing::info!(calendar = %calendar.name, id = calendar_id, "Deleted calendar");
                deleted.push(calendar.name.clone());
            }
            Err(err @ (CalSyncError::SyncExhausted { .. } | CalSyncError::Cancelled)) => {
                return Err(err);
            }
            Err(err) => {
                tracing::warn!(calendar = %calendar.name, error = %err, "Calendar delete failed");
            }
        }
    }

    Ok(deleted)
}

/// Outcome for a category that was never started.
fn skipped_outcome(group: &CategoryGroup, err: &CalSyncError) -> CategoryOutcome {
    let mut outcome = CategoryOutcome::new(group.key.as_str());
    outcome.expected = unique_records(&group.records).len();
    outcome.duplicate_rows = group.records.len() - outcome.expected;
    outcome.phase = Phase::Failed;
    outcome.error = Some(format!("not started: {err}"));
    outcome
}

/// First record for each distinct signature, in source order.
fn unique_records(records: &[EventRecord]) -> Vec<&EventRecord> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.signature()))
        .collect()
}
