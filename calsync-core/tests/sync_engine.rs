mod common;

use std::time::Duration;

use calsync_core::constants::DEFAULT_CATEGORY_SEPARATORS;
use calsync_core::engine::{Phase, Reconciler, RunOptions, SyncReport};
use calsync_core::record::{CategoryGroup, CategoryKey, EventRecord, group_by_category};
use calsync_core::retry::Executor;
use calsync_core::store::SyncStore;
use chrono::{Duration as ChronoDuration, Utc};
use chrono_tz::Europe::Paris;
use tokio::time::Instant;

use common::{FakeCalendar, executor, record, weekly};

fn options() -> RunOptions {
    RunOptions {
        pause_between_categories: Duration::from_secs(300),
        post_create_delay: Duration::from_millis(500),
        ..RunOptions::default()
    }
}

async fn run(
    remote: &FakeCalendar,
    store: &SyncStore,
    exec: &Executor,
    records: Vec<EventRecord>,
    options: &RunOptions,
) -> SyncReport {
    let groups: Vec<CategoryGroup> = group_by_category(records);
    Reconciler::new(remote, store, exec, Paris)
        .run(groups, options, &mut ())
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn new_category_is_created_and_fully_synced() {
    let remote = FakeCalendar::new();
    let store = SyncStore::open_in_memory().unwrap();
    let exec = executor();

    let report = run(&remote, &store, &exec, weekly("Optique — Sec6", 3), &options()).await;

    let outcome = &report.categories[0];
    assert_eq!(outcome.name, "Optique");
    assert!(outcome.calendar_created);
    assert_eq!(outcome.already_present, 0);
    assert_eq!(outcome.created, 3);
    assert_eq!(outcome.phase, Phase::Settled);

    let state = store.get_calendar_state("Optique").unwrap().unwrap();
    assert_eq!(state.expected_count, 3);
    assert_eq!(state.synced_count, 3);
    assert!(state.complete);
    assert!(state.last_sync.is_some());

    let calendar_id = remote.calendar_id("Optique").unwrap();
    assert_eq!(state.calendar_id, calendar_id);
    assert_eq!(remote.events(&calendar_id).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn resume_creates_only_missing_events() {
    let remote = FakeCalendar::new();
    let calendar_id = remote.add_calendar("Optique");
    remote.add_event(&calendar_id, "Optique — Sec6", "2026-03-02 08:30", "2026-03-02 10:30");
    remote.add_event(&calendar_id, "Optique — Sec6", "2026-03-09 08:30", "2026-03-09 10:30");

    let store = SyncStore::open_in_memory().unwrap();
    let exec = executor();
    let report = run(&remote, &store, &exec, weekly("Optique — Sec6", 5), &options()).await;

    let outcome = &report.categories[0];
    assert!(!outcome.calendar_created);
    assert_eq!(outcome.already_present, 2);
    assert_eq!(outcome.created, 3);
    assert_eq!(remote.calls().create_event, 3);
    assert_eq!(remote.events(&calendar_id).len(), 5);
    assert!(store.get_calendar_state("Optique").unwrap().unwrap().complete);
}

#[tokio::test(start_paused = true)]
async fn second_run_inserts_nothing() {
    let remote = FakeCalendar::new();
    let store = SyncStore::open_in_memory().unwrap();
    let exec = executor();
    let mut records = weekly("Optique — Sec6", 3);
    records.extend(weekly("Analyse 4 — Sec6", 2));

    let first = run(&remote, &store, &exec, records.clone(), &options()).await;
    assert_eq!(first.events_created(), 5);
    assert_eq!(first.calendars_created(), 2);

    let second = run(&remote, &store, &exec, records, &options()).await;
    assert_eq!(second.events_created(), 0);
    assert_eq!(second.calendars_created(), 0);
    assert_eq!(remote.calls().create_event, 5);
    assert_eq!(remote.calls().create_calendar, 2);

    for state in store.list_calendar_states().unwrap() {
        assert!(state.complete, "{} should stay complete", state.name);
    }
}

#[tokio::test(start_paused = true)]
async fn categories_run_in_lexical_order_with_pause_between() {
    let remote = FakeCalendar::new();
    let store = SyncStore::open_in_memory().unwrap();
    let exec = executor();
    let opts = RunOptions {
        post_create_delay: Duration::ZERO,
        ..options()
    };

    let mut records = weekly("Optique — Sec6", 1);
    records.extend(weekly("Analyse 4 — Sec6", 1));
    records.extend(weekly("Mécanique — Sec6", 1));

    let started = Instant::now();
    let report = run(&remote, &store, &exec, records, &opts).await;

    let names: Vec<&str> = report.categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Analyse 4", "Mécanique", "Optique"]);
    assert_eq!(remote.calendar_names(), vec!["Analyse 4", "Mécanique", "Optique"]);
    // Two pauses, none after the last category.
    assert_eq!(started.elapsed(), Duration::from_secs(600));
}

#[tokio::test(start_paused = true)]
async fn exhaustion_fails_category_but_not_run() {
    let remote = FakeCalendar::new();
    let store = SyncStore::open_in_memory().unwrap();
    let exec = executor();
    let mut records = weekly("Analyse 4 — Sec6", 2);
    records.extend(weekly("Optique — Sec6", 2));

    // First event of "Analyse 4" uses up every attempt.
    remote.fail_creates_with_quota(5);
    let report = run(&remote, &store, &exec, records, &options()).await;

    let analyse = &report.categories[0];
    assert_eq!(analyse.phase, Phase::Failed);
    assert!(analyse.error.as_deref().unwrap().contains("after 5 attempts"));
    assert_eq!(analyse.created, 0);

    let state = store.get_calendar_state("Analyse 4").unwrap().unwrap();
    assert!(!state.complete);
    assert_eq!(state.synced_count, 0);

    let optique = &report.categories[1];
    assert_eq!(optique.phase, Phase::Settled);
    assert!(optique.complete);
    assert_eq!(report.incomplete().count(), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_quota_errors_are_retried_transparently() {
    let remote = FakeCalendar::new();
    let store = SyncStore::open_in_memory().unwrap();
    let exec = executor();

    remote.fail_creates_with_quota(2);
    let report = run(&remote, &store, &exec, weekly("Optique — Sec6", 2), &options()).await;

    assert_eq!(report.events_created(), 2);
    assert!(report.categories[0].complete);
    assert_eq!(remote.calls().create_event, 4);
}

#[tokio::test(start_paused = true)]
async fn rejected_event_is_skipped_and_category_left_incomplete() {
    let remote = FakeCalendar::new();
    let store = SyncStore::open_in_memory().unwrap();
    let exec = executor();

    let mut records = weekly("Optique — Sec6", 2);
    records.push(record("Optique — Sec6 TP", "2026-03-03 14:00", "2026-03-03 16:00"));
    remote.reject_subject("Optique — Sec6 TP");

    let report = run(&remote, &store, &exec, records, &options()).await;

    let outcome = &report.categories[0];
    assert_eq!(outcome.phase, Phase::Settled);
    assert_eq!(outcome.created, 2);
    assert_eq!(outcome.failed_events, 1);
    assert_eq!(outcome.synced, 2);
    assert!(!outcome.complete);
    assert_eq!(remote.calls().create_event, 3);
}

#[tokio::test(start_paused = true)]
async fn repeated_schedule_rows_are_created_once() {
    let remote = FakeCalendar::new();
    let store = SyncStore::open_in_memory().unwrap();
    let exec = executor();

    let mut records = weekly("Optique — Sec6", 2);
    records.push(records[0].clone());

    let report = run(&remote, &store, &exec, records, &options()).await;
    let outcome = &report.categories[0];
    assert_eq!(outcome.expected, 2);
    assert_eq!(outcome.duplicate_rows, 1);
    assert_eq!(outcome.created, 2);
    assert_eq!(report.duplicates_skipped(), 1);
}

#[tokio::test(start_paused = true)]
async fn delete_existing_recreates_calendar_from_scratch() {
    let remote = FakeCalendar::new();
    let old_id = remote.add_calendar("Optique");
    remote.add_event(&old_id, "Optique — Sec6", "2026-03-02 08:30", "2026-03-02 10:30");
    remote.add_event(&old_id, "Stale", "2026-01-05 08:30", "2026-01-05 10:30");
    remote.add_calendar("Holidays in France");

    let store = SyncStore::open_in_memory().unwrap();
    let exec = executor();
    let opts = RunOptions {
        delete_existing: true,
        ..options()
    };

    let report = run(&remote, &store, &exec, weekly("Optique — Sec6", 2), &opts).await;

    assert_eq!(report.deleted_calendars, vec!["Optique".to_string()]);
    assert_eq!(remote.calls().delete_calendar, 1);
    let new_id = remote.calendar_id("Optique").unwrap();
    assert_ne!(new_id, old_id);
    assert_eq!(remote.events(&new_id).len(), 2);
    assert!(remote.calendar_names().contains(&"Holidays in France".to_string()));
    assert_eq!(store.event_count(&old_id).unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn dry_run_mutates_nothing() {
    let remote = FakeCalendar::new();
    let calendar_id = remote.add_calendar("Optique");
    remote.add_event(&calendar_id, "Optique — Sec6", "2026-03-02 08:30", "2026-03-02 10:30");

    let store = SyncStore::open_in_memory().unwrap();
    let exec = executor();
    let opts = RunOptions {
        dry_run: true,
        ..options()
    };

    let mut records = weekly("Optique — Sec6", 3);
    records.extend(weekly("Analyse 4 — Sec6", 2));
    let report = run(&remote, &store, &exec, records, &opts).await;

    assert!(report.dry_run);
    let analyse = &report.categories[0];
    assert!(analyse.calendar_created);
    assert_eq!(analyse.missing(), 2);

    let optique = &report.categories[1];
    assert_eq!(optique.already_present, 1);
    assert_eq!(optique.missing(), 2);

    let calls = remote.calls();
    assert_eq!(calls.create_calendar, 0);
    assert_eq!(calls.create_event, 0);
    assert!(store.list_calendar_states().unwrap().is_empty());
    assert_eq!(store.event_count(&calendar_id).unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn trusted_store_skips_remote_for_complete_categories() {
    let remote = FakeCalendar::new();
    let store = SyncStore::open_in_memory().unwrap();
    let exec = executor();
    let records = weekly("Optique — Sec6", 3);

    run(&remote, &store, &exec, records.clone(), &options()).await;
    let before = remote.calls();

    let opts = RunOptions {
        trust_store: true,
        ..options()
    };
    let report = run(&remote, &store, &exec, records.clone(), &opts).await;
    assert!(report.categories[0].trusted);
    assert_eq!(remote.calls().list_events, before.list_events);

    // A changed desired set is not trusted.
    let mut more = records;
    more.extend(weekly("Optique — Sec6 TD", 1));
    let report = run(&remote, &store, &exec, more, &opts).await;
    assert!(!report.categories[0].trusted);
    assert_eq!(report.events_created(), 1);
}

#[tokio::test(start_paused = true)]
async fn filter_limits_categories() {
    let remote = FakeCalendar::new();
    let store = SyncStore::open_in_memory().unwrap();
    let exec = executor();
    let opts = RunOptions {
        filter: Some("Opti".to_string()),
        ..options()
    };

    let mut records = weekly("Optique — Sec6", 1);
    records.extend(weekly("Analyse 4 — Sec6", 1));
    let report = run(&remote, &store, &exec, records, &opts).await;

    assert_eq!(report.categories.len(), 1);
    assert_eq!(remote.calendar_names(), vec!["Optique"]);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_pause_stops_between_categories() {
    let remote = FakeCalendar::new();
    let store = SyncStore::open_in_memory().unwrap();
    let exec = executor();
    let token = exec.cancel_token().clone();

    let mut records = weekly("Analyse 4 — Sec6", 1);
    records.extend(weekly("Optique — Sec6", 1));

    let canceller = async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        token.cancel();
    };
    let opts = options();
    let (report, _) = tokio::join!(run(&remote, &store, &exec, records, &opts), canceller);

    assert!(report.cancelled);
    assert_eq!(report.categories.len(), 1);
    assert!(store.get_calendar_state("Analyse 4").unwrap().unwrap().complete);
    assert!(store.get_calendar_state("Optique").unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn api_calls_are_counted() {
    let remote = FakeCalendar::new();
    let store = SyncStore::open_in_memory().unwrap();
    let exec = executor();

    let report = run(&remote, &store, &exec, weekly("Optique — Sec6", 3), &options()).await;

    let calls = remote.calls();
    let total = calls.list_calendars
        + calls.create_calendar
        + calls.list_events
        + calls.create_event;
    assert_eq!(report.api_calls, u64::from(total));
    assert_eq!(report.api_calls_remaining, None);
}

#[tokio::test(start_paused = true)]
async fn dry_run_with_delete_existing_plans_from_scratch() {
    let remote = FakeCalendar::new();
    let calendar_id = remote.add_calendar("Optique");
    remote.add_event(&calendar_id, "Optique — Sec6", "2026-03-02 08:30", "2026-03-02 10:30");
    remote.add_event(&calendar_id, "Optique — Sec6", "2026-03-09 08:30", "2026-03-09 10:30");

    let store = SyncStore::open_in_memory().unwrap();
    let exec = executor();
    let opts = RunOptions {
        dry_run: true,
        delete_existing: true,
        ..options()
    };

    let report = run(&remote, &store, &exec, weekly("Optique — Sec6", 3), &opts).await;

    assert_eq!(report.deleted_calendars, vec!["Optique".to_string()]);
    let outcome = &report.categories[0];
    assert!(outcome.calendar_created);
    assert_eq!(outcome.already_present, 0);
    assert_eq!(outcome.missing(), 3);

    let calls = remote.calls();
    assert_eq!(calls.delete_calendar, 0);
    assert_eq!(calls.list_events, 0);
    assert_eq!(remote.events(&calendar_id).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn exhausted_calendar_deletion_reports_categories_as_not_started() {
    let remote = FakeCalendar::new();
    let calendar_id = remote.add_calendar("Optique");
    remote.fail_calendar_deletes_with_quota(5);

    let store = SyncStore::open_in_memory().unwrap();
    let exec = executor();
    let opts = RunOptions {
        delete_existing: true,
        ..options()
    };

    let mut records = weekly("Optique — Sec6", 2);
    records.extend(weekly("Analyse 4 — Sec6", 1));
    let report = run(&remote, &store, &exec, records, &opts).await;

    assert!(report.deleted_calendars.is_empty());
    assert_eq!(report.categories.len(), 2);
    assert_eq!(report.failed().count(), 2);
    let optique = &report.categories[1];
    assert_eq!(optique.name, "Optique");
    assert_eq!(optique.expected, 2);
    assert!(optique.error.as_deref().unwrap().contains("not started"));

    assert_eq!(remote.calls().delete_calendar, 5);
    assert_eq!(remote.calls().create_event, 0);
    assert_eq!(remote.calendar_id("Optique"), Some(calendar_id));
}

#[tokio::test(start_paused = true)]
async fn refresh_lists_events_over_the_desired_span() {
    let remote = FakeCalendar::new();
    let store = SyncStore::open_in_memory().unwrap();
    let exec = executor();

    run(&remote, &store, &exec, weekly("Optique — Sec6", 2), &options()).await;

    let ranges = remote.listed_ranges();
    assert_eq!(ranges.len(), 1);
    // Europe/Paris is UTC+1 in early March.
    assert_eq!(ranges[0].from.unwrap().to_rfc3339(), "2026-03-02T07:30:00+00:00");
    assert_eq!(ranges[0].to.unwrap().to_rfc3339(), "2026-03-09T09:30:00+00:00");
}

#[tokio::test(start_paused = true)]
async fn empty_category_refreshes_the_coming_months() {
    let remote = FakeCalendar::new();
    let store = SyncStore::open_in_memory().unwrap();
    let exec = executor();
    let group = CategoryGroup {
        key: CategoryKey::from_subject("Optique", DEFAULT_CATEGORY_SEPARATORS),
        records: Vec::new(),
    };

    let before = Utc::now();
    let outcome = Reconciler::new(&remote, &store, &exec, Paris)
        .sync_category(&group, &options())
        .await
        .unwrap();
    let after = Utc::now();

    assert!(outcome.complete);
    let ranges = remote.listed_ranges();
    assert_eq!(ranges.len(), 1);
    let from = ranges[0].from.unwrap();
    let to = ranges[0].to.unwrap();
    assert!(before <= from && from <= after);
    assert_eq!(to - from, ChronoDuration::days(180));
}
