mod common;

use calsync_core::constants::DEFAULT_PROTECTED_KEYWORDS;
use calsync_core::date_range::DateRange;
use calsync_core::dedupe::DuplicateScanner;
use calsync_core::resolver::CalendarFilter;
use chrono_tz::Europe::Paris;

use common::{FakeCalendar, executor};

fn scanner<'a>(
    remote: &'a FakeCalendar,
    exec: &'a calsync_core::retry::Executor,
) -> DuplicateScanner<'a, FakeCalendar> {
    DuplicateScanner::new(remote, exec, Paris, DEFAULT_PROTECTED_KEYWORDS)
}

/// Calendar with one plain duplicate pair, a protected duplicate pair and a
/// singleton.
fn seeded() -> (FakeCalendar, String, String) {
    let remote = FakeCalendar::new();
    let id = remote.add_calendar("Optique");
    remote.add_event(&id, "Optique — Sec6", "2026-03-02 08:30", "2026-03-02 10:30");
    let dup = remote.add_event(&id, "Optique — Sec6 ", "2026-03-02 08:30", "2026-03-02 10:30");
    remote.add_event(&id, "Holiday: Easter Monday", "2026-04-06 00:00", "2026-04-07 00:00");
    remote.add_event(&id, "Holiday: Easter Monday", "2026-04-06 00:00", "2026-04-07 00:00");
    remote.add_event(&id, "Optique — Sec6", "2026-03-09 08:30", "2026-03-09 10:30");
    (remote, id, dup)
}

#[tokio::test(start_paused = true)]
async fn prunes_plain_duplicates_and_spares_protected_ones() {
    let (remote, id, dup) = seeded();
    let exec = executor();

    let report = scanner(&remote, &exec)
        .scan(&CalendarFilter::new(None).unwrap(), &DateRange::default(), false)
        .await
        .unwrap();

    assert_eq!(report.duplicates_found(), 1);
    assert_eq!(report.deleted(), 1);

    let calendar = &report.calendars[0];
    assert_eq!(calendar.scanned, 5);
    assert_eq!(calendar.protected, 2);
    assert_eq!(calendar.duplicates[0].event_id, dup);

    let remaining = remote.events(&id);
    assert_eq!(remaining.len(), 4);
    assert!(remaining.iter().all(|e| e.id != dup));
    assert_eq!(
        remaining.iter().filter(|e| e.summary.starts_with("Holiday")).count(),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn dry_run_only_reports() {
    let (remote, id, _) = seeded();
    let exec = executor();

    let report = scanner(&remote, &exec)
        .scan(&CalendarFilter::new(None).unwrap(), &DateRange::default(), true)
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.duplicates_found(), 1);
    assert_eq!(report.deleted(), 0);
    assert_eq!(remote.calls().delete_event, 0);
    assert_eq!(remote.events(&id).len(), 5);
}

#[tokio::test(start_paused = true)]
async fn protected_and_unmatched_calendars_are_not_scanned() {
    let (remote, _, _) = seeded();
    let holidays = remote.add_calendar("Holidays in France");
    remote.add_event(&holidays, "Easter", "2026-04-06 00:00", "2026-04-07 00:00");
    remote.add_event(&holidays, "Easter", "2026-04-06 00:00", "2026-04-07 00:00");
    let other = remote.add_calendar("Analyse 4");
    remote.add_event(&other, "Analyse 4", "2026-03-02 08:30", "2026-03-02 10:30");
    remote.add_event(&other, "Analyse 4", "2026-03-02 08:30", "2026-03-02 10:30");
    let exec = executor();

    let report = scanner(&remote, &exec)
        .scan(&CalendarFilter::new(Some("o")).unwrap(), &DateRange::default(), false)
        .await
        .unwrap();

    // "o" matches "Optique" and "Holidays in France" but not "Analyse 4".
    let names: Vec<&str> = report.calendars.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Optique"]);
    assert_eq!(report.protected_calendars, vec!["Holidays in France".to_string()]);
    assert_eq!(remote.events(&holidays).len(), 2);
    assert_eq!(remote.events(&other).len(), 2);
}
