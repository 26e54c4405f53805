//! Schedule source: Google Calendar import-format CSV.
//!
//! Columns: `Subject`, `Start Date`, `Start Time`, `End Date`, `End Time`,
//! `All Day Event`, `Description`. Rows whose dates or times do not parse
//! are skipped and reported rather than failing the load.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::error::{CalSyncError, CalSyncResult};
use crate::record::{CategoryKey, EventRecord, EventTime, Signature};

const DATE_FORMAT: &str = "%m/%d/%Y";
const DATE_TIME_FORMAT: &str = "%m/%d/%Y %I:%M %p";

#[derive(Debug, Deserialize)]
struct ScheduleRow {
    #[serde(rename = "Subject", default)]
    subject: String,
    #[serde(rename = "Start Date", default)]
    start_date: String,
    #[serde(rename = "Start Time", default)]
    start_time: String,
    #[serde(rename = "End Date", default)]
    end_date: String,
    #[serde(rename = "End Time", default)]
    end_time: String,
    #[serde(rename = "All Day Event", default)]
    all_day: String,
    #[serde(rename = "Description", default)]
    description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: String,
}

/// Parsed schedule, records in file order.
#[derive(Debug, Default)]
pub struct Schedule {
    pub records: Vec<EventRecord>,
    pub skipped: Vec<SkippedRow>,
}

impl Schedule {
    pub fn load<S: AsRef<str>>(path: &Path, separators: &[S]) -> CalSyncResult<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            CalSyncError::Schedule(format!("Could not open {}: {}", path.display(), e))
        })?;
        Self::from_reader(file, separators)
    }

    pub fn from_reader<R: Read, S: AsRef<str>>(reader: R, separators: &[S]) -> CalSyncResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers = reader
            .headers()
            .map_err(|e| CalSyncError::Schedule(e.to_string()))?
            .clone();

        let mut schedule = Schedule::default();
        for result in reader.records() {
            let raw = match result {
                Ok(raw) => raw,
                Err(e) => {
                    let line = e.position().map_or(0, |p| p.line());
                    schedule.skip(line, e.to_string());
                    continue;
                }
            };
            let line = raw.position().map_or(0, |p| p.line());

            let row: ScheduleRow = match raw.deserialize(Some(&headers)) {
                Ok(row) => row,
                Err(e) => {
                    schedule.skip(line, e.to_string());
                    continue;
                }
            };

            match parse_row(row, separators) {
                Ok(record) => schedule.records.push(record),
                Err(reason) => schedule.skip(line, reason),
            }
        }

        Ok(schedule)
    }

    fn skip(&mut self, line: u64, reason: String) {
        tracing::warn!(line, %reason, "Skipping schedule row");
        self.skipped.push(SkippedRow { line, reason });
    }

    pub fn audit(&self) -> ScheduleAudit {
        let mut audit = ScheduleAudit {
            skipped: self.skipped.clone(),
            ..ScheduleAudit::default()
        };
        let mut seen: HashMap<Signature, usize> = HashMap::new();

        for (index, record) in self.records.iter().enumerate() {
            *audit
                .by_category
                .entry(record.category.as_str().to_string())
                .or_default() += 1;

            let subject = record.subject.as_str();
            if !subject.contains("Sec") && !subject.to_lowercase().contains("semaine") {
                audit.missing_section.push(subject.to_string());
            }

            let signature = record.signature();
            if let Some(first) = seen.get(&signature) {
                audit.duplicates.push(DuplicateRow {
                    first_index: *first,
                    index,
                    signature,
                });
            } else {
                seen.insert(signature, index);
            }
        }

        audit
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateRow {
    /// Position among parsed records of the first occurrence.
    pub first_index: usize,
    pub index: usize,
    pub signature: Signature,
}

/// Validation report for a schedule, before anything is uploaded.
#[derive(Debug, Default)]
pub struct ScheduleAudit {
    pub by_category: BTreeMap<String, usize>,
    pub duplicates: Vec<DuplicateRow>,
    /// Subjects with no section tag.
    pub missing_section: Vec<String>,
    pub skipped: Vec<SkippedRow>,
}

impl ScheduleAudit {
    pub fn issue_count(&self) -> usize {
        self.duplicates.len() + self.missing_section.len() + self.skipped.len()
    }
}

fn parse_row<S: AsRef<str>>(row: ScheduleRow, separators: &[S]) -> Result<EventRecord, String> {
    let all_day = matches!(
        row.all_day.to_lowercase().as_str(),
        "true" | "1" | "yes"
    );

    let (start, end) = if all_day {
        (
            EventTime::Date(parse_date(&row.start_date)?),
            EventTime::Date(parse_date(&row.end_date)?),
        )
    } else {
        (
            EventTime::DateTime(parse_date_time(&row.start_date, &row.start_time)?),
            EventTime::DateTime(parse_date_time(&row.end_date, &row.end_time)?),
        )
    };

    Ok(EventRecord {
        category: CategoryKey::from_subject(&row.subject, separators),
        subject: row.subject,
        start,
        end,
        all_day,
        description: row.description,
    })
}

fn parse_date(date: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|e| format!("bad date '{date}': {e}"))
}

fn parse_date_time(date: &str, time: &str) -> Result<NaiveDateTime, String> {
    let raw = format!("{date} {time}");
    NaiveDateTime::parse_from_str(&raw, DATE_TIME_FORMAT)
        .map_err(|e| format!("bad date/time '{raw}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_CATEGORY_SEPARATORS;
    use std::io::Write;

    const HEADER: &str =
        "Subject,Start Date,Start Time,End Date,End Time,All Day Event,Description\n";

    fn parse(body: &str) -> Schedule {
        let csv = format!("{HEADER}{body}");
        Schedule::from_reader(csv.as_bytes(), DEFAULT_CATEGORY_SEPARATORS).unwrap()
    }

    #[test]
    fn test_timed_and_all_day_rows() {
        let schedule = parse(
            "Optique — Sec6,03/02/2026,08:30 AM,03/02/2026,10:30 AM,False,Week 1\n\
             Semaine de révision,04/06/2026,,04/10/2026,,True,\n",
        );

        assert_eq!(schedule.records.len(), 2);
        assert!(schedule.skipped.is_empty());

        let timed = &schedule.records[0];
        assert_eq!(timed.category.as_str(), "Optique");
        assert_eq!(timed.start.normalized(), "2026-03-02T08:30:00");
        assert!(!timed.all_day);

        let all_day = &schedule.records[1];
        assert!(all_day.all_day);
        assert_eq!(all_day.end.normalized(), "2026-04-10");
    }

    #[test]
    fn test_pm_times_convert_to_24h() {
        let schedule = parse("Analyse 4 — Sec6,03/02/2026,02:30 PM,03/02/2026,04:30 PM,false,\n");
        assert_eq!(schedule.records[0].end.normalized(), "2026-03-02T16:30:00");
    }

    #[test]
    fn test_unparseable_rows_are_skipped_with_line() {
        let schedule = parse(
            "Optique — Sec6,2026-03-02,08:30 AM,03/02/2026,10:30 AM,False,\n\
             Optique — Sec6,03/09/2026,08:30 AM,03/09/2026,10:30 AM,False,\n\
             Optique — Sec6,03/16/2026,25:00 PM,03/16/2026,10:30 AM,False,\n",
        );

        assert_eq!(schedule.records.len(), 1);
        let lines: Vec<u64> = schedule.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![2, 4]);
    }

    #[test]
    fn test_audit_counts_and_duplicates() {
        let schedule = parse(
            "Optique — Sec6,03/02/2026,08:30 AM,03/02/2026,10:30 AM,False,\n\
             Optique — Sec6,03/02/2026,08:30 AM,03/02/2026,10:30 AM,False,\n\
             Savoir être,03/03/2026,08:30 AM,03/03/2026,10:30 AM,False,\n\
             broken,xx,,xx,,False,\n",
        );

        let audit = schedule.audit();
        assert_eq!(audit.by_category.get("Optique"), Some(&2));
        assert_eq!(audit.by_category.get("Savoir être"), Some(&1));
        assert_eq!(audit.duplicates.len(), 1);
        assert_eq!(audit.duplicates[0].first_index, 0);
        assert_eq!(audit.missing_section, vec!["Savoir être".to_string()]);
        assert_eq!(audit.skipped.len(), 1);
        assert_eq!(audit.issue_count(), 3);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{HEADER}Optique — Sec6,03/02/2026,08:30 AM,03/02/2026,10:30 AM,False,\n"
        )
        .unwrap();

        let schedule = Schedule::load(file.path(), DEFAULT_CATEGORY_SEPARATORS).unwrap();
        assert_eq!(schedule.records.len(), 1);
    }

    #[test]
    fn test_missing_file_is_schedule_error() {
        let err = Schedule::load(Path::new("/nonexistent/schedule.csv"), DEFAULT_CATEGORY_SEPARATORS)
            .unwrap_err();
        assert!(matches!(err, CalSyncError::Schedule(_)));
    }
}
