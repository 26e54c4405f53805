//! Terminal rendering for calsync-core results.
//!
//! Extension traits that add colored output to core types using owo_colors.

use calsync_core::dedupe::{CalendarDedupe, DedupeReport};
use calsync_core::engine::{CategoryOutcome, SyncReport};
use calsync_core::schedule::ScheduleAudit;
use calsync_core::store::CalendarSyncState;
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

pub fn pluralize(word: &str, count: usize) -> String {
    match (count, word.strip_suffix('y')) {
        (1, _) => word.to_string(),
        (_, Some(stem)) => format!("{}ies", stem),
        (_, None) => format!("{}s", word),
    }
}

impl Render for CategoryOutcome {
    fn render(&self) -> String {
        let mut lines = vec![format!("📅 {}", self.name)];

        if let Some(error) = &self.error {
            lines.push(format!(
                "   {} {} ({} of {} synced)",
                "✗".red(),
                error.red(),
                self.synced,
                self.expected
            ));
            return lines.join("\n");
        }

        if self.trusted {
            lines.push(format!(
                "   {}",
                format!("complete in local state, {} events", self.expected).dimmed()
            ));
            return lines.join("\n");
        }

        if self.calendar_created {
            lines.push(format!("   {} {}", "+".green(), "new calendar".green()));
        }
        if self.created > 0 {
            let label = format!("{} {} created", self.created, pluralize("event", self.created));
            lines.push(format!("   {} {}", "+".green(), label.green()));
        }
        if self.failed_events > 0 {
            let label = format!(
                "{} {} rejected",
                self.failed_events,
                pluralize("event", self.failed_events)
            );
            lines.push(format!("   {} {}", "!".yellow(), label.yellow()));
        }
        if self.missing() > 0 {
            let label = format!("{} {} missing", self.missing(), pluralize("event", self.missing()));
            lines.push(format!("   {} {}", "~".yellow(), label.yellow()));
        }

        let status = format!(
            "{}/{} synced, {} already present",
            self.synced, self.expected, self.already_present
        );
        if self.complete {
            lines.push(format!("   {} {}", "✓".green(), status.dimmed()));
        } else {
            lines.push(format!("   {} {}", "…".yellow(), status.dimmed()));
        }

        lines.join("\n")
    }
}

impl Render for SyncReport {
    fn render(&self) -> String {
        let mut lines = Vec::new();

        if self.dry_run {
            lines.push("Dry run: no calendars or events were changed.".bold().to_string());
        }
        if self.cancelled {
            lines.push("Interrupted: progress so far was saved.".yellow().to_string());
        }
        if !self.deleted_calendars.is_empty() {
            let verb = if self.dry_run { "Would delete" } else { "Deleted" };
            lines.push(format!(
                "{} {} {}: {}",
                verb,
                self.deleted_calendars.len(),
                pluralize("calendar", self.deleted_calendars.len()),
                self.deleted_calendars.join(", ")
            ));
        }

        lines.push(format!(
            "Calendars created: {}",
            self.calendars_created()
        ));
        lines.push(format!("Events inserted: {}", self.events_created()));
        lines.push(format!("Duplicates skipped: {}", self.duplicates_skipped()));

        let incomplete: Vec<&CategoryOutcome> = self.incomplete().collect();
        if incomplete.is_empty() {
            lines.push(format!("{}", "All categories complete.".green()));
        } else {
            lines.push(format!(
                "{} {}:",
                "Incomplete".yellow(),
                pluralize("category", incomplete.len())
            ));
            for outcome in incomplete {
                let detail = match &outcome.error {
                    Some(error) => format!("{}/{} ({})", outcome.synced, outcome.expected, error),
                    None => format!("{}/{}", outcome.synced, outcome.expected),
                };
                lines.push(format!("   {} {}", outcome.name, detail.dimmed()));
            }
        }

        let failed = self.failed().count();
        if failed > 0 {
            lines.push(format!(
                "{}",
                format!("{} {} failed", failed, pluralize("category", failed)).red()
            ));
        }

        let calls = match self.api_calls_remaining {
            Some(remaining) => format!("API calls: {} used, {} remaining", self.api_calls, remaining),
            None => format!("API calls: {} used", self.api_calls),
        };
        lines.push(calls.dimmed().to_string());

        lines.join("\n")
    }
}

impl Render for CalendarSyncState {
    fn render(&self) -> String {
        let mark = if self.complete {
            "✓".green().to_string()
        } else {
            "…".yellow().to_string()
        };
        let last_sync = self
            .last_sync
            .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());

        format!(
            "{} {} {}",
            mark,
            self.name,
            format!(
                "{}/{} synced, last sync {}",
                self.synced_count, self.expected_count, last_sync
            )
            .dimmed()
        )
    }
}

impl Render for CalendarDedupe {
    fn render(&self) -> String {
        let mut lines = vec![format!("📅 {}", self.name)];

        if let Some(error) = &self.error {
            lines.push(format!("   {} {}", "✗".red(), error.red()));
        }

        for duplicate in &self.duplicates {
            lines.push(format!("   {} {}", "-".red(), duplicate.signature.to_string().red()));
        }

        let mut summary = format!(
            "{} scanned, {} {}",
            self.scanned,
            self.duplicates.len(),
            pluralize("duplicate", self.duplicates.len())
        );
        if self.protected > 0 {
            summary.push_str(&format!(", {} protected", self.protected));
        }
        if self.failed > 0 {
            summary.push_str(&format!(", {} failed to delete", self.failed));
        }
        lines.push(format!("   {}", summary.dimmed()));

        lines.join("\n")
    }
}

impl Render for DedupeReport {
    fn render(&self) -> String {
        let mut lines: Vec<String> = self.calendars.iter().map(|c| c.render()).collect();

        if !self.protected_calendars.is_empty() {
            lines.push(format!(
                "{} {}",
                "Skipped protected:".dimmed(),
                self.protected_calendars.join(", ").dimmed()
            ));
        }

        let found = self.duplicates_found();
        if self.dry_run {
            lines.push(format!(
                "\nDry run: {} {} would be deleted.",
                found,
                pluralize("duplicate", found)
            ));
        } else {
            lines.push(format!(
                "\nDeleted {} of {} {}.",
                self.deleted(),
                found,
                pluralize("duplicate", found)
            ));
        }

        lines.join("\n")
    }
}

impl Render for ScheduleAudit {
    fn render(&self) -> String {
        let mut lines = vec!["Events per category:".bold().to_string()];
        for (category, count) in &self.by_category {
            lines.push(format!("   {:<40} {}", category, count));
        }

        if !self.skipped.is_empty() {
            lines.push(format!("\n{}", "Skipped rows:".yellow()));
            for row in &self.skipped {
                lines.push(format!("   line {}: {}", row.line, row.reason));
            }
        }

        if !self.duplicates.is_empty() {
            lines.push(format!("\n{}", "Repeated rows:".yellow()));
            for dup in &self.duplicates {
                lines.push(format!(
                    "   row {} repeats row {}: {}",
                    dup.index + 1,
                    dup.first_index + 1,
                    dup.signature
                ));
            }
        }

        if !self.missing_section.is_empty() {
            lines.push(format!("\n{}", "Subjects without a section:".yellow()));
            for subject in &self.missing_section {
                lines.push(format!("   {}", subject));
            }
        }

        let issues = self.issue_count();
        if issues == 0 {
            lines.push(format!("\n{}", "No issues found.".green()));
        } else {
            lines.push(format!("\n{} {} found.", issues, pluralize("issue", issues)));
        }

        lines.join("\n")
    }
}
