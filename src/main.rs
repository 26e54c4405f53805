mod commands;
mod logging;
mod render;
mod utils;

use anyhow::{Context, Result};
use calsync_core::config::SyncConfig;
use calsync_core::date_range::DateRange;
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

use commands::sync::SyncArgs;

#[derive(Parser)]
#[command(name = "calsync")]
#[command(about = "Upload a course schedule into one remote calendar per category, without duplicates")]
struct Cli {
    /// Config file (defaults to ~/.config/calsync/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More detailed logs (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload the schedule, resuming where the last run stopped
    Sync {
        /// Schedule CSV (defaults to `schedule` from config)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Only categories whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,

        /// Pause between categories (e.g. "5m", "30s")
        #[arg(long, value_parser = humantime::parse_duration)]
        pause: Option<Duration>,

        /// API call budget for this run
        #[arg(long)]
        budget: Option<u64>,

        /// Delete and recreate the calendars of the schedule's categories
        #[arg(long)]
        delete_existing: bool,

        /// Show what would be created without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Skip categories the local state already marks complete
        #[arg(long)]
        trust_store: bool,
    },
    /// Find and delete duplicate events in remote calendars
    Dedupe {
        /// Case-insensitive regex on calendar names ("all" for every calendar)
        pattern: Option<String>,

        /// Scan from this date (YYYY-MM-DD, or "start" for all past events)
        #[arg(long)]
        from: Option<String>,

        /// Scan until this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Only report duplicates
        #[arg(long)]
        dry_run: bool,
    },
    /// List remote calendars
    List,
    /// Delete remote calendars whose name matches a regex
    Delete {
        /// Case-insensitive regex on calendar names
        pattern: String,

        /// Actually delete (otherwise only list matches)
        #[arg(short, long)]
        yes: bool,
    },
    /// Show local sync state per calendar
    Status,
    /// Clear local sync state
    Reset {
        /// Only this calendar
        name: Option<String>,

        #[arg(short, long)]
        yes: bool,
    },
    /// Check a schedule CSV for problems
    Audit {
        /// Schedule CSV (defaults to `schedule` from config)
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Authenticate with the configured provider
    Auth,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SyncConfig::load_from(path),
        None => SyncConfig::load(),
    }
    .context("Failed to load config")?;

    let log_path = logging::init(&config.log_dir()?, cli.verbose)?;
    tracing::debug!(log = %log_path.display(), "Logging initialized");

    match cli.command {
        Commands::Sync {
            csv,
            filter,
            pause,
            budget,
            delete_existing,
            dry_run,
            trust_store,
        } => {
            let csv = schedule_path(&config, csv)?;
            let args = SyncArgs {
                filter,
                pause,
                budget,
                delete_existing,
                dry_run,
                trust_store,
            };
            commands::sync::run(&config, &csv, args).await
        }
        Commands::Dedupe {
            pattern,
            from,
            to,
            dry_run,
        } => {
            let range = DateRange::from_args(
                from.as_deref(),
                to.as_deref(),
                config.dedupe.past_days,
                config.dedupe.future_days,
            )?;
            commands::dedupe::run(&config, pattern, range, dry_run).await
        }
        Commands::List => commands::list::run(&config).await,
        Commands::Delete { pattern, yes } => commands::delete::run(&config, &pattern, yes).await,
        Commands::Status => commands::status::run(&config),
        Commands::Reset { name, yes } => commands::reset::run(&config, name, yes),
        Commands::Audit { csv } => {
            let csv = schedule_path(&config, csv)?;
            commands::audit::run(&config, &csv)
        }
        Commands::Auth => commands::auth::run(&config).await,
    }
}

fn schedule_path(config: &SyncConfig, csv: Option<PathBuf>) -> Result<PathBuf> {
    let path = csv.or_else(|| config.schedule_path()).ok_or_else(|| {
        anyhow::anyhow!(
            "No schedule given.\n\n\
            Pass one with --csv, or set it in your config.toml:\n  \
            schedule = \"~/schedule.csv\""
        )
    })?;
    require_file(&path)?;
    Ok(path)
}

fn require_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!("Schedule not found: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sync_flags() {
        let cli = Cli::parse_from([
            "calsync", "sync", "--csv", "s.csv", "--pause", "30s", "--budget", "400", "--dry-run",
        ]);
        match cli.command {
            Commands::Sync {
                csv,
                pause,
                budget,
                dry_run,
                delete_existing,
                ..
            } => {
                assert_eq!(csv, Some(PathBuf::from("s.csv")));
                assert_eq!(pause, Some(Duration::from_secs(30)));
                assert_eq!(budget, Some(400));
                assert!(dry_run);
                assert!(!delete_existing);
            }
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn test_missing_schedule_is_reported() {
        let config = SyncConfig::default();
        let err = schedule_path(&config, Some(PathBuf::from("/nonexistent/s.csv"))).unwrap_err();
        assert!(err.to_string().contains("Schedule not found"));
    }
}
