//! calsync configuration at ~/.config/calsync/config.toml
//!
//! The file is layered under `CALSYNC_*` environment variables (nested keys
//! use `__`, e.g. `CALSYNC_RETRY__MAX_ATTEMPTS`). Every component receives
//! the values it needs from here at construction.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::constants::{
    DEFAULT_CATEGORY_SEPARATORS, DEFAULT_PROTECTED_KEYWORDS, DEFAULT_PROVIDER, DEFAULT_SCAN_DAYS,
    DEFAULT_TIME_ZONE,
};
use crate::error::{CalSyncError, CalSyncResult};
use crate::remote::{Provider, Remote, RemoteConfig};
use crate::retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY, RetryPolicy};

const DEFAULT_PAUSE: Duration = Duration::from_secs(300);
const DEFAULT_POST_CREATE_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub time_zone: String,
    pub provider: String,
    pub remote: RemoteConfig,

    pub store_path: Option<PathBuf>,
    pub schedule: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,

    #[serde(with = "humantime_duration")]
    pub pause_between_categories: Duration,
    #[serde(with = "humantime_duration")]
    pub post_create_delay: Duration,
    #[serde(with = "humantime_duration")]
    pub provider_timeout: Duration,
    pub quota_budget: Option<u64>,

    pub category_separators: Vec<String>,
    pub protected_keywords: Vec<String>,

    pub retry: RetrySettings,
    pub dedupe: DedupeSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    #[serde(with = "humantime_duration")]
    pub base_delay: Duration,
    #[serde(with = "humantime_duration")]
    pub max_delay: Duration,
    pub max_attempts: u32,
}

/// Default scan window for duplicate pruning, in days around today.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupeSettings {
    pub past_days: i64,
    pub future_days: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            provider: DEFAULT_PROVIDER.to_string(),
            remote: RemoteConfig::default(),
            store_path: None,
            schedule: None,
            log_dir: None,
            pause_between_categories: DEFAULT_PAUSE,
            post_create_delay: DEFAULT_POST_CREATE_DELAY,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            quota_budget: None,
            category_separators: DEFAULT_CATEGORY_SEPARATORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            protected_keywords: DEFAULT_PROTECTED_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            retry: RetrySettings::default(),
            dedupe: DedupeSettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl Default for DedupeSettings {
    fn default() -> Self {
        DedupeSettings {
            past_days: DEFAULT_SCAN_DAYS,
            future_days: DEFAULT_SCAN_DAYS,
        }
    }
}

impl SyncConfig {
    pub fn config_path() -> CalSyncResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CalSyncError::Config("Could not determine config directory".into()))?
            .join("calsync");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location, writing a commented default file on
    /// first run.
    pub fn load() -> CalSyncResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> CalSyncResult<Self> {
        let config: SyncConfig = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("CALSYNC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| CalSyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalSyncError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CalSyncResult<()> {
        self.tz()?;
        if self.retry.max_attempts == 0 {
            return Err(CalSyncError::Config(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err(CalSyncError::Config(
                "retry.base_delay must not exceed retry.max_delay".into(),
            ));
        }
        if self.category_separators.iter().any(|s| s.is_empty()) {
            return Err(CalSyncError::Config(
                "category_separators must not contain empty strings".into(),
            ));
        }
        Ok(())
    }

    pub fn tz(&self) -> CalSyncResult<Tz> {
        Tz::from_str(&self.time_zone)
            .map_err(|_| CalSyncError::Config(format!("Unknown time zone '{}'", self.time_zone)))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: self.retry.base_delay,
            max_delay: self.retry.max_delay,
            max_attempts: self.retry.max_attempts,
        }
    }

    pub fn remote(&self) -> Remote {
        Remote::new(
            Provider::new(&self.provider, self.provider_timeout),
            self.remote.clone(),
        )
    }

    pub fn store_path(&self) -> CalSyncResult<PathBuf> {
        match &self.store_path {
            Some(path) => Ok(expand(path)),
            None => Ok(data_dir()?.join("state.db")),
        }
    }

    pub fn log_dir(&self) -> CalSyncResult<PathBuf> {
        match &self.log_dir {
            Some(path) => Ok(expand(path)),
            None => Ok(data_dir()?.join("logs")),
        }
    }

    pub fn schedule_path(&self) -> Option<PathBuf> {
        self.schedule.as_deref().map(expand)
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> CalSyncResult<()> {
        let contents = format!(
            "\
# calsync configuration

# Time zone for timed events and new calendars:
# time_zone = \"{DEFAULT_TIME_ZONE}\"

# Provider binary (calsync-provider-<name>) and its settings:
# provider = \"{DEFAULT_PROVIDER}\"
# [remote]
# google_account = \"you@example.com\"

# Schedule CSV used when --csv is not given:
# schedule = \"~/schedule.csv\"

# Local sync state and logs (default: platform data dir):
# store_path = \"~/.local/share/calsync/state.db\"
# log_dir = \"~/.local/share/calsync/logs\"

# Throttling:
# pause_between_categories = \"5m\"
# post_create_delay = \"500ms\"
# provider_timeout = \"30s\"
# quota_budget = 10000

# Subjects are cut at the first separator found to name their calendar:
# category_separators = [\" — Sec\", \" — \"]

# Calendars and events containing these are never pruned:
# protected_keywords = [\"holiday\", \"birth\", \"task\", \"morocco\", \"semaine\", \"@\", \"primary\"]

# [retry]
# base_delay = \"10s\"
# max_delay = \"5m\"
# max_attempts = 5

# [dedupe]
# past_days = {DEFAULT_SCAN_DAYS}
# future_days = {DEFAULT_SCAN_DAYS}
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CalSyncError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| CalSyncError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

fn data_dir() -> CalSyncResult<PathBuf> {
    Ok(dirs::data_dir()
        .ok_or_else(|| CalSyncError::Config("Could not determine data directory".into()))?
        .join("calsync"))
}

mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, de::Error};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(D::Error::custom)
    }
}
