/// Days scanned on each side of today when no explicit window is given.
pub const DEFAULT_SCAN_DAYS: i64 = 365;

/// Refresh window used when a category has no desired events.
pub const EMPTY_REFRESH_DAYS: i64 = 180;

pub const DEFAULT_TIME_ZONE: &str = "Europe/Paris";

pub const DEFAULT_PROVIDER: &str = "google";

/// Separators tried in order when deriving a category from a subject.
pub const DEFAULT_CATEGORY_SEPARATORS: &[&str] = &[" — Sec", " — "];

/// Subjects or calendar names containing one of these are never pruned.
pub const DEFAULT_PROTECTED_KEYWORDS: &[&str] =
    &["holiday", "birth", "task", "morocco", "semaine", "@", "primary"];

pub const UNKNOWN_CATEGORY: &str = "Unknown";
