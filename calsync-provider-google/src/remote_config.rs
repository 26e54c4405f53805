//! Google-specific remote configuration.
//!
//! calsync passes its `[remote]` table through untyped; this is the typed view
//! the provider works with.

use anyhow::Result;

/// Strongly-typed remote configuration for Google Calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleRemoteConfig {
    pub google_account: String,
}

impl TryFrom<&serde_json::Map<String, serde_json::Value>> for GoogleRemoteConfig {
    type Error = anyhow::Error;

    fn try_from(map: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let google_account = map
            .get("google_account")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Missing required field: google_account (run `calsync auth` first)"
                )
            })?
            .to_string();

        Ok(Self { google_account })
    }
}
