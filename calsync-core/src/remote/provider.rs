//! Provider subprocess protocol.
//!
//! This module handles communication with external provider binaries
//! (e.g., `calsync-provider-google`) using JSON over stdin/stdout.
//!
//! Any executable that speaks the JSON protocol can be a provider.
//! Providers manage their own credentials and tokens; calsync only passes
//! the `[remote]` table from its config.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

use crate::error::{CalSyncError, CalSyncResult};
use crate::remote::RemoteError;
use crate::remote::protocol::{Authenticate, Command, ProviderCommand, Request, Response};

/// Auth involves a browser round-trip, so it gets a much longer limit.
const AUTH_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Clone, Debug)]
pub struct Provider {
    name: String,
    timeout: Duration,
}

impl Provider {
    pub fn new(name: &str, timeout: Duration) -> Self {
        Provider {
            name: name.to_string(),
            timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binary_name(&self) -> String {
        format!("calsync-provider-{}", self.name)
    }

    fn binary_path(&self) -> CalSyncResult<PathBuf> {
        let binary_name = self.binary_name();
        which::which(&binary_name).map_err(|_| {
            CalSyncError::ProviderNotInstalled(format!(
                "{}. Install it with:\n  cargo install {}",
                self.name, binary_name
            ))
        })
    }

    /// Run the provider's login flow; returns the account identifier.
    pub async fn authenticate(
        &self,
        remote_config: serde_json::Map<String, serde_json::Value>,
    ) -> CalSyncResult<String> {
        timeout(
            AUTH_TIMEOUT,
            self.call_raw(Authenticate::command(), Authenticate { remote_config }),
        )
        .await
        .map_err(|_| CalSyncError::ProviderTimeout(AUTH_TIMEOUT.as_secs()))?
    }

    /// Call a typed provider command and return the result.
    ///
    /// The response type is inferred from the command's associated type.
    pub async fn call<C: ProviderCommand>(&self, cmd: C) -> CalSyncResult<C::Response> {
        timeout(self.timeout, self.call_raw(C::command(), cmd))
            .await
            .map_err(|_| CalSyncError::ProviderTimeout(self.timeout.as_secs()))?
    }

    async fn call_raw<P: Serialize, R: DeserializeOwned>(
        &self,
        command: Command,
        params: P,
    ) -> CalSyncResult<R> {
        let params =
            serde_json::to_value(params).map_err(|e| CalSyncError::Serialization(e.to_string()))?;
        let request = Request { command, params };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| CalSyncError::Serialization(e.to_string()))?;

        let binary_path = self.binary_path()?;
        tracing::debug!(provider = %self.name, ?command, "calling provider");

        let mut child = TokioCommand::new(&binary_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CalSyncError::Provider(format!("Failed to spawn {}: {}", binary_path.display(), e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| CalSyncError::Provider("Provider stdin unavailable".into()))?;
        stdin
            .write_all(format!("{request_json}\n").as_bytes())
            .await?;
        drop(stdin);

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(CalSyncError::Provider(format!(
                "Provider exited with status: {}",
                output.status.code().unwrap_or(-1)
            )));
        }

        let response_str = String::from_utf8_lossy(&output.stdout);
        if response_str.trim().is_empty() {
            return Err(CalSyncError::Provider("Provider returned no response".into()));
        }

        parse_response(&response_str)
    }
}

fn parse_response<R: DeserializeOwned>(raw: &str) -> CalSyncResult<R> {
    let response: Response<R> = serde_json::from_str(raw)
        .map_err(|e| CalSyncError::Provider(format!("Failed to parse response: {}", e)))?;

    match response {
        Response::Success { data } => Ok(data),
        Response::Error { error, kind } => Err(RemoteError::new(kind, error).into()),
    }
}
