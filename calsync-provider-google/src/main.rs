//! calsync-provider-google - Google Calendar provider for calsync
//!
//! This binary implements the calsync provider protocol, communicating
//! with calsync via JSON over stdin/stdout.
//!
//! The provider manages its own credentials and tokens:
//!   ~/.config/calsync/providers/google/app_config.toml
//!   ~/.config/calsync/providers/google/session/{account}.toml

mod api;
mod app_config;
mod commands;
mod remote_config;
mod session;

use anyhow::Result;
use calsync_core::remote::RemoteErrorKind;
use calsync_core::remote::protocol::{Command, Request, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::api::ApiError;

#[tokio::main]
async fn main() -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        // Skip empty lines
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => handle_request(request).await,
            Err(e) => Response::<()>::error(
                &format!("Failed to parse request: {}", e),
                RemoteErrorKind::BadRequest,
            ),
        };

        stdout.write_all(response.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}

async fn handle_request(request: Request) -> String {
    let params = request.params;
    match request.command {
        Command::Authenticate => dispatch(params, commands::authenticate::handle).await,
        Command::ListCalendars => dispatch(params, commands::list_calendars::handle).await,
        Command::CreateCalendar => dispatch(params, commands::create_calendar::handle).await,
        Command::DeleteCalendar => dispatch(params, commands::delete_calendar::handle).await,
        Command::ListEvents => dispatch(params, commands::list_events::handle).await,
        Command::CreateEvent => dispatch(params, commands::create_event::handle).await,
        Command::DeleteEvent => dispatch(params, commands::delete_event::handle).await,
    }
}

/// Deserialize the params, run the handler and encode its outcome.
async fn dispatch<C, T, F, Fut>(params: serde_json::Value, handler: F) -> String
where
    C: DeserializeOwned,
    T: Serialize,
    F: FnOnce(C) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let cmd: C = match serde_json::from_value(params) {
        Ok(cmd) => cmd,
        Err(e) => {
            return Response::<()>::error(
                &format!("Invalid params: {}", e),
                RemoteErrorKind::BadRequest,
            );
        }
    };

    match handler(cmd).await {
        Ok(data) => Response::success(data),
        Err(e) => error_response(&e),
    }
}

/// Encode an error, keeping the API's classification when there is one.
fn error_response(e: &anyhow::Error) -> String {
    let kind = e
        .downcast_ref::<ApiError>()
        .map(|api_error| api_error.kind)
        .unwrap_or_default();
    Response::<()>::error(&format!("{:#}", e), kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use reqwest::StatusCode;

    #[test]
    fn test_error_kind_survives_context() {
        let api_error = ApiError::from_response(StatusCode::TOO_MANY_REQUESTS, "");
        let err = Err::<(), _>(api_error)
            .context("Failed to create event: Optique")
            .unwrap_err();

        let response: Response<()> = serde_json::from_str(&error_response(&err)).unwrap();
        match response {
            Response::Error { error, kind } => {
                assert_eq!(kind, RemoteErrorKind::QuotaExceeded);
                assert!(error.starts_with("Failed to create event: Optique"));
            }
            Response::Success { .. } => panic!("expected error"),
        }
    }

    #[test]
    fn test_plain_errors_are_other() {
        let err = anyhow::anyhow!("Google credentials not found");
        let response: Response<()> = serde_json::from_str(&error_response(&err)).unwrap();
        assert!(matches!(
            response,
            Response::Error {
                kind: RemoteErrorKind::Other,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_invalid_params_are_bad_requests() {
        let response = handle_request(Request {
            command: Command::DeleteEvent,
            params: serde_json::json!({ "google_account": "me@example.com" }),
        })
        .await;
        let response: Response<()> = serde_json::from_str(&response).unwrap();
        assert!(matches!(
            response,
            Response::Error {
                kind: RemoteErrorKind::BadRequest,
                ..
            }
        ));
    }
}
