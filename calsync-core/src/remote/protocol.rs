//! Defines the JSON protocol used between calsync and provider binaries
//! over stdin/stdout.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::remote::RemoteErrorKind;
use crate::remote::types::{NewEvent, Page, RemoteCalendar, RemoteEvent};

pub trait ProviderCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Authenticate,
    ListCalendars,
    CreateCalendar,
    DeleteCalendar,
    ListEvents,
    CreateEvent,
    DeleteEvent,
}

/// Request sent from calsync to provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Response sent from provider to calsync.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success {
        data: T,
    },
    Error {
        error: String,
        #[serde(default)]
        kind: RemoteErrorKind,
    },
}

impl<T: Serialize> Response<T> {
    pub fn success(data: T) -> String {
        serde_json::to_string(&Response::Success { data }).unwrap_or_else(|e| {
            Response::<()>::error(
                &format!("Failed to serialize response: {e}"),
                RemoteErrorKind::Other,
            )
        })
    }
}

impl Response<()> {
    pub fn error(msg: &str, kind: RemoteErrorKind) -> String {
        let response = Response::<()>::Error {
            error: msg.to_string(),
            kind,
        };
        serde_json::to_string(&response)
            .unwrap_or_else(|_| r#"{"status":"error","error":"unserializable error"}"#.to_string())
    }
}

/// Run the provider's interactive login for an account.
#[derive(Debug, Serialize, Deserialize)]
pub struct Authenticate {
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
}

impl ProviderCommand for Authenticate {
    type Response = String; // Account identifier (e.g., email)
    fn command() -> Command {
        Command::Authenticate
    }
}

/// One page of the account's calendar list.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListCalendars {
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

impl ProviderCommand for ListCalendars {
    type Response = Page<RemoteCalendar>;
    fn command() -> Command {
        Command::ListCalendars
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCalendar {
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
    pub name: String,
    pub time_zone: String,
}

impl ProviderCommand for CreateCalendar {
    type Response = RemoteCalendar;
    fn command() -> Command {
        Command::CreateCalendar
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteCalendar {
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
    pub calendar_id: String,
}

impl ProviderCommand for DeleteCalendar {
    type Response = ();
    fn command() -> Command {
        Command::DeleteCalendar
    }
}

/// One page of events within a time range.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListEvents {
    /// Provider-specific config (e.g., google_account)
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
    pub calendar_id: String,
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

impl ProviderCommand for ListEvents {
    type Response = Page<RemoteEvent>;
    fn command() -> Command {
        Command::ListEvents
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEvent {
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
    pub calendar_id: String,
    pub event: NewEvent,
}

impl ProviderCommand for CreateEvent {
    type Response = RemoteEvent;
    fn command() -> Command {
        Command::CreateEvent
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteEvent {
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
    pub calendar_id: String,
    pub event_id: String,
}

impl ProviderCommand for DeleteEvent {
    type Response = ();
    fn command() -> Command {
        Command::DeleteEvent
    }
}
