//! Thin client for the Google Calendar v3 REST API.
//!
//! Every failure is returned as an [`ApiError`] whose kind tells calsync
//! whether the call is worth retrying.

use calsync_core::remote::{NewEvent, Page, RemoteCalendar, RemoteErrorKind, RemoteEvent, RemoteTime};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use url::Url;

const BASE_URL: &str = "https://www.googleapis.com/calendar/v3/";

/// Largest page the events endpoint serves.
const EVENTS_PAGE_SIZE: &str = "2500";

/// Reasons Google uses in 403 bodies for throttling rather than permissions.
const QUOTA_REASONS: &[&str] = &[
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "quotaExceeded",
    "dailyLimitExceeded",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: RemoteErrorKind,
    pub message: String,
    /// HTTP status, when the server answered at all.
    pub status: Option<StatusCode>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        ApiError {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Classify a non-success response from its status and JSON error body.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
        let (message, reasons) = match parsed {
            Some(ErrorBody { error }) => (
                error.message,
                error.errors.into_iter().map(|e| e.reason).collect(),
            ),
            None => (body.trim().to_string(), Vec::new()),
        };
        let message = if message.is_empty() {
            status.to_string()
        } else {
            format!("{} ({})", message, status)
        };

        let is_quota_reason = reasons.iter().any(|r| QUOTA_REASONS.contains(&r.as_str()));
        let kind = match status {
            StatusCode::TOO_MANY_REQUESTS => RemoteErrorKind::QuotaExceeded,
            StatusCode::FORBIDDEN if is_quota_reason => RemoteErrorKind::QuotaExceeded,
            StatusCode::NOT_FOUND | StatusCode::GONE => RemoteErrorKind::NotFound,
            StatusCode::BAD_REQUEST => RemoteErrorKind::BadRequest,
            StatusCode::UNAUTHORIZED => RemoteErrorKind::Unauthorized,
            _ => RemoteErrorKind::Other,
        };

        ApiError {
            status: Some(status),
            ..ApiError::new(kind, message)
        }
    }

    fn from_transport(err: reqwest::Error) -> Self {
        let kind = if err.is_connect() || err.is_timeout() || err.is_request() {
            RemoteErrorKind::Transport
        } else {
            RemoteErrorKind::Other
        };
        ApiError::new(kind, format!("Request to Google Calendar failed: {}", err))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorReason>,
}

#[derive(Deserialize)]
struct ErrorReason {
    #[serde(default)]
    reason: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleCalendar {
    id: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    primary: bool,
}

impl From<GoogleCalendar> for RemoteCalendar {
    fn from(cal: GoogleCalendar) -> Self {
        RemoteCalendar {
            id: cal.id,
            name: cal.summary,
        }
    }
}

#[derive(Deserialize)]
struct GoogleEvent {
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    start: Option<RemoteTime>,
    #[serde(default)]
    end: Option<RemoteTime>,
}

impl GoogleEvent {
    /// None for cancelled events and events without usable bounds.
    fn into_remote(self) -> Option<RemoteEvent> {
        if self.status.as_deref() == Some("cancelled") {
            return None;
        }
        Some(RemoteEvent {
            id: self.id,
            summary: self.summary,
            description: self.description,
            start: self.start?,
            end: self.end?,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Listing<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    next_page_token: Option<String>,
}

pub struct GoogleApi {
    http: reqwest::Client,
    access_token: String,
    base_url: Url,
}

impl GoogleApi {
    pub fn new(access_token: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(BASE_URL)
            .map_err(|e| ApiError::new(RemoteErrorKind::Other, e.to_string()))?;
        Ok(GoogleApi {
            http: reqwest::Client::new(),
            access_token: access_token.to_string(),
            base_url,
        })
    }

    /// Build an endpoint URL, percent-encoding each path segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_response(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::new(RemoteErrorKind::Other, format!("Unexpected response: {}", e)))
    }

    pub async fn list_calendars(
        &self,
        page_token: Option<&str>,
    ) -> Result<Page<RemoteCalendar>, ApiError> {
        let mut request = self.http.get(self.url(&["users", "me", "calendarList"]));
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let listing: Listing<GoogleCalendar> = self.send_json(request).await?;
        Ok(Page {
            items: listing.items.into_iter().map(RemoteCalendar::from).collect(),
            next_page_token: listing.next_page_token,
        })
    }

    /// The account's email, which Google uses as the primary calendar's id.
    pub async fn primary_calendar_id(&self) -> Result<String, ApiError> {
        let calendar: GoogleCalendar = self
            .send_json(self.http.get(self.url(&["calendars", "primary"])))
            .await?;
        if calendar.primary || calendar.id.contains('@') {
            Ok(calendar.id)
        } else {
            Err(ApiError::new(RemoteErrorKind::Other, "No primary calendar found"))
        }
    }

    pub async fn create_calendar(
        &self,
        name: &str,
        time_zone: &str,
    ) -> Result<RemoteCalendar, ApiError> {
        let body = serde_json::json!({ "summary": name, "timeZone": time_zone });
        let calendar: GoogleCalendar = self
            .send_json(self.http.post(self.url(&["calendars"])).json(&body))
            .await?;
        Ok(calendar.into())
    }

    pub async fn delete_calendar(&self, calendar_id: &str) -> Result<(), ApiError> {
        self.send(self.http.delete(self.url(&["calendars", calendar_id])))
            .await?;
        Ok(())
    }

    pub async fn list_events(
        &self,
        calendar_id: &str,
        time_min: &str,
        time_max: &str,
        page_token: Option<&str>,
    ) -> Result<Page<RemoteEvent>, ApiError> {
        let mut request = self
            .http
            .get(self.url(&["calendars", calendar_id, "events"]))
            .query(&[
                ("timeMin", time_min),
                ("timeMax", time_max),
                ("singleEvents", "true"),
                ("maxResults", EVENTS_PAGE_SIZE),
            ]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let listing: Listing<GoogleEvent> = self.send_json(request).await?;
        Ok(Page {
            items: listing
                .items
                .into_iter()
                .filter_map(GoogleEvent::into_remote)
                .collect(),
            next_page_token: listing.next_page_token,
        })
    }

    pub async fn create_event(
        &self,
        calendar_id: &str,
        event: &NewEvent,
    ) -> Result<RemoteEvent, ApiError> {
        let created: GoogleEvent = self
            .send_json(
                self.http
                    .post(self.url(&["calendars", calendar_id, "events"]))
                    .json(event),
            )
            .await?;
        created.into_remote().ok_or_else(|| {
            ApiError::new(RemoteErrorKind::Other, "Created event came back without times")
        })
    }

    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), ApiError> {
        self.send(
            self.http
                .delete(self.url(&["calendars", calendar_id, "events", event_id])),
        )
        .await?;
        Ok(())
    }
}
