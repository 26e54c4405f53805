use anyhow::{Context, Result};
use calsync_core::remote::protocol::Authenticate;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use url::Url;

use crate::api::GoogleApi;
use crate::app_config::AppConfig;
use crate::session::{self, Session, SessionData};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/calendar"];

const REDIRECT_PORT: u16 = 8085;

pub fn redirect_uri() -> String {
    format!("http://localhost:{}/callback", REDIRECT_PORT)
}

pub fn redirect_address() -> String {
    format!("127.0.0.1:{}", REDIRECT_PORT)
}

pub async fn handle(_cmd: Authenticate) -> Result<String> {
    let creds = AppConfig::load()?;
    let state = format!("calsync-{}", chrono::Utc::now().timestamp_millis());

    let auth_url = consent_url(&creds.client_id, &state)?;

    eprintln!("\nOpen this URL in your browser to authenticate:\n");
    eprintln!("{}\n", auth_url);

    // Try to open the browser automatically
    if open::that(auth_url.as_str()).is_err() {
        eprintln!("(Could not open browser automatically, please copy the URL above)");
    }

    let (code, returned_state) = wait_for_callback().await?;
    if returned_state != state {
        anyhow::bail!("OAuth state mismatch, please retry `calsync auth`");
    }

    eprintln!("\nReceived authorization code, exchanging for tokens...");

    let redirect_uri = redirect_uri();
    let tokens = session::request_tokens(&[
        ("code", code.as_str()),
        ("client_id", creds.client_id.as_str()),
        ("client_secret", creds.client_secret.as_str()),
        ("redirect_uri", redirect_uri.as_str()),
        ("grant_type", "authorization_code"),
    ])
    .await
    .context("Failed to exchange authorization code for tokens")?;

    let data = SessionData::from_tokens(tokens, None)?;

    // The primary calendar's id is the account email.
    let account_email = GoogleApi::new(data.access_token())?
        .primary_calendar_id()
        .await
        .context("Failed to look up the account's primary calendar")?;

    Session::new(&account_email, data).save()?;

    eprintln!("Authentication successful!");

    Ok(account_email)
}

fn consent_url(client_id: &str, state: &str) -> Result<Url> {
    let scopes = SCOPES.join(" ");
    let url = Url::parse_with_params(
        AUTH_URL,
        &[
            ("client_id", client_id),
            ("redirect_uri", redirect_uri().as_str()),
            ("response_type", "code"),
            ("scope", scopes.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state),
        ],
    )?;
    Ok(url)
}

async fn wait_for_callback() -> Result<(String, String)> {
    let listener = TcpListener::bind(redirect_address())
        .await
        .context("Failed to bind OAuth callback listener")?;

    let (stream, _) = listener
        .accept()
        .await
        .context("Failed to accept OAuth callback")?;

    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .await
        .context("Failed to read OAuth callback request line")?;

    let (code, state) = parse_callback(&request_line)?;

    let response = "HTTP/1.1 200 OK\r\n\
        Content-Type: text/html\r\n\
        Connection: close\r\n\
        \r\n\
        <html><body>\
        <h1>Authentication successful!</h1>\
        <p>You can close this window and return to the terminal.</p>\
        </body></html>";

    let mut stream = reader.into_inner();
    stream
        .write_all(response.as_bytes())
        .await
        .context("Failed to write OAuth callback response")?;
    stream.flush().await?;

    Ok((code, state))
}

/// Extract `code` and `state` from a `GET /callback?... HTTP/1.1` line.
fn parse_callback(request_line: &str) -> Result<(String, String)> {
    let url_part = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("Invalid HTTP request"))?;

    let url = Url::parse(&format!("http://localhost{}", url_part))?;
    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.to_string())
    };

    if let Some(error) = param("error") {
        anyhow::bail!("Authorization was denied: {}", error);
    }

    let code = param("code").ok_or_else(|| anyhow::anyhow!("No code in callback"))?;
    let state = param("state").ok_or_else(|| anyhow::anyhow!("No state in callback"))?;

    Ok((code, state))
}
