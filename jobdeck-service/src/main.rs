//! jobdeck-service - the operation surface for the dashboard shell.
//!
//! Reads one JSON request per line on stdin and writes one JSON response
//! per line on stdout:
//!
//!   {"action": "sync_all", "params": {"user_id": "alice"}}
//!   {"status": "success", "data": {"to_google": {...}, "from_google": {...}}}
//!
//! Diagnostics go to stderr; stdout is reserved for the protocol.

use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use uuid::Uuid;

use jobdeck_core::constants::DEFAULT_CALENDAR_ID;
use jobdeck_core::google::GoogleCalendarApi;
use jobdeck_core::oauth::{self, DEFAULT_REDIRECT_URI, OAuthApp, TokenClient, TokenRefresher};
use jobdeck_core::protocol::{AccountStatus, Action, AuthUrlData, Request, Response};
use jobdeck_core::{
    CredentialRecord, JobdeckError, JobdeckResult, PullReport, PushReport, Store, SyncEngine,
    SyncReport,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let store = match open_store() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to open database: {e}");
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Failed to read stdin: {e}");
                break;
            }
        };

        // Skip empty lines
        if line.trim().is_empty() {
            continue;
        }

        let request: Request = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                let response = Response::error(&format!("Failed to parse request: {e}"));
                writeln!(stdout, "{response}").unwrap();
                stdout.flush().unwrap();
                continue;
            }
        };

        let response = handle_request(&store, request).await;

        writeln!(stdout, "{response}").unwrap();
        stdout.flush().unwrap();
    }
}

fn open_store() -> JobdeckResult<Store> {
    Store::open(jobdeck_core::config::db_path()?)
}

async fn handle_request(store: &Store, request: Request) -> String {
    match request.action {
        Action::GetAuthUrl => respond(handle_get_auth_url(&request.params)),
        Action::ExchangeCode => respond(handle_exchange_code(store, &request.params).await),
        Action::RefreshToken => respond(handle_refresh_token(store, &request.params).await),
        Action::Disconnect => respond(handle_disconnect(store, &request.params)),
        Action::ToGoogle => respond(handle_to_google(store, &request.params).await),
        Action::FromGoogle => respond(handle_from_google(store, &request.params).await),
        Action::SyncAll => respond(handle_sync_all(store, &request.params).await),
        Action::SyncSingleEvent => respond(handle_sync_single(store, &request.params).await),
    }
}

fn respond<T: Serialize>(result: JobdeckResult<T>) -> String {
    match result {
        Ok(data) => Response::success(data),
        Err(e) => Response::error(&e.to_string()),
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: &serde_json::Value) -> JobdeckResult<T> {
    serde_json::from_value(params.clone())
        .map_err(|e| JobdeckError::Config(format!("Invalid params: {e}")))
}

fn account_status(record: &CredentialRecord) -> AccountStatus {
    AccountStatus {
        user_id: record.user_id.clone(),
        calendar_id: record.calendar_id.clone(),
        sync_enabled: record.sync_enabled,
        token_expiry: record.token_expiry,
        last_sync_at: record.last_sync_at,
    }
}

#[derive(Debug, Deserialize)]
struct GetAuthUrlParams {
    redirect_uri: Option<String>,
}

fn handle_get_auth_url(params: &serde_json::Value) -> JobdeckResult<AuthUrlData> {
    let params: GetAuthUrlParams = parse_params(params)?;
    let redirect_uri = params
        .redirect_uri
        .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());

    let client = TokenClient::new(OAuthApp::load()?);
    let state = Uuid::new_v4().to_string();
    let authorization_url = client.auth_url(&redirect_uri, &state)?;

    Ok(AuthUrlData {
        authorization_url,
        state,
        scopes: oauth::SCOPES.iter().map(|s| s.to_string()).collect(),
    })
}

#[derive(Debug, Deserialize)]
struct ExchangeCodeParams {
    user_id: String,
    code: String,
    redirect_uri: Option<String>,
}

async fn handle_exchange_code(
    store: &Store,
    params: &serde_json::Value,
) -> JobdeckResult<AccountStatus> {
    let params: ExchangeCodeParams = parse_params(params)?;
    let redirect_uri = params
        .redirect_uri
        .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());

    let client = TokenClient::new(OAuthApp::load()?);
    let tokens = client.exchange_code(&params.code, &redirect_uri).await?;

    let refresh_token = tokens.refresh_token.ok_or_else(|| {
        JobdeckError::Provider("Provider did not return a refresh token".to_string())
    })?;

    let record = CredentialRecord {
        user_id: params.user_id,
        access_token: tokens.access_token,
        refresh_token,
        token_expiry: tokens.expires_at,
        sync_enabled: true,
        calendar_id: DEFAULT_CALENDAR_ID.to_string(),
        last_sync_at: None,
    };
    store.upsert_credentials(&record)?;

    Ok(account_status(&record))
}

#[derive(Debug, Deserialize)]
struct UserParams {
    user_id: String,
}

async fn handle_refresh_token(
    store: &Store,
    params: &serde_json::Value,
) -> JobdeckResult<AccountStatus> {
    let params: UserParams = parse_params(params)?;

    let mut record = store
        .credentials(&params.user_id)?
        .ok_or_else(|| JobdeckError::NotConnected(params.user_id.clone()))?;

    let client = TokenClient::new(OAuthApp::load()?);
    let tokens = client.refresh(&record.refresh_token).await?;
    record.access_token = tokens.access_token;
    record.token_expiry = tokens.expires_at;
    if let Some(refresh_token) = tokens.refresh_token {
        record.refresh_token = refresh_token;
    }
    store.upsert_credentials(&record)?;

    Ok(account_status(&record))
}

fn handle_disconnect(store: &Store, params: &serde_json::Value) -> JobdeckResult<()> {
    let params: UserParams = parse_params(params)?;
    store.delete_ledger_for_user(&params.user_id)?;
    store.delete_credentials(&params.user_id)?;
    Ok(())
}

/// Token acquisition shared by the sync actions: refresh if stale, then
/// build the API client for the user's calendar.
async fn connected_api(
    store: &Store,
    user_id: &str,
) -> JobdeckResult<(GoogleCalendarApi, String)> {
    let client = TokenClient::new(OAuthApp::load()?);
    let record = oauth::valid_credentials(store, &client, user_id).await?;
    Ok((
        GoogleCalendarApi::new(record.access_token),
        record.calendar_id,
    ))
}

async fn handle_to_google(store: &Store, params: &serde_json::Value) -> JobdeckResult<PushReport> {
    let params: UserParams = parse_params(params)?;
    let (api, calendar_id) = connected_api(store, &params.user_id).await?;
    SyncEngine::new(store, &api, &params.user_id, &calendar_id)
        .push()
        .await
}

async fn handle_from_google(
    store: &Store,
    params: &serde_json::Value,
) -> JobdeckResult<PullReport> {
    let params: UserParams = parse_params(params)?;
    let (api, calendar_id) = connected_api(store, &params.user_id).await?;
    SyncEngine::new(store, &api, &params.user_id, &calendar_id)
        .pull()
        .await
}

async fn handle_sync_all(store: &Store, params: &serde_json::Value) -> JobdeckResult<SyncReport> {
    let params: UserParams = parse_params(params)?;
    let (api, calendar_id) = connected_api(store, &params.user_id).await?;
    SyncEngine::new(store, &api, &params.user_id, &calendar_id)
        .sync_all()
        .await
}

#[derive(Debug, Deserialize)]
struct SyncSingleParams {
    user_id: String,
    event_id: String,
}

async fn handle_sync_single(
    store: &Store,
    params: &serde_json::Value,
) -> JobdeckResult<PushReport> {
    let params: SyncSingleParams = parse_params(params)?;
    let (api, calendar_id) = connected_api(store, &params.user_id).await?;
    SyncEngine::new(store, &api, &params.user_id, &calendar_id)
        .push_single(&params.event_id)
        .await
}
