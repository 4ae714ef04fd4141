use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use uuid::Uuid;

use jobdeck_core::CredentialRecord;
use jobdeck_core::constants::DEFAULT_CALENDAR_ID;
use jobdeck_core::oauth::{DEFAULT_REDIRECT_URI, OAuthApp, TokenClient};

use super::open_store;

pub async fn run(user_id: &str) -> Result<()> {
    let store = open_store()?;
    let client = TokenClient::new(OAuthApp::load()?);

    let state = Uuid::new_v4().to_string();
    let url = client.auth_url(DEFAULT_REDIRECT_URI, &state)?;

    println!("Opening your browser for Google consent...");
    println!("If nothing opens, visit:\n\n  {url}\n");
    let _ = open::that(&url);

    let code: String = dialoguer::Input::new()
        .with_prompt("Paste the authorization code")
        .interact_text()?;

    let tokens = client.exchange_code(code.trim(), DEFAULT_REDIRECT_URI).await?;
    let refresh_token = tokens
        .refresh_token
        .context("Google did not return a refresh token; remove the app's access and retry")?;

    store.upsert_credentials(&CredentialRecord {
        user_id: user_id.to_string(),
        access_token: tokens.access_token,
        refresh_token,
        token_expiry: tokens.expires_at,
        sync_enabled: true,
        calendar_id: DEFAULT_CALENDAR_ID.to_string(),
        last_sync_at: None,
    })?;

    println!("{}", "Google Calendar connected.".green());
    println!("Run `jobdeck sync` to sync events.");

    Ok(())
}
