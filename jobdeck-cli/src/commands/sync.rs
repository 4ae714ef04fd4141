use anyhow::Result;
use owo_colors::OwoColorize;

use jobdeck_core::SyncEngine;
use jobdeck_core::google::GoogleCalendarApi;
use jobdeck_core::oauth::{self, OAuthApp, TokenClient};

use super::open_store;
use crate::render;

pub async fn run(user_id: &str, push_only: bool, pull_only: bool) -> Result<()> {
    if push_only && pull_only {
        anyhow::bail!("--push and --pull are mutually exclusive; omit both for a full sync");
    }

    let store = open_store()?;
    let client = TokenClient::new(OAuthApp::load()?);
    let record = oauth::valid_credentials(&store, &client, user_id).await?;
    let api = GoogleCalendarApi::new(record.access_token.clone());
    let engine = SyncEngine::new(&store, &api, user_id, &record.calendar_id);

    if push_only {
        let report = engine.push().await?;
        println!("{}", render::render_push_report(&report));
    } else if pull_only {
        let report = engine.pull().await?;
        println!("{}", render::render_pull_report(&report));
    } else {
        let report = engine.sync_all().await?;
        println!("{}", render::render_push_report(&report.to_google));
        println!("{}", render::render_pull_report(&report.from_google));
    }

    println!("{}", "Sync complete.".green());
    Ok(())
}
