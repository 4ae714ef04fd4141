use anyhow::Result;
use owo_colors::OwoColorize;

use super::open_store;

pub fn run(user_id: &str) -> Result<()> {
    let store = open_store()?;

    store.delete_ledger_for_user(user_id)?;
    store.delete_credentials(user_id)?;

    println!("{}", "Google Calendar disconnected.".green());
    println!("Local events were kept; reconnecting will treat them as unsynced.");

    Ok(())
}
