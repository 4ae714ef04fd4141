use anyhow::Result;
use owo_colors::OwoColorize;

use super::open_store;

pub fn run(user_id: &str) -> Result<()> {
    let store = open_store()?;

    match store.credentials(user_id)? {
        None => {
            println!("{}", "Not connected.".yellow());
            println!("Run `jobdeck connect` to link your Google Calendar.");
        }
        Some(record) => {
            println!("{}", "Connected to Google Calendar.".green());
            println!("  Calendar:     {}", record.calendar_id);
            println!(
                "  Auto-sync:    {}",
                if record.sync_enabled { "on" } else { "off" }
            );
            println!(
                "  Access token: {}",
                if record.is_expired() {
                    "expired (will refresh on next sync)".to_string()
                } else {
                    format!("valid until {}", record.token_expiry.format("%Y-%m-%d %H:%M UTC"))
                }
            );
            match record.last_sync_at {
                Some(at) => println!("  Last sync:    {}", at.format("%Y-%m-%d %H:%M UTC")),
                None => println!("  Last sync:    never"),
            }
        }
    }

    let events = store.count_events(user_id)?;
    let synced = store.count_ledger(user_id)?;
    println!("\n{events} events, {synced} synced");

    Ok(())
}
