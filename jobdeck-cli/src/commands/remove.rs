use anyhow::Result;
use owo_colors::OwoColorize;

use super::open_store;

pub fn run(user_id: &str, event_id: &str) -> Result<()> {
    let store = open_store()?;
    // Also drops the ledger pairing so a later pull can't resurrect it
    store.delete_event(user_id, event_id)?;
    println!("{}", "Event removed.".green());
    Ok(())
}
