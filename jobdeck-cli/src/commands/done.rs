use anyhow::Result;
use owo_colors::OwoColorize;

use super::open_store;

pub fn run(user_id: &str, event_id: &str) -> Result<()> {
    let store = open_store()?;
    store.mark_completed(user_id, event_id, true)?;
    println!("{}", "Marked as completed.".green());
    Ok(())
}
