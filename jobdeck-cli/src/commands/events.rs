use anyhow::Result;

use super::open_store;
use crate::render;

pub fn run(user_id: &str, include_completed: bool) -> Result<()> {
    let store = open_store()?;
    let events = store.list_events(user_id)?;

    let visible: Vec<_> = events
        .iter()
        .filter(|e| include_completed || !e.completed)
        .collect();

    if visible.is_empty() {
        println!("No events. Add one with `jobdeck add <title> --start <when>`.");
        return Ok(());
    }

    for event in visible {
        println!("{}", render::render_event(event));
    }

    Ok(())
}
