//! Terminal rendering helpers.

use jobdeck_core::{CalendarEvent, EventCategory, PullReport, PushReport};
use owo_colors::OwoColorize;

pub fn render_event(event: &CalendarEvent) -> String {
    let when = event.start.format("%Y-%m-%d %H:%M");
    let mark = if event.completed { "✓" } else { " " };

    let mut line = format!(
        "{} {}  {}  {}",
        mark.green(),
        when.to_string().yellow(),
        render_category(event),
        event.title
    );

    if let Some(ref company) = event.company {
        line.push_str(&format!("  @ {company}"));
    }

    format!("{line}  {}", event.id.dimmed())
}

fn render_category(event: &CalendarEvent) -> String {
    let label = match event.category {
        EventCategory::Interview => "interview".cyan().to_string(),
        EventCategory::FollowUp => "follow-up".blue().to_string(),
        EventCategory::Deadline => "deadline".red().to_string(),
        EventCategory::Other => "other".dimmed().to_string(),
    };
    // Heuristic categories are marked so the user can correct them
    if event.category_inferred {
        format!("[{label}?]")
    } else {
        format!("[{label}]")
    }
}

pub fn render_push_report(report: &PushReport) -> String {
    format!(
        "Pushed: {} created, {} updated, {} errors",
        report.created, report.updated, report.errors
    )
}

pub fn render_pull_report(report: &PullReport) -> String {
    format!(
        "Pulled: {} imported, {} skipped, {} errors",
        report.imported, report.skipped, report.errors
    )
}
