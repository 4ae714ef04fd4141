mod commands;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "jobdeck")]
#[command(about = "Manage your job-search calendar and sync it with Google Calendar")]
struct Cli {
    /// Account to operate on
    #[arg(long, global = true, default_value = "default")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect a Google Calendar account
    Connect,
    /// Disconnect the Google Calendar account (events are kept)
    Disconnect,
    /// Sync with Google Calendar (push then pull by default)
    Sync {
        /// Only push local events to Google
        #[arg(long)]
        push: bool,

        /// Only pull Google events into jobdeck
        #[arg(long)]
        pull: bool,
    },
    /// List events
    Events {
        /// Include completed events
        #[arg(long)]
        all: bool,
    },
    /// Add a new event
    Add {
        title: String,

        /// Start date/time, e.g. "2026-09-01T14:00" (local input, stored as UTC)
        #[arg(short, long)]
        start: String,

        /// End date/time (defaults to one hour after start when synced)
        #[arg(long)]
        end: Option<String>,

        /// interview | follow_up | deadline | other
        #[arg(short, long, default_value = "other")]
        category: String,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        location: Option<String>,

        /// Reminder lead time in minutes
        #[arg(long)]
        reminder: Option<i64>,

        #[arg(long)]
        notes: Option<String>,
    },
    /// Mark an event as completed
    Done { id: String },
    /// Delete an event (and its sync pairing)
    Remove { id: String },
    /// Show connection and sync state
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Connect => commands::connect::run(&cli.user).await,
        Commands::Disconnect => commands::disconnect::run(&cli.user),
        Commands::Sync { push, pull } => commands::sync::run(&cli.user, push, pull).await,
        Commands::Events { all } => commands::events::run(&cli.user, all),
        Commands::Add {
            title,
            start,
            end,
            category,
            company,
            location,
            reminder,
            notes,
        } => {
            commands::add::run(
                &cli.user,
                commands::add::AddArgs {
                    title,
                    start,
                    end,
                    category,
                    company,
                    location,
                    reminder,
                    notes,
                },
            )
            .await
        }
        Commands::Done { id } => commands::done::run(&cli.user, &id),
        Commands::Remove { id } => commands::remove::run(&cli.user, &id),
        Commands::Status => commands::status::run(&cli.user),
    }
}
