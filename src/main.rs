use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod calendar;
mod config;
mod db;
mod models;
mod popularity;
mod report;
mod schedule;
mod snapshot;

use config::Config;
use models::EventRecord;

#[derive(Parser)]
#[command(name = "campus-event-trends")]
#[command(about = "Trending-event predictions for campus event listings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed events
    Seed,
    /// Import events from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List upcoming events ranked by predicted popularity
    Score {
        /// Read events from a JSON snapshot instead of Postgres
        #[arg(long)]
        snapshot: Option<PathBuf>,
        #[arg(long)]
        category: Option<String>,
        /// Include upcoming events that are not predicted to trend
        #[arg(long)]
        all: bool,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        snapshot: Option<PathBuf>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Write the snapshot back out with popularity flags set
    Export {
        #[arg(long)]
        snapshot: Option<PathBuf>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Show a student's upcoming enrollments and finished events
    Student {
        #[arg(long)]
        snapshot: Option<PathBuf>,
        #[arg(long)]
        email: String,
    },
    /// Enroll a student in an event
    Enroll {
        #[arg(long)]
        event: String,
        #[arg(long)]
        email: String,
    },
    /// Remove a student from an event
    Unenroll {
        #[arg(long)]
        event: String,
        #[arg(long)]
        email: String,
    },
    /// Delete an event
    Delete {
        #[arg(long)]
        event: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let now = Local::now().naive_local();

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&config).await?;
            db::seed(&pool).await?;
            println!("Seed events inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect(&config).await?;
            let imported = db::import_csv(&pool, &csv).await?;
            println!("Imported {imported} events from {}.", csv.display());
        }
        Commands::Score {
            snapshot,
            category,
            all,
            limit,
        } => {
            let events = load_events(&config, snapshot.as_deref()).await?;
            print_ranking(&events, category.as_deref(), all, limit, now);
        }
        Commands::Report {
            snapshot,
            category,
            out,
        } => {
            let events = load_events(&config, snapshot.as_deref()).await?;
            let report = report::build_report(category.as_deref(), now, &events);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { snapshot, out } => {
            let events = load_events(&config, snapshot.as_deref()).await?;
            let annotated = popularity::annotate_snapshot(&events);
            snapshot::write_snapshot(&out, &annotated)?;
            let upcoming_popular = schedule::popular_active_events(&annotated, now).len();
            println!(
                "Exported {} events ({upcoming_popular} upcoming and predicted popular) to {}.",
                annotated.len(),
                out.display()
            );
        }
        Commands::Student { snapshot, email } => {
            let events = load_events(&config, snapshot.as_deref()).await?;
            let annotated = popularity::annotate_snapshot(&events);
            print_student(&annotated, &email, now);
        }
        Commands::Enroll { event, email } => {
            let pool = connect(&config).await?;
            if db::enroll(&pool, &event, &email).await? {
                println!("Enrolled {email} in {event}.");
            } else {
                println!("{email} is already enrolled in {event}.");
            }
        }
        Commands::Unenroll { event, email } => {
            let pool = connect(&config).await?;
            if db::unenroll(&pool, &event, &email).await? {
                println!("Removed {email} from {event}.");
            } else {
                println!("{email} was not enrolled in {event}.");
            }
        }
        Commands::Delete { event } => {
            let pool = connect(&config).await?;
            if db::delete_event(&pool, &event).await? {
                println!("Deleted {event}.");
            } else {
                println!("No event with id {event}.");
            }
        }
    }

    Ok(())
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")
}

async fn load_events(
    config: &Config,
    snapshot: Option<&Path>,
) -> anyhow::Result<Vec<EventRecord>> {
    match snapshot {
        Some(path) => snapshot::load_snapshot(path),
        None => {
            let pool = connect(config).await?;
            db::fetch_events(&pool).await
        }
    }
}

fn print_ranking(
    events: &[EventRecord],
    category: Option<&str>,
    all: bool,
    limit: usize,
    now: NaiveDateTime,
) {
    let ranked: Vec<_> = popularity::rank_snapshot(events)
        .into_iter()
        .filter(|scored| all || scored.breakdown.popular)
        .filter(|scored| {
            !schedule::is_event_in_past(&scored.event.date, &scored.event.time, now)
        })
        .filter(|scored| {
            category.map_or(true, |wanted| {
                scored.event.categories.iter().any(|c| c == wanted)
            })
        })
        .collect();
    info!(scored = events.len(), listed = ranked.len(), "ranked snapshot");

    if ranked.is_empty() {
        println!("No upcoming events match.");
        return;
    }

    println!("Upcoming events by predicted popularity:");
    for scored in ranked.iter().take(limit) {
        let badge = if scored.breakdown.popular { "[popular] " } else { "" };
        println!(
            "- {badge}{} ({} {}, {}) score {:.2} with {} enrolled",
            report::display_title(&scored.event),
            scored.event.date,
            scored.event.time,
            scored.event.room,
            scored.breakdown.total,
            scored.event.enrollment_count()
        );
    }
}

fn print_student(events: &[EventRecord], email: &str, now: NaiveDateTime) {
    let upcoming: Vec<&EventRecord> = schedule::enrolled_events(events, email)
        .into_iter()
        .filter(|event| !schedule::is_event_in_past(&event.date, &event.time, now))
        .collect();

    println!("Upcoming enrollments for {email}:");
    if upcoming.is_empty() {
        println!("- none");
    }
    for event in upcoming {
        let reminder = schedule::reminder_time(event, now)
            .map(|at| format!("reminder at {}", at.format("%d/%m/%Y %H:%M")))
            .unwrap_or_else(|| "no reminder".to_string());
        let badge = if event.predicted_popular { "[popular] " } else { "" };
        println!(
            "- {badge}{} ({} {}, {}), {reminder}",
            report::display_title(event),
            event.date,
            event.time,
            event.room
        );
    }

    let finished = schedule::finished_attended_events(events, email, now);
    println!("Finished events attended by {email}:");
    if finished.is_empty() {
        println!("- none");
    }
    for event in finished {
        println!(
            "- {} ({} {})",
            report::display_title(event),
            event.date,
            event.time
        );
    }
}
