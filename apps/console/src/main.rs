mod config;
mod terminal;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{wait_for_poll, ConsoleEvent, HttpTripApi, PollOutcome, TripConsole, TripForm};
use shared::domain::TripId;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{config::load_settings, terminal::TerminalView};

#[derive(Parser, Debug)]
#[command(name = "trip-console", about = "Browse, generate and edit trip itineraries")]
struct Cli {
    /// Base URL of the itinerary service.
    #[arg(long, global = true)]
    server_url: Option<String>,
    #[arg(long, global = true, default_value = config::SETTINGS_FILE)]
    config: PathBuf,
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,
    /// Seconds before a status check gives up; 0 waits forever.
    #[arg(long, global = true)]
    poll_timeout_secs: Option<u64>,
    /// Return as soon as the request is accepted instead of following
    /// generation until it settles.
    #[arg(long, global = true)]
    no_wait: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all trips.
    List,
    /// Print a trip's itinerary.
    Show { trip_id: i64 },
    /// Create a trip and generate its itinerary.
    Create(TripArgs),
    /// Change a trip's details; unset fields keep their current value.
    Update {
        trip_id: i64,
        #[command(flatten)]
        fields: TripArgs,
    },
    /// Replace a trip's itinerary with the contents of a file.
    EditContent {
        trip_id: i64,
        #[arg(long)]
        file: PathBuf,
    },
    Delete {
        trip_id: i64,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Ask the service to generate the itinerary again.
    Regenerate { trip_id: i64 },
    /// Follow a trip's status until it settles.
    Watch { trip_id: i64 },
}

#[derive(Args, Debug, Default)]
struct TripArgs {
    #[arg(long)]
    identifier: Option<String>,
    #[arg(long = "type")]
    trip_type: Option<String>,
    /// Start of the trip, `YYYY-MM-DDTHH:MM`.
    #[arg(long)]
    start: Option<String>,
    /// End of the trip, `YYYY-MM-DDTHH:MM`.
    #[arg(long)]
    end: Option<String>,
    #[arg(long)]
    from: Option<String>,
    #[arg(long)]
    to: Option<String>,
    #[arg(long)]
    focus: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

impl TripArgs {
    fn apply(self, form: &mut TripForm) {
        let fields = [
            (self.identifier, &mut form.identifier),
            (self.trip_type, &mut form.trip_type),
            (self.start, &mut form.start_date),
            (self.end, &mut form.end_date),
            (self.from, &mut form.start_place),
            (self.to, &mut form.end_place),
            (self.focus, &mut form.trip_focus),
            (self.notes, &mut form.trip_notes),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config);
    if let Some(url) = cli.server_url.clone() {
        settings.server_url = url;
    }
    if let Some(ms) = cli.poll_interval_ms {
        settings.poll_interval_ms = ms;
    }
    if let Some(secs) = cli.poll_timeout_secs {
        settings.poll_timeout_secs = secs;
    }
    let api = HttpTripApi::new(&settings.server_url, settings.request_timeout())
        .with_context(|| format!("invalid server url '{}'", settings.server_url))?;
    info!("console: server_url={}", api.base_url());
    let assume_yes = matches!(cli.command, Command::Delete { yes: true, .. });
    let console = TripConsole::new(
        Arc::new(api),
        Arc::new(TerminalView::new(assume_yes)),
        settings.console_options(),
    );
    let mut events = console.subscribe_events();

    let outcome = run(&console, &mut events, cli.command, cli.no_wait).await;
    console.shutdown().await;
    outcome
}

async fn run(
    console: &Arc<TripConsole>,
    events: &mut broadcast::Receiver<ConsoleEvent>,
    command: Command,
    no_wait: bool,
) -> Result<()> {
    match command {
        Command::List => {
            console.list_trips().await?;
        }
        Command::Show { trip_id } => {
            console.view_trip(TripId(trip_id)).await?;
        }
        Command::Create(args) => {
            let mut form = TripForm::default();
            args.apply(&mut form);
            console.set_form(form).await;
            let trip_id = console.submit_trip().await?;
            follow(console, events, trip_id, no_wait).await?;
        }
        Command::Update { trip_id, fields } => {
            console.edit_trip(TripId(trip_id)).await?;
            let mut form = console.form().await;
            fields.apply(&mut form);
            console.set_form(form).await;
            let trip_id = console.submit_trip().await?;
            follow(console, events, trip_id, no_wait).await?;
        }
        Command::EditContent { trip_id, file } => {
            let html = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            console.view_trip(TripId(trip_id)).await?;
            console.begin_content_edit().await?;
            console.save_content(html).await?;
        }
        Command::Delete { trip_id, .. } => {
            if !console.delete_trip(TripId(trip_id)).await? {
                println!("Delete cancelled.");
            }
        }
        Command::Regenerate { trip_id } => {
            let trip_id = TripId(trip_id);
            console.regenerate_trip(trip_id).await?;
            follow(console, events, trip_id, no_wait).await?;
        }
        Command::Watch { trip_id } => {
            let trip_id = TripId(trip_id);
            console.list_trips().await?;
            console.poll_status(trip_id).await;
            follow(console, events, trip_id, no_wait).await?;
        }
    }
    Ok(())
}

/// Blocks until the trip's polling session ends, if one is running.
async fn follow(
    console: &Arc<TripConsole>,
    events: &mut broadcast::Receiver<ConsoleEvent>,
    trip_id: TripId,
    no_wait: bool,
) -> Result<()> {
    if no_wait || !console.is_polling(trip_id).await {
        return Ok(());
    }
    match wait_for_poll(events, trip_id).await {
        Some(PollOutcome::Settled(status)) => {
            println!("Trip {trip_id} finished: {status}");
        }
        Some(PollOutcome::TimedOut) => {
            println!("Trip {trip_id} is still generating; run `watch {trip_id}` later.");
        }
        Some(PollOutcome::Errored(message)) => bail!("status check for trip {trip_id} failed: {message}"),
        None => {}
    }
    Ok(())
}
