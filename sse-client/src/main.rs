use anyhow::Result;
use clap::Parser;
use colored::*;
use std::str::FromStr;
use std::time::Duration;

mod auth;

use auth::{login, UserCredentials};
use events::EventKind;
use sse_client::{ConnectionState, Connector, EventSourceTransport, Options, Topic};

#[derive(Parser)]
#[command(name = "sse-probe")]
#[command(about = "Live tail of the helpdesk event stream")]
struct Cli {
    /// Base URL of the backend (e.g., http://localhost:4747)
    #[arg(long)]
    base_url: String,

    /// Credentials (format: email:password)
    #[arg(long)]
    user: String,

    /// Only print events of these types (e.g., ticket:created); repeatable
    #[arg(long)]
    event: Vec<String>,

    /// Delay unit for linear reconnect backoff, in seconds
    #[arg(long, default_value_t = 3)]
    base_delay: u64,

    /// Reconnect attempts before giving up
    #[arg(long, default_value_t = 5)]
    max_attempts: u32,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

fn print_event(event: &events::Event) {
    let body = serde_json::to_string(event).unwrap_or_else(|_| "<unserializable>".to_string());
    println!("{} {}", event.kind().to_string().cyan().bold(), body);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    let topics: Vec<Topic> = if cli.event.is_empty() {
        vec![Topic::All]
    } else {
        cli.event
            .iter()
            .map(|name| EventKind::from_str(name).map(Topic::Kind))
            .collect::<Result<_, _>>()?
    };

    let credentials = UserCredentials::parse(&cli.user)?;

    println!("{} Authenticating...", "→".blue());
    let client = reqwest::Client::new();
    let user = login(&client, &cli.base_url, &credentials).await?;
    println!(
        "{} Authenticated as {} ({})",
        "✓".green(),
        user.user_id,
        user.role
    );

    let transport = EventSourceTransport::new(&cli.base_url, &user.token);
    let connector = Connector::connect(
        transport,
        Options {
            base_delay: Duration::from_secs(cli.base_delay),
            max_attempts: cli.max_attempts,
        },
    );

    // Keep the handles alive for the lifetime of the tail.
    let _subscriptions: Vec<_> = topics
        .into_iter()
        .map(|topic| connector.subscribe(topic, print_event))
        .collect();

    let mut state_rx = connector.watch_state();
    let state_feed = tokio::spawn(async move {
        loop {
            let state = *state_rx.borrow_and_update();
            match state {
                ConnectionState::Idle => {}
                ConnectionState::Connecting => println!("{} Connecting...", "→".blue()),
                ConnectionState::Open => println!("{} Stream open", "✓".green()),
                ConnectionState::Reconnecting { attempt } => {
                    println!("{} Connection lost, reconnect attempt {}", "!".yellow(), attempt)
                }
                ConnectionState::Closed => {
                    println!("{} Stream closed", "✗".red());
                    return;
                }
            }
            if state_rx.changed().await.is_err() {
                return;
            }
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!("\n{} Shutting down", "→".blue());
            connector.close();
        }
        _ = state_feed => {
            // Terminal close: retries exhausted.
            std::process::exit(1);
        }
    }

    Ok(())
}
