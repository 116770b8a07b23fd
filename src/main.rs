mod config;
mod error;
mod fetch;
mod notify;
mod parser;
mod state;
mod tracker;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use config::Config;
use error::RunError;
use notify::{NotificationEvent, Notifier};
use state::MemoryState;

#[derive(Parser)]
#[command(name = "restock_monitor", about = "Amazon.co.jp restock monitor with Telegram alerts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Automatic run: alert on novel listings, advance the heartbeat counter
    Run {
        #[command(flatten)]
        args: MonitorArgs,
    },
    /// Manual run: same pipeline, never counts toward the heartbeat,
    /// always ends with a status report
    Check {
        #[command(flatten)]
        args: MonitorArgs,
    },
    /// Show persisted memory (seen listings and run counter)
    Stats {
        /// State file to inspect
        #[arg(long, default_value = config::DEFAULT_STATE_PATH)]
        state_file: PathBuf,
    },
}

#[derive(Args)]
struct MonitorArgs {
    /// Search results URL to watch
    #[arg(long, default_value = config::DEFAULT_SEARCH_URL)]
    url: String,

    /// Relevance keyword, repeatable (default: hot wheels variants)
    #[arg(short, long = "keyword")]
    keywords: Vec<String>,

    /// Sponsored/ad phrase, repeatable (default: multi-locale set)
    #[arg(long = "ad-phrase")]
    ad_phrases: Vec<String>,

    /// Minimum accepted price in yen, inclusive
    #[arg(long, default_value_t = 0)]
    min_price: i64,

    /// Maximum accepted price in yen, inclusive
    #[arg(long, default_value_t = 5000)]
    max_price: i64,

    /// Keep listings whose price could not be parsed
    #[arg(long)]
    allow_unknown_price: bool,

    /// Max remembered listings; oldest evicted first
    #[arg(long, default_value_t = 50)]
    capacity: usize,

    /// Liveness ping every this many automatic runs (0 disables)
    #[arg(long, default_value_t = 12)]
    heartbeat_every: u32,

    /// Path of the persisted memory file
    #[arg(long, default_value = config::DEFAULT_STATE_PATH)]
    state_file: PathBuf,
}

impl MonitorArgs {
    fn into_config(self) -> Config {
        let defaults = Config::default();
        let lower =
            |v: Vec<String>| -> Vec<String> { v.into_iter().map(|s| s.to_lowercase()).collect() };
        Config {
            search_url: self.url,
            keywords: if self.keywords.is_empty() {
                defaults.keywords
            } else {
                lower(self.keywords)
            },
            ad_phrases: if self.ad_phrases.is_empty() {
                defaults.ad_phrases
            } else {
                lower(self.ad_phrases)
            },
            min_price: self.min_price,
            max_price: self.max_price,
            allow_unknown_price: self.allow_unknown_price,
            memory_capacity: self.capacity,
            heartbeat_every: self.heartbeat_every,
            state_path: self.state_file,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { args } => run_once(&args.into_config(), false).await,
        Commands::Check { args } => run_once(&args.into_config(), true).await,
        Commands::Stats { state_file } => {
            show_stats(&state_file);
            Ok(())
        }
    }
}

/// One complete run: load memory, fetch, gate on the fetch classification,
/// extract + filter + dedup, diff against memory, persist, notify. All abort
/// paths leave the persisted id map exactly as loaded.
async fn run_once(cfg: &Config, manual: bool) -> Result<()> {
    let mut state = MemoryState::load(&cfg.state_path);
    let notifier = Notifier::from_env();
    let client = fetch::build_client()?;

    info!(
        "Checking {} ({} remembered, run count {})",
        cfg.search_url,
        state.len(),
        state.run_count
    );

    let body = match fetch::fetch_page(&client, &cfg.search_url).await {
        Ok(body) => body,
        Err(e @ RunError::Blocked { .. }) => {
            warn!("{}", e);
            // Blocked runs never touch the id map, but automatic ones still
            // count toward the heartbeat so a sustained block stays visible.
            let mut events = Vec::new();
            if manual {
                events.push(NotificationEvent::Error { message: e.to_string() });
            } else {
                if tracker::advance_heartbeat(&mut state, cfg.heartbeat_every) {
                    events.push(NotificationEvent::Liveness { runs: cfg.heartbeat_every });
                }
                state.save(&cfg.state_path)?;
            }
            notifier.send_all(&events).await;
            return Ok(());
        }
        Err(e) => {
            warn!("{}", e);
            if manual {
                let events = [NotificationEvent::Error { message: e.to_string() }];
                notifier.send_all(&events).await;
            }
            return Ok(());
        }
    };

    let snapshot = parser::process_document(&body, cfg);
    let mut events = Vec::new();

    if snapshot.candidate_count == 0 {
        warn!("Page yielded zero candidates (layout change or empty results)");
        if manual {
            events.push(NotificationEvent::StatusReport {
                summary: "Page yielded no candidates (layout change or empty results?).".to_string(),
            });
        } else {
            if tracker::advance_heartbeat(&mut state, cfg.heartbeat_every) {
                events.push(NotificationEvent::Liveness { runs: cfg.heartbeat_every });
            }
            state.save(&cfg.state_path)?;
        }
        notifier.send_all(&events).await;
        return Ok(());
    }

    events.extend(tracker::novelty_events(&snapshot.items, &state, cfg));
    let novel = events.len();
    tracker::commit(&snapshot.items, &mut state, cfg.memory_capacity);

    if manual {
        events.push(NotificationEvent::StatusReport {
            summary: format!(
                "{} of {} candidates match filters; {} new.",
                snapshot.items.len(),
                snapshot.candidate_count,
                novel
            ),
        });
    } else if tracker::advance_heartbeat(&mut state, cfg.heartbeat_every) {
        events.push(NotificationEvent::Liveness { runs: cfg.heartbeat_every });
    }

    state.save(&cfg.state_path)?;
    notifier.send_all(&events).await;

    info!(
        "Run complete: {} candidates, {} matched, {} novel",
        snapshot.candidate_count,
        snapshot.items.len(),
        novel
    );
    Ok(())
}

fn show_stats(path: &Path) {
    let state = MemoryState::load(path);
    println!("State file: {}", path.display());
    println!("Run count:  {}", state.run_count);
    println!("Remembered: {} listings (oldest first)", state.len());
    for (asin, price) in state.iter() {
        let price = if price == parser::PRICE_UNKNOWN {
            "-".to_string()
        } else {
            format!("¥{}", price)
        };
        println!("  {:<12} {:>10}", asin, price);
    }
}
