use std::io::BufRead;

use clap::Parser;
use hourglass_core::{clock, Event, HourglassConfig};
use hourglass_scheduler::Scheduler;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

mod input;

/// Read JSON-lines events from stdin and print each payload at its due second.
#[derive(Debug, Parser)]
#[command(name = "hourglass", version)]
struct Cli {
    /// Config file (defaults to $HOURGLASS_CONFIG, then ~/.hourglass/hourglass.toml).
    #[arg(long)]
    config: Option<String>,

    /// Log filter used when RUST_LOG is unset, e.g. `hourglass=debug`.
    #[arg(long)]
    log: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // load config: --config > HOURGLASS_CONFIG env > ~/.hourglass/hourglass.toml
    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("HOURGLASS_CONFIG").ok());
    let loaded = HourglassConfig::load(config_path.as_deref());
    let config = loaded.as_ref().cloned().unwrap_or_default();

    // stdout carries payloads, so logs go to stderr
    let filter = cli.log.clone().unwrap_or_else(|| config.log.filter.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
    if let Err(e) = loaded {
        warn!("Config load failed ({}), using defaults", e);
    }

    let (scheduler, events, mut deliveries) = Scheduler::in_memory(&config.scheduler);
    let handle = scheduler.serve()?;

    // Blocking reads on a plain thread: a pending stdin read must not keep
    // the runtime alive at exit.
    std::thread::spawn(move || read_events(events));

    let printer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(payload) = deliveries.recv().await {
            stdout.write_all(payload.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");
    scheduler.cancel();
    handle.await?;
    printer.await??;
    Ok(())
}

fn read_events(events: mpsc::Sender<Event>) {
    let stdin = std::io::stdin();
    for (n, line) in stdin.lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("stdin read failed: {e}");
                return;
            }
        };
        match input::parse_line(&line, clock::now_secs()) {
            Ok(Some(event)) => {
                if events.blocking_send(event).is_err() {
                    info!("scheduler stopped accepting events");
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(line = n + 1, "skipping input: {e:#}"),
        }
    }
    info!("stdin closed, waiting for pending events");
}
