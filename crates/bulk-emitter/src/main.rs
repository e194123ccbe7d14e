use bulk_emitter::{Clock, Emitter, EmitterOptions, EmitterState, HttpTransport, Record, SystemClock};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Exceptional init failure: log and exit.
fn fatal(msg: &str, error: &dyn std::fmt::Display) -> ! {
    error!(%error, "{msg}");
    std::process::exit(1);
}

fn setup_logging() {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::prelude::*;

    let level = std::env::var("BULK_EMITTER_LOG_LEVEL")
        .ok()
        .and_then(|val| {
            val.parse::<LevelFilter>().ok().or_else(|| {
                eprintln!("invalid BULK_EMITTER_LOG_LEVEL: {val:?}, defaulting to WARN");
                None
            })
        })
        .unwrap_or(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(level)
        .with(tracing_microjson::JsonLayer::new(std::io::stderr).with_target(true))
        .init();
}

/// Read one record per stdin line until EOF. Lines that are not records are skipped.
async fn read_records(tx: mpsc::Sender<Record>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Record>(&line) {
                    Ok(record) => {
                        if tx.send(record).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => warn!(error = %e, "skipping line that is not a record"),
                }
            }
            Ok(None) => return,
            Err(e) => {
                error!(error = %e, "failed to read stdin");
                return;
            }
        }
    }
}

#[tokio::main]
async fn main() {
    setup_logging();

    let options = EmitterOptions::from_env().unwrap_or_else(|e| fatal("config error", &e));
    let transport =
        HttpTransport::new(&options).unwrap_or_else(|e| fatal("failed to build HTTP client", &e));

    let mut emitter = Emitter::new(transport);
    emitter.initialize(Some(&options));
    if emitter.state() != EmitterState::Enabled {
        warn!("bulk emitter is disabled, records will be discarded");
    }

    let (tx, mut rx) = mpsc::channel::<Record>(1024);
    let reader = tokio::spawn(read_records(tx));

    let mut ticker = tokio::time::interval(options.tick_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            record = rx.recv() => match record {
                Some(record) => emitter.process_record(record),
                None => break,
            },
            _ = ticker.tick() => emitter.tick(SystemClock.now_millis()),
        }
    }

    if let Err(e) = reader.await {
        error!(error = %e, "stdin reader failed");
    }

    debug!(buffered = emitter.buffered(), "stdin closed, flushing");
    emitter.flush();
    emitter.drain().await;
    info!(state = %emitter.state(), "bulk emitter stopped");
}
