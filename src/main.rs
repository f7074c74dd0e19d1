use std::io::{self, Write};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::replay::Script;

mod config;
mod replay;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Set config file path
    #[arg(short, long)]
    config: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a recorded session script and print every outward event as a JSON line
    Replay {
        /// Script file (JSON)
        script: String,
    },
    /// Merge a tracking log into presence intervals per processor
    Timeline {
        /// Tracking log file, a JSON array of {timeStamp, processorId}
        log: String,
        /// Override [timeline] gap_ms
        #[arg(long)]
        gap_ms: Option<u64>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = Config::parse(args.config)?;

    utils::set_log(&utils::crate_filter(
        &cfg.log.level,
        &["overlay-sync", "overlaycore", "timeline"],
    ));

    warn!("set log level : {}", cfg.log.level);
    debug!("config : {:?}", cfg);

    match args.command {
        Commands::Replay { script } => {
            let script = Script::load(&script)?;
            info!(
                camera = %script.camera_id,
                steps = script.steps.len(),
                "replaying script"
            );
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let summary = replay::run(&script, cfg.sync, &mut out).await?;
            out.flush()?;
            if summary.lagged > 0 {
                warn!("{} events were not printed", summary.lagged);
            }
        }
        Commands::Timeline { log, gap_ms } => {
            let text = std::fs::read_to_string(&log).with_context(|| format!("read log {log}"))?;
            let entries: Vec<timeline::TrackingLog> =
                serde_json::from_str(&text).with_context(|| format!("parse log {log}"))?;
            let gap = chrono::Duration::milliseconds(gap_ms.unwrap_or(cfg.timeline.gap_ms) as i64);
            let intervals = timeline::presence_intervals(&entries, gap)?;
            info!(
                entries = entries.len(),
                processors = intervals.len(),
                "timeline merged"
            );
            println!("{}", serde_json::to_string_pretty(&intervals)?);
        }
    }
    Ok(())
}
