use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use demosum_reduce::{reduce, ReduceConfig};
use demosum_source::JsonlSource;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "demosum", version, about = "Reduce a decoded match recording into a JSON match summary")]
struct Cli {
    /// Path to the decoded recording (JSON Lines event log)
    recording: PathBuf,
}

fn init_tracing() {
    let env = std::env::var("DEMOSUM_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // stdout carries only the record
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn config_from_env() -> ReduceConfig {
    let mut cfg = ReduceConfig::default();
    if let Ok(list) = std::env::var("DEMOSUM_CONVARS") {
        cfg.tracked_convars = list.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
    }
    if let Ok(v) = std::env::var("DEMOSUM_ROUND_START_ROSTER") {
        match parse_flag(&v) {
            Some(b) => cfg.roster_on_round_start = b,
            None => warn!(value = %v, "invalid DEMOSUM_ROUND_START_ROSTER; expected 0/1/true/false"),
        }
    }
    cfg
}

/// Reduce one recording and write its record as a single JSON line.
/// Nothing reaches `out` unless the whole reduction succeeded.
fn run(path: &Path, config: ReduceConfig, out: &mut dyn Write) -> Result<()> {
    let started = Instant::now();
    let mut source = JsonlSource::open(path).with_context(|| format!("opening recording {}", path.display()))?;
    let record = reduce(&mut source, config).with_context(|| format!("reducing {} (line {})", path.display(), source.lines_read()))?;
    let json = record.to_json().context("serializing match record")?;
    info!(
        lines = source.lines_read(),
        events = record.events.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "recording reduced"
    );
    writeln!(out, "{json}").context("writing match record")?;
    Ok(())
}

async fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let config = config_from_env();
    info!(recording = %cli.recording.display(), ?config, "demosum invoked");

    let path = cli.recording.clone();
    let job = tokio::task::spawn_blocking(move || {
        let mut buf = Vec::new();
        run(&path, config, &mut buf).map(|()| buf)
    });
    let timeout = std::env::var("DEMOSUM_TIMEOUT_SECS").ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_secs);
    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, job)
            .await
            .map_err(|_| anyhow!("reduction exceeded {}s; partial state discarded", limit.as_secs()))???,
        None => job.await??,
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&output).context("writing to stdout")?;
    stdout.flush().context("flushing stdout")?;
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(e) = try_main().await {
        error!(error = ?e, "demosum failed");
        eprintln!("demosum: {:#}", e);
        // exit directly so a timed-out blocking reducer is not awaited on runtime shutdown
        std::process::exit(1);
    }
}
