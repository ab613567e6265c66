//! Relay CLI - offline tooling for the safetronics relay
//!
//! Commands:
//! - replay: run recorded notification frames through the full decision
//!   pipeline with file-backed collaborators (no live link, no database)
//! - validate: check that a frame capture decodes cleanly
//!
//! The live service embeds the library directly with real transport and
//! gateway implementations; this binary exists for capture analysis and
//! pipeline dry runs.

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;

use safetronics_relay::{
    handoff_queue, AlertEvent, DecisionPipeline, FeatureVector, IngestError, MeasurementRecord,
    PersistenceGateway, RiskClassifier, RiskLabel, RiskScore, WorkerDirectory, WorkerProfile,
    PRODUCER_NAME, RELAY_VERSION,
};

/// Relay - wearable safety telemetry ingestion
#[derive(Parser)]
#[command(name = "relay")]
#[command(author = "Safetronics")]
#[command(version = RELAY_VERSION)]
#[command(about = "Replay and validate wearable telemetry captures", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run recorded frames through the decision pipeline
    Replay {
        /// Frame capture, one JSON frame per line (use - for stdin)
        #[arg(short, long)]
        frames: PathBuf,

        /// Worker roster JSON (array of profiles)
        #[arg(short, long)]
        workers: PathBuf,

        /// Output file for persisted rows as NDJSON (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Probability at or above which the stand-in scorer flags risk
        #[arg(long, default_value = "0.5")]
        risk_threshold: f64,
    },

    /// Check that a frame capture decodes cleanly
    Validate {
        /// Frame capture, one JSON frame per line (use - for stdin)
        #[arg(short, long)]
        frames: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!(producer = PRODUCER_NAME, version = RELAY_VERSION, "Relay starting");

    let result = match cli.command {
        Commands::Replay {
            frames,
            workers,
            output,
            risk_threshold,
        } => cmd_replay(&frames, &workers, &output, risk_threshold).await,
        Commands::Validate { frames } => cmd_validate(&frames),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("relay: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Read an input source line by line (`-` means stdin).
fn read_lines(path: &PathBuf) -> io::Result<Vec<String>> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        for line in io::stdin().lock().lines() {
            buf.push_str(&line?);
            buf.push('\n');
        }
        buf
    } else {
        fs::read_to_string(path)?
    };

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

async fn cmd_replay(
    frames: &PathBuf,
    workers: &PathBuf,
    output: &PathBuf,
    risk_threshold: f64,
) -> io::Result<ExitCode> {
    let lines = read_lines(frames)?;
    let directory = RosterDirectory::load(workers)?;

    let sink: Box<dyn Write + Send> = if output.as_os_str() == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(fs::File::create(output)?)
    };
    let gateway = NdjsonGateway::new(sink);

    let (tx, rx) = handoff_queue();
    let pipeline = DecisionPipeline::new(
        rx,
        directory,
        ThresholdScorer { risk_threshold },
        gateway.clone(),
    );
    let worker = tokio::spawn(pipeline.run());

    let mut decoded = 0usize;
    let mut dropped = 0usize;
    for line in &lines {
        match safetronics_relay::frame::decode(line.as_bytes()) {
            Ok(sample) => {
                decoded += 1;
                tx.put(sample);
            }
            Err(e) => {
                dropped += 1;
                tracing::warn!(error = %e, "Dropping undecodable frame");
            }
        }
    }
    drop(tx);
    worker
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    gateway.flush()?;
    tracing::info!(decoded, dropped, rows = gateway.rows(), "Replay finished");
    Ok(ExitCode::SUCCESS)
}

fn cmd_validate(frames: &PathBuf) -> io::Result<ExitCode> {
    let lines = read_lines(frames)?;

    let mut invalid = 0usize;
    for (idx, line) in lines.iter().enumerate() {
        if let Err(e) = safetronics_relay::frame::decode(line.as_bytes()) {
            invalid += 1;
            eprintln!("line {}: {e}", idx + 1);
        }
    }

    println!("{} frames, {} invalid", lines.len(), invalid);
    Ok(if invalid == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Worker directory backed by a roster file.
struct RosterDirectory {
    profiles: std::collections::HashMap<u32, WorkerProfile>,
}

impl RosterDirectory {
    fn load(path: &PathBuf) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let roster: Vec<WorkerProfile> = serde_json::from_str(&text)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        Ok(Self {
            profiles: roster.into_iter().map(|p| (p.worker_id, p)).collect(),
        })
    }
}

#[async_trait]
impl WorkerDirectory for RosterDirectory {
    async fn get_worker(&self, worker_id: u32) -> Result<Option<WorkerProfile>, IngestError> {
        Ok(self.profiles.get(&worker_id).cloned())
    }
}

/// Stand-in scorer for dry runs.
///
/// The production classifier is an external model server; replays use a
/// crude vitals heuristic instead so captures can be routed end to end
/// without it. Keeps the model's inverted polarity: 0 = risk.
struct ThresholdScorer {
    risk_threshold: f64,
}

#[async_trait]
impl RiskClassifier for ThresholdScorer {
    async fn score(&self, features: &FeatureVector) -> Result<RiskScore, IngestError> {
        // Deviation of each vital from a nominal resting value,
        // normalized to roughly [0, 1] and averaged.
        let hr_dev = ((features.heart_rate - 75.0).abs() / 60.0).clamp(0.0, 1.0);
        let temp_dev = ((features.body_temp - 36.8).abs() / 3.0).clamp(0.0, 1.0);
        let spo2_dev = ((97.0 - features.spo2).max(0.0) / 10.0).clamp(0.0, 1.0);
        let probability = (hr_dev + temp_dev + spo2_dev) / 3.0;

        let label = if probability >= self.risk_threshold {
            RiskLabel::Risk
        } else {
            RiskLabel::Normal
        };

        Ok(RiskScore { probability, label })
    }
}

/// Row shapes written by the replay gateway
#[derive(Serialize)]
#[serde(tag = "table", rename_all = "snake_case")]
enum ReplayRow<'a> {
    Alerts(&'a AlertEvent),
    Measurements(&'a MeasurementRecord),
}

/// Persistence gateway that appends NDJSON rows to a writer.
#[derive(Clone)]
struct NdjsonGateway {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
    rows: Arc<Mutex<usize>>,
}

impl NdjsonGateway {
    fn new(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
            rows: Arc::new(Mutex::new(0)),
        }
    }

    fn write_row(&self, row: &ReplayRow<'_>) -> Result<(), IngestError> {
        let line = serde_json::to_string(row).map_err(|e| IngestError::Persistence(e.to_string()))?;
        let mut sink = self.sink.lock().unwrap();
        writeln!(sink, "{line}").map_err(|e| IngestError::Persistence(e.to_string()))?;
        *self.rows.lock().unwrap() += 1;
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        self.sink.lock().unwrap().flush()
    }

    fn rows(&self) -> usize {
        *self.rows.lock().unwrap()
    }
}

#[async_trait]
impl PersistenceGateway for NdjsonGateway {
    async fn insert_alert(&self, alert: &AlertEvent) -> Result<(), IngestError> {
        self.write_row(&ReplayRow::Alerts(alert))
    }

    async fn insert_measurement(&self, record: &MeasurementRecord) -> Result<(), IngestError> {
        self.write_row(&ReplayRow::Measurements(record))
    }
}
