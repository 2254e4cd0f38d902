// THEORY:
// `rug_tester` drives the motion rug core end to end the way a host application
// would: a producer task pushes frame messages into a `RugWorker`, and this task
// collects the rugs it publishes. Frames come either from an NDJSON recording (one
// inbound message per line) or from a built-in simulation of a small fleet. The
// simulation deliberately delivers some frames out of order so the resequencer
// is exercised. The last rug of every (strategy, feature) pair is written as a
// PNG, together with the ordered, color-annotated data behind it.

use anyhow::{bail, Context};
use log::{info, warn};
use motion_rugs::core_modules::utils::image_helper::image_helper::{rug_file_name, save_rug_scaled};
use motion_rugs::{FrameMessage, Reading, RugConfig, RugImage, RugWorker, Strategy, WorkerHandle};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

const SIMULATED_FRAMES: u64 = 600;
const SIMULATED_MOVERS: usize = 24;
const CANVAS_WIDTH: u32 = 2000;
const PNG_SCALE: u32 = 4;
const QUEUE_DEPTH: usize = 64;

struct Args {
    output_dir: PathBuf,
    config: Option<PathBuf>,
    input: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let mut args = std::env::args().skip(1);
    let Some(output_dir) = args.next() else {
        return Ok(None);
    };
    let mut parsed = Args {
        output_dir: PathBuf::from(output_dir),
        config: None,
        input: None,
    };
    while let Some(flag) = args.next() {
        let value = args.next().with_context(|| format!("{} needs a value", flag))?;
        match flag.as_str() {
            "--config" => parsed.config = Some(PathBuf::from(value)),
            "--input" => parsed.input = Some(PathBuf::from(value)),
            other => bail!("unknown option {}", other),
        }
    }
    Ok(Some(parsed))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    // --- 1. Argument Parsing & Setup ---
    let Some(args) = parse_args()? else {
        println!("Usage: rug_tester <output_dir> [--config <config.json>] [--input <frames.ndjson>]");
        return Ok(());
    };
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    let config = match &args.config {
        Some(path) => RugConfig::from_json_file(path).context("loading config")?,
        None => RugConfig {
            strategies: vec![Strategy::Hilbert, Strategy::ZOrder],
            features: vec!["Velocity".to_string(), "Acceleration".to_string()],
            redraw_interval: 10,
            ..RugConfig::default()
        },
    };

    // --- 2. Worker Initialization ---
    let RugWorker { handle, mut rugs, task } = RugWorker::spawn(config, QUEUE_DEPTH)?;

    // --- 3. Producer ---
    let producer = match args.input.clone() {
        Some(path) => tokio::spawn(async move { replay(&path, handle).await }),
        None => tokio::spawn(async move { simulate(handle).await }),
    };

    // --- 4. Collect Rugs ---
    let mut latest: BTreeMap<(Strategy, String), (u64, RugImage)> = BTreeMap::new();
    let mut rug_count = 0u64;
    while let Some(rug) = rugs.recv().await {
        rug_count += 1;
        latest.insert((rug.strategy, rug.feature.clone()), (rug_count, rug));
    }

    producer.await.context("producer task panicked")??;
    let stats = task.await.context("rug worker panicked")?;
    info!(
        "{} frames received, {} rejected, {} failed redraws, {} rugs emitted",
        stats.frames_received, stats.frames_rejected, stats.redraws_failed, stats.rugs_emitted
    );

    // --- 5. Write Output ---
    if latest.is_empty() {
        warn!("no rugs were rendered");
    }
    for (sequence, rug) in latest.values() {
        write_rug(&args.output_dir, rug, *sequence)?;
    }
    Ok(())
}

/// Writes the rug as a PNG and its ordered data as JSON next to it. `sequence` is
/// the rug's position among every rug the worker published.
fn write_rug(output_dir: &Path, rug: &RugImage, sequence: u64) -> anyhow::Result<()> {
    let png = output_dir.join(rug_file_name(rug, sequence));
    save_rug_scaled(&png, rug, PNG_SCALE).with_context(|| format!("writing {}", png.display()))?;

    let json = png.with_extension("json");
    let writer = BufWriter::new(File::create(&json).with_context(|| format!("creating {}", json.display()))?);
    serde_json::to_writer(writer, &rug.ordered).with_context(|| format!("writing {}", json.display()))?;

    info!("{} / {}: {}x{} rug written to {}", rug.strategy, rug.feature, rug.width(), rug.height(), png.display());
    Ok(())
}

/// Replays an NDJSON recording, one inbound message per line.
async fn replay(path: &Path, handle: WorkerHandle) -> anyhow::Result<()> {
    let reader = BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
    for (line_number, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let message: FrameMessage = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(err) => {
                warn!("{}:{}: skipping malformed message: {}", path.display(), line_number + 1, err);
                continue;
            }
        };
        handle.send_frame(message).await?;
    }
    handle.shutdown().await?;
    Ok(())
}

/// Streams a simulated fleet, swapping every fifth pair of frames in transit.
async fn simulate(handle: WorkerHandle) -> anyhow::Result<()> {
    let mut number = 0;
    while number < SIMULATED_FRAMES {
        if number % 10 == 5 && number + 1 < SIMULATED_FRAMES {
            handle.send_frame(simulated_message(number + 1)).await?;
            handle.send_frame(simulated_message(number)).await?;
            number += 2;
        } else {
            handle.send_frame(simulated_message(number)).await?;
            number += 1;
        }
    }
    handle.shutdown().await?;
    Ok(())
}

/// Movers orbit a handful of cluster centres; speed rises as they swing outward.
fn simulated_message(number: u64) -> FrameMessage {
    let t = number as f64 * 0.02;
    let readings = (0..SIMULATED_MOVERS)
        .map(|i| {
            let cluster = (i % 4) as f64;
            let phase = i as f64 * 0.9;
            let radius = 0.0004 + 0.0002 * (t + phase).sin();
            let lat = 48.1372 + 0.002 * cluster + radius * (t * 1.5 + phase).cos();
            let lng = 11.5755 + 0.0015 * cluster + radius * (t * 1.5 + phase).sin();
            let velocity = 8.0 + 4.0 * (t + phase).sin() + cluster;
            let acceleration = 4.0 * (t + phase).cos() * 0.02;
            Reading::new(lat, lng)
                .with_feature("Velocity", velocity)
                .with_feature("Acceleration", acceleration)
        })
        .collect();
    FrameMessage::new(number, readings, CANVAS_WIDTH)
}
