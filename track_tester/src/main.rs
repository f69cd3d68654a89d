use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use hue_tracker::{
    Deadline, FlightPhase, FlightSession, LoggingActuator, OperatorCommand, SessionReport, ThresholdConfig,
    TrackerConfig,
};
use log::{info, warn};

mod camera;

use camera::CameraFeed;

/// Follows a colored object through a camera or video file and logs the movement
/// commands a vehicle would receive.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Camera index or path to a video file.
    #[arg(default_value = "0")]
    input: String,

    /// Tracker configuration (JSON). Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Threshold file written by the calibrator; overrides the configured range.
    #[arg(long)]
    thresholds: Option<PathBuf>,

    /// Stop tracking after this many seconds.
    #[arg(long)]
    duration: Option<f64>,

    /// Read takeoff / track / land / quit commands from stdin instead of starting
    /// right away.
    #[arg(long)]
    interactive: bool,

    /// Run without the preview window. The session then ends only at the end of the
    /// input or after `--duration`.
    #[arg(long)]
    headless: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // --- 1. Configuration ---
    let mut config = match &args.config {
        Some(path) => TrackerConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => TrackerConfig::default(),
    };
    if let Some(path) = &args.thresholds {
        config.thresholds = ThresholdConfig::load(path).with_context(|| format!("loading {}", path.display()))?;
    }
    let limit = args
        .duration
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("--duration must be a non-negative number of seconds")?;

    // --- 2. Video input ---
    let feed = CameraFeed::open(&args.input, !args.headless)?;
    info!("reading from {}", args.input);

    // --- 3. Session ---
    let mut session = FlightSession::new(config, LoggingActuator::default())?;
    let report = if args.interactive {
        run_interactive(&mut session, feed, limit)?
    } else {
        session.takeoff()?;
        let stop = (feed.interrupt_key(), limit.map(Deadline::after));
        Some(session.track(feed, stop)?)
    };

    match report {
        Some(report) => print_report(&report),
        None => println!("Session ended without tracking."),
    }
    Ok(())
}

fn run_interactive(
    session: &mut FlightSession<LoggingActuator>,
    feed: CameraFeed,
    limit: Option<Duration>,
) -> anyhow::Result<Option<SessionReport>> {
    println!("Commands: takeoff (t), track (g), land (l), quit (q)");
    let mut lines = io::stdin().lines();

    while session.phase() != FlightPhase::Stopped {
        print!("[{}] > ", session.phase());
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            // stdin closed
            session.terminate()?;
            break;
        };
        let command = match line?.parse::<OperatorCommand>() {
            Ok(command) => command,
            Err(err) => {
                warn!("{err}");
                continue;
            }
        };

        if command == OperatorCommand::BeginTracking && session.phase().after(command).is_some() {
            // The time limit counts from the start of tracking.
            let stop = (feed.interrupt_key(), limit.map(Deadline::after));
            return Ok(Some(session.track(feed, stop)?));
        }
        if let Err(err) = session.apply(command) {
            warn!("{err}");
        }
    }
    Ok(None)
}

fn print_report(report: &SessionReport) {
    println!("Tracking stopped: {}", report.reason);
    println!("  cycles:        {}", report.cycles);
    println!("  commands sent: {}", report.commands_sent);
    println!("  landed:        {}", report.landed);
    match report.last_target {
        Some(target) => println!(
            "  last target:   ({}, {}), area {:.0}",
            target.centroid.x, target.centroid.y, target.area
        ),
        None => println!("  last target:   none"),
    }
}
