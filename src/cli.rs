// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! - Single captures and full sweeps
//! - Manual drive moves
//! - Calibration dump and config inspection

use panorama::backends::drive::{
    DriveController, DriveLink, LoopbackLink, MotionCommand, SerialLink,
};
use panorama::backends::sensor::{
    ArrivalPump, FrameSynchronizer, NullObserver, SensorSource, SyntheticSensor,
};
use panorama::config::Config;
use panorama::constants::sensor;
use panorama::errors::AppResult;
use panorama::pipelines::panorama::{
    CaptureState, CaptureWorker, MotionProfile, PanoramaCapture,
};
use panorama::pipelines::persist::FileSink;
use panorama::registration::{self, CoordinateMapper};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// What to do once the pipeline is running
#[derive(Debug, Clone, Copy)]
pub enum SessionRequest {
    Single,
    Sweep(u32),
}

pub fn load_config(path: Option<&Path>) -> AppResult<Config> {
    Config::load_or_default(path)
}

/// Apply command-line output overrides
pub fn apply_output(config: &mut Config, output: Option<PathBuf>, raw: bool) {
    if output.is_some() {
        config.output.directory = output;
    }
    config.output.dump_raw |= raw;
}

fn open_drive(
    config: &Config,
    dry_run: bool,
) -> Result<DriveController, Box<dyn std::error::Error>> {
    let link: Box<dyn DriveLink> = if dry_run {
        Box::new(LoopbackLink::new())
    } else {
        Box::new(SerialLink::from_settings(&config.drive)?)
    };

    let mut controller = DriveController::new(link);
    controller.initialize(config.drive.announce_on_connect)?;
    Ok(controller)
}

/// Run one capture session against the synthetic sensor
pub fn run_session(
    config: &Config,
    dry_run: bool,
    request: SessionRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let source = SyntheticSensor::from_settings(&config.sensor)?;
    let table = registration::load_or_fetch(config.output.calibration_path.as_deref(), &source)?;
    let mapper = CoordinateMapper::new(table, config.registration.clone());

    let drive = open_drive(config, dry_run)?;
    let sink = FileSink::from_settings(&config.output);
    let output_dir = sink.directory().to_path_buf();

    let mut capture = PanoramaCapture::new(
        mapper,
        drive,
        Box::new(sink),
        MotionProfile::from_config(config),
    );
    capture.set_listener(Box::new(|state: CaptureState| println!("  {}", state)));

    let accepted = match request {
        SessionRequest::Single => capture.start_capture(),
        SessionRequest::Sweep(rotations) => {
            println!("Sweep: {} rotations, {} captures", rotations, rotations + 1);
            capture.start_panorama(rotations)
        }
    };
    if !accepted {
        return Err("A capture session is already active".into());
    }

    let mut worker = CaptureWorker::new(
        FrameSynchronizer::from_settings(&config.sensor),
        capture,
        Box::new(NullObserver),
    );

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })?;

    println!("Source: {} (press Ctrl+C to stop)", source.name());
    let (mut pump, arrivals) = ArrivalPump::start(Box::new(source), sensor::ARRIVAL_QUEUE_DEPTH);
    let report = worker.run(&arrivals, &stop_flag);
    pump.stop();

    if dry_run {
        println!("Dry run: motion packets were not sent");
    }

    match report {
        Some(report) => {
            println!(
                "Panorama {}: {} captures, {} rotations{}",
                report.panorama_index,
                report.captures,
                report.rotations,
                if report.partial { " (partial)" } else { "" }
            );
            println!("Saved to: {}", output_dir.display());
            Ok(())
        }
        None if stop_flag.load(Ordering::SeqCst) => {
            // Leave the base stationary
            worker.capture_mut().drive().send(MotionCommand::Stop)?;
            println!("Stopped early");
            Ok(())
        }
        None => Err("Sensor stream ended before the session finished".into()),
    }
}

/// Issue one timed motion
pub fn drive(
    config: &Config,
    dry_run: bool,
    command: MotionCommand,
    duration_ms: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut controller = open_drive(config, dry_run)?;

    let duration = match (duration_ms, command) {
        (Some(ms), _) => Duration::from_millis(ms),
        (None, MotionCommand::Forward | MotionCommand::Backward) => config.drive.move_duration(),
        (None, MotionCommand::RotateCw | MotionCommand::RotateCcw) => {
            config.drive.rotate_duration()
        }
        (None, MotionCommand::Stop) => Duration::ZERO,
    };

    if command == MotionCommand::Stop {
        controller.send(command)?;
    } else {
        controller.drive_for(command, duration)?;
    }

    println!("{} for {} ms", command, duration.as_millis());
    Ok(())
}

/// Fetch the calibration table and write it out
pub fn write_calibration(
    config: &Config,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = SyntheticSensor::from_settings(&config.sensor)?;
    let table = source.calibration_table()?;
    let path = output.unwrap_or_else(|| config.output.calibration_path());

    table.dump(&path)?;

    println!(
        "Calibration: {}x{} ({} entries)",
        table.width(),
        table.height(),
        table.len()
    );
    println!("Saved to: {}", path.display());
    Ok(())
}

/// Print the effective configuration, optionally saving it
pub fn show_config(
    config: &Config,
    path: Option<PathBuf>,
    save: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(config)?);

    if save {
        let path = path
            .or_else(Config::default_path)
            .ok_or("No config directory available")?;
        config.save(&path)?;
        println!("Saved to: {}", path.display());
    }
    Ok(())
}
