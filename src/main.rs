// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand, ValueEnum};
use panorama::MotionCommand;
use panorama::constants::app_info;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "panorama")]
#[command(about = "Depth + color panorama capture on a rotating drive base")]
#[command(version = app_info::version())]
struct Cli {
    /// Config file (default: ~/.config/panorama/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Record motion packets in memory instead of opening the serial port
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a single depth/color pair without moving
    Capture {
        /// Output directory (default: ~/Pictures/Panorama)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write PGM/PPM raw dumps
        #[arg(long)]
        raw: bool,
    },

    /// Run a full panorama sweep
    Sweep {
        /// Number of rotation steps (captures = rotations + 1)
        #[arg(short, long)]
        rotations: Option<u32>,

        /// Output directory (default: ~/Pictures/Panorama)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write PGM/PPM raw dumps
        #[arg(long)]
        raw: bool,
    },

    /// Issue one timed motion
    Drive {
        motion: Motion,

        /// Motion duration (default: from config)
        #[arg(short, long)]
        duration_ms: Option<u64>,
    },

    /// Write the depth calibration table dump
    Calibration {
        /// Dump path (default: <output dir>/Depth2Color.bin)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config {
        /// Write it back to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Motion {
    Forward,
    Backward,
    Cw,
    Ccw,
    Stop,
}

impl From<Motion> for MotionCommand {
    fn from(motion: Motion) -> Self {
        match motion {
            Motion::Forward => MotionCommand::Forward,
            Motion::Backward => MotionCommand::Backward,
            Motion::Cw => MotionCommand::RotateCw,
            Motion::Ccw => MotionCommand::RotateCcw,
            Motion::Stop => MotionCommand::Stop,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control log level, e.g. RUST_LOG=panorama=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let mut config = cli::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Capture { output, raw } => {
            cli::apply_output(&mut config, output, raw);
            cli::run_session(&config, cli.dry_run, cli::SessionRequest::Single)
        }
        Commands::Sweep {
            rotations,
            output,
            raw,
        } => {
            cli::apply_output(&mut config, output, raw);
            let rotations = rotations.unwrap_or(config.panorama.max_rotations);
            cli::run_session(&config, cli.dry_run, cli::SessionRequest::Sweep(rotations))
        }
        Commands::Drive {
            motion,
            duration_ms,
        } => cli::drive(&config, cli.dry_run, motion.into(), duration_ms),
        Commands::Calibration { output } => cli::write_calibration(&config, output),
        Commands::Config { save } => cli::show_config(&config, cli.config, save),
    }
}
