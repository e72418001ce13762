//! Glide CLI
//!
//! Play tween scenarios headlessly and inspect easing curves.

use anyhow::Result;
use clap::{Parser, Subcommand};
use glide_animation::{EaseMode, Easing, Transition};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod stage;

use config::Scenario;
use stage::Stage;

/// Frames played when a scenario has no duration and never goes idle
const MAX_UNBOUNDED_SECONDS: u64 = 60;

/// Width of the bar drawn by `glide curve`
const CURVE_WIDTH: usize = 40;

#[derive(Parser)]
#[command(name = "glide")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Glide tweening CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario and print property values per frame
    Run {
        /// Scenario file or directory containing glide.toml
        #[arg(default_value = ".")]
        scenario: String,

        /// Override the scenario's ticks per second
        #[arg(long)]
        fps: Option<u32>,

        /// Number of frames to play
        #[arg(long)]
        frames: Option<u64>,

        /// Only print the final frame
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print a sampled easing curve
    Curve {
        /// Transition name (linear, sine, quad, cubic, quart, quint, expo,
        /// circ, elastic, back, bounce, spring)
        transition: String,

        /// Ease mode (in, out, in_out, out_in)
        #[arg(short, long, default_value = "in")]
        mode: String,

        /// Number of samples between 0 and 1 inclusive
        #[arg(short, long, default_value = "11")]
        samples: usize,
    },

    /// Write a starter scenario
    Init {
        /// Output file or directory
        #[arg(default_value = "glide.toml")]
        path: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            fps,
            frames,
            quiet,
        } => cmd_run(&scenario, fps, frames, quiet),

        Commands::Curve {
            transition,
            mode,
            samples,
        } => cmd_curve(&transition, &mode, samples),

        Commands::Init { path } => cmd_init(&path),
    }
}

fn cmd_run(path: &str, fps: Option<u32>, frames: Option<u64>, quiet: bool) -> Result<()> {
    let scenario = Scenario::load(Path::new(path))?;

    let fps = fps.unwrap_or(scenario.playback.fps);
    if fps == 0 {
        anyhow::bail!("--fps must be at least 1");
    }
    let dt = 1.0 / fps as f32;

    // Stop early on idle only when nothing fixed the length
    let (frames, stop_when_idle) = match (frames, scenario.playback.duration) {
        (Some(frames), _) => (frames, false),
        (None, Some(duration)) => ((duration * fps as f32).ceil() as u64, false),
        (None, None) => (fps as u64 * MAX_UNBOUNDED_SECONDS, true),
    };

    let mut stage = Stage::build(&scenario)?;
    info!("Playing {} for up to {} frames at {} fps", path, frames, fps);

    let mut last = String::new();
    let mut played = 0;
    for frame in 1..=frames {
        stage.tick(dt);
        played = frame;
        last = stage.format_frame(frame, frame as f32 * dt);
        if !quiet {
            println!("{}", last);
        }
        if stop_when_idle && stage.is_idle() {
            break;
        }
    }

    if quiet {
        println!("{}", last);
    }
    if !stage.is_idle() {
        warn!("Stopped after {} frames with animations still running", played);
    } else {
        info!(
            "Finished after {} frames, {} tweens pooled",
            played,
            stage.runtime().pooled_count::<f32>()
        );
    }
    Ok(())
}

fn cmd_curve(transition: &str, mode: &str, samples: usize) -> Result<()> {
    let transition: Transition = transition.parse()?;
    let mode: EaseMode = mode.parse()?;
    if samples < 2 {
        anyhow::bail!("--samples must be at least 2");
    }

    let easing = Easing::new(transition, mode);
    println!("{:?} / {:?}", transition, mode);
    for i in 0..samples {
        let t = i as f32 / (samples - 1) as f32;
        let value = easing.apply(t);
        println!("{:>6.3}  {:>8.4}  {}", t, value, curve_bar(value));
    }
    Ok(())
}

/// Horizontal bar for a curve value; overshoot past 0..1 is marked at the edges
fn curve_bar(value: f32) -> String {
    let clamped = value.clamp(0.0, 1.0);
    let filled = (clamped * CURVE_WIDTH as f32).round() as usize;
    let mut bar = "#".repeat(filled);
    if value < 0.0 {
        bar.insert(0, '<');
    } else if value > 1.0 {
        bar.push('>');
    }
    bar
}

fn cmd_init(path: &str) -> Result<()> {
    let mut target = PathBuf::from(path);
    if target.is_dir() {
        target = target.join("glide.toml");
    }

    if target.exists() {
        anyhow::bail!("{} already exists", target.display());
    }

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&target, Scenario::starter())?;

    info!("Wrote starter scenario to {}", target.display());
    info!("Play it with: glide run {}", target.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_bar() {
        assert_eq!(curve_bar(0.0), "");
        assert_eq!(curve_bar(1.0).len(), CURVE_WIDTH);
        assert!(curve_bar(1.2).ends_with('>'));
        assert!(curve_bar(-0.1).starts_with('<'));
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from(["glide", "run", "demo.toml", "--fps", "30", "-q"]).unwrap();
        match cli.command {
            Commands::Run {
                scenario,
                fps,
                quiet,
                ..
            } => {
                assert_eq!(scenario, "demo.toml");
                assert_eq!(fps, Some(30));
                assert!(quiet);
            }
            _ => panic!("expected run"),
        }
    }
}
